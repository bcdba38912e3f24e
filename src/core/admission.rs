//! Per-cluster admission control for connectivity checks.
//!
//! Every host of a large cluster probes every other host, so the number of
//! hosts told to start a connectivity check is bounded per cluster to
//! `threshold` admissions within a sliding window. Hosts that do not fit are
//! queued in arrival order and admitted on a later poll once the window frees
//! capacity.

use std::{
    collections::VecDeque,
    sync::Arc,
    time::Duration,
};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::AdmissionConfig;

/// Admission state of one cluster
#[derive(Debug)]
struct ClusterQueue {
    inner: Mutex<ClusterQueueInner>,
}

#[derive(Debug)]
struct ClusterQueueInner {
    /// Admission timestamps, oldest first
    admitted: VecDeque<Instant>,
    /// Hosts waiting for admission, in arrival order
    waiting: Vec<Uuid>,
    last_used: Instant,
}

impl ClusterQueue {
    fn new() -> Self {
        Self {
            inner: Mutex::new(ClusterQueueInner {
                admitted: VecDeque::new(),
                waiting: Vec::new(),
                last_used: Instant::now(),
            }),
        }
    }
}

impl ClusterQueueInner {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.admitted.front() {
            if now.duration_since(*oldest) < window {
                break;
            }
            self.admitted.pop_front();
        }
    }

    fn position_or_insert(&mut self, host_id: Uuid) -> usize {
        match self.waiting.iter().position(|id| *id == host_id) {
            Some(index) => index,
            None => {
                self.waiting.push(host_id);
                self.waiting.len() - 1
            }
        }
    }
}

/// Sliding-window admission queue shared by all connectivity-check calls.
#[derive(Debug)]
pub struct AdmissionQueue {
    threshold: usize,
    window: Duration,
    idle_ttl: Duration,
    clusters: DashMap<Uuid, Arc<ClusterQueue>>,
}

impl AdmissionQueue {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            threshold: config.threshold,
            window: Duration::from_secs(config.window_secs),
            idle_ttl: Duration::from_secs(config.idle_ttl_secs),
            clusters: DashMap::new(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Clusters at or below the threshold bypass the queue entirely.
    pub fn requires_admission(&self, host_count: usize) -> bool {
        host_count > self.threshold
    }

    /// Atomic get-or-insert so concurrent first callers share one queue.
    ///
    /// `last_used` is refreshed while the shard is still locked, so
    /// [`evict_idle`](Self::evict_idle) cannot drop a queue between lookup
    /// and use.
    fn queue(&self, cluster_id: Uuid) -> Arc<ClusterQueue> {
        let entry = self
            .clusters
            .entry(cluster_id)
            .or_insert_with(|| Arc::new(ClusterQueue::new()));
        entry.inner.lock().last_used = Instant::now();
        Arc::clone(entry.value())
    }

    /// Decide whether the host may run a connectivity check now.
    ///
    /// A host not admitted keeps its place in the waiting queue and is
    /// re-evaluated on its next poll.
    pub fn is_admitted(&self, cluster_id: Uuid, host_id: Uuid) -> bool {
        let queue = self.queue(cluster_id);
        let mut inner = queue.inner.lock();
        let now = Instant::now();
        inner.last_used = now;
        inner.prune(now, self.window);

        let capacity = self.threshold.saturating_sub(inner.admitted.len());
        let index = inner.position_or_insert(host_id);

        if index < capacity {
            inner.waiting.remove(index);
            inner.admitted.push_back(now);
            trace!(
                cluster_id = %cluster_id,
                host_id = %host_id,
                index,
                capacity,
                "Host admitted to connectivity check"
            );
            true
        } else {
            trace!(
                cluster_id = %cluster_id,
                host_id = %host_id,
                index,
                capacity,
                "Host waiting for connectivity check admission"
            );
            false
        }
    }

    /// Queue a host without trying to admit it. Returns its position.
    pub fn enqueue(&self, cluster_id: Uuid, host_id: Uuid) -> usize {
        let queue = self.queue(cluster_id);
        let mut inner = queue.inner.lock();
        inner.last_used = Instant::now();
        inner.position_or_insert(host_id)
    }

    /// Unexpired admissions in the current window.
    pub fn admitted_count(&self, cluster_id: Uuid) -> usize {
        self.clusters
            .get(&cluster_id)
            .map(|queue| {
                let mut inner = queue.inner.lock();
                inner.prune(Instant::now(), self.window);
                inner.admitted.len()
            })
            .unwrap_or(0)
    }

    pub fn waiting_count(&self, cluster_id: Uuid) -> usize {
        self.clusters
            .get(&cluster_id)
            .map(|queue| queue.inner.lock().waiting.len())
            .unwrap_or(0)
    }

    pub fn waiting_position(&self, cluster_id: Uuid, host_id: Uuid) -> Option<usize> {
        self.clusters.get(&cluster_id).and_then(|queue| {
            queue
                .inner
                .lock()
                .waiting
                .iter()
                .position(|id| *id == host_id)
        })
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Drop queues of clusters that have not been used within the idle TTL.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.clusters.len();
        self.clusters
            .retain(|_, queue| now.duration_since(queue.inner.lock().last_used) < self.idle_ttl);
        let evicted = before.saturating_sub(self.clusters.len());
        if evicted > 0 {
            debug!(evicted, "Evicted idle connectivity admission queues");
        }
        evicted
    }

    /// Periodically evict idle cluster queues until the returned guard drops.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> AdmissionSweeper {
        let queue = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                queue.evict_idle();
            }
        });
        AdmissionSweeper { handle }
    }
}

/// Aborts the idle-queue sweeper on drop.
#[derive(Debug)]
pub struct AdmissionSweeper {
    handle: JoinHandle<()>,
}

impl Drop for AdmissionSweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
