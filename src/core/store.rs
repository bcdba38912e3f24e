//! Host/cluster record store
//!
//! Generators only read records, except for the two host fields the install
//! step writes back. Persistence itself lives behind [`HostStore`].

use std::fmt::Debug;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::{
    cluster::{Cluster, InfraEnv},
    error::{StoreError, StoreResult},
    host::Host,
};

#[async_trait]
pub trait HostStore: Send + Sync + Debug {
    async fn get_host(&self, infra_env_id: Uuid, host_id: Uuid) -> StoreResult<Host>;

    async fn get_cluster(&self, cluster_id: Uuid) -> StoreResult<Cluster>;

    async fn get_infra_env(&self, infra_env_id: Uuid) -> StoreResult<InfraEnv>;

    /// All hosts bound to the cluster
    async fn list_cluster_hosts(&self, cluster_id: Uuid) -> StoreResult<Vec<Host>>;

    /// Record the installer image the host was told to run.
    ///
    /// Returns whether the stored value changed.
    async fn update_installer_version(
        &self,
        infra_env_id: Uuid,
        host_id: Uuid,
        version: &str,
    ) -> StoreResult<bool>;

    async fn update_skip_formatting_disks(
        &self,
        infra_env_id: Uuid,
        host_id: Uuid,
        disks: &str,
    ) -> StoreResult<()>;
}

/// In-memory store keyed by record id
#[derive(Debug, Default)]
pub struct InMemoryHostStore {
    hosts: DashMap<Uuid, Host>,
    clusters: DashMap<Uuid, Cluster>,
    infra_envs: DashMap<Uuid, InfraEnv>,
}

impl InMemoryHostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_host(&self, host: Host) {
        self.hosts.insert(host.id, host);
    }

    pub fn insert_cluster(&self, cluster: Cluster) {
        self.clusters.insert(cluster.id, cluster);
    }

    pub fn insert_infra_env(&self, infra_env: InfraEnv) {
        self.infra_envs.insert(infra_env.id, infra_env);
    }

    pub fn remove_host(&self, host_id: Uuid) -> Option<Host> {
        self.hosts.remove(&host_id).map(|(_, host)| host)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }
}

#[async_trait]
impl HostStore for InMemoryHostStore {
    async fn get_host(&self, infra_env_id: Uuid, host_id: Uuid) -> StoreResult<Host> {
        self.hosts
            .get(&host_id)
            .filter(|host| host.infra_env_id == infra_env_id)
            .map(|host| host.clone())
            .ok_or(StoreError::HostNotFound {
                infra_env_id,
                host_id,
            })
    }

    async fn get_cluster(&self, cluster_id: Uuid) -> StoreResult<Cluster> {
        self.clusters
            .get(&cluster_id)
            .map(|cluster| cluster.clone())
            .ok_or(StoreError::ClusterNotFound { cluster_id })
    }

    async fn get_infra_env(&self, infra_env_id: Uuid) -> StoreResult<InfraEnv> {
        self.infra_envs
            .get(&infra_env_id)
            .map(|infra_env| infra_env.clone())
            .ok_or(StoreError::InfraEnvNotFound { infra_env_id })
    }

    async fn list_cluster_hosts(&self, cluster_id: Uuid) -> StoreResult<Vec<Host>> {
        let mut hosts: Vec<Host> = self
            .hosts
            .iter()
            .filter(|entry| entry.cluster_id == Some(cluster_id))
            .map(|entry| entry.value().clone())
            .collect();
        hosts.sort_by_key(|host| host.id);
        Ok(hosts)
    }

    async fn update_installer_version(
        &self,
        infra_env_id: Uuid,
        host_id: Uuid,
        version: &str,
    ) -> StoreResult<bool> {
        let mut host = self
            .hosts
            .get_mut(&host_id)
            .filter(|host| host.infra_env_id == infra_env_id)
            .ok_or(StoreError::HostNotFound {
                infra_env_id,
                host_id,
            })?;
        if host.installer_version == version {
            return Ok(false);
        }
        debug!(host_id = %host_id, version, "Updating installer version");
        host.installer_version = version.to_string();
        Ok(true)
    }

    async fn update_skip_formatting_disks(
        &self,
        infra_env_id: Uuid,
        host_id: Uuid,
        disks: &str,
    ) -> StoreResult<()> {
        let mut host = self
            .hosts
            .get_mut(&host_id)
            .filter(|host| host.infra_env_id == infra_env_id)
            .ok_or(StoreError::HostNotFound {
                infra_env_id,
                host_id,
            })?;
        host.skip_formatting_disks = disks.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(cluster_id: Option<Uuid>) -> Host {
        Host {
            id: Uuid::new_v4(),
            infra_env_id: Uuid::new_v4(),
            cluster_id,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_host_checks_infra_env() {
        let store = InMemoryHostStore::new();
        let h = host(None);
        store.insert_host(h.clone());

        assert!(store.get_host(h.infra_env_id, h.id).await.is_ok());
        let err = store.get_host(Uuid::new_v4(), h.id).await.unwrap_err();
        assert!(matches!(err, StoreError::HostNotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_cluster_hosts() {
        let store = InMemoryHostStore::new();
        let cluster_id = Uuid::new_v4();
        store.insert_host(host(Some(cluster_id)));
        store.insert_host(host(Some(cluster_id)));
        store.insert_host(host(Some(Uuid::new_v4())));
        store.insert_host(host(None));

        let hosts = store.list_cluster_hosts(cluster_id).await.unwrap();
        assert_eq!(hosts.len(), 2);
        assert!(hosts.iter().all(|h| h.cluster_id == Some(cluster_id)));
    }

    #[tokio::test]
    async fn test_update_installer_version_once() {
        let store = InMemoryHostStore::new();
        let h = host(None);
        store.insert_host(h.clone());

        assert!(store
            .update_installer_version(h.infra_env_id, h.id, "installer:1")
            .await
            .unwrap());
        assert!(!store
            .update_installer_version(h.infra_env_id, h.id, "installer:1")
            .await
            .unwrap());

        store.remove_host(h.id);
        assert!(store
            .update_installer_version(h.infra_env_id, h.id, "installer:2")
            .await
            .is_err());
    }
}
