use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::{
    ApiVipConnectivityCmd, ConnectivityCheckCmd, DhcpAllocateCmd, DiskPerformanceCmd,
    DomainResolutionCmd, FreeAddressesCmd, ImageAvailabilityCmd, InstallCmd, InventoryCmd,
    LogsGatherCmd, NoOpCmd, NtpSyncCmd, RebootForReclaimCmd, ResetCmd, StepGenerator, StopCmd,
    TangConnectivityCmd, UpgradeAgentCmd, VerifyVipsCmd,
};
use crate::{
    config::InstructionConfig,
    core::{
        AdmissionQueue, Host, HostStatus, HostStore, InstructionError, InstructionResult,
        StepError, StoreError,
    },
    hardware::InterfaceValidator,
    observability::{events::EventsHandler, logging::host_span},
    protocols::{Step, StepType, StepsResult},
    versions::ReleaseResolver,
};

/// Services the generators read from or report to
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub store: Arc<dyn HostStore>,
    pub releases: Arc<dyn ReleaseResolver>,
    pub events: Arc<dyn EventsHandler>,
    pub interfaces: Arc<dyn InterfaceValidator>,
    pub admission: Arc<AdmissionQueue>,
}

#[derive(Debug)]
struct StateEntry {
    generators: Vec<Arc<dyn StepGenerator>>,
    next_instruction_seconds: i64,
}

type StateTable = HashMap<HostStatus, StateEntry>;

/// Dispatches a host poll to the generators registered for its status.
///
/// Three tables are kept: one for clusters being installed, one for day-2
/// clusters that add hosts to a running OpenShift, and one for hosts not yet
/// bound to any cluster. The tables are built once and never mutated, so a
/// manager can serve concurrent polls without locking.
#[derive(Debug)]
pub struct InstructionManager {
    store: Arc<dyn HostStore>,
    installing: StateTable,
    add_hosts: StateTable,
    pool: StateTable,
    upgrade: Option<Arc<UpgradeAgentCmd>>,
    disabled_steps: HashSet<StepType>,
    active_secs: i64,
    request_timeout_secs: u64,
}

impl InstructionManager {
    pub fn new(config: &InstructionConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            store,
            releases,
            events,
            interfaces,
            admission,
        } = collaborators;
        let shared_config = Arc::new(config.clone());

        let inventory: Arc<dyn StepGenerator> = Arc::new(InventoryCmd);
        let connectivity: Arc<dyn StepGenerator> = Arc::new(ConnectivityCheckCmd::new(
            store.clone(),
            interfaces,
            admission,
        ));
        let api_vip: Arc<dyn StepGenerator> = Arc::new(ApiVipConnectivityCmd::new(store.clone()));
        let free_addresses: Arc<dyn StepGenerator> =
            Arc::new(FreeAddressesCmd::new(config.support_free_addresses));
        let dhcp: Arc<dyn StepGenerator> = Arc::new(DhcpAllocateCmd::new(store.clone()));
        let domain: Arc<dyn StepGenerator> =
            Arc::new(DomainResolutionCmd::new(store.clone(), releases.clone()));
        let ntp: Arc<dyn StepGenerator> = Arc::new(NtpSyncCmd::new(store.clone()));
        let tang: Arc<dyn StepGenerator> = Arc::new(TangConnectivityCmd::new(store.clone()));
        let verify_vips: Arc<dyn StepGenerator> = Arc::new(VerifyVipsCmd::new(store.clone()));
        let disk_performance: Arc<dyn StepGenerator> =
            Arc::new(DiskPerformanceCmd::new(config.disk_check_timeout_secs));
        let image_availability: Arc<dyn StepGenerator> = Arc::new(ImageAvailabilityCmd::new(
            store.clone(),
            releases.clone(),
            config.installer_image.clone(),
            config.release_image_mirror.clone(),
            config.image_availability_timeout_secs,
        ));
        let install: Arc<dyn StepGenerator> = Arc::new(InstallCmd::new(
            store.clone(),
            releases,
            events.clone(),
            shared_config,
        ));
        let logs: Arc<dyn StepGenerator> = Arc::new(LogsGatherCmd::new(store.clone()));
        let reset: Arc<dyn StepGenerator> = Arc::new(ResetCmd);
        let stop: Arc<dyn StepGenerator> = Arc::new(StopCmd);
        let no_op: Arc<dyn StepGenerator> = Arc::new(NoOpCmd);
        let reclaim: Arc<dyn StepGenerator> =
            Arc::new(RebootForReclaimCmd::new(config.hostfs_mount_dir.clone()));

        let active = config.polling.active_secs;
        let backoff = config.polling.backoff_secs;
        let entry = |generators: &[&Arc<dyn StepGenerator>], next_instruction_seconds: i64| {
            StateEntry {
                generators: generators.iter().map(|g| Arc::clone(*g)).collect(),
                next_instruction_seconds,
            }
        };

        let installing = HashMap::from([
            (
                HostStatus::Known,
                entry(
                    &[&connectivity, &free_addresses, &dhcp, &inventory, &ntp, &domain, &tang, &verify_vips],
                    active,
                ),
            ),
            (
                HostStatus::Insufficient,
                entry(
                    &[&inventory, &connectivity, &free_addresses, &dhcp, &ntp, &domain, &tang, &verify_vips],
                    active,
                ),
            ),
            (
                HostStatus::PendingForInput,
                entry(
                    &[&inventory, &connectivity, &free_addresses, &dhcp, &ntp, &domain, &tang, &verify_vips],
                    active,
                ),
            ),
            (HostStatus::Disconnected, entry(&[&inventory], backoff)),
            (HostStatus::Discovering, entry(&[&inventory, &ntp, &domain], active)),
            (HostStatus::Installing, entry(&[&install, &dhcp], backoff)),
            (HostStatus::InstallingInProgress, entry(&[&inventory, &dhcp], active)),
            (
                HostStatus::PreparingForInstallation,
                entry(&[&dhcp, &disk_performance, &image_availability], active),
            ),
            (HostStatus::PreparingSuccessful, entry(&[&dhcp], active)),
            (HostStatus::Disabled, entry(&[], backoff)),
            (HostStatus::Resetting, entry(&[&reset], backoff)),
            (HostStatus::Error, entry(&[&logs, &stop], backoff)),
            (HostStatus::Cancelled, entry(&[&logs, &stop], backoff)),
        ]);

        let add_hosts = HashMap::from([
            (
                HostStatus::Known,
                entry(&[&connectivity, &api_vip, &inventory, &ntp, &domain, &tang], active),
            ),
            (
                HostStatus::Insufficient,
                entry(&[&inventory, &connectivity, &api_vip, &ntp, &domain, &tang], active),
            ),
            (
                HostStatus::PendingForInput,
                entry(&[&inventory, &connectivity, &api_vip, &ntp, &domain], active),
            ),
            (HostStatus::Disconnected, entry(&[&inventory], backoff)),
            (HostStatus::Discovering, entry(&[&inventory, &ntp, &domain], active)),
            (HostStatus::Installing, entry(&[&install], backoff)),
            (HostStatus::InstallingInProgress, entry(&[], active)),
            (HostStatus::PreparingForInstallation, entry(&[&disk_performance], active)),
            (HostStatus::Disabled, entry(&[], backoff)),
            (HostStatus::Resetting, entry(&[&reset], backoff)),
            (HostStatus::Error, entry(&[&logs, &stop], backoff)),
            (HostStatus::Cancelled, entry(&[&logs, &stop], backoff)),
        ]);

        let pool = HashMap::from([
            (HostStatus::DiscoveringUnbound, entry(&[&inventory, &ntp], active)),
            (HostStatus::InsufficientUnbound, entry(&[&inventory, &ntp], active)),
            (HostStatus::KnownUnbound, entry(&[&inventory, &ntp], active)),
            (HostStatus::DisconnectedUnbound, entry(&[&inventory], backoff)),
            (HostStatus::DisabledUnbound, entry(&[], backoff)),
            (HostStatus::Binding, entry(&[&no_op], backoff)),
            (HostStatus::Unbinding, entry(&[&no_op], backoff)),
            (HostStatus::UnbindingPendingUserAction, entry(&[&no_op], backoff)),
            (HostStatus::ReclaimingRebooting, entry(&[&reclaim], backoff)),
        ]);

        let disabled_steps = parse_disabled_steps(&config.disabled_steps);
        let upgrade = (config.enable_upgrade_agent
            && !disabled_steps.contains(&StepType::UpgradeAgent))
        .then(|| Arc::new(UpgradeAgentCmd::new(config.agent_image.clone(), events)));

        Self {
            store,
            installing,
            add_hosts,
            pool,
            upgrade,
            disabled_steps,
            active_secs: active,
            request_timeout_secs: config.request_timeout_secs,
        }
    }

    /// Steps for the host's current status.
    ///
    /// Generator failures are logged and skipped; only a failure to load the
    /// host's cluster, an unavailable store or an exceeded deadline fails
    /// the call.
    pub async fn get_next_steps(&self, host: &Host) -> InstructionResult<StepsResult> {
        let poll = self.next_steps(host).instrument(host_span(host));
        if self.request_timeout_secs == 0 {
            return poll.await;
        }
        let deadline = std::time::Duration::from_secs(self.request_timeout_secs);
        tokio::time::timeout(deadline, poll)
            .await
            .map_err(|_| InstructionError::DeadlineExceeded {
                host_id: host.id,
                timeout_secs: self.request_timeout_secs,
            })?
    }

    /// Load the host record and compute its steps.
    pub async fn get_next_steps_for(
        &self,
        infra_env_id: Uuid,
        host_id: Uuid,
    ) -> InstructionResult<StepsResult> {
        let host = self.store.get_host(infra_env_id, host_id).await?;
        self.get_next_steps(&host).await
    }

    async fn next_steps(&self, host: &Host) -> InstructionResult<StepsResult> {
        if let Some(upgrade) = &self.upgrade {
            if upgrade.should_upgrade(host) {
                return self.upgrade_steps(upgrade, host).await;
            }
        }

        let table = self.table_for(host).await?;
        let Some(entry) = table.get(&host.status) else {
            debug!(
                host_id = %host.id,
                status = %host.status,
                "No instructions registered for host status"
            );
            return Ok(StepsResult::empty(self.active_secs));
        };

        let mut steps = Vec::new();
        for generator in &entry.generators {
            match generator.get_steps(host).await {
                Ok(Some(generated)) => steps.extend(generated),
                Ok(None) => {}
                Err(StepError::Store(e @ StoreError::Unavailable { .. })) => return Err(e.into()),
                Err(e) => warn!(
                    host_id = %host.id,
                    infra_env_id = %host.infra_env_id,
                    generator = generator.name(),
                    error = %e,
                    "Failed to generate steps"
                ),
            }
        }

        steps.retain(|step| !self.disabled_steps.contains(&step.step_type));
        self.finalize(host, &mut steps);

        let mut result = StepsResult::empty(entry.next_instruction_seconds);
        result.instructions = steps;
        Ok(result)
    }

    async fn upgrade_steps(
        &self,
        upgrade: &UpgradeAgentCmd,
        host: &Host,
    ) -> InstructionResult<StepsResult> {
        let mut steps = match upgrade.get_steps(host).await {
            Ok(steps) => steps.unwrap_or_default(),
            Err(e) => {
                warn!(host_id = %host.id, error = %e, "Failed to generate upgrade step");
                Vec::new()
            }
        };
        self.finalize(host, &mut steps);

        let mut result = StepsResult::empty(self.active_secs);
        result.instructions = steps;
        Ok(result)
    }

    async fn table_for(&self, host: &Host) -> InstructionResult<&StateTable> {
        let Some(cluster_id) = host.cluster_id else {
            return Ok(&self.pool);
        };
        let cluster = self.store.get_cluster(cluster_id).await?;
        if host.is_day2() || cluster.is_day2() {
            Ok(&self.add_hosts)
        } else {
            Ok(&self.installing)
        }
    }

    fn finalize(&self, host: &Host, steps: &mut [Step]) {
        for step in steps.iter_mut() {
            if step.step_id.is_empty() {
                step.step_id = generate_step_id(step.step_type);
            }
            info!(
                step_type = %step.step_type,
                step_id = %step.step_id,
                host_id = %host.id,
                infra_env_id = %host.infra_env_id,
                "Submitting step"
            );
        }
    }
}

/// `<step-type>-<8 hex digits>`; unique with high probability.
fn generate_step_id(step_type: StepType) -> String {
    format!("{}-{:08x}", step_type, rand::random::<u32>())
}

fn parse_disabled_steps(names: &[String]) -> HashSet<StepType> {
    names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .filter_map(|name| match name.parse::<StepType>() {
            Ok(step_type) => Some(step_type),
            Err(e) => {
                warn!(step = %name, error = %e, "Ignoring invalid disabled step");
                None
            }
        })
        .collect()
}
