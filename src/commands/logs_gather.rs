use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{encode, StepGenerator};
use crate::{
    core::{Cluster, Host, HostRole, HostStore, Inventory, StepError, StepResult},
    network::{addresses_in_cidr, primary_machine_cidr, strip_prefix},
    protocols::{LogsGatherCmdRequest, Step, StepType},
};

/// Collects agent and installer logs from a failed or cancelled host.
#[derive(Debug, Clone)]
pub struct LogsGatherCmd {
    store: Arc<dyn HostStore>,
}

impl LogsGatherCmd {
    pub fn new(store: Arc<dyn HostStore>) -> Self {
        Self { store }
    }

    /// Addresses of the control-plane hosts the bootstrap node gathers from.
    async fn master_ips(&self, host: &Host, cluster: &Cluster) -> StepResult<Vec<String>> {
        let hosts = self.store.list_cluster_hosts(cluster.id).await?;
        let cidr = if cluster.user_managed_networking {
            None
        } else {
            Some(
                primary_machine_cidr(cluster, &hosts)?
                    .ok_or(StepError::MachineCidrUnknown { host_id: host.id })?,
            )
        };

        let mut ips = Vec::new();
        for peer in hosts
            .iter()
            .filter(|peer| !peer.bootstrap && peer.effective_role() != HostRole::Worker)
        {
            let inventory = match Inventory::parse(&peer.inventory) {
                Ok(inventory) => inventory,
                Err(e) => {
                    warn!(host_id = %peer.id, error = %e, "Skipping master without inventory");
                    continue;
                }
            };
            match &cidr {
                Some(cidr) => ips.extend(addresses_in_cidr(&inventory, cidr)),
                None => ips.extend(
                    inventory
                        .interfaces
                        .iter()
                        .flat_map(|i| i.addresses())
                        .map(|addr| strip_prefix(addr).to_string()),
                ),
            }
        }
        Ok(ips)
    }
}

#[async_trait]
impl StepGenerator for LogsGatherCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        if host.logs_collected_at.is_some() {
            return Ok(None);
        }
        let Some(cluster_id) = host.cluster_id else {
            return Ok(None);
        };
        let cluster = self.store.get_cluster(cluster_id).await?;

        let master_ips = if host.bootstrap {
            Some(self.master_ips(host, &cluster).await?)
        } else {
            None
        };

        let request = LogsGatherCmdRequest {
            bootstrap: host.bootstrap,
            cluster_id,
            host_id: host.id,
            infra_env_id: host.infra_env_id,
            installer_gather: !host.installer_version.is_empty(),
            master_ips,
        };
        let payload = encode("logs-gather request", &request)?;
        Ok(Some(vec![Step::new(StepType::LogsGather, vec![payload])]))
    }

    fn name(&self) -> &'static str {
        "logs-gather"
    }
}
