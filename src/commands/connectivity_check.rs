use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{encode, StepGenerator};
use crate::{
    core::{AdmissionQueue, Host, HostStore, StepResult},
    hardware::InterfaceValidator,
    network::strip_prefix,
    protocols::{ConnectivityCheckHost, ConnectivityCheckNic, Step, StepType},
};

/// Full-mesh L2/L3 probe from the host to every other host of its cluster.
///
/// Large clusters go through the [`AdmissionQueue`] so that only a bounded
/// number of hosts start probing within one window.
#[derive(Debug, Clone)]
pub struct ConnectivityCheckCmd {
    store: Arc<dyn HostStore>,
    interfaces: Arc<dyn InterfaceValidator>,
    admission: Arc<AdmissionQueue>,
}

impl ConnectivityCheckCmd {
    pub fn new(
        store: Arc<dyn HostStore>,
        interfaces: Arc<dyn InterfaceValidator>,
        admission: Arc<AdmissionQueue>,
    ) -> Self {
        Self {
            store,
            interfaces,
            admission,
        }
    }

    fn peer(&self, host: &Host) -> StepResult<ConnectivityCheckHost> {
        let nics = self
            .interfaces
            .valid_interfaces(host)?
            .into_iter()
            .map(|interface| ConnectivityCheckNic {
                ip_addresses: interface
                    .addresses()
                    .map(|addr| strip_prefix(addr).to_string())
                    .collect(),
                name: interface.name,
                mac: interface.mac_address,
            })
            .collect();
        Ok(ConnectivityCheckHost {
            host_id: host.id,
            nics,
        })
    }
}

#[async_trait]
impl StepGenerator for ConnectivityCheckCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        let Some(cluster_id) = host.cluster_id else {
            return Ok(None);
        };
        let hosts = self.store.list_cluster_hosts(cluster_id).await?;

        if self.admission.requires_admission(hosts.len())
            && !self.admission.is_admitted(cluster_id, host.id)
        {
            debug!(
                host_id = %host.id,
                cluster_id = %cluster_id,
                hosts = hosts.len(),
                "Connectivity check deferred by admission queue"
            );
            return Ok(None);
        }

        let peers = hosts
            .iter()
            .filter(|peer| peer.id != host.id && !peer.status.is_unreachable())
            .map(|peer| self.peer(peer))
            .collect::<StepResult<Vec<_>>>()?;
        if peers.is_empty() {
            return Ok(None);
        }

        let payload = encode("connectivity-check request", &peers)?;
        Ok(Some(vec![Step::new(StepType::ConnectivityCheck, vec![payload])]))
    }

    fn name(&self) -> &'static str {
        "connectivity-check"
    }
}
