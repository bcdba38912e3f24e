use std::sync::Arc;

use async_trait::async_trait;
use ipnet::IpNet;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{encode, StepGenerator};
use crate::{
    core::{Host, HostStore, StepResult},
    network::{address_in_cidr, configured_machine_cidr, NetworkError},
    protocols::{DhcpAllocationRequest, Step, StepType},
};

/// OUI prefix of generated VIP MAC addresses
const VIP_MAC_PREFIX: &str = "00:1a:4a";

/// Deterministic MAC for a cluster VIP; `role` is `api` or `ingress`.
pub fn generate_vip_mac(cluster_id: Uuid, role: &str) -> String {
    let digest = Sha256::digest(format!("{}-{}", cluster_id, role).as_bytes());
    format!(
        "{}:{:02x}:{:02x}:{:02x}",
        VIP_MAC_PREFIX, digest[0], digest[1], digest[2]
    )
}

/// Requests DHCP leases for the API and ingress VIPs on the host's
/// machine-network interface.
#[derive(Debug, Clone)]
pub struct DhcpAllocateCmd {
    store: Arc<dyn HostStore>,
}

impl DhcpAllocateCmd {
    pub fn new(store: Arc<dyn HostStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StepGenerator for DhcpAllocateCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        let Some(cluster_id) = host.cluster_id else {
            return Ok(None);
        };
        let cluster = self.store.get_cluster(cluster_id).await?;
        if !cluster.vip_dhcp_allocation || host.inventory.is_empty() {
            return Ok(None);
        }
        // IPv4 only, and only the configured machine network; never inferred
        let cidr = match configured_machine_cidr(&cluster)? {
            Some(cidr @ IpNet::V4(_)) => cidr,
            _ => return Ok(None),
        };

        let inventory = host.parse_inventory()?;
        let mut interface = None;
        'interfaces: for candidate in &inventory.interfaces {
            for address in &candidate.ipv4_addresses {
                if address_in_cidr(address, &cidr)? {
                    interface = Some(candidate.name.clone());
                    break 'interfaces;
                }
            }
        }
        let interface = interface.ok_or_else(|| NetworkError::NoMatchingInterface {
            address: cidr.to_string(),
        })?;

        let request = DhcpAllocationRequest {
            api_vip_mac: generate_vip_mac(cluster.id, "api"),
            ingress_vip_mac: generate_vip_mac(cluster.id, "ingress"),
            interface,
            api_vip_lease: cluster.api_vip_lease.clone().filter(|l| !l.is_empty()),
            ingress_vip_lease: cluster.ingress_vip_lease.clone().filter(|l| !l.is_empty()),
        };
        let payload = encode("dhcp-lease-allocate request", &request)?;
        Ok(Some(vec![Step::new(StepType::DhcpLeaseAllocate, vec![payload])]))
    }

    fn name(&self) -> &'static str {
        "dhcp-allocate"
    }
}
