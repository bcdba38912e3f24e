use async_trait::async_trait;
use tracing::warn;

use super::{encode, StepGenerator};
use crate::{
    core::{Host, StepError, StepResult},
    network::network_of,
    protocols::{Step, StepType},
};

/// Subnets larger than this (more than 4096 addresses) are not scanned
const MIN_PREFIX_LEN: u8 = 20;

/// Scans the host's IPv4 subnets for unused addresses, used to suggest VIPs.
#[derive(Debug, Clone, Copy)]
pub struct FreeAddressesCmd {
    enabled: bool,
}

impl FreeAddressesCmd {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl StepGenerator for FreeAddressesCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        if !self.enabled {
            return Ok(None);
        }
        let inventory = host.parse_inventory()?;

        let mut networks: Vec<String> = Vec::new();
        for address in inventory.interfaces.iter().flat_map(|i| i.ipv4_addresses.iter()) {
            let network = network_of(address)?;
            if network.prefix_len() < MIN_PREFIX_LEN {
                warn!(
                    host_id = %host.id,
                    network = %network,
                    "Skipping free addresses scan, network is too large"
                );
                continue;
            }
            let network = network.to_string();
            if !networks.contains(&network) {
                networks.push(network);
            }
        }

        if networks.is_empty() {
            if inventory.has_ipv6() {
                return Ok(None);
            }
            return Err(StepError::MissingField {
                host_id: host.id,
                field: "a scannable IPv4 network",
            });
        }

        let payload = encode("free-addresses request", &networks)?;
        Ok(Some(vec![Step::new(
            StepType::FreeNetworkAddresses,
            vec![payload],
        )]))
    }

    fn name(&self) -> &'static str {
        "free-addresses"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Interface, Inventory};

    fn host(interfaces: Vec<(Vec<&str>, Vec<&str>)>) -> Host {
        let inventory = Inventory {
            interfaces: interfaces
                .into_iter()
                .enumerate()
                .map(|(i, (v4, v6))| Interface {
                    name: format!("eth{}", i),
                    ipv4_addresses: v4.iter().map(|s| s.to_string()).collect(),
                    ipv6_addresses: v6.iter().map(|s| s.to_string()).collect(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        Host {
            inventory: serde_json::to_string(&inventory).unwrap(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_dedupes_networks() {
        let host = host(vec![
            (vec!["10.0.0.5/24", "192.168.1.2/24"], vec![]),
            (vec!["10.0.0.6/24"], vec![]),
        ]);
        let steps = FreeAddressesCmd::new(true)
            .get_steps(&host)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(steps[0].args, vec![r#"["10.0.0.0/24","192.168.1.0/24"]"#]);
    }

    #[tokio::test]
    async fn test_skips_large_networks() {
        let host = host(vec![(vec!["10.0.0.5/16", "10.1.0.5/20"], vec![])]);
        let steps = FreeAddressesCmd::new(true)
            .get_steps(&host)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(steps[0].args, vec![r#"["10.1.0.0/20"]"#]);
    }

    #[tokio::test]
    async fn test_only_large_networks_fails_without_ipv6() {
        let host = host(vec![(vec!["10.0.0.5/8"], vec![])]);
        assert!(FreeAddressesCmd::new(true).get_steps(&host).await.is_err());
    }

    #[tokio::test]
    async fn test_ipv6_only_emits_nothing() {
        let host = host(vec![(vec![], vec!["2001:db8::1/64"])]);
        assert!(FreeAddressesCmd::new(true)
            .get_steps(&host)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_disabled() {
        let host = host(vec![(vec!["10.0.0.5/24"], vec![])]);
        assert!(FreeAddressesCmd::new(false)
            .get_steps(&host)
            .await
            .unwrap()
            .is_none());
    }
}
