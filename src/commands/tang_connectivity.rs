use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{encode, StepGenerator};
use crate::{
    core::{Cluster, DiskEncryptionMode, Host, HostRole, HostStore, StepError, StepResult},
    protocols::{Step, StepType, TangConnectivityRequest, TangServer},
};

/// Reply of the host's last API-VIP connectivity check
#[derive(Debug, Default, Deserialize)]
struct ApiVipConnectivityReply {
    #[serde(default)]
    ignition: String,
}

/// The slice of an ignition config that carries clevis tang bindings
#[derive(Debug, Default, Deserialize)]
struct Ignition {
    #[serde(default)]
    storage: IgnitionStorage,
}

#[derive(Debug, Default, Deserialize)]
struct IgnitionStorage {
    #[serde(default)]
    luks: Vec<Luks>,
}

#[derive(Debug, Default, Deserialize)]
struct Luks {
    #[serde(default)]
    clevis: Option<Clevis>,
}

#[derive(Debug, Default, Deserialize)]
struct Clevis {
    #[serde(default)]
    tang: Vec<TangServer>,
}

/// Checks that the host reaches the tang servers its disks will be bound to.
#[derive(Debug, Clone)]
pub struct TangConnectivityCmd {
    store: Arc<dyn HostStore>,
}

impl TangConnectivityCmd {
    pub fn new(store: Arc<dyn HostStore>) -> Self {
        Self { store }
    }

    /// Tang servers recorded in the ignition the host fetched from the
    /// existing cluster.
    fn servers_from_ignition(host: &Host) -> StepResult<Option<String>> {
        if host.api_vip_connectivity.is_empty() {
            return Ok(None);
        }
        let reply: ApiVipConnectivityReply = serde_json::from_str(&host.api_vip_connectivity)
            .map_err(|e| StepError::Serialization {
                what: "api-vip connectivity reply",
                reason: e.to_string(),
            })?;
        if reply.ignition.is_empty() {
            return Ok(None);
        }
        let ignition: Ignition =
            serde_json::from_str(&reply.ignition).map_err(|e| StepError::Serialization {
                what: "host ignition",
                reason: e.to_string(),
            })?;

        let servers: Vec<TangServer> = ignition
            .storage
            .luks
            .into_iter()
            .filter_map(|luks| luks.clevis)
            .flat_map(|clevis| clevis.tang)
            .collect();
        if servers.is_empty() {
            return Ok(None);
        }
        encode("tang servers", &servers).map(Some)
    }

    fn servers_from_cluster(host: &Host, cluster: &Cluster) -> Option<String> {
        let encryption = cluster.disk_encryption.as_ref()?;
        if encryption.mode != DiskEncryptionMode::Tang {
            return None;
        }
        let role = if host.bootstrap {
            HostRole::Bootstrap
        } else {
            host.effective_role()
        };
        if !encryption.is_enabled_for_role(role) || encryption.tang_servers.is_empty() {
            return None;
        }
        Some(encryption.tang_servers.clone())
    }
}

#[async_trait]
impl StepGenerator for TangConnectivityCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        let Some(cluster_id) = host.cluster_id else {
            return Ok(None);
        };
        let cluster = self.store.get_cluster(cluster_id).await?;

        // imported clusters carry no encryption settings of their own
        let servers = if host.is_day2() || cluster.imported {
            Self::servers_from_ignition(host)?
        } else {
            Self::servers_from_cluster(host, &cluster)
        };
        let Some(tang_servers) = servers else {
            return Ok(None);
        };

        let payload = encode(
            "tang-connectivity request",
            &TangConnectivityRequest { tang_servers },
        )?;
        Ok(Some(vec![Step::new(
            StepType::TangConnectivityCheck,
            vec![payload],
        )]))
    }

    fn name(&self) -> &'static str {
        "tang-connectivity"
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::core::{DiskEncryption, HostKind, InMemoryHostStore};

    const TANG_SERVERS: &str = r#"[{"url":"http://tang.example.com:7500","thumbprint":""}]"#;

    const HOST_IGNITION: &str = r#"{
        "ignition": {"version": "3.2.0"},
        "storage": {
            "luks": [{
                "clevis": {"tang": [{"thumbprint": "nWW89qAs1hDPKiIcae-ey2cQmUk", "url": "http://foo.bar"}]},
                "device": "/dev/disk/by-partlabel/root",
                "name": "root"
            }],
            "files": []
        }
    }"#;

    fn setup(cluster: Cluster, mut host: Host) -> (TangConnectivityCmd, Host) {
        let store = Arc::new(InMemoryHostStore::new());
        host.id = Uuid::new_v4();
        host.infra_env_id = Uuid::new_v4();
        host.cluster_id = Some(cluster.id);
        store.insert_cluster(cluster);
        store.insert_host(host.clone());
        (TangConnectivityCmd::new(store), host)
    }

    fn encrypted_cluster(enable_on: &str) -> Cluster {
        Cluster {
            id: Uuid::new_v4(),
            disk_encryption: Some(DiskEncryption {
                enable_on: enable_on.to_string(),
                mode: DiskEncryptionMode::Tang,
                tang_servers: TANG_SERVERS.to_string(),
            }),
            ..Default::default()
        }
    }

    fn day2_host(ignition: &str) -> Host {
        let reply = serde_json::json!({"is_success": true, "ignition": ignition});
        Host {
            kind: HostKind::AddToExistingClusterHost,
            api_vip_connectivity: reply.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_servers_from_cluster_config() {
        let worker = Host {
            role: HostRole::Worker,
            ..Default::default()
        };
        let (cmd, host) = setup(encrypted_cluster("all"), worker);
        let steps = cmd.get_steps(&host).await.unwrap().unwrap();
        let request: TangConnectivityRequest = serde_json::from_str(&steps[0].args[0]).unwrap();
        assert_eq!(request.tang_servers, TANG_SERVERS);
    }

    #[tokio::test]
    async fn test_role_not_encrypted() {
        let worker = Host {
            role: HostRole::Worker,
            ..Default::default()
        };
        let (cmd, host) = setup(encrypted_cluster("masters"), worker);
        assert!(cmd.get_steps(&host).await.unwrap().is_none());

        let (cmd, host) = setup(encrypted_cluster("none"), Host::default());
        assert!(cmd.get_steps(&host).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tpm_mode_skipped() {
        let mut cluster = encrypted_cluster("all");
        if let Some(encryption) = cluster.disk_encryption.as_mut() {
            encryption.mode = DiskEncryptionMode::Tpmv2;
        }
        let (cmd, host) = setup(cluster, Host::default());
        assert!(cmd.get_steps(&host).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_day2_servers_from_ignition() {
        let cluster = Cluster {
            id: Uuid::new_v4(),
            ..Default::default()
        };
        let (cmd, host) = setup(cluster, day2_host(HOST_IGNITION));
        let steps = cmd.get_steps(&host).await.unwrap().unwrap();
        assert_eq!(
            steps[0].args,
            vec![
                r#"{"tang_servers":"[{\"thumbprint\":\"nWW89qAs1hDPKiIcae-ey2cQmUk\",\"url\":\"http://foo.bar\"}]"}"#
            ]
        );
    }

    #[tokio::test]
    async fn test_day2_ignition_without_luks() {
        let cluster = Cluster {
            id: Uuid::new_v4(),
            ..Default::default()
        };
        let ignition = r#"{"ignition": {"version": "3.2.0"}, "storage": {"files": []}}"#;
        let (cmd, host) = setup(cluster.clone(), day2_host(ignition));
        assert!(cmd.get_steps(&host).await.unwrap().is_none());

        let (cmd, mut host) = setup(cluster, day2_host(ignition));
        host.api_vip_connectivity.clear();
        assert!(cmd.get_steps(&host).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_day2_invalid_ignition() {
        let cluster = Cluster {
            id: Uuid::new_v4(),
            ..Default::default()
        };
        let (cmd, host) = setup(cluster, day2_host("invalid json"));
        assert!(cmd.get_steps(&host).await.is_err());
    }
}
