use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::host::HostRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClusterKind {
    #[default]
    Cluster,
    AddHostsCluster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HighAvailabilityMode {
    #[default]
    Full,
    None,
}

impl HighAvailabilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighAvailabilityMode::Full => "Full",
            HighAvailabilityMode::None => "None",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Proxy {
    #[serde(default)]
    pub http_proxy: String,
    #[serde(default)]
    pub https_proxy: String,
    #[serde(default)]
    pub no_proxy: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskEncryptionMode {
    #[default]
    Tpmv2,
    Tang,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskEncryption {
    /// `none`, `all`, or a comma-separated combination of `masters`,
    /// `workers` and `arbiters`
    #[serde(default = "default_enable_on")]
    pub enable_on: String,
    #[serde(default)]
    pub mode: DiskEncryptionMode,
    /// JSON array of `{url, thumbprint}` objects
    #[serde(default)]
    pub tang_servers: String,
}

fn default_enable_on() -> String {
    "none".to_string()
}

impl Default for DiskEncryption {
    fn default() -> Self {
        Self {
            enable_on: default_enable_on(),
            mode: DiskEncryptionMode::default(),
            tang_servers: String::new(),
        }
    }
}

impl DiskEncryption {
    pub fn is_enabled_for_role(&self, role: HostRole) -> bool {
        self.enable_on
            .split(',')
            .map(str::trim)
            .any(|scope| match scope {
                "all" => true,
                "masters" => matches!(role, HostRole::Master | HostRole::Bootstrap),
                "arbiters" => role == HostRole::Arbiter,
                "workers" => role == HostRole::Worker,
                _ => false,
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IgnitionEndpoint {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ca_certificate: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: Uuid,
    #[serde(default)]
    pub kind: ClusterKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_dns_domain: String,
    #[serde(default)]
    pub openshift_version: String,
    #[serde(default = "default_cpu_architecture")]
    pub cpu_architecture: String,
    #[serde(default)]
    pub pull_secret: String,
    /// Day-2 cluster registered from an already running OpenShift
    #[serde(default)]
    pub imported: bool,
    #[serde(default)]
    pub vip_dhcp_allocation: bool,
    #[serde(default)]
    pub machine_networks: Vec<String>,
    #[serde(default)]
    pub service_networks: Vec<String>,
    #[serde(default)]
    pub cluster_networks: Vec<String>,
    #[serde(default)]
    pub api_vips: Vec<String>,
    #[serde(default)]
    pub ingress_vips: Vec<String>,
    #[serde(default)]
    pub api_vip_dns_name: Option<String>,
    #[serde(default)]
    pub api_vip_lease: Option<String>,
    #[serde(default)]
    pub ingress_vip_lease: Option<String>,
    #[serde(default)]
    pub high_availability_mode: HighAvailabilityMode,
    #[serde(default)]
    pub control_plane_count: Option<i64>,
    #[serde(default)]
    pub user_managed_networking: bool,
    #[serde(default)]
    pub static_network_configured: bool,
    #[serde(default)]
    pub disk_encryption: Option<DiskEncryption>,
    #[serde(default)]
    pub proxy: Proxy,
    #[serde(default)]
    pub additional_ntp_source: String,
    #[serde(default)]
    pub ignition_endpoint: Option<IgnitionEndpoint>,
    #[serde(default)]
    pub ignition_endpoint_token: Option<String>,
}

fn default_cpu_architecture() -> String {
    "x86_64".to_string()
}

impl Default for Cluster {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            kind: ClusterKind::default(),
            name: String::new(),
            base_dns_domain: String::new(),
            openshift_version: String::new(),
            cpu_architecture: default_cpu_architecture(),
            pull_secret: String::new(),
            imported: false,
            vip_dhcp_allocation: false,
            machine_networks: Vec::new(),
            service_networks: Vec::new(),
            cluster_networks: Vec::new(),
            api_vips: Vec::new(),
            ingress_vips: Vec::new(),
            api_vip_dns_name: None,
            api_vip_lease: None,
            ingress_vip_lease: None,
            high_availability_mode: HighAvailabilityMode::default(),
            control_plane_count: None,
            user_managed_networking: false,
            static_network_configured: false,
            disk_encryption: None,
            proxy: Proxy::default(),
            additional_ntp_source: String::new(),
            ignition_endpoint: None,
            ignition_endpoint_token: None,
        }
    }
}

impl Cluster {
    pub fn is_day2(&self) -> bool {
        self.kind == ClusterKind::AddHostsCluster
    }

    /// `<name>.<base-domain>`, when both are set.
    pub fn domain(&self) -> Option<String> {
        if self.name.is_empty() || self.base_dns_domain.is_empty() {
            return None;
        }
        Some(format!("{}.{}", self.name, self.base_dns_domain))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfraEnv {
    pub id: Uuid,
    /// Static network configuration, empty when hosts use DHCP
    #[serde(default)]
    pub static_network_config: String,
    #[serde(default)]
    pub additional_ntp_sources: String,
    #[serde(default)]
    pub proxy: Proxy,
}

impl InfraEnv {
    pub fn has_static_network(&self) -> bool {
        !self.static_network_config.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_encryption_roles() {
        let all = DiskEncryption {
            enable_on: "all".to_string(),
            ..Default::default()
        };
        for role in [HostRole::Master, HostRole::Worker, HostRole::Arbiter] {
            assert!(all.is_enabled_for_role(role));
        }

        let masters = DiskEncryption {
            enable_on: "masters".to_string(),
            ..Default::default()
        };
        assert!(masters.is_enabled_for_role(HostRole::Master));
        assert!(masters.is_enabled_for_role(HostRole::Bootstrap));
        assert!(!masters.is_enabled_for_role(HostRole::Worker));

        let combined = DiskEncryption {
            enable_on: "workers,arbiters".to_string(),
            ..Default::default()
        };
        assert!(combined.is_enabled_for_role(HostRole::Worker));
        assert!(combined.is_enabled_for_role(HostRole::Arbiter));
        assert!(!combined.is_enabled_for_role(HostRole::Master));

        assert!(!DiskEncryption::default().is_enabled_for_role(HostRole::Master));
    }

    #[test]
    fn test_cluster_domain() {
        let mut cluster = Cluster {
            name: "test-cluster".to_string(),
            ..Default::default()
        };
        assert_eq!(cluster.domain(), None);
        cluster.base_dns_domain = "example.com".to_string();
        assert_eq!(cluster.domain().as_deref(), Some("test-cluster.example.com"));
    }

    #[test]
    fn test_cluster_defaults_from_json() {
        let cluster: Cluster =
            serde_json::from_str(r#"{"id":"00000000-0000-0000-0000-000000000001"}"#).unwrap();
        assert_eq!(cluster.cpu_architecture, "x86_64");
        assert_eq!(cluster.kind, ClusterKind::Cluster);
        assert_eq!(cluster.high_availability_mode, HighAvailabilityMode::Full);
    }
}
