//! Step payloads.
//!
//! Optional fields are omitted when unset so older agents keep parsing the
//! payloads they know.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityCheckNic {
    pub name: String,
    pub mac: String,
    pub ip_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityCheckHost {
    pub host_id: Uuid,
    pub nics: Vec<ConnectivityCheckNic>,
}

pub type ConnectivityCheckParams = Vec<ConnectivityCheckHost>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVipConnectivityRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignition_endpoint_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<Vec<RequestHeader>>,
    pub url: String,
}

/// Candidate subnets, in CIDR notation
pub type FreeNetworksAddressesRequest = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpAllocationRequest {
    pub api_vip_mac: String,
    pub ingress_vip_mac: String,
    pub interface: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_vip_lease: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_vip_lease: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainResolutionName {
    pub domain_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainResolutionRequest {
    pub domains: Vec<DomainResolutionName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NtpSynchronizationRequest {
    pub ntp_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskSpeedCheckRequest {
    pub path: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerImageAvailabilityRequest {
    pub images: Vec<String>,
    pub timeout: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallProxy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Installer invocation handed to the agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallCmdRequest {
    pub boot_device: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub check_cvo: bool,
    pub cluster_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_count: Option<i64>,
    pub controller_image: String,
    #[serde(default)]
    pub disks_to_format: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_skip_mco_reboot: bool,
    pub high_availability_mode: String,
    pub host_id: Uuid,
    pub infra_env_id: Uuid,
    /// JSON-encoded array of extra installer flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_args: Option<String>,
    pub installer_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mco_image: Option<String>,
    /// Either a bare image or a JSON map of operator name to image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_gather_image: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub notify_num_reboots: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openshift_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<InstallProxy>,
    pub role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_ips: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_installation_disk_cleanup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsGatherCmdRequest {
    pub bootstrap: bool,
    pub cluster_id: Uuid,
    pub host_id: Uuid,
    pub infra_env_id: Uuid,
    pub installer_gather: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_ips: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TangServer {
    #[serde(default)]
    pub thumbprint: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TangConnectivityRequest {
    /// JSON-encoded list of [`TangServer`]
    pub tang_servers: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VipType {
    Api,
    Ingress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyVip {
    pub vip: String,
    pub vip_type: VipType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyVipsRequest {
    pub vips: Vec<VerifyVip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebootForReclaimRequest {
    pub host_fs_mount_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeAgentRequest {
    pub agent_image: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_vip_request_key_order() {
        let request = ApiVipConnectivityRequest {
            ca_certificate: Some("cert".to_string()),
            ignition_endpoint_token: Some("token".to_string()),
            request_headers: Some(vec![RequestHeader {
                key: "Authorization".to_string(),
                value: "Bearer token".to_string(),
            }]),
            url: "http://api.test:22624/config/worker".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"ca_certificate":"cert","ignition_endpoint_token":"token","request_headers":[{"key":"Authorization","value":"Bearer token"}],"url":"http://api.test:22624/config/worker"}"#
        );
    }

    #[test]
    fn test_install_request_omits_unset_fields() {
        let request = InstallCmdRequest {
            boot_device: "/dev/sda".to_string(),
            role: "master".to_string(),
            high_availability_mode: "Full".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&request).unwrap();
        let object = value.as_object().unwrap();
        for omitted in [
            "check_cvo",
            "installer_args",
            "mco_image",
            "must_gather_image",
            "openshift_version",
            "proxy",
            "service_ips",
            "skip_installation_disk_cleanup",
        ] {
            assert!(!object.contains_key(omitted), "{} should be omitted", omitted);
        }
        assert_eq!(value["disks_to_format"], serde_json::json!([]));
    }

    #[test]
    fn test_verify_vip_type_tag() {
        let request = VerifyVipsRequest {
            vips: vec![VerifyVip {
                vip: "10.0.0.5".to_string(),
                vip_type: VipType::Ingress,
            }],
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"vips":[{"vip":"10.0.0.5","vip_type":"ingress"}]}"#
        );
    }
}
