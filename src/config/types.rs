use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigResult;

pub const DEFAULT_INSTALLER_IMAGE: &str = "quay.io/ocpmetal/assisted-installer:latest";
pub const DEFAULT_CONTROLLER_IMAGE: &str = "quay.io/ocpmetal/assisted-installer-controller:latest";
pub const DEFAULT_AGENT_IMAGE: &str = "quay.io/ocpmetal/assisted-installer-agent:latest";

/// Step generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionConfig {
    #[serde(default)]
    pub service_base_url: Option<String>,
    /// Comma-separated service IPs handed to the installer
    #[serde(default)]
    pub service_ips: String,
    #[serde(default = "default_installer_image")]
    pub installer_image: String,
    #[serde(default = "default_controller_image")]
    pub controller_image: String,
    #[serde(default = "default_agent_image")]
    pub agent_image: String,
    #[serde(default)]
    pub check_cluster_version: bool,
    #[serde(default = "default_true")]
    pub support_free_addresses: bool,
    #[serde(default = "default_disk_check_timeout_secs")]
    pub disk_check_timeout_secs: u64,
    #[serde(default = "default_image_availability_timeout_secs")]
    pub image_availability_timeout_secs: u64,
    /// Step type names that are never handed to agents
    #[serde(default)]
    pub disabled_steps: Vec<String>,
    #[serde(default)]
    pub release_image_mirror: Option<String>,
    #[serde(default)]
    pub enable_upgrade_agent: bool,
    #[serde(default)]
    pub enable_skip_mco_reboot: bool,
    #[serde(default)]
    pub notify_num_reboots: bool,
    #[serde(default = "default_hostfs_mount_dir")]
    pub hostfs_mount_dir: String,
    /// 0 disables the per-call deadline
    #[serde(default)]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub log_json: bool,
}

fn default_installer_image() -> String {
    DEFAULT_INSTALLER_IMAGE.to_string()
}

fn default_controller_image() -> String {
    DEFAULT_CONTROLLER_IMAGE.to_string()
}

fn default_agent_image() -> String {
    DEFAULT_AGENT_IMAGE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_disk_check_timeout_secs() -> u64 {
    8 * 60
}

fn default_image_availability_timeout_secs() -> u64 {
    16 * 60
}

fn default_hostfs_mount_dir() -> String {
    "/host".to_string()
}

impl Default for InstructionConfig {
    fn default() -> Self {
        Self {
            service_base_url: None,
            service_ips: String::new(),
            installer_image: default_installer_image(),
            controller_image: default_controller_image(),
            agent_image: default_agent_image(),
            check_cluster_version: false,
            support_free_addresses: true,
            disk_check_timeout_secs: default_disk_check_timeout_secs(),
            image_availability_timeout_secs: default_image_availability_timeout_secs(),
            disabled_steps: Vec::new(),
            release_image_mirror: None,
            enable_upgrade_agent: false,
            enable_skip_mco_reboot: false,
            notify_num_reboots: false,
            hostfs_mount_dir: default_hostfs_mount_dir(),
            request_timeout_secs: 0,
            admission: AdmissionConfig::default(),
            polling: PollingConfig::default(),
            log_level: None,
            log_dir: None,
            log_json: false,
        }
    }
}

impl InstructionConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        crate::config::validation::ConfigValidator::validate(self)
    }

    /// Service IPs split on commas, empty entries dropped
    pub fn service_ip_list(&self) -> Vec<String> {
        self.service_ips
            .split(',')
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

/// Connectivity-check admission limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Admissions allowed per cluster within one window
    pub threshold: usize,
    pub window_secs: u64,
    /// Idle cluster queues are evicted after this long
    pub idle_ttl_secs: u64,
    /// 0 disables the background sweeper
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            threshold: 150,
            window_secs: 60,
            idle_ttl_secs: 3600,
            sweep_interval_secs: 0,
        }
    }
}

/// Agent poll-back intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Used while the host has work to do
    pub active_secs: i64,
    /// Used while the host is idle or failed
    pub backoff_secs: i64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            active_secs: 60,
            backoff_secs: 120,
        }
    }
}
