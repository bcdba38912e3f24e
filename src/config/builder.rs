use std::path::Path;

use super::{AdmissionConfig, ConfigError, ConfigResult, InstructionConfig, PollingConfig};

/// Builder for InstructionConfig that wraps the config itself
#[derive(Debug, Clone, Default)]
pub struct InstructionConfigBuilder {
    config: InstructionConfig,
}

impl InstructionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: InstructionConfig) -> Self {
        Self { config }
    }

    /// Load a YAML config file as the starting point
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ValidationFailed {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        let config: InstructionConfig =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ValidationFailed {
                reason: format!("Failed to parse config file {}: {}", path.display(), e),
            })?;
        Ok(Self::from_config(config))
    }

    // ==================== Images ====================

    pub fn installer_image(mut self, image: impl Into<String>) -> Self {
        self.config.installer_image = image.into();
        self
    }

    pub fn controller_image(mut self, image: impl Into<String>) -> Self {
        self.config.controller_image = image.into();
        self
    }

    pub fn agent_image(mut self, image: impl Into<String>) -> Self {
        self.config.agent_image = image.into();
        self
    }

    pub fn release_image_mirror(mut self, mirror: impl Into<String>) -> Self {
        self.config.release_image_mirror = Some(mirror.into());
        self
    }

    // ==================== Install request ====================

    pub fn service_ips(mut self, ips: impl Into<String>) -> Self {
        self.config.service_ips = ips.into();
        self
    }

    pub fn check_cluster_version(mut self, enable: bool) -> Self {
        self.config.check_cluster_version = enable;
        self
    }

    pub fn enable_skip_mco_reboot(mut self, enable: bool) -> Self {
        self.config.enable_skip_mco_reboot = enable;
        self
    }

    pub fn notify_num_reboots(mut self, enable: bool) -> Self {
        self.config.notify_num_reboots = enable;
        self
    }

    // ==================== Steps ====================

    pub fn disabled_steps(mut self, steps: Vec<String>) -> Self {
        self.config.disabled_steps = steps;
        self
    }

    pub fn support_free_addresses(mut self, enable: bool) -> Self {
        self.config.support_free_addresses = enable;
        self
    }

    pub fn enable_upgrade_agent(mut self, enable: bool) -> Self {
        self.config.enable_upgrade_agent = enable;
        self
    }

    pub fn disk_check_timeout_secs(mut self, secs: u64) -> Self {
        self.config.disk_check_timeout_secs = secs;
        self
    }

    pub fn image_availability_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_availability_timeout_secs = secs;
        self
    }

    pub fn hostfs_mount_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.hostfs_mount_dir = dir.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    // ==================== Admission & polling ====================

    pub fn admission(mut self, admission: AdmissionConfig) -> Self {
        self.config.admission = admission;
        self
    }

    pub fn admission_threshold(mut self, threshold: usize) -> Self {
        self.config.admission.threshold = threshold;
        self
    }

    pub fn polling(mut self, polling: PollingConfig) -> Self {
        self.config.polling = polling;
        self
    }

    // ==================== Logging ====================

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = Some(level.into());
        self
    }

    pub fn log_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.log_dir = Some(dir.into());
        self
    }

    pub fn log_json(mut self, enable: bool) -> Self {
        self.config.log_json = enable;
        self
    }

    pub fn build(self) -> ConfigResult<InstructionConfig> {
        self.build_with_validation(true)
    }

    pub fn build_unchecked(self) -> InstructionConfig {
        self.config
    }

    pub fn build_with_validation(self, validate: bool) -> ConfigResult<InstructionConfig> {
        if validate {
            self.config.validate()?;
        }
        Ok(self.config)
    }
}

impl InstructionConfig {
    pub fn builder() -> InstructionConfigBuilder {
        InstructionConfigBuilder::new()
    }

    pub fn to_builder(&self) -> InstructionConfigBuilder {
        InstructionConfigBuilder::from_config(self.clone())
    }
}
