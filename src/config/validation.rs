use std::net::IpAddr;

use super::*;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &InstructionConfig) -> ConfigResult<()> {
        Self::validate_images(config)?;
        Self::validate_service_ips(config)?;
        Self::validate_admission(&config.admission)?;
        Self::validate_polling(&config.polling)?;
        Ok(())
    }

    fn validate_images(config: &InstructionConfig) -> ConfigResult<()> {
        for (field, image) in [
            ("installer_image", &config.installer_image),
            ("controller_image", &config.controller_image),
            ("agent_image", &config.agent_image),
        ] {
            if image.trim().is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_service_ips(config: &InstructionConfig) -> ConfigResult<()> {
        for ip in config.service_ip_list() {
            if ip.parse::<IpAddr>().is_err() {
                return Err(ConfigError::InvalidValue {
                    field: "service_ips".to_string(),
                    value: ip,
                    reason: "Must be an IP address".to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_admission(admission: &AdmissionConfig) -> ConfigResult<()> {
        if admission.threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "admission.threshold".to_string(),
                value: admission.threshold.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }
        if admission.window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "admission.window_secs".to_string(),
                value: admission.window_secs.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }
        Ok(())
    }

    fn validate_polling(polling: &PollingConfig) -> ConfigResult<()> {
        if polling.active_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "polling.active_secs".to_string(),
                value: polling.active_secs.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }
        if polling.backoff_secs < polling.active_secs {
            return Err(ConfigError::IncompatibleConfig {
                reason: format!(
                    "polling.backoff_secs ({}) must not be shorter than polling.active_secs ({})",
                    polling.backoff_secs, polling.active_secs
                ),
            });
        }
        Ok(())
    }
}
