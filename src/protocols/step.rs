use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Action kinds understood by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepType {
    Inventory,
    ConnectivityCheck,
    ApiVipConnectivityCheck,
    FreeNetworkAddresses,
    DhcpLeaseAllocate,
    DomainResolution,
    NtpSynchronizer,
    InstallationDiskSpeedCheck,
    ContainerImageAvailability,
    Install,
    LogsGather,
    ResetInstallation,
    StopInstallation,
    RebootForReclaim,
    TangConnectivityCheck,
    VerifyVips,
    UpgradeAgent,
}

impl StepType {
    pub const ALL: [StepType; 17] = [
        StepType::Inventory,
        StepType::ConnectivityCheck,
        StepType::ApiVipConnectivityCheck,
        StepType::FreeNetworkAddresses,
        StepType::DhcpLeaseAllocate,
        StepType::DomainResolution,
        StepType::NtpSynchronizer,
        StepType::InstallationDiskSpeedCheck,
        StepType::ContainerImageAvailability,
        StepType::Install,
        StepType::LogsGather,
        StepType::ResetInstallation,
        StepType::StopInstallation,
        StepType::RebootForReclaim,
        StepType::TangConnectivityCheck,
        StepType::VerifyVips,
        StepType::UpgradeAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Inventory => "inventory",
            StepType::ConnectivityCheck => "connectivity-check",
            StepType::ApiVipConnectivityCheck => "api-vip-connectivity-check",
            StepType::FreeNetworkAddresses => "free-network-addresses",
            StepType::DhcpLeaseAllocate => "dhcp-lease-allocate",
            StepType::DomainResolution => "domain-resolution",
            StepType::NtpSynchronizer => "ntp-synchronizer",
            StepType::InstallationDiskSpeedCheck => "installation-disk-speed-check",
            StepType::ContainerImageAvailability => "container-image-availability",
            StepType::Install => "install",
            StepType::LogsGather => "logs-gather",
            StepType::ResetInstallation => "reset-installation",
            StepType::StopInstallation => "stop-installation",
            StepType::RebootForReclaim => "reboot-for-reclaim",
            StepType::TangConnectivityCheck => "tang-connectivity-check",
            StepType::VerifyVips => "verify-vips",
            StepType::UpgradeAgent => "upgrade-agent",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        StepType::ALL
            .into_iter()
            .find(|step_type| step_type.as_str() == name)
            .ok_or_else(|| format!("unknown step type: {}", name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub step_type: StepType,
    #[serde(default)]
    pub step_id: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Step {
    /// Step without an id; the dispatcher assigns one.
    pub fn new(step_type: StepType, args: Vec<String>) -> Self {
        Self {
            step_type,
            step_id: String::new(),
            command: String::new(),
            args,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStepAction {
    #[default]
    Continue,
    Exit,
}

/// Response to one agent poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepsResult {
    pub instructions: Vec<Step>,
    pub next_instruction_seconds: i64,
    pub post_step_action: PostStepAction,
}

impl StepsResult {
    pub fn empty(next_instruction_seconds: i64) -> Self {
        Self {
            instructions: Vec::new(),
            next_instruction_seconds,
            post_step_action: PostStepAction::Continue,
        }
    }

    pub fn step_types(&self) -> Vec<StepType> {
        self.instructions.iter().map(|step| step.step_type).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_type_names_match_serde() {
        for step_type in StepType::ALL {
            let json = serde_json::to_string(&step_type).unwrap();
            assert_eq!(json, format!("\"{}\"", step_type.as_str()));
            assert_eq!(step_type.as_str().parse::<StepType>().unwrap(), step_type);
        }
    }

    #[test]
    fn test_unknown_step_type() {
        assert!("format-disk".parse::<StepType>().is_err());
        assert_eq!(
            " dhcp-lease-allocate ".parse::<StepType>().unwrap(),
            StepType::DhcpLeaseAllocate
        );
    }

    #[test]
    fn test_steps_result_wire_format() {
        let mut step = Step::new(StepType::Inventory, vec!["host".to_string()]);
        step.step_id = "inventory-0a1b2c3d".to_string();
        let result = StepsResult {
            instructions: vec![step],
            next_instruction_seconds: 60,
            post_step_action: PostStepAction::Continue,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["post_step_action"], "continue");
        assert_eq!(value["next_instruction_seconds"], 60);
        assert_eq!(value["instructions"][0]["step_type"], "inventory");
        assert_eq!(value["instructions"][0]["step_id"], "inventory-0a1b2c3d");
    }
}
