use async_trait::async_trait;
use tracing::debug;

use super::{encode, StepGenerator};
use crate::{
    core::{Host, StepResult},
    hardware::boot_device,
    protocols::{DiskSpeedCheckRequest, Step, StepType},
};

/// Boot devices of this type keep the OS across reboots and are not benchmarked
const PERSISTENT_BOOT_DEVICE: &str = "persistent";

/// Measures fsync latency of the installation disk, once per disk.
#[derive(Debug, Clone, Copy)]
pub struct DiskPerformanceCmd {
    timeout_secs: u64,
}

impl DiskPerformanceCmd {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl StepGenerator for DiskPerformanceCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        let inventory = host.parse_inventory()?;
        let Some(path) = boot_device(host, &inventory) else {
            return Ok(None);
        };
        let persistent = inventory
            .boot
            .as_ref()
            .is_some_and(|boot| boot.device_type == PERSISTENT_BOOT_DEVICE);
        if persistent {
            return Ok(None);
        }
        if host.disk_speed_tested(&path) {
            debug!(host_id = %host.id, path = %path, "Disk speed already measured");
            return Ok(None);
        }

        let request = DiskSpeedCheckRequest {
            path,
            timeout_seconds: self.timeout_secs,
        };
        let payload = encode("disk-speed-check request", &request)?;
        Ok(Some(vec![Step::new(
            StepType::InstallationDiskSpeedCheck,
            vec![payload],
        )]))
    }

    fn name(&self) -> &'static str {
        "disk-performance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Boot, Disk, Inventory};

    fn host(device_type: &str, disks_info: &str) -> Host {
        let inventory = Inventory {
            boot: Some(Boot {
                device_type: device_type.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        Host {
            installation_disk_id: "/dev/disk/by-id/wwn-0x1".to_string(),
            inventory: serde_json::to_string(&inventory).unwrap(),
            disks_info: disks_info.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_emits_check_for_untested_disk() {
        let steps = DiskPerformanceCmd::new(480)
            .get_steps(&host("", ""))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            steps[0].args,
            vec![r#"{"path":"/dev/disk/by-id/wwn-0x1","timeout_seconds":480}"#]
        );
    }

    #[tokio::test]
    async fn test_skips_tested_disk() {
        let info = r#"{"/dev/disk/by-id/wwn-0x1":{"disk_speed":{"tested":true,"speed_ms":4,"exit_code":0}}}"#;
        assert!(DiskPerformanceCmd::new(480)
            .get_steps(&host("", info))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_skips_persistent_boot() {
        assert!(DiskPerformanceCmd::new(480)
            .get_steps(&host("persistent", ""))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unrecorded_disk_uses_first_eligible() {
        let inventory = Inventory {
            disks: vec![Disk {
                id: "/dev/disk/by-id/wwn-0x2".to_string(),
                path: "/dev/sdb".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let host = Host {
            inventory: serde_json::to_string(&inventory).unwrap(),
            ..Default::default()
        };
        let steps = DiskPerformanceCmd::new(480)
            .get_steps(&host)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            steps[0].args,
            vec![r#"{"path":"/dev/disk/by-id/wwn-0x2","timeout_seconds":480}"#]
        );
    }

    #[tokio::test]
    async fn test_no_boot_device() {
        let mut host = host("", "");
        host.installation_disk_id.clear();
        assert!(DiskPerformanceCmd::new(480)
            .get_steps(&host)
            .await
            .unwrap()
            .is_none());
    }
}
