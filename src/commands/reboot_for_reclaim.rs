use async_trait::async_trait;

use super::{encode, StepGenerator};
use crate::{
    core::{Host, StepResult},
    protocols::{RebootForReclaimRequest, Step, StepType},
};

/// Reboots a reclaimed host back into the discovery image.
#[derive(Debug, Clone)]
pub struct RebootForReclaimCmd {
    host_fs_mount_dir: String,
}

impl RebootForReclaimCmd {
    pub fn new(host_fs_mount_dir: impl Into<String>) -> Self {
        Self {
            host_fs_mount_dir: host_fs_mount_dir.into(),
        }
    }
}

#[async_trait]
impl StepGenerator for RebootForReclaimCmd {
    async fn get_steps(&self, _host: &Host) -> StepResult<Option<Vec<Step>>> {
        let request = RebootForReclaimRequest {
            host_fs_mount_dir: self.host_fs_mount_dir.clone(),
        };
        Ok(Some(vec![Step::new(
            StepType::RebootForReclaim,
            vec![encode("reboot-for-reclaim request", &request)?],
        )]))
    }

    fn name(&self) -> &'static str {
        "reboot-for-reclaim"
    }
}
