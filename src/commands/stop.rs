use async_trait::async_trait;

use super::StepGenerator;
use crate::{
    core::{Host, StepResult},
    protocols::{Step, StepType},
};

/// Stops the installer and agent services on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct StopCmd;

#[async_trait]
impl StepGenerator for StopCmd {
    async fn get_steps(&self, _host: &Host) -> StepResult<Option<Vec<Step>>> {
        Ok(Some(vec![Step::new(StepType::StopInstallation, Vec::new())]))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}
