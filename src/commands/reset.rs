use async_trait::async_trait;

use super::StepGenerator;
use crate::{
    core::{Host, StepResult},
    protocols::{Step, StepType},
};

#[derive(Debug, Default, Clone, Copy)]
pub struct ResetCmd;

#[async_trait]
impl StepGenerator for ResetCmd {
    async fn get_steps(&self, _host: &Host) -> StepResult<Option<Vec<Step>>> {
        Ok(Some(vec![Step::new(StepType::ResetInstallation, Vec::new())]))
    }

    fn name(&self) -> &'static str {
        "reset"
    }
}
