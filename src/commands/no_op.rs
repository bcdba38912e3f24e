use async_trait::async_trait;

use super::StepGenerator;
use crate::{
    core::{Host, StepResult},
    protocols::Step,
};

/// Placeholder for transitional states with nothing to do.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpCmd;

#[async_trait]
impl StepGenerator for NoOpCmd {
    async fn get_steps(&self, _host: &Host) -> StepResult<Option<Vec<Step>>> {
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "no-op"
    }
}
