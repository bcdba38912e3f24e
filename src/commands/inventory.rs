use async_trait::async_trait;

use super::StepGenerator;
use crate::{
    core::{Host, StepResult},
    protocols::{Step, StepType},
};

/// Asks the agent to report its hardware inventory.
#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryCmd;

#[async_trait]
impl StepGenerator for InventoryCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        Ok(Some(vec![Step::new(
            StepType::Inventory,
            vec![host.id.to_string()],
        )]))
    }

    fn name(&self) -> &'static str {
        "inventory"
    }
}
