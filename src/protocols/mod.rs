//! Wire types exchanged with host agents.
//!
//! Agents are updated independently of the service, so field names and the
//! JSON layout of every payload are part of the contract.

pub mod requests;
pub mod step;

pub use requests::*;
pub use step::{PostStepAction, Step, StepType, StepsResult};
