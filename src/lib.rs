pub mod commands;
pub mod config;
pub mod core;
pub mod hardware;
pub mod network;
pub mod observability;
pub mod protocols;
pub mod versions;

pub use commands::{InstructionManager, StepGenerator};
pub use config::InstructionConfig;
pub use protocols::{Step, StepType, StepsResult};
