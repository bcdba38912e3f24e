//! Logging and host event notifications.

pub mod events;
pub mod logging;
