//! Step generators and the instruction dispatcher
//!
//! Each generator turns a host (plus whatever cluster context it loads) into
//! zero or more agent steps. The [`InstructionManager`] picks the generators
//! for a host's status and aggregates their output.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    core::{Host, StepError, StepResult},
    protocols::Step,
};

mod api_vip_connectivity;
mod connectivity_check;
mod dhcp_allocate;
mod disk_performance;
mod domain_resolution;
mod free_addresses;
mod image_availability;
mod install;
pub mod install_args;
mod instruction_manager;
mod inventory;
mod logs_gather;
mod no_op;
mod ntp_sync;
mod reboot_for_reclaim;
mod reset;
mod stop;
mod tang_connectivity;
mod upgrade_agent;
mod verify_vips;

pub use api_vip_connectivity::ApiVipConnectivityCmd;
pub use connectivity_check::ConnectivityCheckCmd;
pub use dhcp_allocate::{generate_vip_mac, DhcpAllocateCmd};
pub use disk_performance::DiskPerformanceCmd;
pub use domain_resolution::DomainResolutionCmd;
pub use free_addresses::FreeAddressesCmd;
pub use image_availability::ImageAvailabilityCmd;
pub use install::{must_gather_argument, proxy_arguments, InstallCmd};
pub use instruction_manager::{Collaborators, InstructionManager};
pub use inventory::InventoryCmd;
pub use logs_gather::LogsGatherCmd;
pub use no_op::NoOpCmd;
pub use ntp_sync::NtpSyncCmd;
pub use reboot_for_reclaim::RebootForReclaimCmd;
pub use reset::ResetCmd;
pub use stop::StopCmd;
pub use tang_connectivity::TangConnectivityCmd;
pub use upgrade_agent::UpgradeAgentCmd;
pub use verify_vips::VerifyVipsCmd;

/// Produces the steps of one action kind for a host
///
/// `Ok(None)` means the generator has nothing to contribute for this host;
/// it never returns an empty list.
#[async_trait]
pub trait StepGenerator: Send + Sync + Debug {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>>;

    /// Generator name for logs
    fn name(&self) -> &'static str;
}

pub(crate) fn encode<T: Serialize + ?Sized>(what: &'static str, value: &T) -> StepResult<String> {
    serde_json::to_string(value).map_err(|e| StepError::Serialization {
        what,
        reason: e.to_string(),
    })
}
