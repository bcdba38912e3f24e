//! Host records as seen by the step generators

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    error::{StepError, StepResult},
    inventory::Inventory,
};

/// Host lifecycle status.
///
/// Unrecognized values deserialize to [`HostStatus::Unknown`], which no
/// dispatch table matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostStatus {
    Discovering,
    Known,
    Disconnected,
    Insufficient,
    Disabled,
    PreparingForInstallation,
    PreparingFailed,
    PreparingSuccessful,
    PendingForInput,
    Installing,
    InstallingInProgress,
    InstallingPendingUserAction,
    ResettingPendingUserAction,
    Installed,
    Error,
    Resetting,
    AddedToExistingCluster,
    Cancelled,
    Binding,
    Unbinding,
    UnbindingPendingUserAction,
    KnownUnbound,
    DisconnectedUnbound,
    InsufficientUnbound,
    DisabledUnbound,
    DiscoveringUnbound,
    Reclaiming,
    ReclaimingRebooting,
    #[default]
    #[serde(other)]
    Unknown,
}

impl HostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostStatus::Discovering => "discovering",
            HostStatus::Known => "known",
            HostStatus::Disconnected => "disconnected",
            HostStatus::Insufficient => "insufficient",
            HostStatus::Disabled => "disabled",
            HostStatus::PreparingForInstallation => "preparing-for-installation",
            HostStatus::PreparingFailed => "preparing-failed",
            HostStatus::PreparingSuccessful => "preparing-successful",
            HostStatus::PendingForInput => "pending-for-input",
            HostStatus::Installing => "installing",
            HostStatus::InstallingInProgress => "installing-in-progress",
            HostStatus::InstallingPendingUserAction => "installing-pending-user-action",
            HostStatus::ResettingPendingUserAction => "resetting-pending-user-action",
            HostStatus::Installed => "installed",
            HostStatus::Error => "error",
            HostStatus::Resetting => "resetting",
            HostStatus::AddedToExistingCluster => "added-to-existing-cluster",
            HostStatus::Cancelled => "cancelled",
            HostStatus::Binding => "binding",
            HostStatus::Unbinding => "unbinding",
            HostStatus::UnbindingPendingUserAction => "unbinding-pending-user-action",
            HostStatus::KnownUnbound => "known-unbound",
            HostStatus::DisconnectedUnbound => "disconnected-unbound",
            HostStatus::InsufficientUnbound => "insufficient-unbound",
            HostStatus::DisabledUnbound => "disabled-unbound",
            HostStatus::DiscoveringUnbound => "discovering-unbound",
            HostStatus::Reclaiming => "reclaiming",
            HostStatus::ReclaimingRebooting => "reclaiming-rebooting",
            HostStatus::Unknown => "unknown",
        }
    }

    /// Statuses in which the host cannot answer connectivity probes yet.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, HostStatus::Discovering | HostStatus::Disconnected)
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostRole {
    #[default]
    AutoAssign,
    Master,
    Worker,
    Bootstrap,
    Arbiter,
}

impl HostRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostRole::AutoAssign => "auto-assign",
            HostRole::Master => "master",
            HostRole::Worker => "worker",
            HostRole::Bootstrap => "bootstrap",
            HostRole::Arbiter => "arbiter",
        }
    }
}

impl fmt::Display for HostRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day-1 hosts install a new cluster; day-2 hosts join an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HostKind {
    #[default]
    Host,
    AddToExistingClusterHost,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskSpeed {
    #[serde(default)]
    pub tested: bool,
    #[serde(default)]
    pub speed_ms: i64,
    #[serde(default)]
    pub exit_code: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    #[serde(default)]
    pub disk_speed: Option<DiskSpeed>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Host {
    pub id: Uuid,
    pub infra_env_id: Uuid,
    #[serde(default)]
    pub cluster_id: Option<Uuid>,
    #[serde(default)]
    pub kind: HostKind,
    #[serde(default)]
    pub status: HostStatus,
    #[serde(default)]
    pub role: HostRole,
    #[serde(default)]
    pub suggested_role: Option<HostRole>,
    #[serde(default)]
    pub bootstrap: bool,
    /// Agent-reported inventory, JSON encoded
    #[serde(default)]
    pub inventory: String,
    /// User-supplied installer flags, a JSON array of strings
    #[serde(default)]
    pub installer_args: String,
    #[serde(default)]
    pub installation_disk_id: String,
    #[serde(default)]
    pub installation_disk_path: String,
    /// Comma-separated disk identifiers the installer must not wipe
    #[serde(default)]
    pub skip_formatting_disks: String,
    #[serde(default)]
    pub api_vip_connectivity: String,
    #[serde(default)]
    pub fencing_credentials: Option<String>,
    #[serde(default)]
    pub requested_hostname: String,
    #[serde(default)]
    pub installer_version: String,
    /// Per-disk measurements keyed by device path, JSON encoded
    #[serde(default)]
    pub disks_info: String,
    #[serde(default)]
    pub logs_collected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub discovery_agent_version: String,
}

impl Host {
    pub fn is_day2(&self) -> bool {
        self.kind == HostKind::AddToExistingClusterHost
    }

    pub fn is_unbound(&self) -> bool {
        self.cluster_id.is_none()
    }

    /// Assigned role, or the suggested one while the role is still auto-assign.
    pub fn effective_role(&self) -> HostRole {
        match (self.role, self.suggested_role) {
            (HostRole::AutoAssign, Some(suggested)) => suggested,
            (role, _) => role,
        }
    }

    /// Installation disk identifier, falling back to its path.
    pub fn installation_path(&self) -> Option<&str> {
        [&self.installation_disk_id, &self.installation_disk_path]
            .into_iter()
            .map(String::as_str)
            .find(|path| !path.is_empty())
    }

    pub fn parse_inventory(&self) -> StepResult<Inventory> {
        if self.inventory.is_empty() {
            return Err(StepError::InvalidInventory {
                host_id: self.id,
                reason: "inventory is empty".to_string(),
            });
        }
        Inventory::parse(&self.inventory).map_err(|e| StepError::InvalidInventory {
            host_id: self.id,
            reason: e.to_string(),
        })
    }

    /// Name used in logs and events.
    pub fn display_name(&self) -> String {
        if !self.requested_hostname.is_empty() {
            return self.requested_hostname.clone();
        }
        match Inventory::parse(&self.inventory) {
            Ok(inventory) if !inventory.hostname.is_empty() => inventory.hostname,
            _ => self.id.to_string(),
        }
    }

    pub fn skip_formatting_disk_ids(&self) -> Vec<&str> {
        self.skip_formatting_disks
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect()
    }

    pub fn disk_speed_tested(&self, path: &str) -> bool {
        if self.disks_info.is_empty() {
            return false;
        }
        serde_json::from_str::<HashMap<String, DiskInfo>>(&self.disks_info)
            .ok()
            .and_then(|info| info.get(path).and_then(|disk| disk.disk_speed.clone()))
            .is_some_and(|speed| speed.tested)
    }
}
