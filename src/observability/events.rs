//! Host events for observability and user notification.
//!
//! Events are fire-and-forget: sending one never blocks or fails the step
//! generator that produced it.

use std::fmt::Debug;

use tracing::info;
use uuid::Uuid;

use crate::core::Host;

pub trait Event {
    fn emit(&self);
}

/// Identity of the host an event refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRef {
    pub host_id: Uuid,
    pub infra_env_id: Uuid,
    pub cluster_id: Option<Uuid>,
    pub hostname: String,
}

impl From<&Host> for HostRef {
    fn from(host: &Host) -> Self {
        Self {
            host_id: host.id,
            infra_env_id: host.infra_env_id,
            cluster_id: host.cluster_id,
            hostname: host.display_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The installer will wipe the boot sector of a bootable disk
    DiskFormatPerformed {
        host: HostRef,
        disk_name: String,
        disk_id: String,
    },
    /// A bootable disk is kept because the user asked to skip it
    DiskFormatSkipped {
        host: HostRef,
        disk_name: String,
        disk_id: String,
    },
    UpgradeAgentStarted { host: HostRef, agent_image: String },
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::DiskFormatPerformed { .. } => "disk_format_performed",
            HostEvent::DiskFormatSkipped { .. } => "disk_format_skipped",
            HostEvent::UpgradeAgentStarted { .. } => "upgrade_agent_started",
        }
    }

    pub fn host(&self) -> &HostRef {
        match self {
            HostEvent::DiskFormatPerformed { host, .. }
            | HostEvent::DiskFormatSkipped { host, .. }
            | HostEvent::UpgradeAgentStarted { host, .. } => host,
        }
    }

    pub fn message(&self) -> String {
        match self {
            HostEvent::DiskFormatPerformed {
                host,
                disk_name,
                disk_id,
            } => format!(
                "Host {}: performing quick format of disk {}({})",
                host.hostname, disk_name, disk_id
            ),
            HostEvent::DiskFormatSkipped {
                host,
                disk_name,
                disk_id,
            } => format!(
                "Host {}: skipping quick format of disk {}({}) due to user request. \
                 This could lead to boot order issues during installation",
                host.hostname, disk_name, disk_id
            ),
            HostEvent::UpgradeAgentStarted { host, agent_image } => format!(
                "Host {}: started upgrading agent to {}",
                host.hostname, agent_image
            ),
        }
    }
}

impl Event for HostEvent {
    fn emit(&self) {
        let host = self.host();
        info!(
            target: "host_instructions::observability::events",
            event = self.name(),
            host_id = %host.host_id,
            infra_env_id = %host.infra_env_id,
            cluster_id = ?host.cluster_id,
            "{}",
            self.message()
        );
    }
}

/// Receiver of host events
pub trait EventsHandler: Send + Sync + Debug {
    fn send_host_event(&self, event: HostEvent);
}

/// Emits every host event as a structured tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventsHandler;

impl EventsHandler for TracingEventsHandler {
    fn send_host_event(&self, event: HostEvent) {
        event.emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_ref() -> HostRef {
        HostRef {
            host_id: Uuid::nil(),
            infra_env_id: Uuid::nil(),
            cluster_id: None,
            hostname: "master-0".to_string(),
        }
    }

    #[test]
    fn test_event_messages() {
        let performed = HostEvent::DiskFormatPerformed {
            host: host_ref(),
            disk_name: "sda".to_string(),
            disk_id: "/dev/disk/by-id/wwn-sda".to_string(),
        };
        assert_eq!(performed.name(), "disk_format_performed");
        assert_eq!(
            performed.message(),
            "Host master-0: performing quick format of disk sda(/dev/disk/by-id/wwn-sda)"
        );

        let upgrade = HostEvent::UpgradeAgentStarted {
            host: host_ref(),
            agent_image: "quay.io/example/agent:v2".to_string(),
        };
        assert!(upgrade.message().contains("quay.io/example/agent:v2"));
        assert_eq!(upgrade.host().hostname, "master-0");
    }

    #[test]
    fn test_tracing_handler_does_not_panic() {
        TracingEventsHandler.send_host_event(HostEvent::DiskFormatSkipped {
            host: host_ref(),
            disk_name: "sdb".to_string(),
            disk_id: "/dev/sdb".to_string(),
        });
    }
}
