use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{encode, StepGenerator};
use crate::{
    core::{Host, HostStatus, StepResult},
    observability::events::{EventsHandler, HostEvent, HostRef},
    protocols::{Step, StepType, UpgradeAgentRequest},
};

/// Statuses in which an outdated agent is replaced before anything else runs
const UPGRADABLE_STATUSES: [HostStatus; 8] = [
    HostStatus::Binding,
    HostStatus::Discovering,
    HostStatus::DiscoveringUnbound,
    HostStatus::Insufficient,
    HostStatus::InsufficientUnbound,
    HostStatus::Known,
    HostStatus::PendingForInput,
    HostStatus::KnownUnbound,
];

/// Tells an agent running an outdated image to replace itself.
#[derive(Debug, Clone)]
pub struct UpgradeAgentCmd {
    agent_image: String,
    events: Arc<dyn EventsHandler>,
}

impl UpgradeAgentCmd {
    pub fn new(agent_image: impl Into<String>, events: Arc<dyn EventsHandler>) -> Self {
        Self {
            agent_image: agent_image.into(),
            events,
        }
    }

    pub fn should_upgrade(&self, host: &Host) -> bool {
        UPGRADABLE_STATUSES.contains(&host.status) && host.discovery_agent_version != self.agent_image
    }
}

#[async_trait]
impl StepGenerator for UpgradeAgentCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        let request = UpgradeAgentRequest {
            agent_image: self.agent_image.clone(),
        };
        let payload = encode("upgrade-agent request", &request)?;

        info!(
            host_id = %host.id,
            from = %host.discovery_agent_version,
            to = %self.agent_image,
            "Upgrading agent"
        );
        self.events.send_host_event(HostEvent::UpgradeAgentStarted {
            host: HostRef::from(host),
            agent_image: self.agent_image.clone(),
        });

        Ok(Some(vec![Step::new(StepType::UpgradeAgent, vec![payload])]))
    }

    fn name(&self) -> &'static str {
        "upgrade-agent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::events::TracingEventsHandler;

    fn cmd() -> UpgradeAgentCmd {
        UpgradeAgentCmd::new("quay.io/example/agent:v2", Arc::new(TracingEventsHandler))
    }

    #[test]
    fn test_should_upgrade() {
        let mut host = Host {
            status: HostStatus::Known,
            discovery_agent_version: "quay.io/example/agent:v1".to_string(),
            ..Default::default()
        };
        assert!(cmd().should_upgrade(&host));

        host.discovery_agent_version = "quay.io/example/agent:v2".to_string();
        assert!(!cmd().should_upgrade(&host));

        host.discovery_agent_version = "quay.io/example/agent:v1".to_string();
        host.status = HostStatus::Installing;
        assert!(!cmd().should_upgrade(&host));
    }

    #[tokio::test]
    async fn test_payload() {
        let steps = cmd().get_steps(&Host::default()).await.unwrap().unwrap();
        assert_eq!(steps[0].step_type, StepType::UpgradeAgent);
        assert_eq!(
            steps[0].args,
            vec![r#"{"agent_image":"quay.io/example/agent:v2"}"#]
        );
    }
}
