use std::sync::Arc;

use async_trait::async_trait;

use super::{encode, StepGenerator};
use crate::{
    core::{Host, HostStore, StepResult},
    protocols::{NtpSynchronizationRequest, Step, StepType},
};

/// Points the host's chrony at the configured additional NTP sources.
#[derive(Debug, Clone)]
pub struct NtpSyncCmd {
    store: Arc<dyn HostStore>,
}

impl NtpSyncCmd {
    pub fn new(store: Arc<dyn HostStore>) -> Self {
        Self { store }
    }

    async fn ntp_source(&self, host: &Host) -> StepResult<String> {
        if let Some(cluster_id) = host.cluster_id {
            let cluster = self.store.get_cluster(cluster_id).await?;
            if !cluster.additional_ntp_source.is_empty() {
                return Ok(cluster.additional_ntp_source);
            }
        }
        let infra_env = self.store.get_infra_env(host.infra_env_id).await?;
        Ok(infra_env.additional_ntp_sources)
    }
}

#[async_trait]
impl StepGenerator for NtpSyncCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        let request = NtpSynchronizationRequest {
            ntp_source: self.ntp_source(host).await?,
        };
        let payload = encode("ntp-synchronizer request", &request)?;
        Ok(Some(vec![Step::new(StepType::NtpSynchronizer, vec![payload])]))
    }

    fn name(&self) -> &'static str {
        "ntp-sync"
    }
}
