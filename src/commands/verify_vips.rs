use std::sync::Arc;

use async_trait::async_trait;

use super::{encode, StepGenerator};
use crate::{
    core::{Host, HostStore, StepResult},
    protocols::{Step, StepType, VerifyVip, VerifyVipsRequest, VipType},
};

/// Checks that the cluster VIPs are not already taken on the host's networks.
#[derive(Debug, Clone)]
pub struct VerifyVipsCmd {
    store: Arc<dyn HostStore>,
}

impl VerifyVipsCmd {
    pub fn new(store: Arc<dyn HostStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StepGenerator for VerifyVipsCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        let Some(cluster_id) = host.cluster_id else {
            return Ok(None);
        };
        let cluster = self.store.get_cluster(cluster_id).await?;

        let vips: Vec<VerifyVip> = cluster
            .api_vips
            .iter()
            .map(|vip| (vip, VipType::Api))
            .chain(cluster.ingress_vips.iter().map(|vip| (vip, VipType::Ingress)))
            .filter(|(vip, _)| !vip.trim().is_empty())
            .map(|(vip, vip_type)| VerifyVip {
                vip: vip.trim().to_string(),
                vip_type,
            })
            .collect();
        if vips.is_empty() {
            return Ok(None);
        }

        let payload = encode("verify-vips request", &VerifyVipsRequest { vips })?;
        Ok(Some(vec![Step::new(StepType::VerifyVips, vec![payload])]))
    }

    fn name(&self) -> &'static str {
        "verify-vips"
    }
}
