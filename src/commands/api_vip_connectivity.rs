use std::sync::Arc;

use async_trait::async_trait;

use super::{encode, StepGenerator};
use crate::{
    core::{Host, HostRole, HostStore, StepError, StepResult},
    protocols::{ApiVipConnectivityRequest, RequestHeader, Step, StepType},
};

/// Machine config server port on the existing cluster's API VIP
const MCS_PORT: u16 = 22624;

/// Day-2 check that the host can fetch its ignition from the existing cluster.
#[derive(Debug, Clone)]
pub struct ApiVipConnectivityCmd {
    store: Arc<dyn HostStore>,
}

impl ApiVipConnectivityCmd {
    pub fn new(store: Arc<dyn HostStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StepGenerator for ApiVipConnectivityCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        let cluster_id = host.cluster_id.ok_or(StepError::MissingField {
            host_id: host.id,
            field: "cluster_id",
        })?;
        let cluster = self.store.get_cluster(cluster_id).await?;

        let pool = match host.effective_role() {
            HostRole::Master => "master",
            _ => "worker",
        };

        let endpoint = cluster.ignition_endpoint.as_ref();
        let url = match endpoint.and_then(|e| e.url.as_deref()).filter(|u| !u.is_empty()) {
            Some(base) => format!("{}/{}", base, pool),
            None => {
                let dns_name = cluster
                    .api_vip_dns_name
                    .as_deref()
                    .filter(|name| !name.is_empty())
                    .ok_or(StepError::MissingField {
                        host_id: host.id,
                        field: "cluster api_vip_dns_name",
                    })?;
                format!("http://{}:{}/config/{}", dns_name, MCS_PORT, pool)
            }
        };

        let token = cluster
            .ignition_endpoint_token
            .clone()
            .filter(|token| !token.is_empty());
        let request = ApiVipConnectivityRequest {
            ca_certificate: endpoint
                .and_then(|e| e.ca_certificate.clone())
                .filter(|cert| !cert.is_empty()),
            request_headers: token.as_ref().map(|token| {
                vec![RequestHeader {
                    key: "Authorization".to_string(),
                    value: format!("Bearer {}", token),
                }]
            }),
            ignition_endpoint_token: token,
            url,
        };

        let payload = encode("api-vip-connectivity request", &request)?;
        Ok(Some(vec![Step::new(
            StepType::ApiVipConnectivityCheck,
            vec![payload],
        )]))
    }

    fn name(&self) -> &'static str {
        "api-vip-connectivity"
    }
}
