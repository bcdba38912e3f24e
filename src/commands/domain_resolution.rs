use std::{net::IpAddr, sync::Arc};

use async_trait::async_trait;

use super::{encode, StepGenerator};
use crate::{
    core::{Host, HostStore, StepResult},
    protocols::{DomainResolutionName, DomainResolutionRequest, Step, StepType},
    versions::ReleaseResolver,
};

/// Resolves the cluster's well-known names from the host, plus the release
/// registry for clusters that are still to be installed.
#[derive(Debug, Clone)]
pub struct DomainResolutionCmd {
    store: Arc<dyn HostStore>,
    releases: Arc<dyn ReleaseResolver>,
}

impl DomainResolutionCmd {
    pub fn new(store: Arc<dyn HostStore>, releases: Arc<dyn ReleaseResolver>) -> Self {
        Self { store, releases }
    }
}

/// Registry host of an image reference, or `None` when it is an IP literal.
fn registry_hostname(image: &str) -> Option<String> {
    let authority = image.split('/').next().unwrap_or(image);
    let host = if let Some(rest) = authority.strip_prefix('[') {
        rest.split(']').next().unwrap_or(rest)
    } else {
        authority.split(':').next().unwrap_or(authority)
    };
    if host.is_empty() || host.parse::<IpAddr>().is_ok() {
        return None;
    }
    Some(host.to_string())
}

#[async_trait]
impl StepGenerator for DomainResolutionCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        let Some(cluster_id) = host.cluster_id else {
            return Ok(None);
        };
        let cluster = self.store.get_cluster(cluster_id).await?;
        let Some(domain) = cluster.domain() else {
            return Ok(None);
        };

        let mut names = vec![
            format!("api.{}", domain),
            format!("api-int.{}", domain),
            format!("console-openshift-console.apps.{}", domain),
            format!("validateNoWildcardDNS.{}", domain),
            format!("validateNoWildcardDNS.{}.", domain),
        ];

        if !host.is_day2() && !cluster.is_day2() {
            let release = self
                .releases
                .get_release_image(
                    &cluster.openshift_version,
                    &cluster.cpu_architecture,
                    &cluster.pull_secret,
                )
                .await?;
            if let Some(registry) = registry_hostname(&release.url) {
                names.push(registry);
            }
        }

        let request = DomainResolutionRequest {
            domains: names
                .into_iter()
                .map(|domain_name| DomainResolutionName { domain_name })
                .collect(),
        };
        let payload = encode("domain-resolution request", &request)?;
        Ok(Some(vec![Step::new(StepType::DomainResolution, vec![payload])]))
    }

    fn name(&self) -> &'static str {
        "domain-resolution"
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        core::{Cluster, ClusterKind, InMemoryHostStore},
        versions::{ReleaseEntry, StaticReleaseResolver},
    };

    fn setup(cluster: Cluster, release_url: &str) -> (DomainResolutionCmd, Host) {
        let store = Arc::new(InMemoryHostStore::new());
        let host = Host {
            id: Uuid::new_v4(),
            infra_env_id: Uuid::new_v4(),
            cluster_id: Some(cluster.id),
            ..Default::default()
        };
        let releases = StaticReleaseResolver::new(vec![ReleaseEntry {
            openshift_version: cluster.openshift_version.clone(),
            cpu_architecture: cluster.cpu_architecture.clone(),
            url: release_url.to_string(),
            version: "4.14.3".to_string(),
            mco_image: None,
            must_gather_images: Default::default(),
        }]);
        store.insert_cluster(cluster);
        store.insert_host(host.clone());
        (DomainResolutionCmd::new(store, Arc::new(releases)), host)
    }

    fn cluster(kind: ClusterKind) -> Cluster {
        Cluster {
            id: Uuid::new_v4(),
            kind,
            name: "test-cluster".to_string(),
            base_dns_domain: "example.com".to_string(),
            openshift_version: "4.14".to_string(),
            ..Default::default()
        }
    }

    fn names(step: &Step) -> Vec<String> {
        let request: DomainResolutionRequest = serde_json::from_str(&step.args[0]).unwrap();
        request.domains.into_iter().map(|d| d.domain_name).collect()
    }

    #[test]
    fn test_registry_hostname() {
        assert_eq!(
            registry_hostname("quay.io/openshift-release-dev/ocp-release:4.14.3").as_deref(),
            Some("quay.io")
        );
        assert_eq!(
            registry_hostname("registry.local:5000/ocp/release:4.14").as_deref(),
            Some("registry.local")
        );
        assert_eq!(registry_hostname("10.1.2.3:5000/ocp/release"), None);
        assert_eq!(registry_hostname("[fd00::1]:5000/ocp/release"), None);
    }

    #[tokio::test]
    async fn test_day1_appends_registry() {
        let (cmd, host) = setup(
            cluster(ClusterKind::Cluster),
            "quay.io/openshift-release-dev/ocp-release:4.14.3",
        );
        let steps = cmd.get_steps(&host).await.unwrap().unwrap();
        assert_eq!(
            names(&steps[0]),
            vec![
                "api.test-cluster.example.com",
                "api-int.test-cluster.example.com",
                "console-openshift-console.apps.test-cluster.example.com",
                "validateNoWildcardDNS.test-cluster.example.com",
                "validateNoWildcardDNS.test-cluster.example.com.",
                "quay.io",
            ]
        );
    }

    #[tokio::test]
    async fn test_day2_skips_registry() {
        let (cmd, host) = setup(cluster(ClusterKind::AddHostsCluster), "quay.io/ocp");
        let steps = cmd.get_steps(&host).await.unwrap().unwrap();
        assert_eq!(names(&steps[0]).len(), 5);
    }

    #[tokio::test]
    async fn test_ip_registry_is_not_resolved() {
        let (cmd, host) = setup(cluster(ClusterKind::Cluster), "10.0.0.1:5000/ocp/release");
        let steps = cmd.get_steps(&host).await.unwrap().unwrap();
        assert_eq!(names(&steps[0]).len(), 5);
    }

    #[tokio::test]
    async fn test_missing_domain_emits_nothing() {
        let mut c = cluster(ClusterKind::Cluster);
        c.base_dns_domain.clear();
        let (cmd, host) = setup(c, "quay.io/ocp");
        assert!(cmd.get_steps(&host).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_release_fails() {
        let (cmd, host) = setup(cluster(ClusterKind::Cluster), "quay.io/ocp");
        let cmd = DomainResolutionCmd::new(
            cmd.store.clone(),
            Arc::new(StaticReleaseResolver::default()),
        );
        assert!(cmd.get_steps(&host).await.is_err());
    }
}
