use std::sync::Arc;

use async_trait::async_trait;

use super::{encode, StepGenerator};
use crate::{
    core::{Host, HostStore, StepResult},
    protocols::{ContainerImageAvailabilityRequest, Step, StepType},
    versions::ReleaseResolver,
};

/// Pre-pulls the images the installation needs so registry problems surface
/// before the host starts writing to disk.
#[derive(Debug, Clone)]
pub struct ImageAvailabilityCmd {
    store: Arc<dyn HostStore>,
    releases: Arc<dyn ReleaseResolver>,
    installer_image: String,
    release_image_mirror: Option<String>,
    timeout_secs: u64,
}

impl ImageAvailabilityCmd {
    pub fn new(
        store: Arc<dyn HostStore>,
        releases: Arc<dyn ReleaseResolver>,
        installer_image: impl Into<String>,
        release_image_mirror: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            store,
            releases,
            installer_image: installer_image.into(),
            release_image_mirror,
            timeout_secs,
        }
    }
}

#[async_trait]
impl StepGenerator for ImageAvailabilityCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        let Some(cluster_id) = host.cluster_id else {
            return Ok(None);
        };
        let cluster = self.store.get_cluster(cluster_id).await?;
        if host.is_day2() || cluster.is_day2() {
            return Ok(None);
        }

        let release = self
            .releases
            .get_release_image(
                &cluster.openshift_version,
                &cluster.cpu_architecture,
                &cluster.pull_secret,
            )
            .await?;
        let mco_image = self
            .releases
            .get_mco_image(
                &release.url,
                self.release_image_mirror.as_deref(),
                &cluster.pull_secret,
            )
            .await?;
        let must_gather = self
            .releases
            .get_must_gather_images(
                &cluster.openshift_version,
                &cluster.cpu_architecture,
                &cluster.pull_secret,
            )
            .await?;

        let mut images = vec![release.url, mco_image];
        if let Some(ocp) = must_gather.get("ocp").filter(|image| !image.is_empty()) {
            images.push(ocp.clone());
        }
        images.push(self.installer_image.clone());

        let request = ContainerImageAvailabilityRequest {
            images,
            timeout: self.timeout_secs,
        };
        let payload = encode("container-image-availability request", &request)?;
        Ok(Some(vec![Step::new(
            StepType::ContainerImageAvailability,
            vec![payload],
        )]))
    }

    fn name(&self) -> &'static str {
        "image-availability"
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        core::{Cluster, ClusterKind, InMemoryHostStore},
        versions::{MustGatherImages, ReleaseEntry, StaticReleaseResolver},
    };

    fn setup(kind: ClusterKind, must_gather: MustGatherImages) -> (ImageAvailabilityCmd, Host) {
        let store = Arc::new(InMemoryHostStore::new());
        let cluster = Cluster {
            id: Uuid::new_v4(),
            kind,
            openshift_version: "4.14".to_string(),
            ..Default::default()
        };
        let host = Host {
            id: Uuid::new_v4(),
            infra_env_id: Uuid::new_v4(),
            cluster_id: Some(cluster.id),
            ..Default::default()
        };
        store.insert_cluster(cluster);
        store.insert_host(host.clone());
        let releases = StaticReleaseResolver::new(vec![ReleaseEntry {
            openshift_version: "4.14".to_string(),
            cpu_architecture: "x86_64".to_string(),
            url: "quay.io/ocp-release:4.14.3".to_string(),
            version: "4.14.3".to_string(),
            mco_image: Some("quay.io/mco:4.14.3".to_string()),
            must_gather_images: must_gather,
        }]);
        let cmd = ImageAvailabilityCmd::new(
            store,
            Arc::new(releases),
            "quay.io/installer:latest",
            None,
            960,
        );
        (cmd, host)
    }

    #[tokio::test]
    async fn test_image_order() {
        let must_gather = MustGatherImages::from([("ocp".to_string(), "quay.io/mg".to_string())]);
        let (cmd, host) = setup(ClusterKind::Cluster, must_gather);
        let steps = cmd.get_steps(&host).await.unwrap().unwrap();
        let request: ContainerImageAvailabilityRequest =
            serde_json::from_str(&steps[0].args[0]).unwrap();
        assert_eq!(
            request.images,
            vec![
                "quay.io/ocp-release:4.14.3",
                "quay.io/mco:4.14.3",
                "quay.io/mg",
                "quay.io/installer:latest",
            ]
        );
        assert_eq!(request.timeout, 960);
    }

    #[tokio::test]
    async fn test_without_must_gather() {
        let (cmd, host) = setup(ClusterKind::Cluster, MustGatherImages::new());
        let steps = cmd.get_steps(&host).await.unwrap().unwrap();
        let request: ContainerImageAvailabilityRequest =
            serde_json::from_str(&steps[0].args[0]).unwrap();
        assert_eq!(request.images.len(), 3);
    }

    #[tokio::test]
    async fn test_day2_emits_nothing() {
        let (cmd, host) = setup(ClusterKind::AddHostsCluster, MustGatherImages::new());
        assert!(cmd.get_steps(&host).await.unwrap().is_none());
    }
}
