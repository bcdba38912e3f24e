//! OpenShift release lookups.
//!
//! Resolution of release, machine-config-operator and must-gather images is
//! owned by an external service; the engine only consumes [`ReleaseResolver`]
//! and treats its failures as ordinary errors without retrying.

use std::{collections::BTreeMap, fmt::Debug};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("No release image for OpenShift {version} ({cpu_architecture})")]
    ReleaseImageNotFound {
        version: String,
        cpu_architecture: String,
    },

    #[error("No machine-config-operator image for release {release_image}")]
    McoImageNotFound { release_image: String },

    #[error("No must-gather images for OpenShift {version} ({cpu_architecture})")]
    MustGatherNotFound {
        version: String,
        cpu_architecture: String,
    },

    #[error("Release resolver unavailable: {reason}")]
    Unavailable { reason: String },
}

pub type ReleaseResult<T> = Result<T, ReleaseError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseImage {
    pub url: String,
    /// Full release version, e.g. `4.14.3`
    pub version: String,
}

/// Operator name to must-gather image; `ocp` is the platform image
pub type MustGatherImages = BTreeMap<String, String>;

#[async_trait]
pub trait ReleaseResolver: Send + Sync + Debug {
    async fn get_release_image(
        &self,
        openshift_version: &str,
        cpu_architecture: &str,
        pull_secret: &str,
    ) -> ReleaseResult<ReleaseImage>;

    async fn get_mco_image(
        &self,
        release_image_url: &str,
        mirror: Option<&str>,
        pull_secret: &str,
    ) -> ReleaseResult<String>;

    async fn get_must_gather_images(
        &self,
        openshift_version: &str,
        cpu_architecture: &str,
        pull_secret: &str,
    ) -> ReleaseResult<MustGatherImages>;
}

/// One entry of a preloaded release catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    pub openshift_version: String,
    #[serde(default = "default_cpu_architecture")]
    pub cpu_architecture: String,
    pub url: String,
    pub version: String,
    #[serde(default)]
    pub mco_image: Option<String>,
    #[serde(default)]
    pub must_gather_images: MustGatherImages,
}

fn default_cpu_architecture() -> String {
    "x86_64".to_string()
}

/// Resolver backed by a fixed catalog
#[derive(Debug, Clone, Default)]
pub struct StaticReleaseResolver {
    releases: Vec<ReleaseEntry>,
}

impl StaticReleaseResolver {
    pub fn new(releases: Vec<ReleaseEntry>) -> Self {
        Self { releases }
    }

    fn find(&self, openshift_version: &str, cpu_architecture: &str) -> Option<&ReleaseEntry> {
        self.releases.iter().find(|release| {
            release.openshift_version == openshift_version
                && release.cpu_architecture == cpu_architecture
        })
    }
}

#[async_trait]
impl ReleaseResolver for StaticReleaseResolver {
    async fn get_release_image(
        &self,
        openshift_version: &str,
        cpu_architecture: &str,
        _pull_secret: &str,
    ) -> ReleaseResult<ReleaseImage> {
        self.find(openshift_version, cpu_architecture)
            .map(|release| ReleaseImage {
                url: release.url.clone(),
                version: release.version.clone(),
            })
            .ok_or_else(|| ReleaseError::ReleaseImageNotFound {
                version: openshift_version.to_string(),
                cpu_architecture: cpu_architecture.to_string(),
            })
    }

    async fn get_mco_image(
        &self,
        release_image_url: &str,
        _mirror: Option<&str>,
        _pull_secret: &str,
    ) -> ReleaseResult<String> {
        self.releases
            .iter()
            .find(|release| release.url == release_image_url)
            .and_then(|release| release.mco_image.clone())
            .ok_or_else(|| ReleaseError::McoImageNotFound {
                release_image: release_image_url.to_string(),
            })
    }

    async fn get_must_gather_images(
        &self,
        openshift_version: &str,
        cpu_architecture: &str,
        _pull_secret: &str,
    ) -> ReleaseResult<MustGatherImages> {
        self.find(openshift_version, cpu_architecture)
            .map(|release| release.must_gather_images.clone())
            .ok_or_else(|| ReleaseError::MustGatherNotFound {
                version: openshift_version.to_string(),
                cpu_architecture: cpu_architecture.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> StaticReleaseResolver {
        StaticReleaseResolver::new(vec![ReleaseEntry {
            openshift_version: "4.14".to_string(),
            cpu_architecture: "x86_64".to_string(),
            url: "quay.io/openshift-release-dev/ocp-release:4.14.3-x86_64".to_string(),
            version: "4.14.3".to_string(),
            mco_image: Some("quay.io/openshift/mco:4.14".to_string()),
            must_gather_images: BTreeMap::from([(
                "ocp".to_string(),
                "quay.io/openshift/must-gather:4.14".to_string(),
            )]),
        }])
    }

    #[tokio::test]
    async fn test_static_lookup() {
        let resolver = resolver();
        let release = resolver
            .get_release_image("4.14", "x86_64", "")
            .await
            .unwrap();
        assert_eq!(release.version, "4.14.3");

        let mco = resolver.get_mco_image(&release.url, None, "").await.unwrap();
        assert_eq!(mco, "quay.io/openshift/mco:4.14");
    }

    #[tokio::test]
    async fn test_unknown_architecture() {
        let err = resolver()
            .get_release_image("4.14", "arm64", "")
            .await
            .unwrap_err();
        assert!(matches!(err, ReleaseError::ReleaseImageNotFound { .. }));
    }
}
