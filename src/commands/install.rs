use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{
    encode,
    install_args::{
        construct_host_installer_args, has_save_partition_flag, to_json_string,
        InstallerArgsContext,
    },
    StepGenerator,
};
use crate::{
    config::InstructionConfig,
    core::{Cluster, Host, HostRole, HostStore, Inventory, StepError, StepResult, StoreError},
    hardware::boot_device,
    observability::events::{EventsHandler, HostEvent, HostRef},
    protocols::{InstallCmdRequest, InstallProxy, Step, StepType},
    versions::{MustGatherImages, ReleaseResolver},
};

/// Hosts the installer must always reach directly when a proxy is configured
const IMPLICIT_NO_PROXY: [&str; 4] = ["127.0.0.1", "localhost", ".svc", ".cluster.local"];

/// Proxy section of the install request, `None` without an HTTP(S) proxy.
pub fn proxy_arguments(cluster: &Cluster) -> Option<InstallProxy> {
    let proxy = &cluster.proxy;
    if proxy.http_proxy.is_empty() && proxy.https_proxy.is_empty() {
        return None;
    }

    let no_proxy = proxy.no_proxy.trim();
    let no_proxy = if no_proxy == "*" {
        no_proxy.to_string()
    } else {
        let api_int = format!("api-int.{}.{}", cluster.name, cluster.base_dns_domain);
        let mut entries: Vec<&str> = Vec::new();
        if !no_proxy.is_empty() {
            entries.push(no_proxy);
        }
        entries.extend(IMPLICIT_NO_PROXY);
        entries.push(&api_int);
        entries.join(",")
    };

    Some(InstallProxy {
        http_proxy: Some(proxy.http_proxy.clone()).filter(|p| !p.is_empty()),
        https_proxy: Some(proxy.https_proxy.clone()).filter(|p| !p.is_empty()),
        no_proxy: Some(no_proxy),
    })
}

/// Must-gather argument: the bare `ocp` image when it is the only one,
/// otherwise the whole map as JSON.
pub fn must_gather_argument(images: &MustGatherImages) -> StepResult<String> {
    if images.len() == 1 {
        if let Some(ocp) = images.get("ocp").filter(|image| !image.is_empty()) {
            return Ok(ocp.clone());
        }
    }
    encode("must-gather images", images)
}

/// Builds the full installer invocation for a host that is ready to install.
#[derive(Debug, Clone)]
pub struct InstallCmd {
    store: Arc<dyn HostStore>,
    releases: Arc<dyn ReleaseResolver>,
    events: Arc<dyn EventsHandler>,
    config: Arc<InstructionConfig>,
}

impl InstallCmd {
    pub fn new(
        store: Arc<dyn HostStore>,
        releases: Arc<dyn ReleaseResolver>,
        events: Arc<dyn EventsHandler>,
        config: Arc<InstructionConfig>,
    ) -> Self {
        Self {
            store,
            releases,
            events,
            config,
        }
    }

    /// Release-derived images, only sent for clusters being installed from scratch.
    async fn release_images(&self, cluster: &Cluster, request: &mut InstallCmdRequest) -> StepResult<()> {
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
                self.config.release_image_mirror.as_deref(),
                &cluster.pull_secret,
            )
            .await?;
        info!(
            cluster_id = %cluster.id,
            release_image = %release.url,
            mco_image = %mco_image,
            "Resolved install images"
        );
        let must_gather = self
            .releases
            .get_must_gather_images(
                &cluster.openshift_version,
                &cluster.cpu_architecture,
                &cluster.pull_secret,
            )
            .await?;

        request.mco_image = Some(mco_image);
        request.must_gather_image = Some(must_gather_argument(&must_gather)?);
        request.openshift_version = Some(cluster.openshift_version.clone());
        Ok(())
    }

    /// Bootable disks the installer wipes, minus those the user asked to keep.
    fn disks_to_format(&self, host: &Host, inventory: &Inventory, skipped: &[String]) -> Vec<String> {
        let host_ref = HostRef::from(host);
        let mut disks = Vec::new();
        for disk in inventory.disks.iter().filter(|disk| disk.is_format_candidate()) {
            let disk_id = disk.device_identifier().to_string();
            if skipped.contains(&disk_id) {
                self.events.send_host_event(HostEvent::DiskFormatSkipped {
                    host: host_ref.clone(),
                    disk_name: disk.name.clone(),
                    disk_id,
                });
            } else {
                self.events.send_host_event(HostEvent::DiskFormatPerformed {
                    host: host_ref.clone(),
                    disk_name: disk.name.clone(),
                    disk_id: disk_id.clone(),
                });
                disks.push(disk_id);
            }
        }
        disks
    }
}

#[async_trait]
impl StepGenerator for InstallCmd {
    async fn get_steps(&self, host: &Host) -> StepResult<Option<Vec<Step>>> {
        let cluster_id = host.cluster_id.ok_or(StepError::MissingField {
            host_id: host.id,
            field: "cluster_id",
        })?;
        let cluster = self.store.get_cluster(cluster_id).await?;
        let hosts = self.store.list_cluster_hosts(cluster_id).await?;
        let inventory = host.parse_inventory()?;
        let boot_device = boot_device(host, &inventory).ok_or(StepError::MissingField {
            host_id: host.id,
            field: "installation disk",
        })?;
        let infra_env = match self.store.get_infra_env(host.infra_env_id).await {
            Ok(infra_env) => Some(infra_env),
            Err(StoreError::InfraEnvNotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        let role = if host.bootstrap {
            HostRole::Bootstrap
        } else {
            host.effective_role()
        };
        let mut request = InstallCmdRequest {
            boot_device: boot_device.clone(),
            check_cvo: self.config.check_cluster_version,
            cluster_id,
            control_plane_count: cluster.control_plane_count,
            controller_image: self.config.controller_image.clone(),
            enable_skip_mco_reboot: self.config.enable_skip_mco_reboot,
            high_availability_mode: cluster.high_availability_mode.as_str().to_string(),
            host_id: host.id,
            infra_env_id: host.infra_env_id,
            installer_image: self.config.installer_image.clone(),
            notify_num_reboots: self.config.notify_num_reboots,
            role: role.as_str().to_string(),
            service_ips: self.config.service_ip_list(),
            ..Default::default()
        };

        // day-2 hosts join a running cluster and never pull release images
        if !host.is_day2() && !cluster.is_day2() {
            self.release_images(&cluster, &mut request).await?;
        }

        let args = construct_host_installer_args(&InstallerArgsContext {
            cluster: &cluster,
            host,
            hosts: &hosts,
            inventory: &inventory,
            infra_env: infra_env.as_ref(),
        })?;

        let mut skipped: Vec<String> = host
            .skip_formatting_disk_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        if has_save_partition_flag(&args) {
            request.skip_installation_disk_cleanup = true;
            if !skipped.contains(&boot_device) {
                skipped.push(boot_device.clone());
                self.store
                    .update_skip_formatting_disks(host.infra_env_id, host.id, &skipped.join(","))
                    .await?;
            }
        }

        request.installer_args = to_json_string(&args)?;
        request.disks_to_format = self.disks_to_format(host, &inventory, &skipped);
        request.proxy = proxy_arguments(&cluster);

        let payload = encode("install request", &request)?;

        let changed = self
            .store
            .update_installer_version(host.infra_env_id, host.id, &self.config.installer_image)
            .await?;
        debug!(host_id = %host.id, changed, "Recorded installer version");

        Ok(Some(vec![Step::new(StepType::Install, vec![payload])]))
    }

    fn name(&self) -> &'static str {
        "install"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Proxy;

    fn cluster_with_proxy(http: &str, https: &str, no_proxy: &str) -> Cluster {
        Cluster {
            name: "test-cluster".to_string(),
            base_dns_domain: "example.com".to_string(),
            proxy: Proxy {
                http_proxy: http.to_string(),
                https_proxy: https.to_string(),
                no_proxy: no_proxy.to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_no_proxy_configured() {
        assert_eq!(proxy_arguments(&cluster_with_proxy("", "", "domain.org")), None);
    }

    #[test]
    fn test_no_proxy_extended() {
        let proxy = proxy_arguments(&cluster_with_proxy("http://proxy:3128", "", " domain.org ")).unwrap();
        assert_eq!(proxy.http_proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(proxy.https_proxy, None);
        assert_eq!(
            proxy.no_proxy.as_deref(),
            Some("domain.org,127.0.0.1,localhost,.svc,.cluster.local,api-int.test-cluster.example.com")
        );

        let proxy = proxy_arguments(&cluster_with_proxy("", "https://proxy:3129", "")).unwrap();
        assert_eq!(
            proxy.no_proxy.as_deref(),
            Some("127.0.0.1,localhost,.svc,.cluster.local,api-int.test-cluster.example.com")
        );
    }

    #[test]
    fn test_wildcard_no_proxy_passes_through() {
        let proxy = proxy_arguments(&cluster_with_proxy("http://proxy:3128", "", " * ")).unwrap();
        assert_eq!(proxy.no_proxy.as_deref(), Some("*"));
    }

    #[test]
    fn test_must_gather_argument() {
        let ocp_only = MustGatherImages::from([("ocp".to_string(), "quay.io/mg".to_string())]);
        assert_eq!(must_gather_argument(&ocp_only).unwrap(), "quay.io/mg");

        let mut images = ocp_only.clone();
        images.insert("cnv".to_string(), "quay.io/cnv-mg".to_string());
        assert_eq!(
            must_gather_argument(&images).unwrap(),
            r#"{"cnv":"quay.io/cnv-mg","ocp":"quay.io/mg"}"#
        );

        assert_eq!(must_gather_argument(&MustGatherImages::new()).unwrap(), "{}");
    }
}
