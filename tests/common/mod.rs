// Shared fixtures for the integration tests
#![allow(dead_code)]

use std::sync::Arc;

use host_instructions::{
    commands::{Collaborators, InstructionManager},
    config::InstructionConfig,
    core::{
        AdmissionQueue, Cluster, Disk, DriveType, Host, HostRole, HostStatus, InMemoryHostStore,
        InfraEnv, Interface, Inventory,
    },
    hardware::InventoryInterfaceValidator,
    observability::events::{EventsHandler, HostEvent},
    versions::{MustGatherImages, ReleaseEntry, StaticReleaseResolver},
};
use parking_lot::Mutex;
use uuid::Uuid;

pub const OPENSHIFT_VERSION: &str = "4.14";
pub const RELEASE_IMAGE: &str = "quay.io/openshift-release-dev/ocp-release:4.14.3-x86_64";
pub const MCO_IMAGE: &str = "quay.io/openshift-release-dev/mco:4.14.3";
pub const MUST_GATHER_IMAGE: &str = "quay.io/openshift-release-dev/must-gather:4.14.3";
pub const BOOT_DISK_ID: &str = "/dev/disk/by-id/wwn-0x5000c500a0b1c2d3";

/// Events handler that keeps every event for later assertions
#[derive(Debug, Default)]
pub struct RecordingEventsHandler {
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingEventsHandler {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(HostEvent::name).collect()
    }
}

impl EventsHandler for RecordingEventsHandler {
    fn send_host_event(&self, event: HostEvent) {
        self.events.lock().push(event);
    }
}

pub fn release_entry(must_gather_images: MustGatherImages) -> ReleaseEntry {
    ReleaseEntry {
        openshift_version: OPENSHIFT_VERSION.to_string(),
        cpu_architecture: "x86_64".to_string(),
        url: RELEASE_IMAGE.to_string(),
        version: "4.14.3".to_string(),
        mco_image: Some(MCO_IMAGE.to_string()),
        must_gather_images,
    }
}

/// Store, collaborators and a manager wired together
pub struct TestEnv {
    pub store: Arc<InMemoryHostStore>,
    pub releases: Arc<StaticReleaseResolver>,
    pub events: Arc<RecordingEventsHandler>,
    pub admission: Arc<AdmissionQueue>,
    pub config: InstructionConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(InstructionConfig::default())
    }

    pub fn with_config(config: InstructionConfig) -> Self {
        let must_gather =
            MustGatherImages::from([("ocp".to_string(), MUST_GATHER_IMAGE.to_string())]);
        Self {
            store: Arc::new(InMemoryHostStore::new()),
            releases: Arc::new(StaticReleaseResolver::new(vec![release_entry(must_gather)])),
            events: Arc::new(RecordingEventsHandler::default()),
            admission: Arc::new(AdmissionQueue::new(&config.admission)),
            config,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            store: self.store.clone(),
            releases: self.releases.clone(),
            events: self.events.clone(),
            interfaces: Arc::new(InventoryInterfaceValidator),
            admission: self.admission.clone(),
        }
    }

    pub fn manager(&self) -> InstructionManager {
        InstructionManager::new(&self.config, self.collaborators())
    }

    /// Day-1 cluster plus its infra-env, both stored.
    pub fn add_cluster(&self) -> (Cluster, InfraEnv) {
        let cluster = cluster();
        let infra_env = InfraEnv {
            id: Uuid::new_v4(),
            additional_ntp_sources: "clock.redhat.com".to_string(),
            ..Default::default()
        };
        self.store.insert_cluster(cluster.clone());
        self.store.insert_infra_env(infra_env.clone());
        (cluster, infra_env)
    }

    pub fn add_host(&self, host: Host) -> Host {
        self.store.insert_host(host.clone());
        host
    }
}

pub fn cluster() -> Cluster {
    Cluster {
        id: Uuid::new_v4(),
        name: "test-cluster".to_string(),
        base_dns_domain: "example.com".to_string(),
        openshift_version: OPENSHIFT_VERSION.to_string(),
        machine_networks: vec!["192.186.10.0/24".to_string()],
        api_vips: vec!["192.186.10.200".to_string()],
        ingress_vips: vec!["192.186.10.201".to_string()],
        ..Default::default()
    }
}

pub fn inventory(addresses: &[&str]) -> Inventory {
    Inventory {
        hostname: "master-0".to_string(),
        interfaces: vec![Interface {
            name: "eth1".to_string(),
            mac_address: "52:54:00:aa:bb:cc".to_string(),
            ipv4_addresses: addresses.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }],
        disks: vec![
            Disk {
                id: BOOT_DISK_ID.to_string(),
                name: "sda".to_string(),
                path: "/dev/sda".to_string(),
                by_path: "/dev/disk/by-path/pci-0000:00:06.0".to_string(),
                drive_type: DriveType::Hdd,
                bootable: true,
                ..Default::default()
            },
            Disk {
                id: "/dev/disk/by-id/wwn-0x5000c500a0b1c2d4".to_string(),
                name: "sdb".to_string(),
                path: "/dev/sdb".to_string(),
                drive_type: DriveType::Ssd,
                bootable: true,
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

/// Host bound to the cluster with a two-disk inventory.
pub fn host(cluster: &Cluster, infra_env: &InfraEnv, status: HostStatus) -> Host {
    Host {
        id: Uuid::new_v4(),
        infra_env_id: infra_env.id,
        cluster_id: Some(cluster.id),
        status,
        role: HostRole::Master,
        inventory: serde_json::to_string(&inventory(&["192.186.10.10/24"])).unwrap(),
        installation_disk_id: BOOT_DISK_ID.to_string(),
        installation_disk_path: "/dev/sda".to_string(),
        ..Default::default()
    }
}

pub fn unbound_host(infra_env: &InfraEnv, status: HostStatus) -> Host {
    Host {
        id: Uuid::new_v4(),
        infra_env_id: infra_env.id,
        status,
        inventory: serde_json::to_string(&inventory(&["192.186.10.10/24"])).unwrap(),
        ..Default::default()
    }
}
