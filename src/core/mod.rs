//! Core data model and shared state for step generation
//!
//! Hosts, clusters and infra-envs are read from a [`HostStore`]; the only
//! cross-request mutable state is the connectivity [`AdmissionQueue`].

pub mod admission;
pub mod cluster;
pub mod error;
pub mod host;
pub mod inventory;
pub mod store;

pub use admission::{AdmissionQueue, AdmissionSweeper};
pub use cluster::{
    Cluster, ClusterKind, DiskEncryption, DiskEncryptionMode, HighAvailabilityMode,
    IgnitionEndpoint, InfraEnv, Proxy,
};
pub use error::{
    InstructionError, InstructionResult, StepError, StepResult, StoreError, StoreResult,
};
pub use host::{DiskInfo, DiskSpeed, Host, HostKind, HostRole, HostStatus};
pub use inventory::{Boot, Cpu, Disk, DriveType, Interface, Inventory, Iscsi, SystemVendor};
pub use store::{HostStore, InMemoryHostStore};
