//! Error types for the instruction engine
//!
//! Three layers: store lookups ([`StoreError`]), individual generators
//! ([`StepError`], fatal to the generator only) and the whole
//! `get_next_steps` call ([`InstructionError`]).

use uuid::Uuid;

use crate::{network::NetworkError, versions::ReleaseError};

/// Host/cluster record store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Host {host_id} not found in infra-env {infra_env_id}")]
    HostNotFound { infra_env_id: Uuid, host_id: Uuid },

    #[error("Cluster not found: {cluster_id}")]
    ClusterNotFound { cluster_id: Uuid },

    #[error("Infra-env not found: {infra_env_id}")]
    InfraEnvNotFound { infra_env_id: Uuid },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that fail a single step generator
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("Failed to parse inventory of host {host_id}: {reason}")]
    InvalidInventory { host_id: Uuid, reason: String },

    #[error("Cannot determine machine network address family for host {host_id}")]
    MachineCidrUnknown { host_id: Uuid },

    #[error("Invalid installer args: {reason}")]
    InvalidInstallerArgs { reason: String },

    #[error("Invalid {what}: {reason}")]
    Serialization { what: &'static str, reason: String },

    #[error("Host {host_id} is missing {field}")]
    MissingField { host_id: Uuid, field: &'static str },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type StepResult<T> = Result<T, StepError>;

/// Errors that fail a whole `get_next_steps` call
#[derive(Debug, thiserror::Error)]
pub enum InstructionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Step generation for host {host_id} exceeded the {timeout_secs}s deadline")]
    DeadlineExceeded { host_id: Uuid, timeout_secs: u64 },
}

pub type InstructionResult<T> = Result<T, InstructionError>;
