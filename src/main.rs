use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use clap::Parser;
use host_instructions::{
    commands::{Collaborators, InstructionManager},
    config::{InstructionConfig, InstructionConfigBuilder},
    core::{AdmissionQueue, Cluster, Host, InMemoryHostStore, InfraEnv},
    hardware::InventoryInterfaceValidator,
    observability::{
        events::TracingEventsHandler,
        logging::{init_logging, LoggingConfig},
    },
    versions::{ReleaseEntry, StaticReleaseResolver},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// Compute the next agent instructions for one host from a state snapshot.
#[derive(Parser, Debug)]
#[command(name = "host-instructions", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON snapshot of clusters, hosts, infra-envs and releases
    #[arg(long)]
    state: PathBuf,

    #[arg(long)]
    host_id: Uuid,

    /// Needed only when the same host id appears in several infra-envs
    #[arg(long)]
    infra_env_id: Option<Uuid>,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, default_value_t = false)]
    log_json: bool,

    #[arg(long)]
    log_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StateSnapshot {
    #[serde(default)]
    clusters: Vec<Cluster>,
    #[serde(default)]
    hosts: Vec<Host>,
    #[serde(default)]
    infra_envs: Vec<InfraEnv>,
    #[serde(default)]
    releases: Vec<ReleaseEntry>,
}

impl Cli {
    fn to_config(&self) -> anyhow::Result<InstructionConfig> {
        let mut builder = match &self.config {
            Some(path) => InstructionConfigBuilder::from_file(path)?,
            None => InstructionConfigBuilder::new(),
        };
        if let Some(level) = &self.log_level {
            builder = builder.log_level(level.clone());
        }
        if let Some(dir) = &self.log_dir {
            builder = builder.log_dir(dir.clone());
        }
        if self.log_json {
            builder = builder.log_json(true);
        }
        Ok(builder.build()?)
    }

    fn load_state(&self) -> anyhow::Result<StateSnapshot> {
        let raw = fs::read_to_string(&self.state)
            .with_context(|| format!("reading state file {}", self.state.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing state file {}", self.state.display()))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.to_config()?;

    let _log_guard = init_logging(LoggingConfig::from_config(&config));

    let state = cli.load_state()?;
    let Some(host) = state
        .hosts
        .iter()
        .find(|host| {
            host.id == cli.host_id && cli.infra_env_id.map_or(true, |id| id == host.infra_env_id)
        })
        .cloned()
    else {
        bail!("host {} not found in {}", cli.host_id, cli.state.display());
    };

    let store = Arc::new(InMemoryHostStore::new());
    for cluster in state.clusters {
        store.insert_cluster(cluster);
    }
    for infra_env in state.infra_envs {
        store.insert_infra_env(infra_env);
    }
    for host in state.hosts {
        store.insert_host(host);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        let admission = Arc::new(AdmissionQueue::new(&config.admission));
        let _sweeper = (config.admission.sweep_interval_secs > 0).then(|| {
            admission.spawn_sweeper(Duration::from_secs(config.admission.sweep_interval_secs))
        });

        let manager = InstructionManager::new(
            &config,
            Collaborators {
                store,
                releases: Arc::new(StaticReleaseResolver::new(state.releases)),
                events: Arc::new(TracingEventsHandler),
                interfaces: Arc::new(InventoryInterfaceValidator),
                admission,
            },
        );
        info!(host_id = %host.id, status = %host.status, "Computing next steps");
        manager
            .get_next_steps_for(host.infra_env_id, host.id)
            .await
    })?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
