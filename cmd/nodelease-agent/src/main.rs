use clap::Parser;
use pkg_constants::lease::{DEFAULT_LEASE_DURATION_SECS, DEFAULT_NODE_STATUS_UPDATE_FREQUENCY_SECS};
use pkg_constants::paths::{DEFAULT_AGENT_CONFIG, DEFAULT_AGENT_DATA_DIR};
use pkg_controllers::clock::SystemClock;
use pkg_controllers::node_lease::{NodeLeaseConfig, NodeLeaseController};
use pkg_state::client::StateStore;
use pkg_state::lease::StoreLeaseClient;
use pkg_state::nodes::NodeRegistry;
use pkg_types::config::{AgentConfigFile, load_config_file};
use pkg_types::validate::validate_node_name;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nodelease-agent", about = "Keeps this node's liveness lease renewed")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = DEFAULT_AGENT_CONFIG)]
    config: String,

    /// Node name; also the lease holder identity
    #[arg(long)]
    node_name: Option<String>,

    /// Directory for SlateDB state storage
    #[arg(long)]
    data_dir: Option<String>,

    /// How long readers should treat a renewal as valid
    #[arg(long)]
    lease_duration_seconds: Option<i32>,

    /// Node status update frequency; caps the lease renew interval
    #[arg(long)]
    node_status_update_frequency_seconds: Option<u64>,

    /// Register this node in the state store before renewing its lease
    #[arg(long)]
    register_node: Option<bool>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let file_cfg: AgentConfigFile = load_config_file(&cli.config)?;
    info!("Config file: {}", cli.config);

    // Merge: CLI args > config file > defaults
    let node_name = cli
        .node_name
        .or(file_cfg.node_name)
        .ok_or_else(|| anyhow::anyhow!("node name is required (--node-name or node-name:)"))?;
    validate_node_name(&node_name)?;
    let data_dir = cli
        .data_dir
        .or(file_cfg.data_dir)
        .unwrap_or_else(|| DEFAULT_AGENT_DATA_DIR.to_string());
    let lease_duration_seconds = cli
        .lease_duration_seconds
        .or(file_cfg.lease_duration_seconds)
        .unwrap_or(DEFAULT_LEASE_DURATION_SECS);
    let status_frequency = Duration::from_secs(
        cli.node_status_update_frequency_seconds
            .or(file_cfg.node_status_update_frequency_seconds)
            .unwrap_or(DEFAULT_NODE_STATUS_UPDATE_FREQUENCY_SECS),
    );
    let register_node = cli.register_node.or(file_cfg.register_node).unwrap_or(true);

    info!("Starting nodelease-agent");
    info!("  Node:            {}", node_name);
    info!("  Data dir:        {}", data_dir);
    info!("  Lease duration:  {}s", lease_duration_seconds);
    info!("  Status freq:     {}s", status_frequency.as_secs());

    let store = StateStore::open(&data_dir).await?;
    let registry = NodeRegistry::new(store.clone());
    if register_node {
        registry.register(&node_name, HashMap::new()).await?;
    }

    let controller = NodeLeaseController::new(
        NodeLeaseConfig {
            holder_identity: node_name.clone(),
            lease_duration_seconds,
            node_status_update_frequency: status_frequency,
        },
        Arc::new(SystemClock),
        Some(Arc::new(StoreLeaseClient::new(store.clone()))),
        Arc::new(registry),
    )
    .with_failure_callback(Arc::new(move || {
        warn!("Node lease renewal keeps failing for {}", node_name);
    }));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = controller.start(shutdown_rx);

    // Block until Ctrl-C
    info!("Agent is running. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down agent");

    let _ = shutdown_tx.send(true);
    if let Err(e) = handle.await {
        warn!("Node lease controller task failed: {}", e);
    }
    store.close().await?;

    Ok(())
}
