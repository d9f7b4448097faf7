use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use smeshmon_monitor::{Monitor, MonitorConfig, MonitorError, Result};
use smeshmon_rpc::HttpApi;

/// Headless smesher monitor: polls a node and logs its timeline
#[derive(Parser, Debug)]
#[command(name = "smeshmon")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Node JSON API URL, e.g. http://localhost:9071
    #[arg(long, env = "SMESHMON_RPC")]
    rpc: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "SMESHMON_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config = match &cli.config {
        Some(path) => MonitorConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => MonitorConfig::default(),
    };
    if let Some(rpc) = &cli.rpc {
        config.rpc_url = Some(rpc.clone());
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let rpc = config
        .rpc_url
        .clone()
        .ok_or_else(|| MonitorError::Config("no RPC URL given (use --rpc)".to_string()))?;

    let api = HttpApi::new(rpc.as_str())?;
    let mut monitor = Monitor::new(config)?;
    let mut changes = monitor.subscribe();
    monitor.connect(Arc::new(api)).await;
    info!("monitoring {}", rpc);

    let mut shown = BTreeMap::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            change = changes.recv() => match change {
                Ok(change) => {
                    let snapshot = monitor.snapshot().await;
                    debug!("{} items changed (revision {})", change.keys.len(), change.revision);
                    for (id, message) in snapshot.messages {
                        if shown.get(&id) != Some(&message) {
                            info!("{}: {}", id.abbreviated(), message.text);
                            shown.insert(id, message);
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("missed {} timeline updates", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    monitor.disconnect().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    if let Err(err) = run(cli).await {
        error!("{}", err);
        std::process::exit(1);
    }
}
