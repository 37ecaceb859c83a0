// [apps/controller/src/main.rs]
//! Entry point: wires the store, the config file, the per-miner adapter
//! dispatch table, and the passive UDP listener together, then hands off to
//! the scheduler (§4.10, §5).

mod adapters;
mod app_state;
mod scheduler;
mod tracking;

use app_state::AppState;
use clap::Parser;
use fleet_adapters::families::nmminer::run_listener;
use fleet_adapters::PassiveRegistry;
use fleet_config::ConfigStore;
use fleet_store::Store;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "fleet-controller", about = "Heterogeneous crypto miner fleet controller")]
struct Cli {
    /// Path or URL of the libSQL database (`:memory:`, a local file, or a
    /// `libsql://`/`https://` remote endpoint).
    #[arg(long, env = "FLEET_DB_URL", default_value = "fleet.db")]
    db_url: String,

    /// Auth token for a remote libSQL endpoint; ignored for local targets.
    #[arg(long, env = "FLEET_DB_TOKEN")]
    db_token: Option<String>,

    #[arg(long, env = "FLEET_CONFIG_PATH", default_value = "fleet.toml")]
    config_path: PathBuf,

    /// Bind address for the passive (NMMiner) telemetry listener (§4.2).
    #[arg(long, env = "FLEET_NMMINER_BIND", default_value = "0.0.0.0:8266")]
    nmminer_bind: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let store = Store::connect(&cli.db_url, cli.db_token.clone()).await?;
    let config = Arc::new(ConfigStore::load(&cli.config_path)?);

    let passive_cache: fleet_adapters::TelemetryCache = Default::default();
    let passive_registry = PassiveRegistry::new();

    let state = Arc::new(AppState::new(store, config, passive_cache.clone(), passive_registry.clone()));

    adapters::refresh(&state).await?;

    tokio::spawn({
        let bind_addr = cli.nmminer_bind;
        let registry = passive_registry.clone();
        let cache = passive_cache.clone();
        async move {
            if let Err(e) = run_listener(bind_addr, registry, cache).await {
                error!(error = %e, "nmminer listener exited");
            }
        }
    });

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    info!(db_url = %cli.db_url, "fleet controller starting");
    scheduler::run(state, shutdown).await;
    info!("fleet controller stopped");
    Ok(())
}
