// [apps/controller/src/bin/seed.rs]
//! Inserts a small demo fleet for local development: one miner per family
//! that takes pool credentials, one pool, and a starter Agile Solo band
//! table. Safe to run repeatedly — `pools`/`miners` don't get natural keys
//! to conflict on, so this only ever appends; point `FLEET_DB_URL` at a
//! throwaway file or `:memory:` if that's not what you want.

use clap::Parser;
use fleet_models::{Miner, MinerFamily, Pool};
use fleet_store::repositories::{MinerRepository, PoolRepository};
use fleet_store::Store;
use std::collections::HashMap;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "seed", about = "Insert a demo miner/pool/band set for local development")]
struct Cli {
    #[arg(long, env = "FLEET_DB_URL", default_value = "fleet.db")]
    db_url: String,

    #[arg(long, env = "FLEET_DB_TOKEN")]
    db_token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let store = Store::connect(&cli.db_url, cli.db_token).await?;

    let pools = PoolRepository::new(store.clone());
    let pool_id = pools
        .create(&Pool {
            id: 0,
            name: "demo-pool".to_string(),
            host: "solo.ckpool.org".to_string(),
            port: 3333,
            user: "bc1qexampleaddressxxxxxxxxxxxxxxxxxxxxxxxxxxxxx".to_string(),
            password: "x".to_string(),
            enabled: true,
            priority: 0,
            network_difficulty: None,
            network_difficulty_stale: false,
            best_share: None,
        })
        .await?;
    info!(pool_id, "seeded demo pool");

    let miners = MinerRepository::new(store.clone());

    let demo_miners = [
        ("demo-avalon-nano", MinerFamily::AvalonNano, "192.0.2.10"),
        ("demo-bitaxe", MinerFamily::Bitaxe, "192.0.2.11"),
        ("demo-nerdqaxe", MinerFamily::NerdQaxe, "192.0.2.12"),
        ("demo-nmminer", MinerFamily::NMMiner, "192.0.2.13"),
        ("demo-xmrig", MinerFamily::XMRig, "192.0.2.14"),
    ];

    for (name, family, host) in demo_miners {
        let miner_id = miners
            .create(&Miner {
                id: 0,
                name: name.to_string(),
                family,
                host: host.to_string(),
                port: Some(family.default_port()),
                current_mode: None,
                firmware_version: None,
                manual_power_watts: None,
                enabled: true,
                config: HashMap::new(),
                last_mode_change: None,
            })
            .await?;
        info!(miner_id, name, "seeded demo miner");
    }

    let conn = store.connection()?;
    conn.execute(
        "INSERT INTO agile_strategy (id, enabled, current_price_band) VALUES (1, 0, NULL) \
         ON CONFLICT(id) DO NOTHING",
        (),
    )
    .await?;
    conn.execute(
        "INSERT INTO agile_strategy_bands \
         (strategy_id, sort_order, min_price, max_price, target_coin, avalon_nano_mode, bitaxe_mode, nerdqaxe_mode) \
         VALUES (1, 0, NULL, 10.0, 'bitcoin', 'turbo', 'turbo', 'turbo')",
        (),
    )
    .await?;
    conn.execute(
        "INSERT INTO agile_strategy_bands \
         (strategy_id, sort_order, min_price, max_price, target_coin, avalon_nano_mode, bitaxe_mode, nerdqaxe_mode) \
         VALUES (1, 1, 10.0, NULL, 'bitcoin', 'eco', 'standby', 'standby')",
        (),
    )
    .await?;

    info!("demo fleet seeded");
    Ok(())
}
