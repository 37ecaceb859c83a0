// [apps/controller/src/bin/migrate.rs]
//! Standalone migration entry point. `Store::connect` already applies the
//! schema on every connect (see `client.rs`), so this binary's value is
//! purely as an explicit, scriptable "run the migration and exit" command —
//! useful in deploy hooks where you want a distinct step and exit code
//! rather than relying on the main process's implicit bootstrap.

use clap::Parser;
use fleet_store::Store;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "migrate", about = "Apply the fleet controller database schema")]
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

    match Store::connect(&cli.db_url, cli.db_token).await {
        Ok(_) => {
            info!(db_url = %cli.db_url, "schema applied");
            Ok(())
        }
        Err(e) => {
            error!(db_url = %cli.db_url, error = %e, "migration failed");
            std::process::exit(1);
        }
    }
}
