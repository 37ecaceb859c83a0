// [apps/controller/src/app_state.rs]
//! Process-wide shared state: the store handle, the config file, the
//! per-miner adapter dispatch table, and the passive-family cache/registry
//! pair (§4.1, §4.2, §5). One instance, held behind an `Arc` and passed to
//! every scheduled job.

use fleet_adapters::{PassiveRegistry, TelemetryCache};
use fleet_config::ConfigStore;
use fleet_fetchers::{CryptoPriceClient, TtlCache};
use fleet_models::MinerAdapter;
use fleet_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct AppState {
    pub store: Store,
    pub config: Arc<ConfigStore>,
    pub adapters: RwLock<HashMap<i64, Arc<dyn MinerAdapter>>>,
    pub passive_cache: TelemetryCache,
    pub passive_registry: PassiveRegistry,
    pub crypto_price_client: CryptoPriceClient,
    pub crypto_price_cache: TtlCache<String, HashMap<String, f64>>,
}

impl AppState {
    pub fn new(
        store: Store,
        config: Arc<ConfigStore>,
        passive_cache: TelemetryCache,
        passive_registry: PassiveRegistry,
    ) -> Self {
        Self {
            store,
            config,
            adapters: RwLock::new(HashMap::new()),
            passive_cache,
            passive_registry,
            crypto_price_client: CryptoPriceClient::new(),
            crypto_price_cache: TtlCache::new(),
        }
    }
}
