// [libs/infra/adapters/src/families/nmminer/registry.rs]
//! Shared IP→miner_id registry (§4.2, §5). Built once at listener startup
//! from the enabled NMMiner fleet and read-only thereafter — no entity
//! lifetime depends on it, it is purely an addressing shortcut.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct PassiveRegistry {
    by_ip: Arc<RwLock<HashMap<IpAddr, i64>>>,
}

impl PassiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rebuild(&self, entries: impl IntoIterator<Item = (IpAddr, i64)>) {
        let mut map = self.by_ip.write().await;
        map.clear();
        map.extend(entries);
    }

    pub async fn miner_for(&self, ip: IpAddr) -> Option<i64> {
        self.by_ip.read().await.get(&ip).copied()
    }
}
