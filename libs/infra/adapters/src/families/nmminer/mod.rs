// [libs/infra/adapters/src/families/nmminer/mod.rs]
//! Passive UDP family (§4.1, §4.2, §6). The device never answers a request;
//! telemetry only arrives from the shared listener, and control is a
//! best-effort config datagram with no acknowledgement.

mod frame;
mod listener;
mod registry;

pub use listener::run as run_listener;
pub use registry::PassiveRegistry;

use async_trait::async_trait;
use chrono::Utc;
use fleet_models::{AdapterError, MinerAdapter, MinerFamily, PoolTarget, RawTelemetry};
use std::collections::HashMap;
use std::net::UdpSocket as StdUdpSocket;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

pub type TelemetryCache = Arc<RwLock<HashMap<i64, RawTelemetry>>>;

const CONFIG_PORT: u16 = 14523;
/// A frame older than this is treated as the device being offline — the
/// listener never pushes an explicit "went away" signal.
const STALE_AFTER: chrono::Duration = chrono::Duration::minutes(5);

pub struct NmMinerAdapter {
    miner_id: i64,
    host: String,
    cache: TelemetryCache,
}

impl NmMinerAdapter {
    pub fn new(miner_id: i64, host: String, cache: TelemetryCache) -> Self {
        Self { miner_id, host, cache }
    }
}

#[async_trait]
impl MinerAdapter for NmMinerAdapter {
    fn family(&self) -> MinerFamily {
        MinerFamily::NMMiner
    }

    #[instrument(skip(self), fields(host = %self.host))]
    async fn get_telemetry(&self) -> Result<RawTelemetry, AdapterError> {
        self.cache
            .read()
            .await
            .get(&self.miner_id)
            .cloned()
            .ok_or_else(|| AdapterError::Unreachable("no telemetry frame received yet".into()))
    }

    async fn get_mode(&self) -> Result<Option<String>, AdapterError> {
        Ok(None)
    }

    async fn set_mode(&self, _mode: &str) -> Result<(), AdapterError> {
        Err(AdapterError::Unsupported)
    }

    async fn get_available_modes(&self) -> Result<Vec<String>, AdapterError> {
        Err(AdapterError::NoModes { family: MinerFamily::NMMiner })
    }

    #[instrument(skip(self, target), fields(host = %self.host))]
    async fn switch_pool(&self, target: &PoolTarget) -> Result<(), AdapterError> {
        let datagram = serde_json::json!({
            "PrimaryPool": format!("{}:{}", target.host, target.port),
            "PrimaryAddress": target.user,
            "PrimaryPassword": target.password,
        });
        let payload = serde_json::to_vec(&datagram).map_err(|e| AdapterError::Decode(e.to_string()))?;

        let host = self.host.clone();
        tokio::task::spawn_blocking(move || {
            let socket = StdUdpSocket::bind("0.0.0.0:0").map_err(|e| AdapterError::Unreachable(e.to_string()))?;
            socket.send_to(&payload, (host.as_str(), CONFIG_PORT)).map_err(|e| AdapterError::Unreachable(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| AdapterError::Unreachable(e.to_string()))?
    }

    async fn restart(&self) -> Result<(), AdapterError> {
        // The passive protocol has no restart command (§6); only the
        // config datagram is specified as an outbound channel.
        Err(AdapterError::Unsupported)
    }

    async fn is_online(&self) -> Result<bool, AdapterError> {
        let cache = self.cache.read().await;
        Ok(cache.get(&self.miner_id).map(|t| Utc::now() - t.timestamp < STALE_AFTER).unwrap_or(false))
    }
}
