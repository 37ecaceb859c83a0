// [libs/domain/models/src/adapter.rs]
//! The capability port every miner driver implements (§4.1). Lives in the
//! model crate rather than `fleet_adapters` so domain code (the strategy
//! engines, the scheduler) can depend on the *contract* without pulling in
//! TCP/HTTP/UDP wire code — `fleet_adapters` supplies the implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

use crate::telemetry::HashrateUnit;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("device unreachable: {0}")]
    Unreachable(String),
    #[error("could not decode device response: {0}")]
    Decode(String),
    #[error("{family:?} has no available modes")]
    NoModes { family: crate::MinerFamily },
    #[error("pool {host}:{port} is not present in this device's fixed pool slots")]
    PoolNotInSlots { host: String, port: u16 },
    #[error("operation unsupported for this family")]
    Unsupported,
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// The normalised poll result an adapter hands to the ingest pipeline — not
/// yet a `Telemetry` row (no id, no miner_id; those are assigned at the
/// persistence boundary).
#[derive(Debug, Clone)]
pub struct RawTelemetry {
    pub timestamp: DateTime<Utc>,
    pub hashrate: f64,
    pub hashrate_unit: HashrateUnit,
    pub temperature: Option<f64>,
    pub power_watts: Option<f64>,
    pub shares_accepted: Option<i64>,
    pub shares_rejected: Option<i64>,
    pub pool_in_use: Option<String>,
    pub detected_mode: Option<String>,
    pub firmware_version: Option<String>,
    /// Best-share string as reported natively (with unit suffix), consumed
    /// by the high-difficulty-share tracker (§4.11).
    pub best_share: Option<String>,
    pub data: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct PoolTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// One fixed pool slot as currently reported by the device (§3
/// `MinerPoolSlot`, §4.1). Only meaningful for `MinerFamily::is_fixed_slot()`
/// families — see `MinerAdapter::list_pool_slots`.
#[derive(Debug, Clone)]
pub struct PoolSlotInfo {
    pub slot_number: i32,
    pub pool_url: String,
    pub pool_port: u16,
    pub pool_user: String,
    pub is_active: bool,
}

#[async_trait]
pub trait MinerAdapter: Send + Sync {
    fn family(&self) -> crate::MinerFamily;

    async fn get_telemetry(&self) -> Result<RawTelemetry, AdapterError>;

    async fn get_mode(&self) -> Result<Option<String>, AdapterError>;

    async fn set_mode(&self, mode: &str) -> Result<(), AdapterError>;

    async fn get_available_modes(&self) -> Result<Vec<String>, AdapterError>;

    async fn switch_pool(&self, target: &PoolTarget) -> Result<(), AdapterError>;

    async fn restart(&self) -> Result<(), AdapterError>;

    async fn is_online(&self) -> Result<bool, AdapterError>;

    /// Enumerates the device's current fixed pool slots. The pool-slot sync
    /// job (§4.10) calls this only for fixed-slot families; every other
    /// family has nothing to report.
    async fn list_pool_slots(&self) -> Result<Vec<PoolSlotInfo>, AdapterError> {
        Ok(Vec::new())
    }
}
