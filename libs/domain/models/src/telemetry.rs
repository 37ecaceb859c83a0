// [libs/domain/models/src/telemetry.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HashrateUnit {
    #[serde(rename = "KH/s")]
    KhPerSec,
    #[serde(rename = "MH/s")]
    MhPerSec,
    #[serde(rename = "GH/s")]
    GhPerSec,
    #[serde(rename = "TH/s")]
    ThPerSec,
}

impl HashrateUnit {
    /// Conversion factor to H/s, used when comparing telemetry across
    /// families that report in different units.
    pub fn to_hashes_per_sec(self) -> f64 {
        match self {
            HashrateUnit::KhPerSec => 1e3,
            HashrateUnit::MhPerSec => 1e6,
            HashrateUnit::GhPerSec => 1e9,
            HashrateUnit::ThPerSec => 1e12,
        }
    }
}

/// One normalised poll result. Append-only, retained 30 days (§3, §8
/// invariant 5). `pool_in_use` is the raw URL string the adapter observed —
/// matched against `Pool` rows by normalised host:port, never stored as a
/// foreign key, since a miner may report a pool the operator hasn't
/// registered yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    pub id: i64,
    pub miner_id: i64,
    pub timestamp: DateTime<Utc>,
    pub hashrate: f64,
    pub hashrate_unit: HashrateUnit,
    pub temperature: Option<f64>,
    pub power_watts: Option<f64>,
    pub shares_accepted: Option<i64>,
    pub shares_rejected: Option<i64>,
    pub pool_in_use: Option<String>,
    /// Opaque per-family extras (best share string, uptime, work utility, …).
    pub data: HashMap<String, serde_json::Value>,
}

impl Telemetry {
    /// §8 invariant 3: GH/s telemetry must never carry a negative hashrate.
    pub fn is_valid(&self) -> bool {
        if self.hashrate_unit == HashrateUnit::GhPerSec {
            self.hashrate >= 0.0
        } else {
            true
        }
    }
}
