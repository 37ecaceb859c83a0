// [libs/domain/models/src/miner.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The miner families the adapter layer knows how to drive. See
/// `fleet_adapters` for the concrete driver behind each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinerFamily {
    /// Fixed-slot cgminer-API ASIC (stratum+tcp JSON RPC over TCP).
    AvalonNano,
    /// Free-pool HTTP ASIC family.
    Bitaxe,
    /// Free-pool HTTP ASIC family, same firmware lineage as Bitaxe.
    NerdQaxe,
    /// Passive, self-reporting UDP family.
    NMMiner,
    /// CPU miner, JSON over HTTP.
    XMRig,
}

impl MinerFamily {
    /// True for families whose pool slots are a fixed, pre-existing set that
    /// cannot be programmatically extended (§4.1, §6).
    pub fn is_fixed_slot(self) -> bool {
        matches!(self, MinerFamily::AvalonNano)
    }

    /// True for families that only ever speak by broadcasting UDP frames —
    /// the ingest loop never polls them directly (§4.2).
    pub fn is_passive(self) -> bool {
        matches!(self, MinerFamily::NMMiner)
    }

    pub fn default_port(self) -> u16 {
        match self {
            MinerFamily::AvalonNano => 4028,
            MinerFamily::Bitaxe | MinerFamily::NerdQaxe => 80,
            MinerFamily::NMMiner => 8266,
            MinerFamily::XMRig => 16000,
        }
    }

    /// Stable storage representation. Deliberately separate from the
    /// `#[serde(rename_all = "snake_case")]` wire form above (which mangles
    /// `NMMiner`/`XMRig` into `n_m_miner`/`x_m_rig`) — the store column wants
    /// something a human reads in a SQL shell without wincing.
    pub fn as_db_str(self) -> &'static str {
        match self {
            MinerFamily::AvalonNano => "avalon_nano",
            MinerFamily::Bitaxe => "bitaxe",
            MinerFamily::NerdQaxe => "nerdqaxe",
            MinerFamily::NMMiner => "nmminer",
            MinerFamily::XMRig => "xmrig",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "avalon_nano" => Some(MinerFamily::AvalonNano),
            "bitaxe" => Some(MinerFamily::Bitaxe),
            "nerdqaxe" => Some(MinerFamily::NerdQaxe),
            "nmminer" => Some(MinerFamily::NMMiner),
            "xmrig" => Some(MinerFamily::XMRig),
            _ => None,
        }
    }
}

/// A single managed device. Created and deleted only by the operator;
/// `current_mode` is written by `SetMode`, the Agile Solo strategy, or
/// telemetry auto-detect — but never by auto-detect while the miner is
/// enrolled in Agile Solo (see `MinerStrategy`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Miner {
    pub id: i64,
    pub name: String,
    pub family: MinerFamily,
    pub host: String,
    pub port: Option<u16>,
    pub current_mode: Option<String>,
    pub firmware_version: Option<String>,
    pub manual_power_watts: Option<f64>,
    pub enabled: bool,
    /// Opaque, per-family configuration blob (credentials, UDP config port
    /// overrides, …). Decoded by the consumer that knows the family.
    pub config: HashMap<String, serde_json::Value>,
    pub last_mode_change: Option<DateTime<Utc>>,
}

impl Miner {
    /// The port to dial: the operator-supplied override, or the family default.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.family.default_port())
    }
}
