// [libs/domain/models/src/tracking.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A snapshot of a session-best share, append-only; top 30 per miner
/// retained (§3, §8 invariant 6), purged globally past 180 days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighDiffShare {
    pub id: i64,
    pub miner_id: i64,
    pub coin: String,
    pub pool_name: String,
    pub difficulty: f64,
    pub network_difficulty: Option<f64>,
    pub hashrate: f64,
    pub mode: Option<String>,
    pub was_block_solve: bool,
    pub timestamp: DateTime<Utc>,
}

impl HighDiffShare {
    /// §8 invariant 4: whenever both difficulties are known and the share
    /// met or beat the network target, it must be flagged as a block solve.
    pub fn expected_block_solve(&self) -> bool {
        match self.network_difficulty {
            Some(network) => self.difficulty >= network,
            None => false,
        }
    }
}

/// Permanent record of a solved block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockFound {
    pub id: i64,
    pub miner_id: i64,
    pub coin: String,
    pub pool_name: String,
    pub difficulty: f64,
    pub network_difficulty: f64,
    pub timestamp: DateTime<Utc>,
}

/// Append-only pool reachability/health snapshot (§4.4), retained 30 days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolHealth {
    pub pool_id: i64,
    pub timestamp: DateTime<Utc>,
    pub is_reachable: bool,
    pub response_time_ms: Option<u64>,
    pub reject_rate: f64,
    pub shares_accepted: i64,
    pub shares_rejected: i64,
    pub health_score: u8,
    pub luck_percentage: Option<f64>,
    pub error_message: Option<String>,
}

/// Hourly per-miner composite health score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthScore {
    pub miner_id: i64,
    pub timestamp: DateTime<Utc>,
    pub overall_score: u8,
    pub sub_scores: std::collections::HashMap<String, u8>,
}
