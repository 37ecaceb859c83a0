// [libs/domain/models/src/pool.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured mining pool endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub id: i64,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub enabled: bool,
    pub priority: i32,
    /// Marked stale rather than cleared when a refresh fails, so the last
    /// known value stays visible while a fetch backlog clears.
    pub network_difficulty: Option<f64>,
    pub network_difficulty_stale: bool,
    pub best_share: Option<f64>,
}

impl Pool {
    pub fn host_port(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    /// `host:port` normalised the way reconciliation compares observed vs.
    /// intended pool URLs (§4.8): strip protocol, trailing slash, lowercase.
    pub fn normalized_url(&self) -> String {
        normalize_pool_url(&format!("{}:{}", self.host, self.port))
    }
}

/// Strip scheme, trailing slash, and case so two differently-formatted pool
/// URLs can be compared for equality. Grounded on the same normalisation the
/// reconciliation loop needs before diffing observed vs. expected pool (§4.8).
pub fn normalize_pool_url(raw: &str) -> String {
    let mut s = raw.trim().to_ascii_lowercase();
    for scheme in ["stratum+tcp://", "stratum+ssl://", "http://", "https://"] {
        if let Some(rest) = s.strip_prefix(scheme) {
            s = rest.to_string();
            break;
        }
    }
    s.trim_end_matches('/').to_string()
}

/// A pool slot as reported by a fixed-slot family device. Rewritten in
/// place by the pool-slot sync job (§2 item 6); exists only for families
/// where `MinerFamily::is_fixed_slot()` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerPoolSlot {
    pub miner_id: i64,
    pub slot_number: i32,
    pub pool_id: Option<i64>,
    pub pool_url: String,
    pub pool_port: u16,
    pub pool_user: String,
    pub is_active: bool,
    pub last_seen: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_scheme_case_and_trailing_slash() {
        assert_eq!(
            normalize_pool_url("Stratum+TCP://Eu3.Solopool.org:8005/"),
            "eu3.solopool.org:8005"
        );
        assert_eq!(normalize_pool_url("eu3.solopool.org:8005"), "eu3.solopool.org:8005");
    }
}
