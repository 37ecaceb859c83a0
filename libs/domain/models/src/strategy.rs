// [libs/domain/models/src/strategy.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A per-family mode target on an `AgileStrategyBand`. The `ManagedExternally`
/// sentinel means "skip mode changes for this family on this band" — another
/// controller (operator or external automation) owns that family's mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    Mode(String),
    ManagedExternally,
}

impl TargetMode {
    pub fn is_managed_externally(&self) -> bool {
        matches!(self, TargetMode::ManagedExternally)
    }

    pub fn as_mode_str(&self) -> Option<&str> {
        match self {
            TargetMode::Mode(m) => Some(m.as_str()),
            TargetMode::ManagedExternally => None,
        }
    }

    /// Storage form: the literal mode string, or the `"managed_externally"`
    /// sentinel — kept distinct from any real firmware mode name.
    pub fn to_db_str(&self) -> String {
        match self {
            TargetMode::Mode(m) => m.clone(),
            TargetMode::ManagedExternally => "managed_externally".to_string(),
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        if s == "managed_externally" {
            TargetMode::ManagedExternally
        } else {
            TargetMode::Mode(s.to_string())
        }
    }
}

/// Singleton state-machine row for the Agile Solo strategy (§3, §4.5). The
/// `hysteresis_counter` column is reserved: the shipped selection algorithm
/// relies entirely on look-ahead confirmation and always writes 0 here
/// (see `SPEC_FULL.md` / `DESIGN.md` for the open-question rationale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgileStrategy {
    pub id: i64,
    pub enabled: bool,
    /// The `target_coin` of the currently selected band, or `None` before
    /// the first tick has run.
    pub current_price_band: Option<String>,
    pub hysteresis_counter: i32,
    pub last_action_time: Option<DateTime<Utc>>,
    pub last_price_checked: Option<f64>,
    pub state_data: HashMap<String, serde_json::Value>,
}

/// An ordered price band. Bands for one strategy are ordered by `sort_order`
/// ascending, ties forbidden, 0..N-1 contiguous (§8 invariant 2). Sort_order
/// 0 is always the OFF / worst band; higher sort_order is a cheaper/better
/// band. `target_coin` is either the literal string `"OFF"` or a coin symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgileStrategyBand {
    pub id: i64,
    pub strategy_id: i64,
    pub sort_order: i32,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub target_coin: String,
    pub avalon_nano_mode: TargetMode,
    pub bitaxe_mode: TargetMode,
    pub nerdqaxe_mode: TargetMode,
}

pub const OFF_COIN: &str = "OFF";

impl AgileStrategyBand {
    pub fn is_off(&self) -> bool {
        self.target_coin == OFF_COIN
    }

    /// `[min_price, max_price)` interval match with open-ended nulls (§4.5).
    pub fn covers(&self, price: f64) -> bool {
        let above_min = self.min_price.map_or(true, |m| price >= m);
        let below_max = self.max_price.map_or(true, |m| price < m);
        above_min && below_max
    }

    pub fn target_mode_for(&self, family: crate::MinerFamily) -> Option<&TargetMode> {
        use crate::MinerFamily::*;
        match family {
            AvalonNano => Some(&self.avalon_nano_mode),
            Bitaxe => Some(&self.bitaxe_mode),
            NerdQaxe => Some(&self.nerdqaxe_mode),
            // NMMiner has no configurable modes; XMRig is not targeted by
            // Agile Solo in the shipped band schema.
            NMMiner | XMRig => None,
        }
    }
}

/// Enrolment of a miner in the Agile Solo strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerStrategy {
    pub miner_id: i64,
    pub strategy_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    RoundRobin,
    LoadBalance,
    ProMode,
}

/// A generic pool-reassignment strategy (§4.6). `miner_ids` empty means "all
/// enabled miners". `config` is decoded per `strategy_type` by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStrategy {
    pub id: i64,
    pub name: String,
    pub strategy_type: StrategyType,
    pub enabled: bool,
    pub pool_ids: Vec<i64>,
    pub miner_ids: Vec<i64>,
    pub config: serde_json::Value,
    pub current_pool_index: i32,
    pub last_switch: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    PriceThreshold,
    TimeWindow,
    MinerOffline,
    MinerOverheat,
    PoolFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ApplyMode,
    SwitchPool,
    SendAlert,
    LogEvent,
}

/// A single trigger/action automation rule (§4.7). Rules are evaluated
/// ascending by `priority`; `last_execution_context` holds whatever the
/// rule's trigger needs for its own idempotency check (e.g. the price-row id
/// it already acted on).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
    pub trigger_type: TriggerType,
    pub trigger_config: serde_json::Value,
    pub action_type: ActionType,
    pub action_config: serde_json::Value,
    pub priority: i32,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub last_execution_context: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(sort_order: i32, min: Option<f64>, max: Option<f64>, coin: &str) -> AgileStrategyBand {
        AgileStrategyBand {
            id: sort_order as i64,
            strategy_id: 1,
            sort_order,
            min_price: min,
            max_price: max,
            target_coin: coin.to_string(),
            avalon_nano_mode: TargetMode::Mode("low".into()),
            bitaxe_mode: TargetMode::Mode("low".into()),
            nerdqaxe_mode: TargetMode::Mode("low".into()),
        }
    }

    #[test]
    fn covers_is_half_open_with_nullable_ends() {
        let b = band(1, Some(8.0), Some(15.0), "BCH");
        assert!(!b.covers(7.99));
        assert!(b.covers(8.0));
        assert!(b.covers(14.99));
        assert!(!b.covers(15.0));

        let off = band(0, Some(30.0), None, "OFF");
        assert!(off.covers(30.0));
        assert!(off.covers(1000.0));
        assert!(!off.covers(29.99));
    }
}
