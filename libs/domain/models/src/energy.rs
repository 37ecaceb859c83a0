// [libs/domain/models/src/energy.rs]
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single 30-minute tariff slot. `valid_to` is always `valid_from + 30m`
/// (§8 invariant 1); slots for the same `(region, valid_from)` are
/// deduplicated on insert (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyPrice {
    pub region: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub price_pence: f64,
}

impl EnergyPrice {
    pub const SLOT_MINUTES: i64 = 30;

    pub fn new(region: impl Into<String>, valid_from: DateTime<Utc>, price_pence: f64) -> Self {
        Self {
            region: region.into(),
            valid_from,
            valid_to: valid_from + Duration::minutes(Self::SLOT_MINUTES),
            price_pence,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && at < self.valid_to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_is_exactly_thirty_minutes() {
        let from = Utc::now();
        let p = EnergyPrice::new("H", from, 12.3);
        assert_eq!(p.valid_to - p.valid_from, Duration::minutes(30));
    }
}
