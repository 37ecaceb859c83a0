// [libs/domain/strategy/src/agile.rs]
//! The Agile Solo state machine (§4.5): band selection with look-ahead
//! hysteresis, validation gates, and application to enrolled miners.

use crate::errors::StrategyError;
use chrono::Utc;
use fleet_models::{AgileStrategyBand, MinerAdapter, PoolTarget};
use fleet_store::repositories::AgileStrategyRepository;
use fleet_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Pure band-selection rule (§4.5). `current` is the previously selected
/// band (`None` on the very first tick — the current price is accepted
/// unconditionally to establish a starting state). Returns the band that
/// should be in force after this tick.
pub fn select_band<'a>(
    bands: &'a [AgileStrategyBand],
    current: Option<&'a AgileStrategyBand>,
    current_price: f64,
    next_price: Option<f64>,
) -> Option<&'a AgileStrategyBand> {
    let candidate = bands.iter().find(|b| b.covers(current_price))?;

    let current = match current {
        None => return Some(candidate),
        Some(c) => c,
    };

    if candidate.is_off() {
        return Some(candidate);
    }

    if candidate.sort_order > current.sort_order {
        // Upgrade: require the next slot to confirm at least as good a band.
        let confirmed = next_price
            .and_then(|p| bands.iter().find(|b| b.covers(p)))
            .map(|next_band| next_band.sort_order >= candidate.sort_order)
            .unwrap_or(false);
        return Some(if confirmed { candidate } else { current });
    }

    if candidate.sort_order < current.sort_order {
        return Some(candidate);
    }

    Some(current)
}

#[derive(Debug, Clone)]
pub struct MinerOutcome {
    pub miner_id: i64,
    pub skipped: bool,
    pub switched: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AgileTickReport {
    pub transitioned: bool,
    pub band_sort_order: Option<i32>,
    pub target_coin: Option<String>,
    pub miner_outcomes: Vec<MinerOutcome>,
}

pub struct AgileEngine {
    store: Store,
}

impl AgileEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Checks the invariant that every non-OFF band's coin has a matching,
    /// enabled solo pool — either by pool name or by `solopool::is_solopool_pool`.
    /// Disables the strategy and records an audit entry on violation (§4.5).
    async fn validate_bands(&self, bands: &[AgileStrategyBand]) -> Result<bool, StrategyError> {
        let pool_repo = fleet_store::repositories::PoolRepository::new(self.store.clone());
        let audit_repo = fleet_store::repositories::AuditRepository::new(self.store.clone());
        let agile_repo = AgileStrategyRepository::new(self.store.clone());
        let pools = pool_repo.list_enabled().await?;

        for band in bands.iter().filter(|b| !b.is_off()) {
            let has_pool = pools.iter().any(|p| {
                p.name.eq_ignore_ascii_case(&band.target_coin)
                    || crate::solopool::is_solopool_pool(&p.host, p.port, &band.target_coin)
            });
            if !has_pool {
                warn!(coin = %band.target_coin, "agile solo: no solo pool for band coin, disabling strategy");
                agile_repo.disable().await?;
                audit_repo
                    .log_audit(
                        "agile-solo",
                        "disable",
                        "agile_strategy",
                        Some(1),
                        None,
                        Some(serde_json::json!({ "missing_coin": band.target_coin })),
                        "failed",
                        Some("no matching solo pool for a configured band"),
                    )
                    .await?;
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The band identified by the strategy's `current_price_band` field,
    /// which stores the band's `sort_order` (not its coin — coins are not
    /// guaranteed unique across bands, see `DESIGN.md`).
    fn resolve_current_band<'a>(
        bands: &'a [AgileStrategyBand],
        current_price_band: &Option<String>,
    ) -> Option<&'a AgileStrategyBand> {
        let sort_order: i32 = current_price_band.as_ref()?.parse().ok()?;
        bands.iter().find(|b| b.sort_order == sort_order)
    }

    #[instrument(skip(self, adapters))]
    pub async fn run_tick(
        &self,
        region: &str,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> Result<AgileTickReport, StrategyError> {
        let agile_repo = AgileStrategyRepository::new(self.store.clone());
        let mut strategy = agile_repo.get_singleton().await?;
        if !strategy.enabled {
            return Ok(AgileTickReport {
                transitioned: false,
                band_sort_order: None,
                target_coin: None,
                miner_outcomes: vec![],
            });
        }

        let bands = agile_repo.list_bands().await?;
        if bands.is_empty() || !self.validate_bands(&bands).await? {
            return Err(StrategyError::InvariantViolation);
        }

        let energy_repo = fleet_store::repositories::EnergyPriceRepository::new(self.store.clone());
        let now = Utc::now();
        let current_price = energy_repo
            .get_current_price(region)
            .await?
            .ok_or_else(|| StrategyError::NoPriceData(region.to_string()))?;
        let next_price = energy_repo.get_next_price(region, current_price.valid_to).await?;

        let current_band = Self::resolve_current_band(&bands, &strategy.current_price_band);
        let target = select_band(
            &bands,
            current_band,
            current_price.price_pence,
            next_price.map(|p| p.price_pence),
        )
        .ok_or(StrategyError::NoCoveringBand(current_price.price_pence))?;

        let transitioned = current_band.map(|b| b.id) != Some(target.id);
        let mut outcomes = Vec::new();

        if transitioned {
            info!(sort_order = target.sort_order, coin = %target.target_coin, "agile solo band transition");
            if target.is_off() {
                info!("agile solo: OFF band selected, shutdown is delegated externally");
            } else {
                outcomes = self.apply_band(target, adapters).await?;
            }
            strategy.last_action_time = Some(now);
        }

        strategy.current_price_band = Some(target.sort_order.to_string());
        strategy.last_price_checked = Some(current_price.price_pence);
        strategy.hysteresis_counter = 0;
        agile_repo.save(&strategy).await?;

        Ok(AgileTickReport {
            transitioned,
            band_sort_order: Some(target.sort_order),
            target_coin: Some(target.target_coin.clone()),
            miner_outcomes: outcomes,
        })
    }

    async fn apply_band(
        &self,
        band: &AgileStrategyBand,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> Result<Vec<MinerOutcome>, StrategyError> {
        let agile_repo = AgileStrategyRepository::new(self.store.clone());
        let miner_repo = fleet_store::repositories::MinerRepository::new(self.store.clone());
        let pool_repo = fleet_store::repositories::PoolRepository::new(self.store.clone());
        let telemetry_repo = fleet_store::repositories::TelemetryRepository::new(self.store.clone());

        let pools = pool_repo.list_enabled().await?;
        let solo_pool = pools.iter().find(|p| p.name.eq_ignore_ascii_case(&band.target_coin));

        let mut outcomes = Vec::new();
        for miner_id in agile_repo.list_enrolled_miner_ids().await? {
            outcomes.push(self.apply_to_miner(miner_id, band, solo_pool, &miner_repo, &telemetry_repo, adapters).await);
        }
        Ok(outcomes)
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_to_miner(
        &self,
        miner_id: i64,
        band: &AgileStrategyBand,
        solo_pool: Option<&fleet_models::Pool>,
        miner_repo: &fleet_store::repositories::MinerRepository,
        telemetry_repo: &fleet_store::repositories::TelemetryRepository,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> MinerOutcome {
        let miner = match miner_repo.get(miner_id).await {
            Ok(m) => m,
            Err(e) => {
                return MinerOutcome { miner_id, skipped: false, switched: false, error: Some(e.to_string()) }
            }
        };

        let target_mode = match band.target_mode_for(miner.family) {
            Some(m) if !m.is_managed_externally() => m.as_mode_str().unwrap_or_default().to_string(),
            _ => return MinerOutcome { miner_id, skipped: true, switched: false, error: None },
        };

        let Some(pool) = solo_pool else {
            return MinerOutcome {
                miner_id,
                skipped: false,
                switched: false,
                error: Some(format!("no solo pool available for {}", band.target_coin)),
            };
        };

        let already_on_mode = miner.current_mode.as_deref() == Some(target_mode.as_str());
        let already_on_pool = telemetry_repo
            .latest_for_miner(miner_id)
            .await
            .ok()
            .flatten()
            .and_then(|t| t.pool_in_use)
            .map(|observed| fleet_models::pool::normalize_pool_url(&observed) == pool.normalized_url())
            .unwrap_or(false);

        if already_on_mode && already_on_pool {
            return MinerOutcome { miner_id, skipped: true, switched: false, error: None };
        }

        let Some(adapter) = adapters.get(&miner_id) else {
            return MinerOutcome {
                miner_id,
                skipped: false,
                switched: false,
                error: Some("no adapter available".to_string()),
            };
        };

        let target = PoolTarget {
            host: pool.host.clone(),
            port: pool.port,
            user: pool.user.clone(),
            password: pool.password.clone(),
        };
        if let Err(e) = adapter.switch_pool(&target).await {
            return MinerOutcome { miner_id, skipped: false, switched: false, error: Some(e.to_string()) };
        }
        if let Err(e) = adapter.set_mode(&target_mode).await {
            return MinerOutcome { miner_id, skipped: false, switched: false, error: Some(e.to_string()) };
        }
        if let Err(e) = miner_repo.set_current_mode(miner_id, &target_mode, Utc::now()).await {
            warn!(miner_id, error = %e, "agile solo: mode applied on device but store write failed");
        }
        MinerOutcome { miner_id, skipped: false, switched: true, error: None }
    }

    /// §4.5 reconciliation: re-derive the intended band straight from the
    /// current price (ignoring stored state, so manual band edits take
    /// effect) and re-apply mode on drift. Pool URL drift is not touched
    /// here — pool switches are authoritative only at execution time.
    #[instrument(skip(self, adapters))]
    pub async fn run_reconciliation(
        &self,
        region: &str,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> Result<usize, StrategyError> {
        let agile_repo = AgileStrategyRepository::new(self.store.clone());
        let strategy = agile_repo.get_singleton().await?;
        if !strategy.enabled {
            return Ok(0);
        }
        let bands = agile_repo.list_bands().await?;
        let energy_repo = fleet_store::repositories::EnergyPriceRepository::new(self.store.clone());
        let Some(current_price) = energy_repo.get_current_price(region).await? else {
            return Ok(0);
        };
        let Some(band) = bands.iter().find(|b| b.covers(current_price.price_pence)) else {
            return Ok(0);
        };
        if band.is_off() {
            return Ok(0);
        }

        let miner_repo = fleet_store::repositories::MinerRepository::new(self.store.clone());
        let mut reconciled = 0;
        for miner_id in agile_repo.list_enrolled_miner_ids().await? {
            let Ok(miner) = miner_repo.get(miner_id).await else { continue };
            let Some(target_mode) = band.target_mode_for(miner.family) else { continue };
            if target_mode.is_managed_externally() {
                continue;
            }
            let mode_str = target_mode.as_mode_str().unwrap_or_default();
            if miner.current_mode.as_deref() == Some(mode_str) {
                continue;
            }
            let Some(adapter) = adapters.get(&miner_id) else { continue };
            if adapter.set_mode(mode_str).await.is_ok() {
                let _ = miner_repo.set_current_mode(miner_id, mode_str, Utc::now()).await;
                reconciled += 1;
            }
        }
        Ok(reconciled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_models::TargetMode;

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

    fn bands() -> Vec<AgileStrategyBand> {
        vec![
            band(0, Some(30.0), None, "OFF"),
            band(1, Some(15.0), Some(30.0), "DGB"),
            band(2, Some(8.0), Some(15.0), "BCH"),
            band(3, None, Some(8.0), "BTC"),
        ]
    }

    #[test]
    fn downgrade_under_price_spike_is_immediate() {
        let bands = bands();
        let current = bands.iter().find(|b| b.target_coin == "BTC").unwrap();
        let target = select_band(&bands, Some(current), 18.0, Some(17.0)).unwrap();
        assert_eq!(target.target_coin, "DGB");
    }

    #[test]
    fn unconfirmed_upgrade_is_blocked() {
        let bands = bands();
        let current = bands.iter().find(|b| b.target_coin == "DGB").unwrap();
        let target = select_band(&bands, Some(current), 12.0, Some(18.0)).unwrap();
        assert_eq!(target.target_coin, "DGB");
    }

    #[test]
    fn confirmed_upgrade_transitions() {
        let bands = bands();
        let current = bands.iter().find(|b| b.target_coin == "DGB").unwrap();
        let target = select_band(&bands, Some(current), 12.0, Some(11.0)).unwrap();
        assert_eq!(target.target_coin, "BCH");
    }

    #[test]
    fn off_band_is_always_immediate() {
        let bands = bands();
        let current = bands.iter().find(|b| b.target_coin == "BCH").unwrap();
        let target = select_band(&bands, Some(current), 32.0, Some(6.0)).unwrap();
        assert_eq!(target.target_coin, "OFF");
    }

    #[test]
    fn equal_band_stays() {
        let bands = bands();
        let current = bands.iter().find(|b| b.target_coin == "BCH").unwrap();
        let target = select_band(&bands, Some(current), 10.0, Some(10.0)).unwrap();
        assert_eq!(target.target_coin, "BCH");
    }
}
