// [libs/domain/strategy/src/errors.rs]
use fleet_models::AdapterError;
use fleet_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no price data available for region {0}")]
    NoPriceData(String),
    #[error("band set is empty or missing a required solo pool — strategy disabled")]
    InvariantViolation,
    #[error("no band covers price {0}p — band set has a gap in its price coverage")]
    NoCoveringBand(f64),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}
