// [libs/domain/strategy/src/lib.rs]
//! The Agile Solo state machine, pool-strategy engine, and automation-rule
//! engine (§4.5–§4.8). Pure functions over the data model plus the
//! `MinerAdapter` trait object (from `fleet_models`) for the device calls
//! they must make — no direct wire-protocol code lives here.

pub mod agile;
pub mod automation;
pub mod errors;
pub mod pool_strategy;
pub mod solopool;

pub use agile::AgileEngine;
pub use automation::AutomationEngine;
pub use errors::StrategyError;
pub use pool_strategy::PoolStrategyEngine;
