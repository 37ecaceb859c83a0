// [libs/domain/models/src/lib.rs]
//! Data model hub: the record shapes every other stratum of the fleet
//! controller reads and writes. No I/O lives here — see `fleet_store` for
//! persistence and `fleet_adapters` for the device-facing wire formats.

pub mod adapter;
pub mod audit;
pub mod energy;
pub mod event;
pub mod miner;
pub mod pool;
pub mod strategy;
pub mod telemetry;
pub mod tracking;

pub use adapter::{AdapterError, MinerAdapter, PoolSlotInfo, PoolTarget, RawTelemetry};
pub use audit::AuditLog;
pub use energy::EnergyPrice;
pub use event::{Event, EventType};
pub use miner::{Miner, MinerFamily};
pub use pool::{MinerPoolSlot, Pool};
pub use strategy::{
    AgileStrategy, AgileStrategyBand, AutomationRule, MinerStrategy, PoolStrategy,
    StrategyType, TargetMode,
};
pub use telemetry::{HashrateUnit, Telemetry};
pub use tracking::{BlockFound, HealthScore, HighDiffShare, PoolHealth};
