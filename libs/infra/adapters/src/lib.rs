// [libs/infra/adapters/src/lib.rs]
//! One driver per miner family (§4.1, §6), all behind the `MinerAdapter`
//! capability interface defined in `fleet_models`. `factory::build_adapter`
//! is the single dispatch point from a `Miner` row to a concrete driver.

pub mod cgminer_wire;
pub mod factory;
pub mod families;

pub use factory::build_adapter;
pub use families::{AvalonNanoAdapter, FreeHttpAdapter, NmMinerAdapter, PassiveRegistry, TelemetryCache, XmrigAdapter};
