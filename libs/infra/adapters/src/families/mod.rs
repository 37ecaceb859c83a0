// [libs/infra/adapters/src/families/mod.rs]
pub mod avalon_nano;
pub mod free_http;
pub mod nmminer;
pub mod xmrig;

pub use avalon_nano::AvalonNanoAdapter;
pub use free_http::FreeHttpAdapter;
pub use nmminer::{NmMinerAdapter, PassiveRegistry, TelemetryCache};
pub use xmrig::XmrigAdapter;
