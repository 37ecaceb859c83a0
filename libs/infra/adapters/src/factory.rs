// [libs/infra/adapters/src/factory.rs]
//! Builds the right driver for a `Miner` row (§4.1, §9: "dispatch table is
//! built at process start from the miner list").

use crate::families::{AvalonNanoAdapter, FreeHttpAdapter, NmMinerAdapter, TelemetryCache, XmrigAdapter};
use fleet_models::{Miner, MinerAdapter, MinerFamily};
use std::sync::Arc;

pub fn build_adapter(miner: &Miner, passive_cache: &TelemetryCache) -> Arc<dyn MinerAdapter> {
    let host = miner.host.clone();
    let port = miner.effective_port();

    match miner.family {
        MinerFamily::AvalonNano => Arc::new(AvalonNanoAdapter::new(host, port)),
        MinerFamily::Bitaxe | MinerFamily::NerdQaxe => {
            let modes = miner
                .config
                .get("modes")
                .and_then(|v| v.as_object())
                .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default();
            Arc::new(FreeHttpAdapter::new(miner.family, host, port, modes))
        }
        MinerFamily::NMMiner => Arc::new(NmMinerAdapter::new(miner.id, host, passive_cache.clone())),
        MinerFamily::XMRig => {
            let access_token = miner.config.get("access_token").and_then(|v| v.as_str()).map(str::to_string);
            Arc::new(XmrigAdapter::new(host, port, access_token))
        }
    }
}
