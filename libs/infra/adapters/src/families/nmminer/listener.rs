// [libs/infra/adapters/src/families/nmminer/listener.rs]
//! The passive UDP listener (§4.2): binds the fixed telemetry port once,
//! and for every inbound datagram looks the source IP up in the shared
//! registry and deposits the parsed frame into the shared telemetry cache.

use super::frame::{declared_ip, parse_frame};
use super::registry::PassiveRegistry;
use super::TelemetryCache;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

pub async fn run(bind_addr: SocketAddr, registry: PassiveRegistry, cache: TelemetryCache) -> std::io::Result<()> {
    let socket = UdpSocket::bind(bind_addr).await?;
    let mut buf = vec![0u8; 4096];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "nmminer listener: recv_from failed");
                continue;
            }
        };
        let raw: serde_json::Value = match serde_json::from_slice(&buf[..len]) {
            Ok(v) => v,
            Err(e) => {
                warn!(ip = %peer.ip(), error = %e, "nmminer listener: malformed frame");
                continue;
            }
        };
        // Prefer the miner's self-declared IP (§4.2 step 1) — the UDP
        // source address can be NATted — falling back to the packet's
        // source address when the frame doesn't carry one.
        let resolved_ip = declared_ip(&raw).unwrap_or_else(|| peer.ip());
        let Some(miner_id) = registry.miner_for(resolved_ip).await else {
            debug!(ip = %resolved_ip, source = %peer.ip(), "nmminer listener: frame from unregistered IP, dropping");
            continue;
        };
        match parse_frame(&raw) {
            Ok(telemetry) => cache.write().await.insert(miner_id, telemetry),
            Err(e) => {
                warn!(ip = %resolved_ip, error = %e, "nmminer listener: frame parse failed");
                continue;
            }
        };
    }
}
