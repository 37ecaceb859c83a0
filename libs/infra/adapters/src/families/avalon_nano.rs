// [libs/infra/adapters/src/families/avalon_nano.rs]
//! Driver for the fixed-slot cgminer-API family (§4.1, §6). Pool switches
//! only ever select among the device's three existing slots — rewriting a
//! slot's URL is never attempted (§3 `MinerPoolSlot`).

use crate::cgminer_wire::{extract_bracketed, send_command};
use async_trait::async_trait;
use chrono::Utc;
use fleet_models::{AdapterError, HashrateUnit, MinerAdapter, MinerFamily, PoolSlotInfo, PoolTarget, RawTelemetry};
use std::collections::HashMap;
use tracing::{instrument, warn};

const MODES: [&str; 3] = ["low", "normal", "high"];

pub struct AvalonNanoAdapter {
    host: String,
    port: u16,
}

impl AvalonNanoAdapter {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    fn mode_from_code(code: &str) -> Option<&'static str> {
        match code.trim() {
            "0" => Some("low"),
            "1" => Some("normal"),
            "2" => Some("high"),
            _ => None,
        }
    }

    fn code_from_mode(mode: &str) -> Option<&'static str> {
        match mode {
            "low" => Some("0"),
            "normal" => Some("1"),
            "high" => Some("2"),
            _ => None,
        }
    }

    /// Coarse mode inferred from reported frequency when `estats` doesn't
    /// carry a `WORKMODE` token — the original firmware omits it on some
    /// revisions.
    fn mode_from_frequency(freq_mhz: f64) -> &'static str {
        if freq_mhz < 400.0 {
            "low"
        } else if freq_mhz < 600.0 {
            "normal"
        } else {
            "high"
        }
    }

    async fn mm_id0_string(&self) -> Result<String, AdapterError> {
        let estats = send_command(&self.host, self.port, "estats", "").await?;
        estats
            .get("STATS")
            .and_then(|s| s.as_array())
            .and_then(|arr| arr.iter().find_map(|v| v.get("MM ID0")))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| AdapterError::Decode("estats response missing MM ID0".into()))
    }

    async fn find_slot_for(&self, host: &str, port: u16) -> Result<u8, AdapterError> {
        let pools = send_command(&self.host, self.port, "pools", "").await?;
        let entries = pools
            .get("POOLS")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AdapterError::Decode("pools response missing POOLS array".into()))?;
        for entry in entries {
            let url = entry.get("URL").and_then(|v| v.as_str()).unwrap_or_default();
            if url.contains(host) && url.contains(&port.to_string()) {
                let slot = entry.get("POOL").and_then(|v| v.as_u64()).unwrap_or(0);
                return Ok(slot as u8);
            }
        }
        Err(AdapterError::PoolNotInSlots { host: host.to_string(), port })
    }
}

#[async_trait]
impl MinerAdapter for AvalonNanoAdapter {
    fn family(&self) -> MinerFamily {
        MinerFamily::AvalonNano
    }

    #[instrument(skip(self), fields(host = %self.host))]
    async fn get_telemetry(&self) -> Result<RawTelemetry, AdapterError> {
        let summary = send_command(&self.host, self.port, "summary", "").await?;
        let entry = summary
            .get("SUMMARY")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .ok_or_else(|| AdapterError::Decode("summary response missing SUMMARY[0]".into()))?;

        let hashrate = entry.get("MHS 5s").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let shares_accepted = entry.get("Accepted").and_then(|v| v.as_i64());
        let shares_rejected = entry.get("Rejected").and_then(|v| v.as_i64());

        let mm = self.mm_id0_string().await.ok();
        let temperature = mm.as_deref().and_then(|s| extract_bracketed(s, "TAvg")).and_then(|v| v.parse().ok());
        let power_watts = mm.as_deref().and_then(|s| extract_bracketed(s, "MPO")).and_then(|v| v.parse().ok());
        let detected_mode = mm
            .as_deref()
            .and_then(|s| extract_bracketed(s, "WORKMODE"))
            .and_then(Self::mode_from_code)
            .map(str::to_string);

        let best_share = entry
            .get("Best Share")
            .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_f64().map(|f| f.to_string())));

        let pools = send_command(&self.host, self.port, "pools", "").await.ok();
        let pool_in_use = pools
            .as_ref()
            .and_then(|p| p.get("POOLS"))
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.iter().find(|e| e.get("Stratum Active").and_then(|v| v.as_bool()) == Some(true)))
            .and_then(|e| e.get("URL"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(RawTelemetry {
            timestamp: Utc::now(),
            hashrate,
            hashrate_unit: HashrateUnit::MhPerSec,
            temperature,
            power_watts,
            shares_accepted,
            shares_rejected,
            pool_in_use,
            detected_mode,
            firmware_version: None,
            best_share,
            data: HashMap::new(),
        })
    }

    async fn get_mode(&self) -> Result<Option<String>, AdapterError> {
        let mm = self.mm_id0_string().await?;
        if let Some(code) = extract_bracketed(&mm, "WORKMODE").and_then(Self::mode_from_code) {
            return Ok(Some(code.to_string()));
        }
        if let Some(freq) = extract_bracketed(&mm, "Freq").and_then(|v| v.parse::<f64>().ok()) {
            warn!("avalon nano: WORKMODE absent, inferring mode from frequency");
            return Ok(Some(Self::mode_from_frequency(freq).to_string()));
        }
        Ok(None)
    }

    async fn set_mode(&self, mode: &str) -> Result<(), AdapterError> {
        let code = Self::code_from_mode(mode).ok_or(AdapterError::Unsupported)?;
        send_command(&self.host, self.port, "ascset", &format!("0,workmode,set,{code}")).await?;
        Ok(())
    }

    async fn get_available_modes(&self) -> Result<Vec<String>, AdapterError> {
        Ok(MODES.iter().map(|s| s.to_string()).collect())
    }

    #[instrument(skip(self, target), fields(host = %self.host))]
    async fn switch_pool(&self, target: &PoolTarget) -> Result<(), AdapterError> {
        let slot = self.find_slot_for(&target.host, target.port).await?;
        send_command(&self.host, self.port, "switchpool", &slot.to_string()).await?;
        send_command(&self.host, self.port, "enablepool", &slot.to_string()).await?;
        Ok(())
    }

    async fn restart(&self) -> Result<(), AdapterError> {
        send_command(&self.host, self.port, "restart", "").await?;
        Ok(())
    }

    async fn is_online(&self) -> Result<bool, AdapterError> {
        Ok(send_command(&self.host, self.port, "summary", "").await.is_ok())
    }

    #[instrument(skip(self), fields(host = %self.host))]
    async fn list_pool_slots(&self) -> Result<Vec<PoolSlotInfo>, AdapterError> {
        let pools = send_command(&self.host, self.port, "pools", "").await?;
        let entries = pools
            .get("POOLS")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AdapterError::Decode("pools response missing POOLS array".into()))?;

        let mut slots = Vec::with_capacity(entries.len());
        for entry in entries {
            let slot_number = entry.get("POOL").and_then(|v| v.as_i64()).unwrap_or(0) as i32;
            let url = entry.get("URL").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let (pool_url, pool_port) = split_host_port(&url);
            slots.push(PoolSlotInfo {
                slot_number,
                pool_url,
                pool_port,
                pool_user: entry.get("User").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                is_active: entry.get("Stratum Active").and_then(|v| v.as_bool()).unwrap_or(false),
            });
        }
        Ok(slots)
    }
}

/// Splits a cgminer pool URL (`stratum+tcp://host:port`) into bare host and
/// port, defaulting the port to this family's default when absent.
fn split_host_port(url: &str) -> (String, u16) {
    let stripped = fleet_models::pool::normalize_pool_url(url);
    match stripped.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().unwrap_or(MinerFamily::AvalonNano.default_port())),
        None => (stripped, MinerFamily::AvalonNano.default_port()),
    }
}
