// [libs/infra/adapters/src/families/free_http.rs]
//! Shared driver for the free-pool HTTP family (Bitaxe/NerdQaxe, §4.1, §6).
//! Both firmwares expose the same JSON-over-HTTP surface: `GetSystemInfo`,
//! `SetMode`, `SetPool`, `Restart`. Mode names map to a `{frequency,
//! core_voltage}` pair read from the miner's `config["modes"]` map — there
//! is no fixed vocabulary of modes for this family, unlike the fixed-slot
//! ASIC's `low`/`normal`/`high`.

use async_trait::async_trait;
use chrono::Utc;
use fleet_models::{AdapterError, HashrateUnit, MinerAdapter, MinerFamily, PoolTarget, RawTelemetry};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::instrument;

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

pub struct FreeHttpAdapter {
    family: MinerFamily,
    host: String,
    port: u16,
    modes: HashMap<String, Value>,
    client: Client,
}

impl FreeHttpAdapter {
    pub fn new(family: MinerFamily, host: String, port: u16, modes: HashMap<String, Value>) -> Self {
        let client = Client::builder().timeout(CALL_TIMEOUT).build().unwrap_or_default();
        Self { family, host, port, modes, client }
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    async fn get_system_info(&self) -> Result<Value, AdapterError> {
        let url = format!("{}/api/system/info", self.base_url());
        let resp = self.client.get(&url).send().await.map_err(|e| AdapterError::Unreachable(e.to_string()))?;
        resp.json::<Value>().await.map_err(|e| AdapterError::Decode(e.to_string()))
    }

    async fn patch_system(&self, body: Value) -> Result<(), AdapterError> {
        let url = format!("{}/api/system", self.base_url());
        let resp = self
            .client
            .patch(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Unreachable(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(AdapterError::Decode(format!("PATCH /api/system returned {}", resp.status())))
        }
    }
}

#[async_trait]
impl MinerAdapter for FreeHttpAdapter {
    fn family(&self) -> MinerFamily {
        self.family
    }

    #[instrument(skip(self), fields(host = %self.host))]
    async fn get_telemetry(&self) -> Result<RawTelemetry, AdapterError> {
        let info = self.get_system_info().await?;

        let hashrate = info.get("hashRate").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let temperature = info.get("temp").and_then(|v| v.as_f64());
        let power_watts = info.get("power").and_then(|v| v.as_f64());
        let shares_accepted = info.get("sharesAccepted").and_then(|v| v.as_i64());
        let shares_rejected = info.get("sharesRejected").and_then(|v| v.as_i64());
        let pool_in_use = info
            .get("stratumURL")
            .and_then(|v| v.as_str())
            .map(|host| match info.get("stratumPort").and_then(|v| v.as_u64()) {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            });
        let detected_mode = self.current_mode_from_info(&info);
        let firmware_version = info.get("version").and_then(|v| v.as_str()).map(str::to_string);
        let best_share = info.get("bestDiff").and_then(|v| v.as_str()).map(str::to_string);

        Ok(RawTelemetry {
            timestamp: Utc::now(),
            hashrate,
            hashrate_unit: HashrateUnit::GhPerSec,
            temperature,
            power_watts,
            shares_accepted,
            shares_rejected,
            pool_in_use,
            detected_mode,
            firmware_version,
            best_share,
            data: HashMap::new(),
        })
    }

    async fn get_mode(&self) -> Result<Option<String>, AdapterError> {
        let info = self.get_system_info().await?;
        Ok(self.current_mode_from_info(&info))
    }

    async fn set_mode(&self, mode: &str) -> Result<(), AdapterError> {
        let settings = self.modes.get(mode).ok_or(AdapterError::Unsupported)?;
        self.patch_system(settings.clone()).await
    }

    async fn get_available_modes(&self) -> Result<Vec<String>, AdapterError> {
        if self.modes.is_empty() {
            return Err(AdapterError::NoModes { family: self.family });
        }
        Ok(self.modes.keys().cloned().collect())
    }

    #[instrument(skip(self, target), fields(host = %self.host))]
    async fn switch_pool(&self, target: &PoolTarget) -> Result<(), AdapterError> {
        let body = serde_json::json!({
            "stratumURL": target.host,
            "stratumPort": target.port,
            "stratumUser": target.user,
            "stratumPassword": target.password,
        });
        self.patch_system(body).await
    }

    async fn restart(&self) -> Result<(), AdapterError> {
        let url = format!("{}/api/system/restart", self.base_url());
        self.client.post(&url).send().await.map_err(|e| AdapterError::Unreachable(e.to_string()))?;
        Ok(())
    }

    async fn is_online(&self) -> Result<bool, AdapterError> {
        Ok(self.get_system_info().await.is_ok())
    }
}

impl FreeHttpAdapter {
    /// Matches the device's reported `{frequency, coreVoltage}` against the
    /// configured modes; firmware doesn't report a mode name directly.
    fn current_mode_from_info(&self, info: &Value) -> Option<String> {
        let freq = info.get("frequency").and_then(|v| v.as_f64())?;
        let voltage = info.get("coreVoltage").and_then(|v| v.as_f64())?;
        self.modes
            .iter()
            .find(|(_, settings)| {
                let sf = settings.get("frequency").and_then(|v| v.as_f64());
                let sv = settings.get("coreVoltage").and_then(|v| v.as_f64());
                sf == Some(freq) && sv == Some(voltage)
            })
            .map(|(name, _)| name.clone())
    }
}
