// [libs/infra/adapters/src/families/xmrig.rs]
//! CPU-miner family driver (§4.1, §6): JSON over HTTP against XMRig's
//! built-in API. Hashrate arrives in H/s and is normalised to KH/s so it
//! compares sensibly against the ASIC families in telemetry views.

use async_trait::async_trait;
use chrono::Utc;
use fleet_models::{AdapterError, HashrateUnit, MinerAdapter, MinerFamily, PoolTarget, RawTelemetry};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::instrument;

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

pub struct XmrigAdapter {
    host: String,
    port: u16,
    access_token: Option<String>,
    client: Client,
}

impl XmrigAdapter {
    pub fn new(host: String, port: u16, access_token: Option<String>) -> Self {
        let client = Client::builder().timeout(CALL_TIMEOUT).build().unwrap_or_default();
        Self { host, port, access_token, client }
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn summary(&self) -> Result<Value, AdapterError> {
        let url = format!("{}/2/summary", self.base_url());
        let resp = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AdapterError::Unreachable(e.to_string()))?;
        resp.json::<Value>().await.map_err(|e| AdapterError::Decode(e.to_string()))
    }

    async fn config(&self) -> Result<Value, AdapterError> {
        let url = format!("{}/2/config", self.base_url());
        let resp = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AdapterError::Unreachable(e.to_string()))?;
        resp.json::<Value>().await.map_err(|e| AdapterError::Decode(e.to_string()))
    }

    async fn put_config(&self, config: &Value) -> Result<(), AdapterError> {
        let url = format!("{}/2/config", self.base_url());
        let resp = self
            .request(self.client.put(&url))
            .json(config)
            .send()
            .await
            .map_err(|e| AdapterError::Unreachable(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(AdapterError::Decode(format!("PUT /2/config returned {}", resp.status())))
        }
    }
}

#[async_trait]
impl MinerAdapter for XmrigAdapter {
    fn family(&self) -> MinerFamily {
        MinerFamily::XMRig
    }

    #[instrument(skip(self), fields(host = %self.host))]
    async fn get_telemetry(&self) -> Result<RawTelemetry, AdapterError> {
        let summary = self.summary().await?;

        let hashrate_hs = summary
            .get("hashrate")
            .and_then(|h| h.get("total"))
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        let shares_accepted = summary.get("results").and_then(|r| r.get("shares_good")).and_then(|v| v.as_i64());
        let shares_total = summary.get("results").and_then(|r| r.get("shares_total")).and_then(|v| v.as_i64());
        let shares_rejected = match (shares_total, shares_accepted) {
            (Some(total), Some(good)) => Some((total - good).max(0)),
            _ => None,
        };

        let pool_in_use = summary
            .get("connection")
            .and_then(|c| c.get("pool"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(RawTelemetry {
            timestamp: Utc::now(),
            hashrate: hashrate_hs / 1e3,
            hashrate_unit: HashrateUnit::KhPerSec,
            temperature: None,
            power_watts: None,
            shares_accepted,
            shares_rejected,
            pool_in_use,
            detected_mode: None,
            firmware_version: summary.get("version").and_then(|v| v.as_str()).map(str::to_string),
            best_share: None,
            data: HashMap::new(),
        })
    }

    async fn get_mode(&self) -> Result<Option<String>, AdapterError> {
        // XMRig has no named power modes; thread-count profiles are
        // addressed only via SetMode's free-form config merge.
        Ok(None)
    }

    async fn set_mode(&self, mode: &str) -> Result<(), AdapterError> {
        let threads: i64 = mode.parse().map_err(|_| AdapterError::Unsupported)?;
        let mut config = self.config().await?;
        if let Some(cpu) = config.get_mut("cpu") {
            cpu["max-threads-hint"] = serde_json::json!(threads);
        }
        self.put_config(&config).await
    }

    async fn get_available_modes(&self) -> Result<Vec<String>, AdapterError> {
        Err(AdapterError::NoModes { family: MinerFamily::XMRig })
    }

    #[instrument(skip(self, target), fields(host = %self.host))]
    async fn switch_pool(&self, target: &PoolTarget) -> Result<(), AdapterError> {
        let mut config = self.config().await?;
        let pool = serde_json::json!({
            "url": format!("{}:{}", target.host, target.port),
            "user": target.user,
            "pass": target.password,
            "keepalive": true,
            "tls": false,
        });
        config["pools"] = serde_json::json!([pool]);
        self.put_config(&config).await
    }

    async fn restart(&self) -> Result<(), AdapterError> {
        let url = format!("{}/2/config", self.base_url());
        self.request(self.client.post(format!("{url}/restart")))
            .send()
            .await
            .map_err(|e| AdapterError::Unreachable(e.to_string()))?;
        Ok(())
    }

    async fn is_online(&self) -> Result<bool, AdapterError> {
        Ok(self.summary().await.is_ok())
    }
}
