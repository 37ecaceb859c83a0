// [libs/infra/fetchers/src/tariff.rs]
//! Octopus Agile tariff fetcher (§4.9, §6 `octopus_agile.region`). Returns
//! 30-minute price slots for a region; the caller (the energy-price ingest
//! job) owns upserting them into the store.

use crate::errors::FetcherError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

const CALL_TIMEOUT: Duration = Duration::from_secs(20);
const PRODUCT_CODE: &str = "AGILE-24-10-01";

#[derive(Debug, Clone)]
pub struct TariffSlot {
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub price_pence: f64,
}

#[derive(Deserialize)]
struct RatesResponse {
    results: Vec<RateEntry>,
}

#[derive(Deserialize)]
struct RateEntry {
    value_inc_vat: f64,
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
}

pub struct TariffClient {
    client: Client,
    base_url: String,
}

impl TariffClient {
    pub fn new() -> Self {
        Self::with_base_url("https://api.octopus.energy/v1".to_string())
    }

    /// Seam for tests — points the client at a local mock server.
    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder().timeout(CALL_TIMEOUT).build().unwrap_or_default();
        Self { client, base_url }
    }

    #[instrument(skip(self))]
    pub async fn fetch_slots(&self, region: char) -> Result<Vec<TariffSlot>, FetcherError> {
        let tariff_code = format!("E-1R-{PRODUCT_CODE}-{region}");
        let url = format!(
            "{}/products/{PRODUCT_CODE}/electricity-tariffs/{tariff_code}/standard-unit-rates/",
            self.base_url
        );

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(FetcherError::Upstream(resp.status()));
        }
        let payload: RatesResponse = resp.json().await.map_err(|e| FetcherError::Decode(e.to_string()))?;

        Ok(payload
            .results
            .into_iter()
            .map(|r| TariffSlot { valid_from: r.valid_from, valid_to: r.valid_to, price_pence: r.value_inc_vat })
            .collect())
    }
}

impl Default for TariffClient {
    fn default() -> Self {
        Self::new()
    }
}
