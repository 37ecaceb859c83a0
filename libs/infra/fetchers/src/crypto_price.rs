// [libs/infra/fetchers/src/crypto_price.rs]
//! Crypto spot-price fetcher (§4.10's 10-minute cache-refresh job). Used for
//! display/cost-attribution only — never consulted by the Agile Solo
//! band-selection algorithm, which operates purely on the energy tariff.

use crate::errors::FetcherError;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::instrument;

const CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub struct CryptoPriceClient {
    client: Client,
    base_url: String,
}

impl CryptoPriceClient {
    pub fn new() -> Self {
        Self::with_base_url("https://api.coingecko.com/api/v3".to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder().timeout(CALL_TIMEOUT).build().unwrap_or_default();
        Self { client, base_url }
    }

    /// `coin_ids` are CoinGecko's own ids (`bitcoin`, `bitcoin-cash`,
    /// `litecoin`, `digibyte`, `zcash`, `monero`), returned keyed by id.
    #[instrument(skip(self, coin_ids))]
    pub async fn fetch_prices_gbp(&self, coin_ids: &[&str]) -> Result<HashMap<String, f64>, FetcherError> {
        let ids = coin_ids.join(",");
        let url = format!("{}/simple/price?ids={ids}&vs_currencies=gbp", self.base_url);

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(FetcherError::Upstream(resp.status()));
        }
        let payload: Value = resp.json().await.map_err(|e| FetcherError::Decode(e.to_string()))?;
        let obj = payload.as_object().ok_or_else(|| FetcherError::Decode("expected a JSON object".into()))?;

        Ok(obj
            .iter()
            .filter_map(|(id, v)| v.get("gbp").and_then(|p| p.as_f64()).map(|p| (id.clone(), p)))
            .collect())
    }
}

impl Default for CryptoPriceClient {
    fn default() -> Self {
        Self::new()
    }
}
