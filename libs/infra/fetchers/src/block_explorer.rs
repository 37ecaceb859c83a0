// [libs/infra/fetchers/src/block_explorer.rs]
//! Network-difficulty lookups (§4.11: "if a current network difficulty for
//! the coin is available" a qualifying `HighDiffShare` also becomes a
//! `BlockFound`). One blockchair-shaped endpoint per coin; unsupported coins
//! simply return `None` rather than erroring, since the tracker treats a
//! missing network difficulty as "can't confirm a block solve", not a
//! fetch failure.

use crate::errors::FetcherError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

const CALL_TIMEOUT: Duration = Duration::from_secs(15);

pub struct BlockExplorerClient {
    client: Client,
}

impl BlockExplorerClient {
    pub fn new() -> Self {
        let client = Client::builder().timeout(CALL_TIMEOUT).build().unwrap_or_default();
        Self { client }
    }

    fn chain_slug(coin: &str) -> Option<&'static str> {
        match coin.to_ascii_uppercase().as_str() {
            "BTC" => Some("bitcoin"),
            "BCH" => Some("bitcoin-cash"),
            "LTC" => Some("litecoin"),
            "DGB" => Some("digibyte"),
            "ZEC" => Some("zcash"),
            _ => None,
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch_network_difficulty(&self, coin: &str) -> Result<Option<f64>, FetcherError> {
        let Some(slug) = Self::chain_slug(coin) else {
            return Ok(None);
        };
        let url = format!("https://api.blockchair.com/{slug}/stats");
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(FetcherError::Upstream(resp.status()));
        }
        let payload: Value = resp.json().await.map_err(|e| FetcherError::Decode(e.to_string()))?;
        Ok(payload.get("data").and_then(|d| d.get("difficulty")).and_then(|v| v.as_f64()))
    }
}

impl Default for BlockExplorerClient {
    fn default() -> Self {
        Self::new()
    }
}
