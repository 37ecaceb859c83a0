// [libs/infra/fetchers/src/pool_stats.rs]
//! Pool-stats integrations named by the `solopool_enabled` / `braiins_enabled`
//! / `supportxmr_enabled` config toggles (§6). Each is optional and
//! independently disabled; none of these calls feed the adapter layer —
//! they supplement the pool-health monitor (§4.4) with pool-side numbers
//! (network difficulty, pool hashrate) a TCP probe can't see.

use crate::errors::FetcherError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

const CALL_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub pool_hashrate: Option<f64>,
    pub miners_connected: Option<u32>,
    pub network_difficulty: Option<f64>,
}

pub struct PoolStatsClient {
    client: Client,
    braiins_api_token: Option<String>,
}

impl PoolStatsClient {
    pub fn new(braiins_api_token: Option<String>) -> Self {
        let client = Client::builder().timeout(CALL_TIMEOUT).build().unwrap_or_default();
        Self { client, braiins_api_token }
    }

    #[instrument(skip(self))]
    pub async fn fetch_solopool(&self, coin_subdomain: &str) -> Result<PoolStats, FetcherError> {
        #[derive(Deserialize)]
        struct Resp {
            hashrate: f64,
            #[serde(rename = "minersTotal")]
            miners_total: Option<u32>,
            #[serde(rename = "networkDiff")]
            network_diff: Option<f64>,
        }

        let url = format!("https://{coin_subdomain}.solopool.org/api/stats");
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(FetcherError::Upstream(resp.status()));
        }
        let decoded: Resp = resp.json().await.map_err(|e| FetcherError::Decode(e.to_string()))?;
        Ok(PoolStats {
            pool_hashrate: Some(decoded.hashrate),
            miners_connected: decoded.miners_total,
            network_difficulty: decoded.network_diff,
        })
    }

    #[instrument(skip(self))]
    pub async fn fetch_braiins(&self, username: &str) -> Result<PoolStats, FetcherError> {
        let token = self.braiins_api_token.as_deref().ok_or(FetcherError::Disabled)?;

        #[derive(Deserialize)]
        struct Resp {
            btc: BraiinsBtc,
        }
        #[derive(Deserialize)]
        struct BraiinsBtc {
            hash_rate_5m: Option<f64>,
            active_workers: Option<u32>,
        }

        let url = format!("https://pool.braiins.com/accounts/profile/json/btc/{username}");
        let resp = self.client.get(&url).bearer_auth(token).send().await?;
        if !resp.status().is_success() {
            return Err(FetcherError::Upstream(resp.status()));
        }
        let decoded: Resp = resp.json().await.map_err(|e| FetcherError::Decode(e.to_string()))?;
        Ok(PoolStats {
            pool_hashrate: decoded.btc.hash_rate_5m,
            miners_connected: decoded.btc.active_workers,
            network_difficulty: None,
        })
    }

    #[instrument(skip(self))]
    pub async fn fetch_supportxmr(&self, wallet_address: &str) -> Result<PoolStats, FetcherError> {
        #[derive(Deserialize)]
        struct Resp {
            hash: f64,
        }

        let url = format!("https://supportxmr.com/api/miner/{wallet_address}/stats");
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(FetcherError::Upstream(resp.status()));
        }
        let decoded: Resp = resp.json().await.map_err(|e| FetcherError::Decode(e.to_string()))?;
        Ok(PoolStats { pool_hashrate: Some(decoded.hash), miners_connected: None, network_difficulty: None })
    }
}
