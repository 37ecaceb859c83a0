// [libs/infra/fetchers/src/lib.rs]
//! External fetcher clients (§4.9, §6) — tariff, pool stats, crypto price,
//! block explorer — each independent and individually fallible, fronted by
//! a process-local TTL cache (§5). No fetcher here ever touches the Store;
//! callers (the scheduler jobs) own persistence.

pub mod block_explorer;
pub mod cache;
pub mod crypto_price;
pub mod errors;
pub mod pool_stats;
pub mod tariff;

pub use block_explorer::BlockExplorerClient;
pub use cache::TtlCache;
pub use crypto_price::CryptoPriceClient;
pub use errors::FetcherError;
pub use pool_stats::{PoolStats, PoolStatsClient};
pub use tariff::{TariffClient, TariffSlot};
