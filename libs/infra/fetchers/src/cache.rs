// [libs/infra/fetchers/src/cache.rs]
//! Process-local, per-key TTL cache (§5: "the external-fetcher cache is
//! process-local with per-key TTL", §4.10's 10-minute crypto-price refresh
//! cadence). No external cache — this is deliberately in-memory only, wiped
//! on restart.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries.get(key).filter(|e| e.expires_at > Instant::now()).map(|e| e.value.clone())
    }

    pub async fn put(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(key, Entry { value, expires_at: Instant::now() + ttl });
    }

    /// Returns the cached value if still fresh, otherwise calls `fetch` and
    /// caches the result on success. A failed fetch does not evict an
    /// existing (stale) entry — callers that want hard expiry should check
    /// `get` first.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, E>>,
    {
        if let Some(v) = self.get(&key).await {
            return Ok(v);
        }
        let value = fetch().await?;
        self.put(key, value.clone(), ttl).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expires_after_ttl() {
        let cache: TtlCache<&str, i32> = TtlCache::new();
        cache.put("a", 1, Duration::from_millis(10)).await;
        assert_eq!(cache.get(&"a").await, Some(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get(&"a").await, None);
    }

    #[tokio::test]
    async fn get_or_fetch_only_calls_fetch_once_while_fresh() {
        let cache: TtlCache<&str, i32> = TtlCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            let v = cache
                .get_or_fetch("k", Duration::from_secs(60), || {
                    calls += 1;
                    async { Ok::<_, std::convert::Infallible>(42) }
                })
                .await
                .unwrap();
            assert_eq!(v, 42);
        }
        assert_eq!(calls, 1);
    }
}
