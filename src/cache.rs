//! TTL cache for language-model output.
//!
//! Two backends implement [`Cache`]: Redis for deployments and an in-process
//! map for local runs and tests. Pipeline stages go through [`SharedCache`],
//! which bounds every round trip and fails open: a broken cache reads as a
//! miss and writes are dropped.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::models::DateRange;

/// Key under which an enhanced query is stored.
pub fn enhanced_query_key(query: &str) -> String {
    format!("enhanced_query:{query}")
}

/// Key under which a result summary is stored. A date-filtered search
/// summarizes different results, so its range is part of the key.
pub fn summary_key(query: &str, date_range: Option<&DateRange>) -> String {
    match date_range {
        None => format!("summary:{query}"),
        Some(range) => format!(
            "summary:{query}|{}..{}",
            range.start.map(|s| s.to_string()).unwrap_or_default(),
            range.end.map(|e| e.to_string()).unwrap_or_default()
        ),
    }
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

// ─── In-process ──────────────────────────────────────────

/// In-process cache. Expired entries are dropped when read and swept from the
/// whole map on every write.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some((value, expires_at)) if Instant::now() < *expires_at => {
                    return Ok(Some(value.clone()))
                }
                Some(_) => {}
            }
        }
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }
}

// ─── Redis ───────────────────────────────────────────────

/// Redis-backed cache using GET / SETEX.
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).with_context(|| format!("Invalid Redis URL {url}"))?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.context("Redis GET failed")?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, value, ttl.as_secs().max(1))
            .await
            .context("Redis SETEX failed")?;
        Ok(())
    }
}

// ─── Fail-open handle ────────────────────────────────────

/// Cache handle shared by the pipeline stages.
#[derive(Clone)]
pub struct SharedCache {
    backend: Arc<dyn Cache>,
    ttl: Duration,
    op_timeout: Duration,
}

impl SharedCache {
    pub fn new(backend: Arc<dyn Cache>, ttl: Duration, op_timeout: Duration) -> Self {
        Self {
            backend,
            ttl,
            op_timeout,
        }
    }

    /// Connect the configured backend. An unreachable Redis downgrades to the
    /// in-process cache instead of failing startup.
    pub async fn from_config(config: &CacheConfig) -> Self {
        let backend: Arc<dyn Cache> = match &config.redis_url {
            Some(url) => match RedisCache::connect(url).await {
                Ok(cache) => {
                    tracing::info!("Cache: redis ({url})");
                    Arc::new(cache)
                }
                Err(e) => {
                    tracing::warn!("Redis unavailable, using in-process cache: {e:#}");
                    Arc::new(MemoryCache::new())
                }
            },
            None => {
                tracing::info!("Cache: in-process");
                Arc::new(MemoryCache::new())
            }
        };

        Self::new(
            backend,
            Duration::from_secs(config.ttl_secs),
            Duration::from_millis(config.op_timeout_ms),
        )
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        match tokio::time::timeout(self.op_timeout, self.backend.get(key)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                tracing::warn!("Cache read failed for {key}: {e:#}");
                None
            }
            Err(_) => {
                tracing::warn!("Cache read timed out for {key}");
                None
            }
        }
    }

    pub async fn put(&self, key: &str, value: &str) {
        match tokio::time::timeout(self.op_timeout, self.backend.set(key, value, self.ttl)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Cache write failed for {key}: {e:#}"),
            Err(_) => tracing::warn!("Cache write timed out for {key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            anyhow::bail!("connection refused")
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
            anyhow::bail!("connection refused")
        }
    }

    struct StalledCache;

    #[async_trait]
    impl Cache for StalledCache {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Some("too late".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[test]
    fn test_keys_are_namespaced_by_purpose() {
        assert_eq!(enhanced_query_key("bike lanes"), "enhanced_query:bike lanes");
        assert_eq!(summary_key("bike lanes", None), "summary:bike lanes");
    }

    #[test]
    fn test_summary_key_includes_date_range() {
        let since = DateRange {
            start: Some(1_700_000_000),
            end: None,
        };
        let until = DateRange {
            start: None,
            end: Some(1_700_000_000),
        };
        assert_eq!(
            summary_key("bike lanes", Some(&since)),
            "summary:bike lanes|1700000000.."
        );
        assert_ne!(
            summary_key("bike lanes", Some(&since)),
            summary_key("bike lanes", Some(&until))
        );
    }

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_expires_entries() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_memory_cache_sweeps_expired_entries_on_write() {
        let cache = MemoryCache::new();
        for i in 0..1000 {
            cache
                .set(&format!("summary:q{i}"), "v", Duration::from_millis(1))
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        cache.set("summary:fresh", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("summary:fresh").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_shared_cache_fails_open_on_errors() {
        let cache = SharedCache::new(
            Arc::new(BrokenCache),
            Duration::from_secs(3600),
            Duration::from_millis(100),
        );
        cache.put("k", "v").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_shared_cache_times_out_slow_backend() {
        let cache = SharedCache::new(
            Arc::new(StalledCache),
            Duration::from_secs(3600),
            Duration::from_millis(20),
        );
        assert_eq!(cache.get("k").await, None);
        cache.put("k", "v").await;
    }

    #[tokio::test]
    async fn test_shared_cache_uses_configured_ttl() {
        let backend = Arc::new(MemoryCache::new());
        let cache = SharedCache::new(
            backend.clone(),
            Duration::from_secs(3600),
            Duration::from_millis(100),
        );
        cache.put("summary:parks", "cached").await;
        assert_eq!(cache.get("summary:parks").await.as_deref(), Some("cached"));
        assert_eq!(backend.len(), 1);
    }
}
