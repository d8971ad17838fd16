use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPayload {
    pub key: String,
    pub payload: String,
    pub expires_at: i64,
}

/// Response cache keyed by exact endpoint + parameters. Times are unix seconds.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Payload stored under `key` if it has not expired at `now`.
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>>;
    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()>;
    /// Drop entries that expired at or before `now`.
    async fn purge_expired(&self, now: i64) -> Result<u64>;
    /// Remove entries whose key starts with `prefix` (all when `None`).
    async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64>;
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, CachedPayload>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).filter(|c| c.expires_at > now).map(|c| c.payload.clone()))
    }

    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            CachedPayload { key: key.to_string(), payload: payload.to_string(), expires_at },
        );
        Ok(())
    }

    async fn purge_expired(&self, now: i64) -> Result<u64> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, c| c.expires_at > now);
        Ok((before - entries.len()) as u64)
    }

    async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        match prefix {
            Some(p) => entries.retain(|k, _| !k.starts_with(p)),
            None => entries.clear(),
        }
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_expire_and_keys_match_exactly() {
        let s = MemoryStorage::new();
        s.put_cache("latest|page=1", "[1]", 100).await.unwrap();
        assert_eq!(s.get_cache("latest|page=1", 99).await.unwrap().as_deref(), Some("[1]"));
        assert_eq!(s.get_cache("latest|page=1", 100).await.unwrap(), None);
        assert_eq!(s.get_cache("latest|page=10", 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn purge_drops_only_expired() {
        let s = MemoryStorage::new();
        s.put_cache("search|query=a", "a", 10).await.unwrap();
        s.put_cache("search|query=b", "b", 20).await.unwrap();
        assert_eq!(s.purge_expired(10).await.unwrap(), 1);
        assert_eq!(s.get_cache("search|query=b", 10).await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn clear_by_prefix() {
        let s = MemoryStorage::new();
        s.put_cache("latest|page=1", "a", 10).await.unwrap();
        s.put_cache("latest|page=2", "b", 10).await.unwrap();
        s.put_cache("detail|urlId=x", "c", 10).await.unwrap();
        assert_eq!(s.clear_cache_prefix(Some("latest|")).await.unwrap(), 2);
        assert_eq!(s.len(), 1);
        assert_eq!(s.clear_cache_prefix(None).await.unwrap(), 1);
        assert!(s.is_empty());
    }
}
