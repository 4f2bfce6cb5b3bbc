//! Key/value cache capability and the in-process implementation used by the
//! loader decorators.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};
use thiserror::Error;
use tracing::debug;

use crate::config::CacheOptions;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Storage consulted by the pipeline and by caching decorators.
///
/// Implementations must be safe to share between tasks.
#[mockall::automock]
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    async fn put(&self, key: &str, value: Value) -> CacheResult<()>;

    async fn remove(&self, key: &str) -> CacheResult<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    sequence: u64,
}

/// Bounded in-memory cache.
///
/// When full, the oldest insertion is evicted. Entries older than the
/// configured TTL are treated as absent.
#[derive(Clone)]
pub struct MemoryCache {
    options: CacheOptions,
    entries: Arc<DashMap<String, CacheEntry>>,
    sequence: Arc<AtomicU64>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

impl MemoryCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            options,
            entries: Arc::new(DashMap::new()),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.options
            .ttl
            .is_some_and(|ttl| entry.inserted_at.elapsed() > ttl)
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().sequence)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            debug!("evicting cache entry {}", key);
            self.entries.remove(&key);
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let expired = match self.entries.get(key) {
            Some(entry) if !self.is_expired(&entry) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: Value) -> CacheResult<()> {
        if self.options.max_entries == 0 {
            return Ok(());
        }
        if !self.entries.contains_key(key) && self.entries.len() >= self.options.max_entries {
            self.evict_oldest();
        }
        let entry = CacheEntry {
            value,
            inserted_at: Instant::now(),
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
