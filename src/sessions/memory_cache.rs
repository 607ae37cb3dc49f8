//! Process-local [`CacheClient`] with per-key sliding expiration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::cache::{CacheClient, CasOutcome};

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// An in-process key-value cache backed by a mutex-protected hash map.
///
/// Expiry is measured on the tokio clock, so paused-time tests can drive it
/// with `tokio::time::advance`. Expired keys are invisible and removed lazily.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    closed: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Remaining time-to-live of `key`, or `None` if absent or expired.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.expires_at - now)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            bail!("memory cache is closed");
        }
        Ok(())
    }

    /// Drop `key` if it has expired, returning the live entry otherwise.
    fn live_entry<'a>(entries: &'a mut HashMap<String, Entry>, key: &str, now: Instant) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        let mut entries = self.entries.lock();
        Ok(Self::live_entry(&mut entries, key, Instant::now()).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match Self::live_entry(&mut entries, key, now) {
            Some(entry) => {
                entry.expires_at = now + ttl;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        new_value: &str,
        ttl: Duration,
    ) -> Result<CasOutcome> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let Some(entry) = Self::live_entry(&mut entries, key, now) else {
            return Ok(CasOutcome::Missing);
        };
        if entry.value != expected {
            return Ok(CasOutcome::Changed);
        }
        entry.value = new_value.to_string();
        entry.expires_at = now + ttl;
        Ok(CasOutcome::Swapped)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.entries.lock().clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory_cache"
    }
}
