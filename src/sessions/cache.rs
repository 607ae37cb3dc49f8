//! Session store over a remote key-value cache with sliding expiration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::context::OpContext;
use super::error::SessionError;
use super::traits::{SessionData, SessionStore};

/// Key prefix for session entries.
pub const SESSION_KEY_PREFIX: &str = "session:";

/// Expiration applied when no positive TTL is configured.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Result of a [`CacheClient::compare_and_swap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The stored value matched and was replaced.
    Swapped,
    /// No value exists at the key.
    Missing,
    /// The stored value differs from the expected one; nothing was written.
    Changed,
}

/// Connected key-value cache used by [`CacheSessionStore`].
///
/// Implementations must be safe to share across tasks.
/// [`compare_and_swap`](CacheClient::compare_and_swap) must be atomic with
/// respect to every other writer of the key, and it must compare the full
/// stored value. Comparing a field parsed out of it is not enough.
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Write `value` and set its expiration to `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// Reset the expiration of an existing key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> anyhow::Result<bool>;

    /// Replace the value at `key` with `new_value` (expiring after `ttl`)
    /// only if it is still exactly `expected`.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        new_value: &str,
        ttl: Duration,
    ) -> anyhow::Result<CasOutcome>;

    async fn close(&self) -> anyhow::Result<()>;

    fn name(&self) -> &str;
}

/// Session store persisting each session as one JSON value at `session:<id>`.
///
/// Create sets the TTL. Successful gets and updates refresh it. Delete does
/// not touch it.
pub struct CacheSessionStore {
    client: Arc<dyn CacheClient>,
    ttl: Duration,
}

impl CacheSessionStore {
    /// A zero `ttl` falls back to [`DEFAULT_SESSION_TTL`].
    pub fn new(client: Arc<dyn CacheClient>, ttl: Duration) -> Self {
        let ttl = if ttl.is_zero() { DEFAULT_SESSION_TTL } else { ttl };
        Self { client, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key for a session ID.
    pub fn key(id: &str) -> String {
        format!("{SESSION_KEY_PREFIX}{id}")
    }

    fn decode(id: &str, raw: &str) -> Result<SessionData, SessionError> {
        serde_json::from_str(raw).map_err(|source| SessionError::Decode {
            id: id.to_string(),
            source,
        })
    }

    fn encode(data: &SessionData) -> Result<String, SessionError> {
        serde_json::to_string(data).map_err(SessionError::Encode)
    }
}

#[async_trait]
impl SessionStore for CacheSessionStore {
    async fn create(&self, ctx: &OpContext, data: &mut SessionData) -> Result<(), SessionError> {
        let key = Self::key(&data.id);
        let now = Utc::now();
        let mut record = data.clone();
        record.created_at = now;
        record.updated_at = now;
        record.version = 1;
        let encoded = Self::encode(&record)?;

        ctx.run(self.write(&key, &encoded)).await?;

        data.created_at = record.created_at;
        data.updated_at = record.updated_at;
        data.version = record.version;
        tracing::debug!(session_id = %data.id, %key, "session created");
        Ok(())
    }

    async fn get(&self, ctx: &OpContext, id: &str) -> Result<Option<SessionData>, SessionError> {
        ctx.run(self.read_and_touch(id)).await
    }

    async fn update(&self, ctx: &OpContext, data: &mut SessionData) -> Result<(), SessionError> {
        let committed = ctx.run(self.check_and_set(data)).await?;

        data.version = committed.version;
        data.updated_at = committed.updated_at;
        tracing::debug!(session_id = %data.id, version = data.version, "session updated");
        Ok(())
    }

    async fn delete(&self, ctx: &OpContext, id: &str) -> Result<(), SessionError> {
        let key = Self::key(id);
        ctx.run(self.remove(&key)).await?;
        tracing::debug!(session_id = %id, %key, "session deleted");
        Ok(())
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.client.close().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "cache"
    }
}

impl CacheSessionStore {
    async fn write(&self, key: &str, encoded: &str) -> Result<(), SessionError> {
        self.client.set(key, encoded, self.ttl).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.client.delete(key).await?;
        Ok(())
    }

    async fn read_and_touch(&self, id: &str) -> Result<Option<SessionData>, SessionError> {
        let key = Self::key(id);
        let Some(raw) = self.client.get(&key).await? else {
            return Ok(None);
        };
        let data = Self::decode(id, &raw)?;

        if let Err(error) = self.client.expire(&key, self.ttl).await {
            tracing::warn!(session_id = %id, %key, "failed to refresh session TTL: {error:#}");
        }
        Ok(Some(data))
    }

    /// Read, verify the version, then commit with a check-and-set against the
    /// exact value read. Returns the record as committed.
    async fn check_and_set(&self, data: &SessionData) -> Result<SessionData, SessionError> {
        let key = Self::key(&data.id);
        let conflict = || SessionError::VersionConflict {
            id: data.id.clone(),
            expected: data.version,
        };

        let current = self
            .client
            .get(&key)
            .await?
            .ok_or_else(|| SessionError::NotFound(data.id.clone()))?;

        let stored = Self::decode(&data.id, &current)?;
        if stored.version != data.version {
            tracing::warn!(
                session_id = %data.id,
                presented = data.version,
                stored = stored.version,
                "session version conflict"
            );
            return Err(conflict());
        }

        let mut next = data.clone();
        next.version = data
            .version
            .checked_add(1)
            .ok_or_else(|| SessionError::VersionOverflow(data.id.clone()))?;
        next.updated_at = Utc::now();
        let encoded = Self::encode(&next)?;

        match self
            .client
            .compare_and_swap(&key, &current, &encoded, self.ttl)
            .await?
        {
            CasOutcome::Swapped => Ok(next),
            CasOutcome::Missing => Err(SessionError::NotFound(data.id.clone())),
            CasOutcome::Changed => {
                tracing::warn!(
                    session_id = %data.id,
                    presented = data.version,
                    "session changed concurrently before commit"
                );
                Err(conflict())
            }
        }
    }
}
