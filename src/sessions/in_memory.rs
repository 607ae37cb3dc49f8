//! In-memory session store implementation.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::context::OpContext;
use super::error::SessionError;
use super::traits::{SessionData, SessionStore};

/// An in-memory session store backed by a lock-guarded hash map.
///
/// Records are copied in on write and copied out on read, so callers never
/// hold a reference into the map.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of sessions currently held.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, ctx: &OpContext, data: &mut SessionData) -> Result<(), SessionError> {
        ctx.check()?;
        let now = Utc::now();
        data.created_at = now;
        data.updated_at = now;
        data.version = 1;

        self.sessions.write().insert(data.id.clone(), data.clone());
        tracing::debug!(session_id = %data.id, "session created");
        Ok(())
    }

    async fn get(&self, ctx: &OpContext, id: &str) -> Result<Option<SessionData>, SessionError> {
        ctx.check()?;
        Ok(self.sessions.read().get(id).cloned())
    }

    async fn update(&self, ctx: &OpContext, data: &mut SessionData) -> Result<(), SessionError> {
        ctx.check()?;
        let mut sessions = self.sessions.write();
        let stored = sessions
            .get_mut(&data.id)
            .ok_or_else(|| SessionError::NotFound(data.id.clone()))?;

        if stored.version != data.version {
            tracing::warn!(
                session_id = %data.id,
                presented = data.version,
                stored = stored.version,
                "session version conflict"
            );
            return Err(SessionError::VersionConflict {
                id: data.id.clone(),
                expected: data.version,
            });
        }

        data.version = data
            .version
            .checked_add(1)
            .ok_or_else(|| SessionError::VersionOverflow(data.id.clone()))?;
        data.updated_at = Utc::now();
        *stored = data.clone();
        drop(sessions);

        tracing::debug!(session_id = %data.id, version = data.version, "session updated");
        Ok(())
    }

    async fn delete(&self, ctx: &OpContext, id: &str) -> Result<(), SessionError> {
        ctx.check()?;
        self.sessions.write().remove(id);
        tracing::debug!(session_id = %id, "session deleted");
        Ok(())
    }

    async fn close(&self) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write();
        sessions.clear();
        sessions.shrink_to_fit();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
