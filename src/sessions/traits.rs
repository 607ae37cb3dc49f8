//! Session storage traits and the persisted session entity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::context::OpContext;
use super::error::SessionError;
use crate::history::{self, estimate_tokens, HistoryLimits};

/// Speaker of a conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Estimated once at append time and never recomputed.
    pub token_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            role,
            token_count: estimate_tokens(&content),
            content,
            timestamp: Utc::now(),
        }
    }
}

/// All persisted state of one conversation session.
///
/// `version` is the optimistic-lock token: stores force it to 1 on create and
/// bump it by exactly one on every successful update. `rate_limits` and
/// `config` are opaque tenant passthrough and keep their key order on
/// round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub conversation_history: Vec<Message>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub system_prompt: String,
    /// Wire order is kept as written; [`add_keyterm`](Self::add_keyterm) skips duplicates.
    #[serde(default, deserialize_with = "null_as_default")]
    pub keyterms: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(default)]
    pub tts_enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allowed_origins: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rate_limits: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: Map<String, Value>,
}

/// Other writers of the same wire format emit `null` for empty collections.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl SessionData {
    /// A blank session for `id`. Timestamps and version are overwritten by `create`.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            version: 0,
            conversation_history: Vec::new(),
            system_prompt: String::new(),
            keyterms: Vec::new(),
            language: String::new(),
            tts_enabled: false,
            allowed_origins: Vec::new(),
            rate_limits: Map::new(),
            config: Map::new(),
        }
    }

    /// Append a turn and bound the history to `limits`.
    pub fn push_turn(&mut self, role: Role, content: impl Into<String>, limits: &HistoryLimits) {
        let appended = history::append_message(&self.conversation_history, role, content);
        self.conversation_history = limits.apply(&appended).to_vec();
    }

    /// Append a keyterm unless already present. Returns whether it was added.
    pub fn add_keyterm(&mut self, term: impl Into<String>) -> bool {
        let term = term.into();
        if self.keyterms.contains(&term) {
            return false;
        }
        self.keyterms.push(term);
        true
    }

    /// Summed `token_count` of the history, saturating at `usize::MAX`.
    pub fn total_tokens(&self) -> usize {
        self.conversation_history
            .iter()
            .fold(0usize, |acc, m| acc.saturating_add(m.token_count))
    }
}

/// Persistent storage for conversation sessions with optimistic locking.
///
/// Every backend honours the same contract:
///
/// * [`create`](SessionStore::create) overwrites any existing record, forcing
///   `version = 1` and both timestamps to now.
/// * [`get`](SessionStore::get) returns `Ok(None)` for an absent session;
///   decode and transport failures are errors.
/// * [`update`](SessionStore::update) succeeds only when `data.version`
///   equals the stored version, then bumps the version, stamps `updated_at`
///   and persists the whole record as one unit. On failure `data` is left
///   untouched so the caller can re-fetch and retry.
/// * [`delete`](SessionStore::delete) is unconditional.
///
/// Retrying on [`SessionError::VersionConflict`] is the caller's job.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist `data` as a fresh session (version 1). Never fails with
    /// `NotFound` or `VersionConflict`.
    async fn create(&self, ctx: &OpContext, data: &mut SessionData) -> Result<(), SessionError>;

    /// Fetch a caller-owned copy of the session, if it exists.
    async fn get(&self, ctx: &OpContext, id: &str) -> Result<Option<SessionData>, SessionError>;

    /// Version-checked write of the full record.
    async fn update(&self, ctx: &OpContext, data: &mut SessionData) -> Result<(), SessionError>;

    /// Remove the session. Deleting an absent session is not an error.
    async fn delete(&self, ctx: &OpContext, id: &str) -> Result<(), SessionError>;

    /// Release backend resources. Operations after close are unspecified.
    async fn close(&self) -> Result<(), SessionError>;

    /// The name of this session store implementation.
    fn name(&self) -> &str;
}
