//! Tenant, assistant and document metadata consumed by the session layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::sessions::SessionData;

/// An assistant configured by a tenant and addressed by its public token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub public_token: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub rate_limits: Map<String, Value>,
    #[serde(default)]
    pub config: Map<String, Value>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assistant {
    /// Snapshot this assistant's policy into a session.
    ///
    /// `language`, `tts_enabled` and `keyterms` are read from the assistant's
    /// `config` map when present; other session fields are left as they are.
    pub fn seed_session(&self, data: &mut SessionData) {
        data.system_prompt.clone_from(&self.system_prompt);
        data.allowed_origins.clone_from(&self.allowed_origins);
        data.rate_limits.clone_from(&self.rate_limits);
        data.config.clone_from(&self.config);

        if let Some(language) = self.config.get("language").and_then(Value::as_str) {
            data.language = language.to_string();
        }
        if let Some(enabled) = self.config.get("tts_enabled").and_then(Value::as_bool) {
            data.tts_enabled = enabled;
        }
        if let Some(terms) = self.config.get("keyterms").and_then(Value::as_array) {
            data.keyterms.clear();
            for term in terms.iter().filter_map(Value::as_str) {
                data.add_keyterm(term);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub user_id: String,
    #[serde(default)]
    pub is_temporary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A knowledge source attached to an assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub assistant_id: String,
    pub name: String,
    pub source_type: String,
    #[serde(default)]
    pub description: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: String,
    #[serde(default)]
    pub total_documents: u64,
    #[serde(default)]
    pub total_chunks: u64,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub chunk_count: u64,
    #[serde(default)]
    pub page_summary: String,
    #[serde(default)]
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read access to tenant metadata held by an external backend.
///
/// Single lookups return `Ok(None)` when the record does not exist.
#[async_trait]
pub trait MetadataReader: Send + Sync {
    async fn get_assistant_by_token(&self, public_token: &str) -> anyhow::Result<Option<Assistant>>;

    async fn get_tenant(&self, tenant_id: &str) -> anyhow::Result<Option<Tenant>>;

    async fn get_source(&self, source_id: &str) -> anyhow::Result<Option<Source>>;

    /// All active sources for an assistant.
    async fn get_sources_by_assistant(&self, assistant_id: &str) -> anyhow::Result<Vec<Source>>;

    async fn get_document(&self, document_id: &str) -> anyhow::Result<Option<Document>>;

    /// Documents for the given IDs; missing IDs are skipped.
    async fn get_documents_by_ids(&self, document_ids: &[String]) -> anyhow::Result<Vec<Document>>;

    async fn close(&self) -> anyhow::Result<()>;

    fn name(&self) -> &str;
}
