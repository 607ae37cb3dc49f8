//! Read-through TTL cache in front of a [`MetadataReader`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

use super::traits::{Assistant, Document, MetadataReader, Source, Tenant};
use crate::config::MetadataCacheConfig;

/// Lifetime of cached lookups when none is configured.
pub const DEFAULT_METADATA_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct Cached<T> {
    value: T,
    expires_at: Instant,
}

/// Typed expiring map; reads take the shared lock.
struct TtlMap<T> {
    entries: RwLock<HashMap<String, Cached<T>>>,
}

impl<T: Clone> TtlMap<T> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|c| Instant::now() < c.expires_at)
            .map(|c| c.value.clone())
    }

    fn insert(&self, key: &str, value: T, ttl: Duration) {
        let mut entries = self.entries.write();
        let now = Instant::now();
        entries.retain(|_, c| now < c.expires_at);
        entries.insert(
            key.to_string(),
            Cached {
                value,
                expires_at: now + ttl,
            },
        );
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Caches assistant, tenant, source and document lookups for a fixed TTL.
///
/// Assistants are cached by public token and by ID. Absent records and list
/// lookups are never cached.
pub struct CachedMetadataReader<R> {
    inner: R,
    ttl: Duration,
    assistants_by_token: TtlMap<Assistant>,
    assistants_by_id: TtlMap<Assistant>,
    tenants: TtlMap<Tenant>,
    sources: TtlMap<Source>,
    documents: TtlMap<Document>,
}

impl<R: MetadataReader> CachedMetadataReader<R> {
    /// A zero `ttl` falls back to [`DEFAULT_METADATA_CACHE_TTL`].
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            ttl: if ttl.is_zero() {
                DEFAULT_METADATA_CACHE_TTL
            } else {
                ttl
            },
            assistants_by_token: TtlMap::new(),
            assistants_by_id: TtlMap::new(),
            tenants: TtlMap::new(),
            sources: TtlMap::new(),
            documents: TtlMap::new(),
        }
    }

    pub fn from_config(inner: R, config: &MetadataCacheConfig) -> Self {
        Self::new(inner, config.ttl())
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Assistant previously fetched by token, looked up by its ID.
    pub fn cached_assistant(&self, assistant_id: &str) -> Option<Assistant> {
        self.assistants_by_id.get(assistant_id)
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.assistants_by_token.clear();
        self.assistants_by_id.clear();
        self.tenants.clear();
        self.sources.clear();
        self.documents.clear();
    }
}

#[async_trait]
impl<R: MetadataReader> MetadataReader for CachedMetadataReader<R> {
    async fn get_assistant_by_token(&self, public_token: &str) -> anyhow::Result<Option<Assistant>> {
        if let Some(hit) = self.assistants_by_token.get(public_token) {
            return Ok(Some(hit));
        }
        let fetched = self.inner.get_assistant_by_token(public_token).await?;
        if let Some(assistant) = &fetched {
            self.assistants_by_token
                .insert(public_token, assistant.clone(), self.ttl);
            self.assistants_by_id
                .insert(&assistant.id, assistant.clone(), self.ttl);
        }
        Ok(fetched)
    }

    async fn get_tenant(&self, tenant_id: &str) -> anyhow::Result<Option<Tenant>> {
        if let Some(hit) = self.tenants.get(tenant_id) {
            return Ok(Some(hit));
        }
        let fetched = self.inner.get_tenant(tenant_id).await?;
        if let Some(tenant) = &fetched {
            self.tenants.insert(tenant_id, tenant.clone(), self.ttl);
        }
        Ok(fetched)
    }

    async fn get_source(&self, source_id: &str) -> anyhow::Result<Option<Source>> {
        if let Some(hit) = self.sources.get(source_id) {
            return Ok(Some(hit));
        }
        let fetched = self.inner.get_source(source_id).await?;
        if let Some(source) = &fetched {
            self.sources.insert(source_id, source.clone(), self.ttl);
        }
        Ok(fetched)
    }

    /// The list itself is not cached; each returned source warms the by-ID cache.
    async fn get_sources_by_assistant(&self, assistant_id: &str) -> anyhow::Result<Vec<Source>> {
        let sources = self.inner.get_sources_by_assistant(assistant_id).await?;
        for source in &sources {
            self.sources.insert(&source.id, source.clone(), self.ttl);
        }
        Ok(sources)
    }

    async fn get_document(&self, document_id: &str) -> anyhow::Result<Option<Document>> {
        if let Some(hit) = self.documents.get(document_id) {
            return Ok(Some(hit));
        }
        let fetched = self.inner.get_document(document_id).await?;
        if let Some(document) = &fetched {
            self.documents.insert(document_id, document.clone(), self.ttl);
        }
        Ok(fetched)
    }

    async fn get_documents_by_ids(&self, document_ids: &[String]) -> anyhow::Result<Vec<Document>> {
        let mut found: HashMap<String, Document> = HashMap::with_capacity(document_ids.len());
        let mut misses = Vec::new();
        for id in document_ids {
            match self.documents.get(id) {
                Some(doc) => {
                    found.insert(id.clone(), doc);
                }
                None => misses.push(id.clone()),
            }
        }

        if !misses.is_empty() {
            for doc in self.inner.get_documents_by_ids(&misses).await? {
                self.documents.insert(&doc.id, doc.clone(), self.ttl);
                found.insert(doc.id.clone(), doc);
            }
        }

        // Preserve the caller's ordering.
        Ok(document_ids
            .iter()
            .filter_map(|id| found.remove(id))
            .collect())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.invalidate_all();
        self.inner.close().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
