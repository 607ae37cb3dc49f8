//! Vector similarity search contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Restricts which points a search may return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Single source restriction, used when `source_ids` is empty.
    #[serde(default)]
    pub source_id: Option<String>,
    /// Any-of source restriction; takes precedence over `source_id`.
    #[serde(default)]
    pub source_ids: Vec<String>,
    /// Exact-match payload conditions, all of which must hold.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Results scoring below this similarity (0.0–1.0) are dropped.
    #[serde(default)]
    pub min_score: f32,
}

/// One ranked hit from a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    /// Similarity, higher is closer.
    pub score: f32,
    pub content: String,
    pub source_id: String,
    pub document_id: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SearchFilter {
    pub fn for_sources<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.source_id.is_none()
            && self.source_ids.is_empty()
            && self.metadata.is_empty()
            && self.min_score <= 0.0
    }

    /// Whether `result` satisfies every condition of this filter.
    pub fn matches(&self, result: &SearchResult) -> bool {
        if self.min_score > 0.0 && result.score < self.min_score {
            return false;
        }

        let source_ok = if !self.source_ids.is_empty() {
            self.source_ids.iter().any(|id| *id == result.source_id)
        } else {
            self.source_id
                .as_deref()
                .map_or(true, |id| id == result.source_id)
        };
        if !source_ok {
            return false;
        }

        self.metadata
            .iter()
            .all(|(key, expected)| result.metadata.get(key) == Some(expected))
    }
}

/// Keep the results `filter` accepts, best score first, at most `limit`.
pub fn rank_results(mut results: Vec<SearchResult>, filter: &SearchFilter, limit: usize) -> Vec<SearchResult> {
    results.retain(|r| filter.matches(r));
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(limit);
    results
}

/// Similarity search over embedded document chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `limit` results closest to `vector` that satisfy `filter`,
    /// ranked by descending score.
    async fn search(
        &self,
        vector: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> anyhow::Result<Vec<SearchResult>>;

    async fn close(&self) -> anyhow::Result<()>;

    fn name(&self) -> &str;
}
