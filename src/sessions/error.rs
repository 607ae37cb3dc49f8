use thiserror::Error;

/// Failures surfaced by session stores and the store factory.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid store type: {0:?}")]
    InvalidStoreType(String),

    #[error("session not found: {0}")]
    NotFound(String),

    /// The version presented by the updater no longer matches the stored record.
    #[error("session version conflict for {id} (presented version {expected})")]
    VersionConflict { id: String, expected: i64 },

    /// The stored version cannot be incremented any further.
    #[error("session {0} version is exhausted")]
    VersionOverflow(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("failed to decode stored session {id}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode session")]
    Encode(#[source] serde_json::Error),

    /// Transport or backend failure reported by the cache client.
    #[error(transparent)]
    Cache(#[from] anyhow::Error),
}

impl SessionError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_match_variants() {
        let conflict = SessionError::VersionConflict {
            id: "s1".into(),
            expected: 3,
        };
        assert!(conflict.is_version_conflict());
        assert!(!conflict.is_not_found());
        assert!(SessionError::NotFound("s1".into()).is_not_found());
        assert!(SessionError::DeadlineExceeded.is_cancellation());
    }

    #[test]
    fn cache_errors_display_transparently() {
        let err = SessionError::from(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "connection refused");
    }
}
