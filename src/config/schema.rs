use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::history::HistoryLimits;
use crate::sessions::DEFAULT_SESSION_TTL;

const ENV_STORE_BACKEND: &str = "SESSIONVAULT_STORE_BACKEND";
const ENV_STORE_TTL_SECS: &str = "SESSIONVAULT_STORE_TTL_SECS";
const ENV_REDIS_URL: &str = "SESSIONVAULT_REDIS_URL";

// ── Top-level config ──────────────────────────────────────────────

/// Top-level configuration, loaded from a TOML file.
///
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Session store backend selection (`[session]`).
    #[serde(default)]
    pub session: SessionStoreConfig,

    /// History bounding applied when appending turns (`[history]`).
    #[serde(default)]
    pub history: HistoryLimits,

    /// Tenant metadata read-through cache (`[metadata]`).
    #[serde(default)]
    pub metadata: MetadataCacheConfig,

    /// Path the config was loaded from - not serialized
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

// ── Session store ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStoreConfig {
    /// "memory" | "redis" | "cache"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Sliding session expiration in seconds. Non-positive means 24 hours.
    #[serde(default = "default_store_ttl_secs")]
    pub ttl_secs: i64,
    /// Connection URL for the redis backend (e.g. "redis://127.0.0.1/")
    #[serde(default)]
    pub redis_url: Option<String>,
}

fn default_store_backend() -> String {
    "memory".into()
}

fn default_store_ttl_secs() -> i64 {
    86_400
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            ttl_secs: default_store_ttl_secs(),
            redis_url: None,
        }
    }
}

impl SessionStoreConfig {
    /// Effective session TTL.
    pub fn ttl(&self) -> Duration {
        u64::try_from(self.ttl_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_SESSION_TTL, Duration::from_secs)
    }
}

// ── Metadata cache ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataCacheConfig {
    /// Lifetime of cached tenant/assistant/document lookups. Default: 300.
    #[serde(default = "default_metadata_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_metadata_cache_ttl_secs() -> u64 {
    300
}

impl Default for MetadataCacheConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_metadata_cache_ttl_secs(),
        }
    }
}

impl MetadataCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// ── Loading ───────────────────────────────────────────────────────

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse session config")
    }

    /// Load from `path` (`~` is expanded), then apply environment overrides.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy();
        let expanded = PathBuf::from(shellexpand::tilde(&path).into_owned());
        let raw = tokio::fs::read_to_string(&expanded)
            .await
            .with_context(|| format!("failed to read config file {}", expanded.display()))?;

        let mut config = Self::from_toml_str(&raw)?;
        config.config_path = Some(expanded);
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `SESSIONVAULT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(backend) = lookup(ENV_STORE_BACKEND).filter(|v| !v.trim().is_empty()) {
            self.session.backend = backend.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_STORE_TTL_SECS) {
            match raw.trim().parse::<i64>() {
                Ok(secs) => self.session.ttl_secs = secs,
                Err(error) => tracing::warn!(
                    env = ENV_STORE_TTL_SECS,
                    value = %raw,
                    "ignoring invalid TTL override: {error}"
                ),
            }
        }

        if let Some(url) = lookup(ENV_REDIS_URL).filter(|v| !v.trim().is_empty()) {
            self.session.redis_url = Some(url);
        }
    }
}
