//! File-backed result cache
//!
//! Caches search responses and LLM assessments as JSON files keyed by a
//! content fingerprint. Entries expire lazily on read; `cleanup` removes
//! expired entries eagerly.

use crate::config::CacheConfig;
use crate::error::{ErrorContext, LitError, LitResult};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk entry wrapper carrying the creation timestamp
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope<T> {
    created_at: DateTime<Utc>,
    payload: T,
}

/// JSON file cache with fingerprint keys and age-based expiry
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    max_age: Duration,
    enabled: bool,
}

impl FileCache {
    /// Create a cache rooted at the configured directory. The directory is
    /// created on first use, not here.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            max_age: Duration::days(config.max_age_days as i64),
            enabled: config.enabled,
        }
    }

    /// A disabled cache misses on every read and drops every write
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            max_age: Duration::days(0),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stable fingerprint for a cache key: operation name, normalized input,
    /// and a version tag (typically the model or API revision). Changing the
    /// tag invalidates old entries without touching the directory.
    pub fn fingerprint(operation: &str, input: &str, tag: &str) -> String {
        let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(normalized.to_lowercase().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(tag.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read a cached value. Expired or corrupt entries are removed and
    /// reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let path = self.entry_path(key);
        let content = std::fs::read_to_string(&path).ok()?;

        let envelope: CacheEnvelope<T> = match serde_json::from_str(&content) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(key = key, error = %e, "Removing corrupt cache entry");
                let _ = std::fs::remove_file(&path);
                return None;
            }
        };

        if Utc::now() - envelope.created_at > self.max_age {
            debug!(key = key, "Cache entry expired");
            let _ = std::fs::remove_file(&path);
            return None;
        }

        debug!(key = key, "Cache hit");
        Some(envelope.payload)
    }

    /// Write a value to the cache. Writes go through a temporary file and an
    /// atomic rename so readers never observe a partial entry.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> LitResult<()> {
        if !self.enabled {
            return Ok(());
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| self.cache_error("create_dir", e))?;

        let envelope = CacheEnvelope {
            created_at: Utc::now(),
            payload: value,
        };
        let content = serde_json::to_string(&envelope)?;

        let path = self.entry_path(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp, content).map_err(|e| self.cache_error("write_tmp", e))?;
        std::fs::rename(&tmp, &path).map_err(|e| self.cache_error("rename", e))?;

        debug!(key = key, "Cache entry written");
        Ok(())
    }

    /// Remove all expired entries. Unreadable entries are removed too.
    pub fn cleanup(&self) -> LitResult<usize> {
        if !self.enabled || !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir).map_err(|e| self.cache_error("read_dir", e))? {
            let entry = entry.map_err(|e| self.cache_error("read_dir", e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if self.is_expired_or_corrupt(&path) {
                if std::fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            }
        }

        debug!(removed = removed, "Cache cleanup finished");
        Ok(removed)
    }

    /// Remove every entry, expired or not
    pub fn clear(&self) -> LitResult<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir).map_err(|e| self.cache_error("read_dir", e))? {
            let entry = entry.map_err(|e| self.cache_error("read_dir", e))?;
            let path = entry.path();
            let is_cache_file = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json") | Some("tmp")
            );
            if is_cache_file && std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn is_expired_or_corrupt(&self, path: &Path) -> bool {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return true,
        };
        match serde_json::from_str::<CacheEnvelope<serde_json::Value>>(&content) {
            Ok(envelope) => Utc::now() - envelope.created_at > self.max_age,
            Err(_) => true,
        }
    }

    fn cache_error(&self, operation: &str, source: std::io::Error) -> LitError {
        LitError::Cache {
            message: format!("Cache {} failed: {}", operation, source),
            source: Some(Box::new(source)),
            context: ErrorContext::new("cache")
                .with_operation(operation)
                .with_suggestion("Check cache directory permissions"),
        }
    }
}
