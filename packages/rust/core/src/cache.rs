//! Change detection: a content hash persisted between runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use llmstxt_shared::{CacheEntry, ContentRecord, Result, write_atomic};

/// SHA-256 (hex) of the canonical JSON form of `records`.
///
/// The canonical form is an array in record order, each record an object
/// with sorted keys and `null` for absent fields.
pub fn content_hash(records: &[ContentRecord]) -> Result<String> {
    let canonical = canonicalize(serde_json::to_value(records)?);
    let bytes = serde_json::to_vec(&canonical)?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        other => other,
    }
}

/// The cache file plus its freshness window.
#[derive(Debug, Clone)]
pub struct ChangeCache {
    path: PathBuf,
    max_age: Duration,
}

impl ChangeCache {
    pub fn new(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored entry, if present, readable, and younger than `max_age`.
    pub fn load(&self, now: DateTime<Utc>) -> Option<CacheEntry> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no cache entry");
                return None;
            }
        };
        let entry: CacheEntry = match serde_json::from_str(&text) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "unreadable cache entry");
                return None;
            }
        };

        let expired = now
            .signed_duration_since(entry.timestamp)
            .to_std()
            .is_ok_and(|age| age > self.max_age);
        if expired {
            debug!(path = %self.path.display(), "cache entry expired");
            return None;
        }
        Some(entry)
    }

    /// Whether a fresh entry records exactly `hash`.
    pub fn is_unchanged(&self, hash: &str, now: DateTime<Utc>) -> bool {
        self.load(now).is_some_and(|entry| entry.content_hash == hash)
    }

    /// Replace the stored entry.
    pub fn store(&self, entry: &CacheEntry) -> Result<()> {
        let json = serde_json::to_string_pretty(entry)?;
        write_atomic(&self.path, &json)
    }
}
