//! Small JSON file cache with a time-to-live
//!
//! Each cache file holds one envelope: a schema version, a key describing
//! what was cached, the write time and the value. A read is a hit only when
//! all of these line up and the entry is younger than the TTL. Anything else
//! (missing file, unreadable JSON, another key, a clock that went backwards)
//! is a miss, never an error.
//!
//! Writes go to a temporary file in the same directory followed by a rename,
//! so concurrent readers see either the old entry or the new one.

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{CclineError, Result};

/// Bumped whenever a cached value's shape changes
pub const CACHE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope<T> {
    version: u32,
    key: String,
    written_at: DateTime<Utc>,
    value: T,
}

/// A single-entry cache backed by one JSON file
#[derive(Debug, Clone)]
pub struct TtlCache {
    path: PathBuf,
    ttl: TimeDelta,
}

impl TtlCache {
    pub fn new(path: impl Into<PathBuf>, ttl: TimeDelta) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fresh value for `key`, or `None`
    pub fn read<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let envelope = self.load::<T>(key)?;
        let age = now - envelope.written_at;
        if age < TimeDelta::zero() {
            trace!("Cache entry {} written in the future, ignoring", self.path.display());
            return None;
        }
        if age >= self.ttl {
            trace!("Cache entry {} expired", self.path.display());
            return None;
        }
        Some(envelope.value)
    }

    /// Last value for `key` regardless of age
    ///
    /// Used as a fallback when refreshing failed.
    pub fn read_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.load::<T>(key).map(|envelope| envelope.value)
    }

    /// Replace the entry atomically
    pub fn write<T: Serialize>(&self, key: &str, value: &T, now: DateTime<Utc>) -> Result<()> {
        let envelope = CacheEnvelope {
            version: CACHE_SCHEMA_VERSION,
            key: key.to_string(),
            written_at: now,
            value,
        };
        let bytes = serde_json::to_vec(&envelope)?;
        write_atomic(&self.path, &bytes)?;
        debug!("Wrote cache entry {}", self.path.display());
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEnvelope<T>> {
        let text = fs::read_to_string(&self.path).ok()?;
        let envelope: CacheEnvelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Ignoring corrupt cache {}: {}", self.path.display(), e);
                return None;
            }
        };
        if envelope.version != CACHE_SCHEMA_VERSION || envelope.key != key {
            trace!("Cache entry {} does not match", self.path.display());
            return None;
        }
        Some(envelope)
    }
}

/// Write `bytes` to `path` through a temp file and rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CclineError::Cache(format!("invalid cache path {}", path.display())))?;
    let tmp = dir.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()));

    let result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
