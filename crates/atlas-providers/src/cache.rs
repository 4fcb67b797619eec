// SPDX-License-Identifier: MIT OR Apache-2.0
//! Download cache keyed by `(provider, layer, region, vintage)`.
//!
//! Read-many, write-one per key: writers take a key-scoped lock and land
//! bytes via a temp-file rename; readers tolerate a missing key. Entries
//! whose stored checksum no longer matches their bytes are deleted on read
//! and re-fetched by the caller.

use crate::fetch::RawAsset;
use atlas_core::{AtlasError, BoundaryType};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Cache key. Every distinct download the pipeline can make has one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Registered provider name.
    pub provider: String,
    /// Layer being fetched.
    pub layer: BoundaryType,
    /// Optional region scope (state FIPS or portal dataset id).
    pub region: Option<String>,
    /// Dataset vintage year.
    pub vintage: u16,
}

impl CacheKey {
    fn file_stem(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.provider.as_bytes());
        hasher.update(b"\x00");
        hasher.update(self.layer.wire_name().as_bytes());
        hasher.update(b"\x00");
        hasher.update(self.region.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"\x00");
        hasher.update(&self.vintage.to_le_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

/// Sidecar metadata stored beside each cached payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMeta {
    url: String,
    checksum: String,
    retrieved_at: DateTime<Utc>,
}

/// File-backed download cache.
#[derive(Debug)]
pub struct DownloadCache {
    root: PathBuf,
    // Key-scoped write locks; readers go lock-free.
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DownloadCache {
    /// Create a cache rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn payload_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.bin", key.file_stem()))
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.json", key.file_stem()))
    }

    fn lock_for(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        self.write_locks
            .lock()
            .entry(key.file_stem())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Look up a cached asset, verifying its checksum.
    ///
    /// A missing entry returns `None`. A corrupt entry (checksum mismatch,
    /// unreadable sidecar) is deleted and also returns `None` so the
    /// caller re-fetches.
    #[must_use]
    pub fn read(&self, key: &CacheKey) -> Option<RawAsset> {
        let meta_bytes = std::fs::read(self.meta_path(key)).ok()?;
        let Ok(meta) = serde_json::from_slice::<CacheMeta>(&meta_bytes) else {
            self.evict(key);
            return None;
        };
        let bytes = match std::fs::read(self.payload_path(key)) {
            Ok(b) => b,
            Err(_) => {
                self.evict(key);
                return None;
            }
        };
        let digest = hex::encode(Sha256::digest(&bytes));
        if digest != meta.checksum {
            warn!(
                target: "atlas.provider",
                provider = %key.provider,
                layer = %key.layer,
                "cache entry failed checksum, evicting"
            );
            self.evict(key);
            return None;
        }
        Some(RawAsset {
            url: meta.url,
            bytes,
            checksum: meta.checksum,
            retrieved_at: meta.retrieved_at,
            from_cache: true,
        })
    }

    /// Store an asset under a key.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] when the filesystem write fails.
    pub fn write(&self, key: &CacheKey, asset: &RawAsset) -> Result<(), AtlasError> {
        let lock = self.lock_for(key);
        let _guard = lock.lock();

        std::fs::create_dir_all(&self.root).map_err(|e| AtlasError::Internal {
            reason: format!("create cache dir {}: {e}", self.root.display()),
        })?;

        let meta = CacheMeta {
            url: asset.url.clone(),
            checksum: asset.checksum.clone(),
            retrieved_at: asset.retrieved_at,
        };
        let stem = key.file_stem();
        let tmp_payload = self.root.join(format!("{stem}.bin.tmp"));
        let tmp_meta = self.root.join(format!("{stem}.json.tmp"));

        std::fs::write(&tmp_payload, &asset.bytes).map_err(|e| AtlasError::Internal {
            reason: format!("write cache payload: {e}"),
        })?;
        let meta_json = serde_json::to_vec(&meta).map_err(|e| AtlasError::Internal {
            reason: format!("serialize cache meta: {e}"),
        })?;
        std::fs::write(&tmp_meta, meta_json).map_err(|e| AtlasError::Internal {
            reason: format!("write cache meta: {e}"),
        })?;

        std::fs::rename(&tmp_payload, self.payload_path(key)).map_err(|e| {
            AtlasError::Internal {
                reason: format!("commit cache payload: {e}"),
            }
        })?;
        std::fs::rename(&tmp_meta, self.meta_path(key)).map_err(|e| AtlasError::Internal {
            reason: format!("commit cache meta: {e}"),
        })?;
        Ok(())
    }

    /// Remove an entry. Missing files are fine.
    pub fn evict(&self, key: &CacheKey) {
        let _ = std::fs::remove_file(self.payload_path(key));
        let _ = std::fs::remove_file(self.meta_path(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key() -> CacheKey {
        CacheKey {
            provider: "tiger".into(),
            layer: BoundaryType::CongressionalDistrict,
            region: Some("55".into()),
            vintage: 2024,
        }
    }

    fn asset(bytes: &[u8]) -> RawAsset {
        RawAsset {
            url: "https://www2.census.gov/geo/tiger/cd.zip".into(),
            bytes: bytes.to_vec(),
            checksum: hex::encode(Sha256::digest(bytes)),
            retrieved_at: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
            from_cache: false,
        }
    }

    #[test]
    fn missing_key_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DownloadCache::new(dir.path());
        assert!(cache.read(&key()).is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DownloadCache::new(dir.path());
        cache.write(&key(), &asset(b"payload")).unwrap();
        let got = cache.read(&key()).unwrap();
        assert_eq!(got.bytes, b"payload");
        assert!(got.from_cache);
        assert_eq!(got.url, "https://www2.census.gov/geo/tiger/cd.zip");
    }

    #[test]
    fn corrupt_payload_is_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DownloadCache::new(dir.path());
        cache.write(&key(), &asset(b"payload")).unwrap();

        // Flip the payload behind the cache's back.
        std::fs::write(cache.payload_path(&key()), b"tampered").unwrap();

        assert!(cache.read(&key()).is_none());
        // Entry is gone entirely.
        assert!(!cache.payload_path(&key()).exists());
        assert!(!cache.meta_path(&key()).exists());
    }

    #[test]
    fn distinct_vintages_are_distinct_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DownloadCache::new(dir.path());
        let key_2024 = key();
        let key_2023 = CacheKey {
            vintage: 2023,
            ..key()
        };
        cache.write(&key_2024, &asset(b"new")).unwrap();
        assert!(cache.read(&key_2023).is_none());
        cache.write(&key_2023, &asset(b"old")).unwrap();
        assert_eq!(cache.read(&key_2024).unwrap().bytes, b"new");
        assert_eq!(cache.read(&key_2023).unwrap().bytes, b"old");
    }

    #[test]
    fn evict_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DownloadCache::new(dir.path());
        cache.evict(&key());
        cache.write(&key(), &asset(b"payload")).unwrap();
        cache.evict(&key());
        cache.evict(&key());
        assert!(cache.read(&key()).is_none());
    }
}
