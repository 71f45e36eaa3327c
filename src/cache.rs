// src/cache.rs
//! On-disk fetch cache: one JSON file per key, TTL checked lazily on read.
//!
//! File name is the SHA-256 hex digest of the key, content is
//! `{"timestamp": <unix secs f64>, "data": <json>}`. Every operation is best-effort:
//! errors are logged and degrade to a cache miss, never to a failed run.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

use crate::config::CachingConfig;
use crate::metrics::{ensure_described, CACHE_HITS, CACHE_MISSES, CACHE_WRITE_ERRORS};

#[derive(Debug, Serialize)]
struct EntryOut<'a, T: Serialize + ?Sized> {
    timestamp: f64,
    data: &'a T,
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    enabled: bool,
    ttl_hours: u64,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, config: &CachingConfig) -> Self {
        ensure_described();
        let dir = dir.into();
        if config.enabled {
            if let Err(e) = fs::create_dir_all(&dir) {
                warn!(target: "cache", error = %e, dir = %dir.display(), "cannot create cache dir");
            }
        }
        Self {
            dir,
            enabled: config.enabled,
            ttl_hours: config.ttl_hours,
        }
    }

    /// Cache rooted at `config.dir`.
    pub fn from_config(config: &CachingConfig) -> Self {
        Self::new(config.dir.clone(), config)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stable file location for `key`. Hashing keeps keys with `/`, `:` and similar
    /// characters apart and filesystem-safe.
    pub fn derive_location(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hex_digest(key)))
    }

    /// Store `payload` under `key` with the current timestamp.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, payload: &T) {
        if !self.enabled {
            return;
        }
        let path = self.derive_location(key);
        let entry = EntryOut {
            timestamp: now_unix_secs(),
            data: payload,
        };

        let bytes = match serde_json::to_vec(&entry) {
            Ok(b) => b,
            Err(e) => {
                warn!(target: "cache", key, error = %e, "payload not serializable; entry dropped");
                counter!(CACHE_WRITE_ERRORS).increment(1);
                // A stale entry must not outlive a failed overwrite.
                remove_quietly(&path);
                return;
            }
        };

        if let Err(e) = write_atomic(&path, &bytes) {
            warn!(target: "cache", key, error = %e, path = %path.display(), "cache write failed");
            counter!(CACHE_WRITE_ERRORS).increment(1);
        } else {
            debug!(target: "cache", key, bytes = bytes.len(), "cache entry written");
        }
    }

    /// Fresh payload for `key`, or `None` when absent, expired, corrupt or disabled.
    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        let out = self.read_entry(key);
        if out.is_some() {
            counter!(CACHE_HITS).increment(1);
        } else {
            counter!(CACHE_MISSES).increment(1);
        }
        out
    }

    fn read_entry(&self, key: &str) -> Option<Value> {
        let path = self.derive_location(key);
        let raw = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(target: "cache", key, error = %e, "cache read failed");
                return None;
            }
        };

        let parsed: Value = match serde_json::from_slice(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "cache", key, error = %e, "corrupt cache entry removed");
                remove_quietly(&path);
                return None;
            }
        };

        // `data` may legitimately be `null`, so check key presence, not value.
        let Value::Object(mut obj) = parsed else {
            warn!(target: "cache", key, "malformed cache entry (not an object)");
            return None;
        };
        let timestamp = obj.get("timestamp").and_then(Value::as_f64);
        let (Some(timestamp), Some(data)) = (timestamp, obj.remove("data")) else {
            warn!(target: "cache", key, "malformed cache entry (missing timestamp/data)");
            return None;
        };

        let age_hours = (now_unix_secs() - timestamp) / 3600.0;
        if age_hours > self.ttl_hours as f64 {
            debug!(target: "cache", key, age_hours, ttl_hours = self.ttl_hours, "cache entry expired");
            remove_quietly(&path);
            return None;
        }
        Some(data)
    }

    /// Remove one entry, or when `key` is `None` every `*.json` entry along with any
    /// `*.json.tmp` left by an interrupted write.
    pub fn clear(&self, key: Option<&str>) {
        match key {
            Some(k) => {
                let path = self.derive_location(k);
                if path.exists() {
                    remove_quietly(&path);
                }
            }
            None => {
                let entries = match fs::read_dir(&self.dir) {
                    Ok(e) => e,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return,
                    Err(e) => {
                        error!(target: "cache", error = %e, dir = %self.dir.display(), "cannot list cache dir");
                        return;
                    }
                };
                for e in entries.flatten() {
                    let path = e.path();
                    let owned = path
                        .file_name()
                        .and_then(|s| s.to_str())
                        .is_some_and(|n| n.ends_with(".json") || n.ends_with(".json.tmp"));
                    if owned && path.is_file() {
                        remove_quietly(&path);
                    }
                }
            }
        }
    }
}

pub fn hex_digest(key: &str) -> String {
    use std::fmt::Write as _;
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn now_unix_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    fs::rename(tmp, path)?;
    Ok(())
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(target: "cache", error = %e, path = %path.display(), "cannot remove cache file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(dir: &Path, enabled: bool, ttl_hours: u64) -> CacheStore {
        let cfg = CachingConfig {
            enabled,
            ttl_hours,
            dir: dir.to_path_buf(),
        };
        CacheStore::from_config(&cfg)
    }

    #[test]
    fn location_is_hex_digest_under_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let c = store(tmp.path(), true, 1);
        let p = c.derive_location("github_trending");
        assert_eq!(p.parent(), Some(tmp.path()));
        let stem = p.file_stem().unwrap().to_str().unwrap();
        assert_eq!(stem.len(), 64);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn special_char_keys_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let c = store(tmp.path(), true, 1);
        // A naive `/`,`:` -> `_` substitution maps all of these to "a_b".
        let keys = ["a/b", "a:b", "a_b"];
        let locs: std::collections::HashSet<_> =
            keys.iter().map(|k| c.derive_location(k)).collect();
        assert_eq!(locs.len(), keys.len());
    }

    #[test]
    fn disabled_cache_is_inert() {
        let tmp = tempfile::tempdir().unwrap();
        let c = store(tmp.path(), false, 1);
        c.set("k", &json!({"data": "value"}));
        assert_eq!(c.get("k"), None);
        assert!(!c.derive_location("k").exists());
    }

    #[test]
    fn clear_on_missing_dir_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let gone = tmp.path().join("nope");
        let cfg = CachingConfig {
            enabled: false,
            ttl_hours: 1,
            dir: gone.clone(),
        };
        let c = CacheStore::from_config(&cfg);
        c.clear(None);
        assert!(!gone.exists());
    }
}
