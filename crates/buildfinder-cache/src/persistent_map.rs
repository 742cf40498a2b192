//! A single named, JSON-file-backed map: the unit the five `CacheLayer`
//! maps are built from.
//!
//! Modeled on the teacher's `InsightCache` (in-memory layer in front of a
//! disk-backed JSON cache, with hit/miss/write counters), generalized from
//! a single content-hash keyed cache to an arbitrary `String`-keyed map.

use std::collections::HashMap;
use std::fs;

use camino::Utf8PathBuf;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::CacheError;

/// Hit/miss/write counters for a single [`PersistentMap`], surfaced at the
/// end of a run for operational visibility (SPEC_FULL.md §3).
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub writes: usize,
}

/// A read-through, write-through map from `String` keys to `V`, persisted
/// as one JSON file.
///
/// Values are kept fully in memory after the first load; every mutation is
/// flushed to disk immediately (spec.md §3 invariant 4: "Caches are
/// write-through").
#[derive(Debug)]
pub struct PersistentMap<V> {
    path: Utf8PathBuf,
    entries: HashMap<String, V>,
    stats: CacheStats,
    dirty: bool,
}

impl<V> PersistentMap<V>
where
    V: Clone + PartialEq + Serialize + DeserializeOwned,
{
    /// Load `path` if it exists, otherwise start empty. Does not create the
    /// file until the first write.
    pub fn open(path: Utf8PathBuf) -> Result<Self, CacheError> {
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| CacheError::Read {
                path: path.to_string(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| CacheError::Serde {
                path: path.to_string(),
                source,
            })?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries,
            stats: CacheStats::default(),
            dirty: false,
        })
    }

    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Look up `key`. A hit, including a stored empty collection (a valid
    /// negative cache entry per spec.md §4.2), counts as a hit.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        if self.entries.contains_key(key) {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        self.entries.get(key)
    }

    /// Write `value` for `key` and flush to disk immediately.
    ///
    /// Returns `true` if this overwrote an existing, *different* value —
    /// callers use this to implement spec.md §7's "cache inconsistency is a
    /// warning" rule.
    pub fn put(&mut self, key: String, value: V) -> Result<bool, CacheError> {
        self.stats.writes += 1;
        let overwrote_different = match self.entries.get(&key) {
            Some(existing) => *existing != value,
            None => false,
        };
        self.entries.insert(key, value);
        self.dirty = true;
        self.flush()?;
        Ok(overwrote_different)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn flush(&mut self) -> Result<(), CacheError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            buildfinder_utils::paths::ensure_dir_all(parent).map_err(|source| CacheError::Write {
                path: self.path.to_string(),
                source,
            })?;
        }
        let raw = serde_json::to_string_pretty(&self.entries).map_err(|source| CacheError::Serde {
            path: self.path.to_string(),
            source,
        })?;
        fs::write(&self.path, raw).map_err(|source| CacheError::Write {
            path: self.path.to_string(),
            source,
        })?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit_after_put() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("m.json")).unwrap();
        let mut map: PersistentMap<Vec<i64>> = PersistentMap::open(path).unwrap();

        assert!(map.get("abc").is_none());
        assert_eq!(map.stats().misses, 1);

        map.put("abc".to_string(), vec![1, 2]).unwrap();
        assert_eq!(map.get("abc"), Some(&vec![1, 2]));
        assert_eq!(map.stats().hits, 1);
    }

    #[test]
    fn empty_vec_is_a_valid_negative_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("m.json")).unwrap();
        let mut map: PersistentMap<Vec<i64>> = PersistentMap::open(path).unwrap();

        map.put("abc".to_string(), vec![]).unwrap();
        assert!(map.contains("abc"));
        assert_eq!(map.get("abc"), Some(&Vec::new()));
    }

    #[test]
    fn survives_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("m.json")).unwrap();
        {
            let mut map: PersistentMap<String> = PersistentMap::open(path.clone()).unwrap();
            map.put("k".to_string(), "v".to_string()).unwrap();
        }
        let mut reloaded: PersistentMap<String> = PersistentMap::open(path).unwrap();
        assert_eq!(reloaded.get("k"), Some(&"v".to_string()));
    }

    #[test]
    fn put_reports_whether_it_overwrote_a_different_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("m.json")).unwrap();
        let mut map: PersistentMap<i64> = PersistentMap::open(path).unwrap();

        assert!(!map.put("k".to_string(), 1).unwrap());
        assert!(!map.put("k".to_string(), 1).unwrap());
        assert!(map.put("k".to_string(), 2).unwrap());
    }
}
