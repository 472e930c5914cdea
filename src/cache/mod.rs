//! Page cache for incremental regeneration
//!
//! Records when each route was last generated and what it resolved to, so
//! the server can tell fresh pages from stale ones across restarts.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Cache directory, relative to the site base dir
pub const CACHE_DIR: &str = ".spacetraveling-cache";

/// Cache file name
const CACHE_FILE: &str = ".spacetraveling-cache/db.json";

/// What a route produced the last time it was generated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Generation time (unix seconds)
    pub generated_at: u64,
    /// Output path relative to public dir; empty for redirects
    #[serde(default)]
    pub output_path: String,
    /// Destination when the route resolved to a redirect
    #[serde(default)]
    pub redirect: Option<String>,
}

impl CacheEntry {
    pub fn page(output_path: impl Into<String>, generated_at: u64) -> Self {
        Self {
            generated_at,
            output_path: output_path.into(),
            redirect: None,
        }
    }

    pub fn redirect(destination: impl Into<String>, generated_at: u64) -> Self {
        Self {
            generated_at,
            output_path: String::new(),
            redirect: Some(destination.into()),
        }
    }

    /// A revalidate interval of zero means every request is stale
    pub fn is_stale(&self, now: u64, revalidate: u64) -> bool {
        now.saturating_sub(self.generated_at) >= revalidate
    }
}

/// Cache database keyed by route (`/`, `/post/<slug>`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageCache {
    /// Version of the cache format
    pub version: u32,
    pub routes: BTreeMap<String, CacheEntry>,
}

impl PageCache {
    /// Current cache format version
    const VERSION: u32 = 1;

    /// Create a new cache with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Load cache from disk, or create a new empty cache
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = base_dir.join(CACHE_FILE);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            match serde_json::from_str::<PageCache>(&content) {
                Ok(cache) if cache.version == Self::VERSION => return cache,
                Ok(_) => tracing::info!("Cache version mismatch, rebuilding cache"),
                Err(e) => tracing::warn!("Ignoring unreadable cache {:?}: {}", cache_path, e),
            }
        }
        Self::new()
    }

    /// Save cache to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(CACHE_DIR))?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(base_dir.join(CACHE_FILE), content)?;
        Ok(())
    }

    pub fn get(&self, route: &str) -> Option<&CacheEntry> {
        self.routes.get(route)
    }

    pub fn record(&mut self, route: impl Into<String>, entry: CacheEntry) {
        self.routes.insert(route.into(), entry);
    }
}

/// Routes that resolved to "not found" without ever having had a page
///
/// Kept in memory only and bounded: once full, the oldest miss is dropped.
#[derive(Debug)]
pub struct MissCache {
    capacity: usize,
    entries: HashMap<String, u64>,
}

impl MissCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    /// When the route was last found missing
    pub fn get(&self, route: &str) -> Option<u64> {
        self.entries.get(route).copied()
    }

    pub fn insert(&mut self, route: impl Into<String>, checked_at: u64) {
        let route = route.into();
        if !self.entries.contains_key(&route) && self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, at)| **at)
                .map(|(route, _)| route.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(route, checked_at);
    }

    pub fn remove(&mut self, route: &str) {
        self.entries.remove(route);
    }
}

/// Current unix time in seconds
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_staleness() {
        let entry = CacheEntry::page("index.html", 1_000);
        assert!(!entry.is_stale(1_000, 1800));
        assert!(!entry.is_stale(2_799, 1800));
        assert!(entry.is_stale(2_800, 1800));
        // Clock went backwards
        assert!(!entry.is_stale(10, 1800));
        assert!(entry.is_stale(1_000, 0));
    }

    #[test]
    fn test_record_replaces() {
        let mut cache = PageCache::new();
        assert!(cache.get("/").is_none());

        cache.record("/", CacheEntry::page("index.html", 100));
        cache.record("/", CacheEntry::page("index.html", 200));
        assert_eq!(cache.get("/").map(|e| e.generated_at), Some(200));
        assert_eq!(cache.routes.len(), 1);
    }

    #[test]
    fn test_miss_cache_is_bounded() {
        let mut missing = MissCache::new(3);
        for i in 0..10u64 {
            missing.insert(format!("/post/junk-{}", i), i);
        }
        assert_eq!(missing.entries.len(), 3);
        assert_eq!(missing.get("/post/junk-9"), Some(9));
        assert_eq!(missing.get("/post/junk-0"), None);

        // Refreshing a known miss does not evict anything
        missing.insert("/post/junk-7", 20);
        assert_eq!(missing.entries.len(), 3);
        assert_eq!(missing.get("/post/junk-7"), Some(20));

        missing.remove("/post/junk-7");
        assert_eq!(missing.get("/post/junk-7"), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut cache = PageCache::new();
        cache.record("/", CacheEntry::page("index.html", 42));
        cache.record("/post/gone", CacheEntry::redirect("/", 43));
        cache.save(dir.path()).unwrap();

        let loaded = PageCache::load(dir.path());
        assert_eq!(loaded.routes, cache.routes);
        assert_eq!(
            loaded.get("/post/gone").and_then(|e| e.redirect.as_deref()),
            Some("/")
        );
    }

    #[test]
    fn test_version_mismatch_discards() {
        let dir = TempDir::new().unwrap();
        let mut cache = PageCache::new();
        cache.version = 0;
        cache.record("/", CacheEntry::page("index.html", 1));
        cache.save(dir.path()).unwrap();

        let loaded = PageCache::load(dir.path());
        assert_eq!(loaded.version, PageCache::VERSION);
        assert!(loaded.routes.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(CACHE_DIR)).unwrap();
        fs::write(dir.path().join(CACHE_FILE), "{ not json").unwrap();

        assert!(PageCache::load(dir.path()).routes.is_empty());
    }
}
