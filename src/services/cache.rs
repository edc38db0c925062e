use crate::models::{CacheEntry, CacheStats};
use log::{debug, info, warn};
use std::fs;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Which of the two package documents a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Full,
    Abbreviated,
}

impl ManifestKind {
    fn filename(&self) -> &'static str {
        match self {
            ManifestKind::Full => "full.json",
            ManifestKind::Abbreviated => "abbreviated.json",
        }
    }
}

/// File-backed cache of serialized package manifests, keyed by fullname.
/// Entries are evicted by the cache-cleaner event handler whenever a
/// package changes. Each eviction bumps the package's generation; a
/// document read before that bump is not stored.
#[derive(Debug)]
pub struct ManifestCacheService {
    enabled: bool,
    cache_dir: PathBuf,
    generations: Mutex<HashMap<String, u64>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl ManifestCacheService {
    pub fn new(cache_dir: impl Into<PathBuf>, enabled: bool) -> Result<Self, std::io::Error> {
        let cache_dir = cache_dir.into();
        if enabled {
            fs::create_dir_all(&cache_dir)?;
            info!("Manifest cache initialized at: {}", cache_dir.display());
        }

        Ok(Self {
            enabled,
            cache_dir,
            generations: Mutex::new(HashMap::new()),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn generations(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.generations.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take before reading the documents that are about to be cached
    pub fn generation(&self, fullname: &str) -> u64 {
        self.generations().get(fullname).copied().unwrap_or_default()
    }

    pub fn get_package_dir(&self, fullname: &str) -> PathBuf {
        // @scope/name nests one directory deeper, which is fine
        self.cache_dir.join("packages").join(fullname)
    }

    fn get_cache_path(&self, fullname: &str, kind: ManifestKind) -> PathBuf {
        self.get_package_dir(fullname).join(kind.filename())
    }

    fn get_etag_path(&self, fullname: &str, kind: ManifestKind) -> PathBuf {
        self.get_package_dir(fullname)
            .join(format!("{}.etag", kind.filename()))
    }

    pub fn get(&self, fullname: &str, kind: ManifestKind) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }

        let cache_path = self.get_cache_path(fullname, kind);
        let entry = fs::read(&cache_path).and_then(|data| {
            let etag = fs::read_to_string(self.get_etag_path(fullname, kind))?;
            Ok(CacheEntry { data, etag })
        });

        match entry {
            Ok(entry) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {fullname} ({kind:?}, {} bytes)", entry.data.len());
                Some(entry)
            }
            Err(e) => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read cache entry {}: {e}", cache_path.display());
                }
                debug!("Cache miss for {fullname} ({kind:?})");
                None
            }
        }
    }

    pub fn save(&self, fullname: &str, kind: ManifestKind, entry: &CacheEntry) -> Result<(), std::io::Error> {
        if !self.enabled {
            return Ok(());
        }

        let cache_path = self.get_cache_path(fullname, kind);
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        // etag last, so a torn write reads as a miss
        fs::write(&cache_path, &entry.data)?;
        fs::write(self.get_etag_path(fullname, kind), &entry.etag)?;
        debug!("Cached {fullname} ({kind:?}, {} bytes)", entry.data.len());
        Ok(())
    }

    /// Stores `entry` unless the package was evicted after `generation`
    /// was taken. Returns whether it was stored.
    pub fn save_if_current(
        &self,
        fullname: &str,
        kind: ManifestKind,
        entry: &CacheEntry,
        generation: u64,
    ) -> Result<bool, std::io::Error> {
        let generations = self.generations();
        if generations.get(fullname).copied().unwrap_or_default() != generation {
            debug!("Skipped caching stale manifests of {fullname}");
            return Ok(false);
        }
        self.save(fullname, kind, entry)?;
        drop(generations);
        Ok(true)
    }

    /// Drops both cached documents of a package
    pub fn remove_cache(&self, fullname: &str) -> Result<(), std::io::Error> {
        let mut generations = self.generations();
        *generations.entry(fullname.to_string()).or_default() += 1;
        for kind in [ManifestKind::Full, ManifestKind::Abbreviated] {
            remove_if_exists(&self.get_etag_path(fullname, kind))?;
            remove_if_exists(&self.get_cache_path(fullname, kind))?;
        }
        debug!("Evicted cached manifests of {fullname}");
        Ok(())
    }

    pub fn get_stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.enabled,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<(), std::io::Error> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
