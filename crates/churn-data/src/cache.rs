//! Dataset Cache with LRU eviction
//!
//! Keeps parsed datasets keyed by source path so repeated tool calls do not
//! re-read the CSV. Entries are dropped on demand (`invalidate`, `clear`) and
//! whenever the file's modification time no longer matches the cached one.
//! Cached datasets are immutable and shared as `Arc<Dataset>`.

use churn_core::{Error, Result};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;
use tracing::{debug, info};

use crate::dataset::Dataset;

#[derive(Debug, Clone)]
struct CachedDataset {
    dataset: Arc<Dataset>,
    /// Modification time of the file when it was parsed
    modified: Option<SystemTime>,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

struct Inner {
    entries: LruCache<PathBuf, CachedDataset>,
    stats: CacheStats,
}

/// Path-keyed dataset cache
pub struct DatasetCache {
    inner: Mutex<Inner>,
    enabled: bool,
}

impl DatasetCache {
    /// Create a cache holding up to `capacity` datasets
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
            enabled: true,
        }
    }

    /// A cache that always reloads from disk
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(1)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the dataset at `path`, parsing it if it is not cached or the
    /// file changed since it was cached.
    pub fn load(&self, path: &Path) -> Result<Arc<Dataset>> {
        if !self.enabled {
            return Ok(Arc::new(Dataset::from_path(path)?));
        }

        let modified = modified_time(path);

        {
            let mut inner = self.lock()?;
            let fresh = inner
                .entries
                .get(path)
                .filter(|entry| entry.modified == modified)
                .map(|entry| entry.dataset.clone());
            if let Some(dataset) = fresh {
                inner.stats.hits += 1;
                debug!(path = %path.display(), "Dataset cache hit");
                return Ok(dataset);
            }
            inner.stats.misses += 1;
        }

        // Parse outside the lock so other paths stay available.
        let dataset = Arc::new(Dataset::from_path(path)?);

        let mut inner = self.lock()?;
        inner.entries.put(
            path.to_path_buf(),
            CachedDataset {
                dataset: dataset.clone(),
                modified,
            },
        );
        debug!(path = %path.display(), "Dataset cached");
        Ok(dataset)
    }

    /// Drop the cached entry for `path`. Returns whether one existed.
    pub fn invalidate(&self, path: &Path) -> bool {
        match self.lock() {
            Ok(mut inner) => {
                let removed = inner.entries.pop(path).is_some();
                if removed {
                    inner.stats.invalidations += 1;
                    info!(path = %path.display(), "Dataset cache entry invalidated");
                }
                removed
            }
            Err(_) => false,
        }
    }

    /// Drop every cached dataset
    pub fn clear(&self) {
        if let Ok(mut inner) = self.lock() {
            inner.entries.clear();
            info!("Dataset cache cleared");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock()
            .map(|inner| inner.stats.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::internal("dataset cache lock poisoned"))
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(8)
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
