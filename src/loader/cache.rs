use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use super::{normalize, source, LoadError};
use crate::models::Dataset;

/// Identity of a source file's contents as seen by the filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSignature {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl SourceSignature {
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

/// How to read a source
#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    pub header_row: usize,
    pub csv_delimiter: u8,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            header_row: 5,
            csv_delimiter: b';',
        }
    }
}

/// Result of a load at the cache boundary. The dataset is empty when `error` is set.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub dataset: Arc<Dataset>,
    pub error: Option<String>,
    pub from_cache: bool,
}

#[derive(Debug, Default)]
struct Slot {
    signature: Option<SourceSignature>,
    dataset: Option<Arc<Dataset>>,
}

/// Per-process dataset cache keyed by canonical path.
///
/// Each path has its own slot lock, so concurrent callers for the same file
/// wait for a single load instead of reading it twice. An entry is reused
/// only while the file's signature is unchanged. Failed loads are not cached.
#[derive(Debug, Default)]
pub struct DatasetCache {
    options: LoaderOptions,
    slots: DashMap<PathBuf, Arc<Mutex<Slot>>>,
}

impl DatasetCache {
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            options,
            slots: DashMap::new(),
        }
    }

    /// Loads (or reuses) a dataset. Never fails: errors come back as an empty
    /// dataset plus the reason.
    pub fn load(&self, path: impl AsRef<Path>) -> LoadReport {
        let path = path.as_ref();
        match self.try_load(path) {
            Ok((dataset, from_cache)) => LoadReport {
                dataset,
                error: None,
                from_cache,
            },
            Err(e) => {
                tracing::error!("[LOAD] Failed to load composition sheet {}: {}", path.display(), e);
                LoadReport {
                    dataset: Arc::new(Dataset::empty()),
                    error: Some(e.to_string()),
                    from_cache: false,
                }
            }
        }
    }

    /// Same as [`DatasetCache::load`] but with the error channel exposed.
    /// The flag is true when the dataset came from the cache.
    pub fn try_load(&self, path: &Path) -> Result<(Arc<Dataset>, bool), LoadError> {
        let key = std::fs::canonicalize(path)?;
        let slot = {
            let entry = self.slots.entry(key.clone()).or_default();
            Arc::clone(entry.value())
        };

        // held for the whole load: other callers for this path block here
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let signature = SourceSignature::of(&key)?;

        if guard.signature == Some(signature) {
            if let Some(dataset) = &guard.dataset {
                tracing::debug!("[LOAD] Cache hit for {}", key.display());
                return Ok((Arc::clone(dataset), true));
            }
        }

        tracing::info!("[LOAD] Reading composition sheet {}", key.display());
        let start = std::time::Instant::now();
        let table = source::read_table(&key, self.options.header_row, self.options.csv_delimiter)?;
        let dataset = Arc::new(normalize::build_dataset(&table)?);
        tracing::info!(
            "[LOAD] {} compositions loaded in {:?}",
            dataset.len(),
            start.elapsed()
        );

        guard.signature = Some(signature);
        guard.dataset = Some(Arc::clone(&dataset));
        Ok((dataset, false))
    }

    /// Drops the cached dataset for a path; returns whether one was present
    pub fn invalidate(&self, path: impl AsRef<Path>) -> bool {
        let key = std::fs::canonicalize(path.as_ref()).unwrap_or_else(|_| path.as_ref().to_path_buf());
        self.slots.remove(&key).is_some()
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Number of paths with a dataset currently cached
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .lock()
                    .map(|slot| slot.dataset.is_some())
                    .unwrap_or(false)
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
