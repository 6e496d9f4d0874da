//! # Snapshot Cache
//!
//! Two generations of items:
//! - the visible [`Snapshot`], shared with readers as an `Arc` and never
//!   mutated after publish
//! - the staging generation, filled by an in-progress refresh cycle
//!
//! Readers only ever clone the visible `Arc`, so a request arriving
//! mid-refresh sees the complete previous dataset. `end_cycle` replaces the
//! visible snapshot with one pointer exchange.
//!
//! The visible snapshot can be saved to and restored from a JSON array of
//! items on disk.

use chrono::{DateTime, Utc};
use errors::{CacheError, PersistenceError};
use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::item::Item;

/// An immutable, fully-populated generation of items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    items: HashMap<String, Item>,
    generation: u64,
    published_at: Option<DateTime<Utc>>
}

impl Snapshot {
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Zero for the initial empty snapshot, incremented on every publish.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn items(&self) -> &HashMap<String, Item> {
        &self.items
    }

    /// Items ordered by id.
    pub fn sorted_items(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.values().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }
}

/// Serializes as a JSON array of items ordered by id.
impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.sorted_items())
    }
}

/// Result of one `append` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub added: usize,
    pub duplicates: usize
}

/// Result of restoring persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A non-empty snapshot was restored with this many items.
    Loaded(usize),
    /// Nothing to restore.
    Cold
}

/// Double-buffered item store shared by the refresh scheduler and readers.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    visible: RwLock<Arc<Snapshot>>,
    staging: Mutex<Option<HashMap<String, Item>>>,
    persist_lock: Mutex<()>,
    generation: AtomicU64
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published snapshot. Never waits on a refresh.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.visible.read().clone()
    }

    pub fn is_cycle_active(&self) -> bool {
        self.staging.lock().is_some()
    }

    /// Opens an empty staging generation.
    pub fn begin_cycle(&self) -> Result<(), CacheError> {
        let mut staging = self.staging.lock();
        if staging.is_some() {
            return Err(CacheError::CycleInProgress);
        }
        *staging = Some(HashMap::new());
        Ok(())
    }

    /// Adds items to the staging generation. An id already staged in this
    /// cycle is kept and the newcomer dropped.
    pub fn append<I>(&self, items: I) -> Result<AppendOutcome, CacheError>
    where
        I: IntoIterator<Item = Item>
    {
        let mut guard = self.staging.lock();
        let staging = guard.as_mut().ok_or(CacheError::NoActiveCycle)?;

        let mut outcome = AppendOutcome::default();
        for item in items {
            match staging.entry(item.id.clone()) {
                Entry::Occupied(_) => outcome.duplicates += 1,
                Entry::Vacant(slot) => {
                    slot.insert(item);
                    outcome.added += 1;
                }
            }
        }
        Ok(outcome)
    }

    /// Publishes the staging generation as the new visible snapshot.
    pub fn end_cycle(&self) -> Result<Arc<Snapshot>, CacheError> {
        let mut staging = self.staging.lock();
        let items = staging.take().ok_or(CacheError::NoActiveCycle)?;
        let snapshot = Arc::new(self.next_snapshot(items));

        *self.visible.write() = Arc::clone(&snapshot);
        debug!(
            generation = snapshot.generation(),
            items = snapshot.len(),
            "Published snapshot"
        );
        Ok(snapshot)
    }

    /// Discards the staging generation, leaving the visible snapshot as is.
    /// Returns whether a cycle was open.
    pub fn abandon_cycle(&self) -> bool {
        self.staging.lock().take().is_some()
    }

    fn next_snapshot(&self, items: HashMap<String, Item>) -> Snapshot {
        Snapshot {
            items,
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
            published_at: Some(Utc::now())
        }
    }

    /// Restores a snapshot saved by [`save_persisted`](Self::save_persisted).
    ///
    /// A missing file, a blank file or an empty array is a cold start.
    pub fn load_persisted(&self, path: &Path) -> Result<LoadOutcome, PersistenceError> {
        let _guard = self.persist_lock.lock();

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No persisted snapshot");
                return Ok(LoadOutcome::Cold);
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: path.to_path_buf(),
                    source
                });
            }
        };

        if contents.trim().is_empty() {
            return Ok(LoadOutcome::Cold);
        }

        let items: Vec<Item> =
            serde_json::from_str(&contents).map_err(|source| PersistenceError::Parse {
                path: path.to_path_buf(),
                source
            })?;

        if items.is_empty() {
            return Ok(LoadOutcome::Cold);
        }

        let mut map = HashMap::with_capacity(items.len());
        for item in items {
            map.entry(item.id.clone()).or_insert(item);
        }

        let count = map.len();
        {
            // Serialized with `end_cycle` so generations only move forward.
            let _staging = self.staging.lock();
            let snapshot = Arc::new(self.next_snapshot(map));
            *self.visible.write() = snapshot;
        }

        info!(path = %path.display(), items = count, "Restored persisted snapshot");
        Ok(LoadOutcome::Loaded(count))
    }

    /// Writes the visible snapshot to `path`, replacing it atomically.
    pub fn save_persisted(&self, path: &Path) -> Result<usize, PersistenceError> {
        let _guard = self.persist_lock.lock();
        let snapshot = self.current_snapshot();

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new(".")
        };
        let write_err = |source: std::io::Error| PersistenceError::Write {
            path: path.to_path_buf(),
            source
        };

        let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            serde_json::to_writer(&mut writer, snapshot.as_ref()).map_err(|source| {
                PersistenceError::Encode {
                    path: path.to_path_buf(),
                    source
                }
            })?;
            writer.flush().map_err(write_err)?;
        }
        file.persist(path).map_err(|e| write_err(e.error))?;

        info!(path = %path.display(), items = snapshot.len(), "Saved snapshot");
        Ok(snapshot.len())
    }
}
