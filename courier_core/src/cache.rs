//! Capacity-bounded key/value cache with per-entry expiration and a JSON
//! snapshot on disk.
//!
//! Expiration is lazy: an expired entry stays resident until it is looked up,
//! evicted by the capacity bound, or left out of a snapshot.

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

mod clock;
mod lru;

pub use clock::{Clock, ManualClock, SystemClock};
use lru::LruStore;

const DEFAULT_NAME: &str = "temporary";
const DEFAULT_CAPACITY: usize = 50;
const DEFAULT_TTL_SECS: u64 = 12 * 60 * 60;
const FILE_EXTENSION: &str = "cache";

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CacheError {
    #[error("cache file io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache snapshot encoding: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("replace cache file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Snapshot file stem.
    pub name: String,
    pub capacity: usize,
    pub ttl_secs: u64,
    /// Snapshot directory; the platform cache directory when unset.
    pub dir: Option<PathBuf>,
    pub persist_on_drop: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            capacity: DEFAULT_CAPACITY,
            ttl_secs: DEFAULT_TTL_SECS,
            dir: None,
            persist_on_drop: false,
        }
    }
}

impl CacheConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.clone(),
            None => dirs_next::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("courier"),
        }
    }

    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.snapshot_dir().join(format!("{name}.{FILE_EXTENSION}"))
    }
}

pub type EvictionHook<K> = Arc<dyn Fn(&K) + Send + Sync>;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Entry<K, V> {
    key: K,
    value: V,
    expires_at: DateTime<Utc>,
}

/// Keys resident in the bounded store; the index snapshots are built from.
struct KeyTracker<K> {
    keys: HashSet<K>,
}

impl<K: Eq + Hash> KeyTracker<K> {
    fn evicted(&mut self, key: &K) {
        self.keys.remove(key);
    }
}

struct CacheState<K, V> {
    store: LruStore<K, Entry<K, V>>,
    tracker: KeyTracker<K>,
}

pub struct TtlCache<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
    C: Clock,
{
    config: CacheConfig,
    ttl: TimeDelta,
    clock: C,
    state: Mutex<CacheState<K, V>>,
    on_evict: Option<EvictionHook<K>>,
}

impl<K, V> TtlCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// New cache seeded from its snapshot (a missing snapshot yields an empty cache).
    pub fn open(config: CacheConfig) -> Result<Self, CacheError> {
        let cache = Self::new(config);
        cache.restore()?;
        Ok(cache)
    }
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
    C: Clock,
{
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        let ttl = TimeDelta::from_std(config.ttl()).unwrap_or(TimeDelta::MAX);
        Self {
            state: Mutex::new(CacheState {
                store: LruStore::new(config.capacity),
                tracker: KeyTracker {
                    keys: HashSet::new(),
                },
            }),
            config,
            ttl,
            clock,
            on_evict: None,
        }
    }

    /// Called with the key of every entry the capacity bound pushes out.
    pub fn with_eviction_hook(mut self, hook: impl Fn(&K) + Send + Sync + 'static) -> Self {
        self.on_evict = Some(Arc::new(hook));
        self
    }

    #[inline]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<K, V>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, key: K, value: V) {
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.insert_entry(
            Entry {
                key,
                value,
                expires_at,
            },
            false,
        );
    }

    /// With `keep_fresher`, a resident entry that expires no earlier than
    /// `entry` wins and nothing is stored. Returns whether `entry` was stored.
    fn insert_entry(&self, entry: Entry<K, V>, keep_fresher: bool) -> bool {
        let evicted = {
            let mut st = self.lock();
            if keep_fresher
                && st
                    .store
                    .peek(&entry.key)
                    .is_some_and(|resident| resident.expires_at >= entry.expires_at)
            {
                return false;
            }
            st.tracker.keys.insert(entry.key.clone());
            let evicted = st.store.insert(entry.key.clone(), entry);
            if let Some((k, _)) = &evicted {
                st.tracker.evicted(k);
            }
            evicted
        };
        if let Some((key, _)) = evicted {
            tracing::debug!(target: "courier::cache", cache = %self.config.name, "entry evicted by capacity bound");
            if let Some(hook) = &self.on_evict {
                hook(&key);
            }
        }
        true
    }

    /// `None` when absent or expired; an expired entry is dropped on the way out.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut st = self.lock();
        let expired = now >= st.store.peek(key)?.expires_at;
        if expired {
            st.store.remove(key);
            st.tracker.keys.remove(key);
            tracing::trace!(target: "courier::cache", cache = %self.config.name, "expired entry dropped on lookup");
            return None;
        }
        st.store.get(key).map(|e| e.value.clone())
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut st = self.lock();
        st.tracker.keys.remove(key);
        st.store.remove(key).map(|e| e.value)
    }

    pub fn len(&self) -> usize {
        self.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tracked_keys(&self) -> Vec<K> {
        self.lock().tracker.keys.iter().cloned().collect()
    }

    pub fn is_tracked(&self, key: &K) -> bool {
        self.lock().tracker.keys.contains(key)
    }

    /// Entries that are tracked, resident and not yet expired.
    fn live_entries(&self) -> Vec<Entry<K, V>> {
        let now = self.clock.now();
        let st = self.lock();
        st.tracker
            .keys
            .iter()
            .filter_map(|k| st.store.peek(k))
            .filter(|e| now < e.expires_at)
            .cloned()
            .collect()
    }

    pub fn persist(&self) -> Result<usize, CacheError> {
        let name = self.config.name.clone();
        self.persist_as(&name)
    }

    /// Writes `{dir}/{name}.cache`, replacing any previous snapshot atomically.
    pub fn persist_as(&self, name: &str) -> Result<usize, CacheError> {
        let entries = self.live_entries();
        let dir = self.config.snapshot_dir();
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut w = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut w, &entries)?;
            w.flush()?;
        }
        let path = self.config.snapshot_path(name);
        tmp.persist(&path)?;
        tracing::debug!(target: "courier::cache", path = %path.display(), entries = entries.len(), "cache persisted");
        Ok(entries.len())
    }

    pub fn restore(&self) -> Result<usize, CacheError> {
        let name = self.config.name.clone();
        self.restore_from(&name)
    }

    /// Re-inserts snapshot entries with their original expiration; entries
    /// are not filtered by age here. A key already resident with a later or
    /// equal expiration keeps its current value. Returns the entries applied.
    pub fn restore_from(&self, name: &str) -> Result<usize, CacheError> {
        let path = self.config.snapshot_path(name);
        let file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let entries: Vec<Entry<K, V>> = serde_json::from_reader(BufReader::new(file))?;
        let total = entries.len();
        let count = entries
            .into_iter()
            .map(|entry| self.insert_entry(entry, true))
            .filter(|applied| *applied)
            .count();
        tracing::debug!(target: "courier::cache", path = %path.display(), entries = count, skipped = total - count, "cache restored");
        Ok(count)
    }
}

impl<K, V, C> fmt::Debug for TtlCache<K, V, C>
where
    K: Eq + Hash + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.config.name)
            .field("capacity", &self.config.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl<K, V, C> Drop for TtlCache<K, V, C>
where
    K: Eq + Hash + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
    C: Clock,
{
    fn drop(&mut self) {
        if !self.config.persist_on_drop {
            return;
        }
        if let Err(e) = self.persist() {
            tracing::warn!(target: "courier::cache", cache = %self.config.name, error = %e, "failed to persist cache on drop");
        }
    }
}
