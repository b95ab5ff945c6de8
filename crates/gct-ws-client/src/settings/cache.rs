/*
[INPUT]:  Settings snapshots, wall-clock time, a two-slot persistence backend
[OUTPUT]: Time-bounded cached settings (15 minute time-to-live)
[POS]:    Settings layer - client-side freshness cache
[UPDATE]: When changing cache TTL, timestamp format, or storage location
*/

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::model::Settings;
use crate::error::{ClientError, Result};

pub const CACHE_TTL_MINUTES: i64 = 15;
const CACHE_FILE_NAME: &str = "settings-cache.json";
const CACHE_DIR_NAME: &str = "gct-ws-client";

/// The two persisted slots. Always read and written together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSlots {
    pub snapshot: Option<String>,
    pub timestamp: Option<String>,
}

/// Backend for the cache slots.
pub trait CacheStore: Send + Sync {
    fn read(&self) -> Result<CacheSlots>;
    /// Replace both slots in one step.
    fn write(&self, slots: &CacheSlots) -> Result<()>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<CacheSlots>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slots(slots: CacheSlots) -> Self {
        Self {
            slots: Mutex::new(slots),
        }
    }
}

impl CacheStore for MemoryStore {
    fn read(&self) -> Result<CacheSlots> {
        Ok(self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, slots: &CacheSlots) -> Result<()> {
        *self.slots.lock().unwrap_or_else(PoisonError::into_inner) = slots.clone();
        Ok(())
    }
}

/// Single JSON document on disk, replaced atomically via rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `<dir>/settings-cache.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CACHE_FILE_NAME))
    }

    /// Under the platform data directory, e.g. `~/.local/share/gct-ws-client/`.
    pub fn in_default_dir() -> Result<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| ClientError::Config("could not determine data directory".to_string()))?
            .join(CACHE_DIR_NAME);
        Ok(Self::in_dir(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileStore {
    fn read(&self) -> Result<CacheSlots> {
        if !self.path.exists() {
            return Ok(CacheSlots::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, slots: &CacheSlots) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(slots)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Freshness cache for the settings model.
#[derive(Debug)]
pub struct SettingsCache<S: CacheStore = MemoryStore> {
    store: S,
}

impl<S: CacheStore> SettingsCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Valid iff the stored timestamp parses and lies within 15 whole minutes of `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let slots = match self.store.read() {
            Ok(slots) => slots,
            Err(err) => {
                warn!(error = %err, "settings cache unreadable, treating as miss");
                return false;
            }
        };
        timestamp_is_fresh(slots.timestamp.as_deref(), now)
    }

    /// Cached settings if the cache is still fresh.
    pub fn load(&self) -> Option<Settings> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Option<Settings> {
        let slots = match self.store.read() {
            Ok(slots) => slots,
            Err(err) => {
                warn!(error = %err, "settings cache unreadable, treating as miss");
                return None;
            }
        };
        if !timestamp_is_fresh(slots.timestamp.as_deref(), now) {
            debug!("settings cache stale or empty");
            return None;
        }
        match serde_json::from_str(slots.snapshot.as_deref()?) {
            Ok(settings) => Some(settings),
            Err(err) => {
                warn!(error = %err, "cached settings snapshot unparsable");
                None
            }
        }
    }

    pub fn persist(&self, settings: &Settings) -> Result<()> {
        self.persist_at(settings, Utc::now())
    }

    pub fn persist_at(&self, settings: &Settings, now: DateTime<Utc>) -> Result<()> {
        let slots = CacheSlots {
            snapshot: Some(serde_json::to_string(settings)?),
            timestamp: Some(now.to_rfc3339()),
        };
        self.store.write(&slots)?;
        debug!(exchanges = settings.exchanges.len(), "settings cached");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.store.write(&CacheSlots::default())
    }
}

impl SettingsCache<MemoryStore> {
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

fn timestamp_is_fresh(timestamp: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(stored) = timestamp.and_then(|value| DateTime::parse_from_rfc3339(value).ok()) else {
        return false;
    };
    let elapsed = now.signed_duration_since(stored.with_timezone(&Utc));
    elapsed.num_minutes().abs() <= CACHE_TTL_MINUTES
}
