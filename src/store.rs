//! Local persistence for in-progress checkout data.
//!
//! The store is the only channel between steps besides explicit identifiers. Each
//! [`StorageKey`] documents which step writes it and which steps read it.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Closed set of keys the portal persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Written by the auto-saver while the quote form is edited; read by the quote form on
    /// load and by the editable checkout.
    ShipmentDraft,
    /// Written by quote acquisition (and editable checkout re-quotes); read by quote
    /// selection and checkout.
    QuoteSearch,
    /// Written by quote selection; read by checkout.
    SelectedQuote,
    /// Written by quote acquisition; read by quote selection.
    QuotesCache,
    /// Written by checkout after a shipment is created; read by checkout to prefill
    /// contact fields.
    LastAddresses,
}

impl StorageKey {
    pub const ALL: [StorageKey; 5] = [
        StorageKey::ShipmentDraft,
        StorageKey::QuoteSearch,
        StorageKey::SelectedQuote,
        StorageKey::QuotesCache,
        StorageKey::LastAddresses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::ShipmentDraft => "shipment-draft",
            StorageKey::QuoteSearch => "quote-search",
            StorageKey::SelectedQuote => "selected-quote",
            StorageKey::QuotesCache => "quotes-cache",
            StorageKey::LastAddresses => "last-addresses",
        }
    }
}

/// Raw text storage behind a [`DraftStore`]
pub trait StoreBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Process-local backend, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        Ok(())
    }
}

/// Backend keeping every key in one JSON object on disk, so drafts survive restarts.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StoreBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, value: String) -> Result<(), StoreError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.persist(&HashMap::new())
    }
}

#[derive(Serialize, Deserialize)]
struct Expiring<T> {
    value: T,
    /// Unix milliseconds
    expiry: i64,
}

/// Typed JSON access over a [`StoreBackend`]. Last writer wins.
#[derive(Clone)]
pub struct DraftStore {
    backend: Arc<dyn StoreBackend>,
}

impl DraftStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileBackend::new(path)))
    }

    pub fn set<T: Serialize>(&self, key: StorageKey, value: &T) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(value)?;
        self.backend.write(key.as_str(), serialized)?;
        debug!(key = key.as_str(), "stored value");
        Ok(())
    }

    /// Returns `None` when the key is absent or its value cannot be read back.
    pub fn get<T: DeserializeOwned>(&self, key: StorageKey) -> Option<T> {
        let raw = self.read_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "discarding unreadable stored value");
                None
            }
        }
    }

    pub fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
        self.backend.delete(key.as_str())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.clear()
    }

    pub fn set_with_expiry<T: Serialize>(
        &self,
        key: StorageKey,
        value: &T,
        ttl_minutes: i64,
    ) -> Result<(), StoreError> {
        self.set_with_expiry_at(key, value, Utc::now() + Duration::minutes(ttl_minutes))
    }

    pub fn set_with_expiry_at<T: Serialize>(
        &self,
        key: StorageKey,
        value: &T,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.set(
            key,
            &Expiring {
                value,
                expiry: expires_at.timestamp_millis(),
            },
        )
    }

    pub fn get_with_expiry<T: DeserializeOwned>(&self, key: StorageKey) -> Option<T> {
        self.get_with_expiry_at(key, Utc::now())
    }

    /// Reading past the expiry deletes the entry.
    pub fn get_with_expiry_at<T: DeserializeOwned>(
        &self,
        key: StorageKey,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let item: Expiring<T> = self.get(key)?;

        if now.timestamp_millis() > item.expiry {
            if let Err(err) = self.remove(key) {
                warn!(key = key.as_str(), error = %err, "failed to drop expired value");
            }
            return None;
        }

        Some(item.value)
    }

    fn read_raw(&self, key: StorageKey) -> Option<String> {
        match self.backend.read(key.as_str()) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "failed to read stored value");
                None
            }
        }
    }
}
