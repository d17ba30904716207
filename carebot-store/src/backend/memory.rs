//! In-memory backend for tests and local runs.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::debug;

use super::traits::KeyValueBackend;
use crate::error::{StoreError, StoreResult};

/// In-memory backend.
///
/// Counts every call and can be switched offline to exercise failure paths.
pub struct MemoryBackend {
    id: String,
    entries: DashMap<String, String>,
    available: AtomicBool,
    get_count: AtomicU32,
    set_count: AtomicU32,
    delete_count: AtomicU32,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::with_id("memory")
    }

    /// Create an empty backend with a custom identifier.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: DashMap::new(),
            available: AtomicBool::new(true),
            get_count: AtomicU32::new(0),
            set_count: AtomicU32::new(0),
            delete_count: AtomicU32::new(0),
        }
    }

    /// Seed a raw value, bypassing the counters.
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Switch the backend on or off. An offline backend fails every call.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Raw value currently stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// All keys currently holding a value, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Number of `get` calls so far.
    pub fn get_count(&self) -> u32 {
        self.get_count.load(Ordering::SeqCst)
    }

    /// Number of `set` calls so far.
    pub fn set_count(&self) -> u32 {
        self.set_count.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls so far.
    pub fn delete_count(&self) -> u32 {
        self.delete_count.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Backend(format!("{} backend offline", self.id)))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        debug!("Setting {} to {}", key, value);
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.delete_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        debug!("Deleting {}", key);
        self.entries.remove(key);
        Ok(())
    }
}
