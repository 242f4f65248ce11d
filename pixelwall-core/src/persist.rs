//! Best-effort persistence helpers
//!
//! Typed accessors over the [`KeyValueStore`] port. Every helper absorbs
//! storage failures: reads turn into `None`, writes are logged and dropped.
//! In-memory state stays authoritative for the running session.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use pixelwall_hal::{KeyValueStore, StorageError, StorageKey};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Largest value read back from the store
pub const MAX_VALUE_LEN: usize = 2048;

fn load_bytes<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey) -> Option<Vec<u8>> {
    let mut buffer = vec![0u8; MAX_VALUE_LEN];
    match store.read(key, &mut buffer) {
        Ok(len) => {
            buffer.truncate(len);
            Some(buffer)
        }
        Err(StorageError::NotFound) => {
            trace!("Key {} not stored", key.name());
            None
        }
        Err(e) => {
            warn!("Failed to read {}: {}", key.name(), e);
            None
        }
    }
}

fn store_bytes<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey, data: &[u8]) {
    if let Err(e) = store.write(key, data) {
        warn!("Failed to write {}: {}", key.name(), e);
    }
}

/// Read a little-endian `i32`
pub fn load_i32<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey) -> Option<i32> {
    let bytes = load_bytes(store, key)?;
    let raw: [u8; 4] = bytes.as_slice().try_into().ok()?;
    Some(i32::from_le_bytes(raw))
}

/// Write a little-endian `i32`
pub fn store_i32<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey, value: i32) {
    store_bytes(store, key, &value.to_le_bytes());
}

/// Read a non-empty UTF-8 string
pub fn load_string<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey) -> Option<String> {
    let bytes = load_bytes(store, key)?;
    match String::from_utf8(bytes) {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(_) => {
            warn!("Stored {} is not valid UTF-8", key.name());
            None
        }
    }
}

/// Write a UTF-8 string
pub fn store_str<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey, value: &str) {
    store_bytes(store, key, value.as_bytes());
}

/// Read a postcard-encoded value
pub fn load_postcard<S, T>(store: &mut S, key: StorageKey) -> Option<T>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    let bytes = load_bytes(store, key)?;
    match postcard::from_bytes(&bytes) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Stored {} failed to decode", key.name());
            None
        }
    }
}

/// Write a postcard-encoded value
pub fn store_postcard<S, T>(store: &mut S, key: StorageKey, value: &T)
where
    S: KeyValueStore + ?Sized,
    T: Serialize,
{
    match postcard::to_allocvec(value) {
        Ok(bytes) => store_bytes(store, key, &bytes),
        Err(_) => warn!("Failed to encode {}", key.name()),
    }
}

/// Forget a key
pub fn remove<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey) {
    if let Err(e) = store.remove(key) {
        warn!("Failed to remove {}: {}", key.name(), e);
    }
}

/// Erase the whole store
pub fn erase_all<S: KeyValueStore + ?Sized>(store: &mut S) {
    if let Err(e) = store.erase_all() {
        warn!("Failed to erase storage: {}", e);
    }
}

/// RAM-backed key/value store
///
/// Holds values for the lifetime of the process. Cloning a store models a
/// restart that keeps the persisted contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<StorageKey, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.entries.get(&key).ok_or(StorageError::NotFound)?;
        if buffer.len() < data.len() {
            return Err(StorageError::BufferTooSmall);
        }
        buffer[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError> {
        self.entries.insert(key, data.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: StorageKey) -> Result<(), StorageError> {
        self.entries.remove(&key);
        Ok(())
    }

    fn exists(&mut self, key: StorageKey) -> bool {
        self.entries.contains_key(&key)
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        self.entries.clear();
        Ok(())
    }
}
