//! Flash-backed key/value store
//!
//! Uses sequential-storage for wear-levelled key/value storage in a
//! dedicated flash partition. The engine's storage port is synchronous, so
//! each async map operation is driven to completion with
//! [`embassy_futures::block_on`]. Flash operations finish in bounded time
//! and never retry.
//!
//! Removal is recorded as a zero-length value so plain (non-multiwrite)
//! NOR flash is sufficient; zero-length values read back as
//! [`StorageError::NotFound`].

use core::ops::Range;

use embassy_futures::block_on;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

use crate::storage::{KeyValueStore, StorageError, StorageKey};

/// Largest value (plus item header) the store can hold
pub const DATA_BUFFER_SIZE: usize = 2048;

/// Wear-levelled key/value store on NOR flash
pub struct FlashStore<F> {
    flash: F,
    range: Range<u32>,
    buffer: [u8; DATA_BUFFER_SIZE],
}

impl<F: NorFlash> FlashStore<F> {
    /// Create a store over `range` of `flash`
    ///
    /// The range must be aligned to the flash erase size and span at least
    /// two erase pages.
    pub fn new(flash: F, range: Range<u32>) -> Self {
        Self {
            flash,
            range,
            buffer: [0u8; DATA_BUFFER_SIZE],
        }
    }

    /// Get the raw flash for low-level access
    pub fn flash(&mut self) -> &mut F {
        &mut self.flash
    }
}

fn map_error<E>(error: sequential_storage::Error<E>) -> StorageError {
    match error {
        sequential_storage::Error::FullStorage => StorageError::Full,
        _ => StorageError::Storage,
    }
}

impl<F: NorFlash> KeyValueStore for FlashStore<F> {
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, StorageError> {
        let result = block_on(map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &key,
        ));

        match result {
            Ok(Some(data)) if data.is_empty() => Err(StorageError::NotFound),
            Ok(Some(data)) => {
                let len = data.len();
                if buffer.len() < len {
                    return Err(StorageError::BufferTooSmall);
                }
                buffer[..len].copy_from_slice(data);
                Ok(len)
            }
            Ok(None) => Err(StorageError::NotFound),
            Err(e) => Err(map_error(e)),
        }
    }

    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError> {
        block_on(map::store_item(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &key,
            &data,
        ))
        .map_err(map_error)
    }

    fn remove(&mut self, key: StorageKey) -> Result<(), StorageError> {
        let empty: &[u8] = &[];
        self.write(key, empty)
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        let Range { start, end } = self.range.clone();
        block_on(self.flash.erase(start, end)).map_err(|_| StorageError::Flash)
    }
}
