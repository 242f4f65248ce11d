//! Persistent key/value storage abstractions
//!
//! The engine persists its durable state (active plugin, schedules, day/night
//! bounds, cached weather) through the [`KeyValueStore`] port. Every access
//! is best-effort: callers treat failures as non-fatal and keep the
//! in-memory state authoritative.

/// Storage keys for persisted engine state
///
/// Each key has a stable byte value (used by binary backends) and a stable
/// logical name (used by namespace/string backends and for diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// Active plugin id (little-endian i32)
    CurrentPlugin = 0,
    /// Active plugin name (UTF-8)
    PluginName = 1,
    /// Legacy combined schedule (JSON text)
    Schedule = 2,
    /// Day schedule (JSON text)
    ScheduleDay = 3,
    /// Night schedule (JSON text)
    ScheduleNight = 4,
    /// Schedule engine running flag (0/1 as little-endian i32)
    ScheduleActive = 5,
    /// Day start, minutes since local midnight (little-endian i32)
    DayStartMins = 6,
    /// Night start, minutes since local midnight (little-endian i32)
    NightStartMins = 7,
    /// Last good weather reading (postcard)
    WeatherCache = 8,
}

impl StorageKey {
    /// Every key, in byte-value order
    pub const ALL: [StorageKey; 9] = [
        StorageKey::CurrentPlugin,
        StorageKey::PluginName,
        StorageKey::Schedule,
        StorageKey::ScheduleDay,
        StorageKey::ScheduleNight,
        StorageKey::ScheduleActive,
        StorageKey::DayStartMins,
        StorageKey::NightStartMins,
        StorageKey::WeatherCache,
    ];

    /// Get the key as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a key from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Logical name of the key inside the storage namespace
    pub fn name(self) -> &'static str {
        match self {
            StorageKey::CurrentPlugin => "current-plugin",
            StorageKey::PluginName => "plugin_name",
            StorageKey::Schedule => "schedule",
            StorageKey::ScheduleDay => "schedule_day",
            StorageKey::ScheduleNight => "schedule_night",
            StorageKey::ScheduleActive => "scheduleactive",
            StorageKey::DayStartMins => "dayStartMins",
            StorageKey::NightStartMins => "nightStartMins",
            StorageKey::WeatherCache => "weather-cache",
        }
    }
}

/// Errors from key/value storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Flash operation failed
    Flash,
    /// Storage operation failed
    Storage,
    /// Key not found
    NotFound,
    /// Buffer too small for the data
    BufferTooSmall,
    /// Data corrupted or invalid
    Corrupted,
    /// Storage is full
    Full,
}

/// Key/value storage port
///
/// Implementations are expected to be quick enough to call from the
/// periodic tick. They must not retry internally.
pub trait KeyValueStore {
    /// Read a value by key into the provided buffer
    ///
    /// Returns the number of bytes read, [`StorageError::NotFound`] when the
    /// key was never written (or was removed), or
    /// [`StorageError::BufferTooSmall`] when `buffer` cannot hold the value.
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value by key, replacing any previous value
    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&mut self, key: StorageKey) -> Result<(), StorageError>;

    /// Check if a key exists in storage
    fn exists(&mut self, key: StorageKey) -> bool {
        !matches!(self.read(key, &mut []), Err(StorageError::NotFound))
    }

    /// Erase all stored data
    fn erase_all(&mut self) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &mut T {
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, StorageError> {
        (**self).read(key, buffer)
    }

    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError> {
        (**self).write(key, data)
    }

    fn remove(&mut self, key: StorageKey) -> Result<(), StorageError> {
        (**self).remove(key)
    }

    fn exists(&mut self, key: StorageKey) -> bool {
        (**self).exists(key)
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        (**self).erase_all()
    }
}

/// Store used when the board has no persistent storage
///
/// Reads always miss, writes are accepted and dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

impl KeyValueStore for NoopStore {
    fn read(&mut self, _key: StorageKey, _buffer: &mut [u8]) -> Result<usize, StorageError> {
        Err(StorageError::NotFound)
    }

    fn write(&mut self, _key: StorageKey, _data: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove(&mut self, _key: StorageKey) -> Result<(), StorageError> {
        Ok(())
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

// Implement the sequential-storage Key trait when flash support is enabled
#[cfg(feature = "flash")]
impl sequential_storage::map::Key for StorageKey {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        buffer[0] = self.as_u8();
        Ok(1)
    }

    fn deserialize_from(
        buffer: &[u8],
    ) -> Result<(Self, usize), sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        match StorageKey::from_u8(buffer[0]) {
            Some(key) => Ok((key, 1)),
            None => Err(sequential_storage::map::SerializationError::InvalidFormat),
        }
    }
}
