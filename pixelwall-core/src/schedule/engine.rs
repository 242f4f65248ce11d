//! Day/night playlist rotation
//!
//! The engine never touches the plugin manager itself. Every operation that
//! may change the active plugin returns the id to switch to, and the caller
//! applies it. This keeps the engine free of hardware types and makes each
//! transition observable in tests.

use alloc::vec::Vec;

use pixelwall_hal::{Clock, KeyValueStore, StorageKey};
use pixelwall_protocol::{parse_schedule, parse_schedule_str, schedule_to_json, Period};
use serde_json::Value;

use super::item::{entries_from_items, items_from_entries, ScheduleItem};
use super::period::{parse_clock, DayNightBounds};
use super::ScheduleError;
use crate::persist;
use crate::plugin::PluginId;

/// Engine run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
}

/// Rotates plugins through the playlist of the current period
#[derive(Debug, Clone)]
pub struct ScheduleEngine {
    day: Vec<ScheduleItem>,
    night: Vec<ScheduleItem>,
    bounds: DayNightBounds,
    /// Period the active schedule was last built for
    period: Period,
    index: usize,
    last_switch_ms: u64,
    state: EngineState,
}

impl Default for ScheduleEngine {
    fn default() -> Self {
        Self::new(DayNightBounds::default())
    }
}

impl ScheduleEngine {
    /// Create a stopped engine with empty playlists
    pub fn new(bounds: DayNightBounds) -> Self {
        Self {
            day: Vec::new(),
            night: Vec::new(),
            bounds,
            period: Period::Day,
            index: 0,
            last_switch_ms: 0,
            state: EngineState::Stopped,
        }
    }

    /// Load persisted playlists, bounds and run flag
    ///
    /// When neither a day nor a night playlist is stored but a legacy
    /// combined one is, it is copied into both and the copies are persisted
    /// so the migration happens once.
    pub fn init<C, S>(&mut self, clock: &C, store: &mut S) -> Option<PluginId>
    where
        C: Clock + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        let day = load_items(store, StorageKey::ScheduleDay);
        let night = load_items(store, StorageKey::ScheduleNight);

        match (day, night) {
            (None, None) => {
                if let Some(legacy) = load_items(store, StorageKey::Schedule) {
                    info!("Migrating legacy schedule with {} items", legacy.len());
                    self.day = legacy.clone();
                    self.night = legacy;
                    store_items(store, StorageKey::ScheduleDay, &self.day);
                    store_items(store, StorageKey::ScheduleNight, &self.night);
                }
            }
            (day, night) => {
                self.day = day.unwrap_or_default();
                self.night = night.unwrap_or_default();
            }
        }

        let day_start = load_minutes(store, StorageKey::DayStartMins).unwrap_or(self.bounds.day_start);
        let night_start =
            load_minutes(store, StorageKey::NightStartMins).unwrap_or(self.bounds.night_start);
        if let Some(bounds) = DayNightBounds::new(day_start, night_start) {
            self.bounds = bounds;
        }

        self.state = if persist::load_i32(store, StorageKey::ScheduleActive) == Some(1) {
            debug!("Resuming schedule");
            EngineState::Running
        } else {
            EngineState::Stopped
        };
        self.reconcile_period(clock, true)
    }

    /// Start rotating from the first item of the current period
    ///
    /// Does nothing if the current period's playlist is empty.
    pub fn start<C, S>(&mut self, clock: &C, store: &mut S) -> Option<PluginId>
    where
        C: Clock + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        let was_running = self.is_running();
        self.state = EngineState::Stopped;
        self.reconcile_period(clock, true);

        if self.active_schedule().is_empty() {
            if was_running {
                self.state = EngineState::Running;
            }
            debug!("Nothing scheduled for the current period");
            return None;
        }

        self.index = 0;
        self.last_switch_ms = clock.uptime_ms();
        self.state = EngineState::Running;
        persist::store_i32(store, StorageKey::ScheduleActive, 1);
        info!("Schedule started");
        self.current_plugin()
    }

    /// Stop rotating; the active plugin is left alone
    pub fn stop<S: KeyValueStore + ?Sized>(&mut self, store: &mut S) {
        self.state = EngineState::Stopped;
        persist::store_i32(store, StorageKey::ScheduleActive, 0);
        info!("Schedule stopped");
    }

    /// Stop rotating and rewind, optionally forgetting both playlists
    pub fn clear<S: KeyValueStore + ?Sized>(&mut self, erase: bool, store: &mut S) {
        self.index = 0;
        self.state = EngineState::Stopped;
        persist::store_i32(store, StorageKey::ScheduleActive, 0);

        if erase {
            self.day.clear();
            self.night.clear();
            persist::remove(store, StorageKey::Schedule);
            persist::remove(store, StorageKey::ScheduleDay);
            persist::remove(store, StorageKey::ScheduleNight);
            info!("Schedule erased");
        }
    }

    /// Advance the rotation
    ///
    /// Reconciles the period first so a boundary crossed while running
    /// swaps playlists immediately.
    pub fn tick<C: Clock + ?Sized>(&mut self, clock: &C) -> Option<PluginId> {
        if let Some(id) = self.reconcile_period(clock, false) {
            return Some(id);
        }
        if !self.is_running() {
            return None;
        }

        let now = clock.uptime_ms();
        let len = self.active_schedule().len();
        let item = self.active_schedule().get(self.index)?;
        if now.saturating_sub(self.last_switch_ms) < item.duration_ms {
            return None;
        }

        self.index = (self.index + 1) % len;
        self.last_switch_ms = now;
        trace!("Schedule advanced to item {}", self.index);
        self.current_plugin()
    }

    /// Rebuild the active schedule for the current period
    ///
    /// Acts when forced or when the period changed since the last call:
    /// rewinds to the first item and, while running, returns its plugin.
    pub fn reconcile_period<C: Clock + ?Sized>(&mut self, clock: &C, force: bool) -> Option<PluginId> {
        let period = self.bounds.period(clock.local_minutes());
        if !force && period == self.period {
            return None;
        }
        if period != self.period {
            info!("Period changed to {}", period);
        }

        self.period = period;
        self.index = 0;
        self.last_switch_ms = clock.uptime_ms();
        if self.is_running() {
            self.current_plugin()
        } else {
            None
        }
    }

    /// Replace the day playlist from a schedule payload
    pub fn set_day_schedule<C, S>(
        &mut self,
        payload: &Value,
        clock: &C,
        store: &mut S,
    ) -> Result<Option<PluginId>, ScheduleError>
    where
        C: Clock + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        self.day = parse_items(payload)?;
        store_items(store, StorageKey::ScheduleDay, &self.day);
        debug!("Day schedule set with {} items", self.day.len());
        Ok(self.reconcile_period(clock, true))
    }

    /// Replace the night playlist from a schedule payload
    pub fn set_night_schedule<C, S>(
        &mut self,
        payload: &Value,
        clock: &C,
        store: &mut S,
    ) -> Result<Option<PluginId>, ScheduleError>
    where
        C: Clock + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        self.night = parse_items(payload)?;
        store_items(store, StorageKey::ScheduleNight, &self.night);
        debug!("Night schedule set with {} items", self.night.len());
        Ok(self.reconcile_period(clock, true))
    }

    /// Use one playlist for both periods
    ///
    /// Also stored under the legacy combined key.
    pub fn set_schedule_both<C, S>(
        &mut self,
        payload: &Value,
        clock: &C,
        store: &mut S,
    ) -> Result<Option<PluginId>, ScheduleError>
    where
        C: Clock + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        let items = parse_items(payload)?;
        self.day = items.clone();
        self.night = items;
        store_items(store, StorageKey::ScheduleDay, &self.day);
        store_items(store, StorageKey::ScheduleNight, &self.night);
        store_items(store, StorageKey::Schedule, &self.day);
        debug!("Combined schedule set with {} items", self.day.len());
        Ok(self.reconcile_period(clock, true))
    }

    /// Move the day/night boundaries, in minutes since midnight
    pub fn set_bounds<C, S>(
        &mut self,
        day_start: i64,
        night_start: i64,
        clock: &C,
        store: &mut S,
    ) -> Result<Option<PluginId>, ScheduleError>
    where
        C: Clock + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        let bounds = to_minutes(day_start)
            .zip(to_minutes(night_start))
            .and_then(|(day, night)| DayNightBounds::new(day, night))
            .ok_or(ScheduleError::BoundsOutOfRange)?;

        self.bounds = bounds;
        persist::store_i32(store, StorageKey::DayStartMins, bounds.day_start as i32);
        persist::store_i32(store, StorageKey::NightStartMins, bounds.night_start as i32);
        debug!("Bounds set to {} / {}", bounds.day_start, bounds.night_start);
        Ok(self.reconcile_period(clock, true))
    }

    /// Move the boundaries from two `"HH:MM"` strings
    pub fn set_bounds_from_clock<C, S>(
        &mut self,
        day_start: &str,
        night_start: &str,
        clock: &C,
        store: &mut S,
    ) -> Result<Option<PluginId>, ScheduleError>
    where
        C: Clock + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        let day = parse_clock(day_start).ok_or(ScheduleError::InvalidClock)?;
        let night = parse_clock(night_start).ok_or(ScheduleError::InvalidClock)?;
        self.set_bounds(day as i64, night as i64, clock, store)
    }

    /// Playlist of the period the engine last reconciled to
    pub fn active_schedule(&self) -> &[ScheduleItem] {
        if self.period.is_day() {
            &self.day
        } else {
            &self.night
        }
    }

    pub fn day_schedule(&self) -> &[ScheduleItem] {
        &self.day
    }

    pub fn night_schedule(&self) -> &[ScheduleItem] {
        &self.night
    }

    pub fn bounds(&self) -> DayNightBounds {
        self.bounds
    }

    /// Period the active schedule was built for
    pub fn period(&self) -> Period {
        self.period
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    /// Index of the current item in the active schedule
    pub fn current_index(&self) -> usize {
        self.index
    }

    fn current_plugin(&self) -> Option<PluginId> {
        self.active_schedule().get(self.index).map(|item| item.plugin_id)
    }
}

/// Parse a payload, rejecting lists that could not be read back from the store
fn parse_items(payload: &Value) -> Result<Vec<ScheduleItem>, ScheduleError> {
    let entries = parse_schedule(payload).map_err(|_| {
        warn!("Rejected schedule payload");
        ScheduleError::Malformed
    })?;
    let items = items_from_entries(&entries);
    let len = schedule_to_json(&entries_from_items(&items)).len();
    if len > persist::MAX_VALUE_LEN {
        warn!("Rejected schedule of {} bytes", len);
        return Err(ScheduleError::TooLarge);
    }
    Ok(items)
}

fn load_items<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey) -> Option<Vec<ScheduleItem>> {
    let text = persist::load_string(store, key)?;
    match parse_schedule_str(&text) {
        Ok(entries) => Some(items_from_entries(&entries)),
        Err(_) => {
            warn!("Ignoring corrupt {}", key.name());
            None
        }
    }
}

fn store_items<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey, items: &[ScheduleItem]) {
    persist::store_str(store, key, &schedule_to_json(&entries_from_items(items)));
}

fn load_minutes<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey) -> Option<u16> {
    persist::load_i32(store, key).and_then(|raw| to_minutes(raw as i64))
}

fn to_minutes(raw: i64) -> Option<u16> {
    u16::try_from(raw)
        .ok()
        .filter(|m| *m < pixelwall_hal::clock::MINUTES_PER_DAY)
}
