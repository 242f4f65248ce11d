//! Device composition root
//!
//! [`Device`] owns the plugin manager, the schedule engine, both fetch
//! schedulers and the hardware ports, and is the only place where they meet.
//! The board firmware drives it from two places:
//!
//! - the main loop calls [`Device::tick`] periodically and forwards button
//!   presses and control messages
//! - the render loop calls [`Device::render`] as fast as the panel allows
//!
//! Engine operations that may switch plugins return the id to switch to;
//! the device applies it and broadcasts a status snapshot.

use alloc::boxed::Box;

use embedded_hal::delay::DelayNs;
use pixelwall_hal::{Clock, FrameBuffer, KeyValueStore};
use pixelwall_protocol::{Bound, ButtonPress, Command, ProtocolError, StatusSnapshot, SystemStatus};
use serde_json::Value;

use crate::config::DeviceConfig;
use crate::fetch::{weather, FetchScheduler, HttpClient, StockSource, WeatherSource};
use crate::persist;
use crate::plugin::{Plugin, PluginId, PluginManager};
use crate::schedule::{entries_from_items, format_clock, parse_clock, ScheduleEngine, ScheduleError};

/// Receiver of status snapshots (WebSocket broadcast on the board)
pub trait StatusSink {
    /// Deliver a snapshot; delivery failures stay inside the sink
    fn publish(&mut self, snapshot: &StatusSnapshot);
}

impl<T: StatusSink + ?Sized> StatusSink for &mut T {
    fn publish(&mut self, snapshot: &StatusSnapshot) {
        (**self).publish(snapshot)
    }
}

/// Errors from a control-surface command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Message could not be decoded
    Protocol(ProtocolError),
    /// Schedule configuration was rejected
    Schedule(ScheduleError),
}

impl From<ProtocolError> for CommandError {
    fn from(e: ProtocolError) -> Self {
        CommandError::Protocol(e)
    }
}

impl From<ScheduleError> for CommandError {
    fn from(e: ScheduleError) -> Self {
        CommandError::Schedule(e)
    }
}

/// Hardware handed to [`Device::new`]
pub struct Peripherals<S, C, D, T, H, P> {
    pub store: S,
    pub clock: C,
    pub display: D,
    pub delay: T,
    pub weather_http: H,
    pub stock_http: H,
    pub sink: P,
}

/// The running device
pub struct Device<S, C, D, T, H: HttpClient, P> {
    store: S,
    clock: C,
    plugins: PluginManager<D, T>,
    schedule: ScheduleEngine,
    weather: FetchScheduler<WeatherSource<H>>,
    stock: FetchScheduler<StockSource<H>>,
    sink: P,
    status: SystemStatus,
    min_publish_interval_ms: u64,
    last_publish_ms: Option<u64>,
}

impl<S, C, D, T, H, P> Device<S, C, D, T, H, P>
where
    S: KeyValueStore,
    C: Clock,
    D: FrameBuffer,
    T: DelayNs,
    H: HttpClient,
    P: StatusSink,
{
    /// Assemble a device; plugins are registered next, then [`Device::boot`]
    pub fn new(config: &DeviceConfig, parts: Peripherals<S, C, D, T, H, P>) -> Self {
        let bounds = config.schedule.bounds().unwrap_or_else(|e| {
            warn!("Invalid configured bounds: {}", e);
            Default::default()
        });

        let mut weather = FetchScheduler::new(WeatherSource::new(parts.weather_http, config.weather.clone()));
        weather.set_interval_minutes(config.weather.interval_minutes);
        let mut stock = FetchScheduler::new(StockSource::new(parts.stock_http, &config.stock.symbol));
        stock.set_interval_minutes(config.stock.interval_minutes);

        Self {
            store: parts.store,
            clock: parts.clock,
            plugins: PluginManager::new(parts.display, parts.delay),
            schedule: ScheduleEngine::new(bounds),
            weather,
            stock,
            sink: parts.sink,
            status: SystemStatus::Loading,
            min_publish_interval_ms: config.status.min_publish_interval_ms,
            last_publish_ms: None,
        }
    }

    /// Register a plugin; only valid before [`Device::boot`]
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> PluginId {
        self.plugins.register(plugin)
    }

    /// Restore persisted state and run the first fetch of each source
    ///
    /// Expects the network and time sync to have been brought up already;
    /// a failed first fetch only arms the backoff.
    pub fn boot(&mut self) {
        self.status = SystemStatus::Loading;

        if let Some(reading) = weather::load_cache(&mut self.store) {
            debug!("Restored cached weather");
            self.weather.restore_cached(reading);
        }

        self.plugins.restore_from_persistence(&mut self.store);
        let switch = self.schedule.init(&self.clock, &mut self.store);
        self.apply(switch);

        let now = self.clock.uptime_ms();
        self.fetch_weather(now, true);
        let _ = self.stock.fetch_now(now);

        self.status = SystemStatus::None;
        info!("Boot complete with {} plugins", self.plugins.len());
        self.publish();
    }

    /// Periodic driver step
    ///
    /// Schedule rotation and the stock fetch pause while the status is not
    /// nominal; the weather fetch always runs.
    pub fn tick(&mut self) {
        let now = self.clock.uptime_ms();

        if self.status.is_nominal() {
            if let Some(id) = self.schedule.tick(&self.clock) {
                self.switch_to(id);
            }
            let _ = self.stock.maybe_fetch(now);
        }

        self.fetch_weather(now, false);
    }

    /// Run one iteration of the active plugin
    pub fn render(&mut self) -> bool {
        self.plugins.run_active(self.status)
    }

    /// React to a front-panel button press
    ///
    /// Returns true if the press changed anything.
    pub fn handle_button(&mut self, press: ButtonPress) -> bool {
        if press.selects_plugin() && self.status == SystemStatus::Loading {
            return false;
        }

        match press {
            ButtonPress::Single => {
                self.schedule.clear(false, &mut self.store);
                self.plugins.activate_next();
            }
            ButtonPress::Long => {
                self.plugins.restore_from_persistence(&mut self.store);
            }
            ButtonPress::Double => {
                // access point toggling lives in the network layer
                debug!("Double press ignored");
                return false;
            }
        }
        self.publish();
        true
    }

    /// Handle a decoded control-surface message
    ///
    /// The active plugin sees every message first. Messages it consumed
    /// are not an error even when they are not commands.
    pub fn handle_message(&mut self, message: Value) -> Result<(), CommandError> {
        let consumed = self.plugins.forward_control_message(&message);
        match Command::from_value(message) {
            Ok(command) => self.handle_command(command),
            Err(_) if consumed => Ok(()),
            Err(e) => {
                debug!("Unrecognized control message");
                Err(e.into())
            }
        }
    }

    /// Execute a control-surface command
    pub fn handle_command(&mut self, command: Command) -> Result<(), CommandError> {
        if command.is_manual_override() {
            self.schedule.clear(false, &mut self.store);
        }

        match command {
            Command::Info => {}
            Command::SetPlugin { plugin } => {
                self.plugins.activate_by_id(plugin);
            }
            Command::PersistPlugin => {
                self.plugins.persist_active(&mut self.store);
                return Ok(());
            }
            Command::SetBrightness { brightness } => {
                self.plugins.display_mut().set_brightness(brightness);
            }
            Command::SetSchedule { schedule } => {
                let switch = self
                    .schedule
                    .set_schedule_both(&schedule, &self.clock, &mut self.store)?;
                self.apply(switch);
            }
            Command::SetDaySchedule { schedule } => {
                let switch = self
                    .schedule
                    .set_day_schedule(&schedule, &self.clock, &mut self.store)?;
                self.apply(switch);
            }
            Command::SetNightSchedule { schedule } => {
                let switch = self
                    .schedule
                    .set_night_schedule(&schedule, &self.clock, &mut self.store)?;
                self.apply(switch);
            }
            Command::SetBounds {
                day_start,
                night_start,
            } => {
                let day = bound_minutes(&day_start)?;
                let night = bound_minutes(&night_start)?;
                let switch = self
                    .schedule
                    .set_bounds(day, night, &self.clock, &mut self.store)?;
                self.apply(switch);
            }
            Command::ClearSchedule { erase } => {
                self.schedule.clear(erase, &mut self.store);
            }
            Command::StartSchedule => {
                let switch = self.schedule.start(&self.clock, &mut self.store);
                self.apply(switch);
            }
            Command::StopSchedule => {
                self.schedule.stop(&mut self.store);
            }
            Command::ClearStorage => {
                info!("Erasing storage");
                persist::erase_all(&mut self.store);
            }
        }
        self.publish();
        Ok(())
    }

    /// Current engine state as a status snapshot
    pub fn snapshot(&self) -> StatusSnapshot {
        let bounds = self.schedule.bounds();
        StatusSnapshot {
            status: self.status,
            plugin: self.plugins.active_id(),
            brightness: self.plugins.display().brightness(),
            schedule_active: self.schedule.is_running(),
            schedule: entries_from_items(self.schedule.active_schedule()),
            schedule_day: entries_from_items(self.schedule.day_schedule()),
            schedule_night: entries_from_items(self.schedule.night_schedule()),
            day_start: format_clock(bounds.day_start).as_str().into(),
            night_start: format_clock(bounds.night_start).as_str().into(),
            current_period: bounds.period(self.clock.local_minutes()),
            plugins: self.plugins.plugins(),
        }
    }

    /// Broadcast a snapshot unless one went out too recently
    ///
    /// Returns true if the snapshot was published.
    pub fn publish(&mut self) -> bool {
        let now = self.clock.uptime_ms();
        if let Some(last) = self.last_publish_ms {
            if now.saturating_sub(last) < self.min_publish_interval_ms {
                trace!("Status publish throttled");
                return false;
            }
        }
        let snapshot = self.snapshot();
        self.sink.publish(&snapshot);
        self.last_publish_ms = Some(now);
        true
    }

    pub fn status(&self) -> SystemStatus {
        self.status
    }

    /// Change the system status (update, loading, binary upload)
    pub fn set_status(&mut self, status: SystemStatus) {
        if status != self.status {
            debug!("Status {} -> {}", self.status, status);
            self.status = status;
        }
    }

    pub fn plugins(&self) -> &PluginManager<D, T> {
        &self.plugins
    }

    pub fn schedule(&self) -> &ScheduleEngine {
        &self.schedule
    }

    pub fn weather(&self) -> &FetchScheduler<WeatherSource<H>> {
        &self.weather
    }

    pub fn stock(&self) -> &FetchScheduler<StockSource<H>> {
        &self.stock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    fn apply(&mut self, switch: Option<PluginId>) {
        if let Some(id) = switch {
            self.switch_to(id);
        }
    }

    fn switch_to(&mut self, id: PluginId) {
        self.plugins.activate_by_id(id);
        self.publish();
    }

    fn fetch_weather(&mut self, now: u64, force: bool) {
        let result = if force {
            Some(self.weather.fetch_now(now))
        } else {
            self.weather.maybe_fetch(now)
        };
        if let (Some(Ok(())), Some(reading)) = (result, self.weather.cached()) {
            weather::store_cache(&mut self.store, reading);
        }
    }
}

fn bound_minutes(bound: &Bound) -> Result<i64, ScheduleError> {
    match bound {
        Bound::Minutes(minutes) => Ok(*minutes),
        Bound::Clock(text) => parse_clock(text)
            .map(i64::from)
            .ok_or(ScheduleError::InvalidClock),
    }
}
