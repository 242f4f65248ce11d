//! Host fakes for driving a `Device` end to end.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use pixelwall_core::fetch::{FetchError, HttpClient, HttpResponse};
use pixelwall_core::{Device, DeviceConfig, MemoryStore, Peripherals, Plugin, StatusSink};
use pixelwall_hal::{Clock, FrameBuffer};
use pixelwall_protocol::StatusSnapshot;
use serde_json::Value;

pub const NAMES: [&str; 6] = ["Draw", "Breakout", "Snake", "Rain", "Clock", "Weather"];

/// Simulated time: uptime plus an optional local time of day
pub struct SimClock {
    now: Cell<u64>,
    minutes: Cell<Option<u16>>,
}

impl SimClock {
    pub fn at(hour: u16, minute: u16) -> Self {
        Self {
            now: Cell::new(1_000),
            minutes: Cell::new(Some(hour * 60 + minute)),
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.now.set(self.now.get() + secs * 1000);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set_time(&self, hour: u16, minute: u16) {
        self.minutes.set(Some(hour * 60 + minute));
    }
}

impl Clock for SimClock {
    fn uptime_ms(&self) -> u64 {
        self.now.get()
    }

    fn local_minutes(&self) -> Option<u16> {
        self.minutes.get()
    }
}

#[derive(Debug, Default)]
pub struct FakeDisplay {
    pub clears: u32,
    pub brightness: u8,
}

impl FrameBuffer for FakeDisplay {
    fn width(&self) -> u8 {
        16
    }

    fn height(&self) -> u8 {
        16
    }

    fn set_pixel(&mut self, _x: u8, _y: u8, _value: u8) {}

    fn clear(&mut self) {
        self.clears += 1;
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// HTTP client answering from a script; offline once the script runs out
#[derive(Default)]
pub struct ScriptedHttp {
    responses: VecDeque<Result<HttpResponse, FetchError>>,
}

impl ScriptedHttp {
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn respond(mut self, status: u16, body: &str) -> Self {
        self.responses.push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
        self
    }
}

impl HttpClient for ScriptedHttp {
    fn get(&mut self, _url: &str) -> Result<HttpResponse, FetchError> {
        self.responses
            .pop_front()
            .unwrap_or(Err(FetchError::NotConnected))
    }
}

/// Sink keeping every published snapshot
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub published: Rc<RefCell<Vec<StatusSnapshot>>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.published.borrow().len()
    }

    pub fn last(&self) -> Option<StatusSnapshot> {
        self.published.borrow().last().cloned()
    }
}

impl StatusSink for RecordingSink {
    fn publish(&mut self, snapshot: &StatusSnapshot) {
        self.published.borrow_mut().push(snapshot.clone());
    }
}

/// Plugin recording lifecycle calls as `"<call>:<name>"`
pub struct TestPlugin {
    name: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl Plugin for TestPlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn setup(&mut self, _display: &mut dyn FrameBuffer) {
        self.log.borrow_mut().push(format!("setup:{}", self.name));
    }

    fn run(&mut self, _display: &mut dyn FrameBuffer) {
        self.log.borrow_mut().push(format!("run:{}", self.name));
    }

    fn teardown(&mut self) {
        self.log.borrow_mut().push(format!("teardown:{}", self.name));
    }

    fn handle_control_message(&mut self, message: &Value) -> bool {
        if message["event"] == "screen" {
            self.log.borrow_mut().push(format!("message:{}", self.name));
            return true;
        }
        false
    }
}

pub type TestDevice<'a> =
    Device<MemoryStore, &'a SimClock, FakeDisplay, NoDelay, ScriptedHttp, RecordingSink>;

pub struct Harness<'a> {
    pub device: TestDevice<'a>,
    pub sink: RecordingSink,
    pub log: Rc<RefCell<Vec<String>>>,
}

impl<'a> Harness<'a> {
    /// Device with every test plugin registered, not yet booted
    pub fn new(clock: &'a SimClock, store: MemoryStore) -> Self {
        Self::with_http(clock, store, ScriptedHttp::offline(), ScriptedHttp::offline())
    }

    pub fn with_http(
        clock: &'a SimClock,
        store: MemoryStore,
        weather_http: ScriptedHttp,
        stock_http: ScriptedHttp,
    ) -> Self {
        let mut config = DeviceConfig::default();
        config.weather.location = "52.52,13.40".into();
        config.weather.api_key = "test".into();
        config.status.min_publish_interval_ms = 0;
        Self::with_config(clock, store, &config, weather_http, stock_http)
    }

    pub fn with_config(
        clock: &'a SimClock,
        store: MemoryStore,
        config: &DeviceConfig,
        weather_http: ScriptedHttp,
        stock_http: ScriptedHttp,
    ) -> Self {
        let sink = RecordingSink::default();
        let mut device = Device::new(
            config,
            Peripherals {
                store,
                clock,
                display: FakeDisplay::default(),
                delay: NoDelay,
                weather_http,
                stock_http,
                sink: sink.clone(),
            },
        );

        let log = Rc::new(RefCell::new(Vec::new()));
        for name in NAMES {
            device.register(Box::new(TestPlugin {
                name,
                log: log.clone(),
            }));
        }

        Self { device, sink, log }
    }

    pub fn booted(clock: &'a SimClock, store: MemoryStore) -> Self {
        let mut harness = Self::new(clock, store);
        harness.device.boot();
        harness.take_log();
        harness
    }

    pub fn active(&self) -> Option<u16> {
        self.device.plugins().active_id()
    }

    pub fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    /// Send a JSON command
    pub fn send(&mut self, message: Value) {
        self.device
            .handle_message(message)
            .expect("command accepted");
    }
}
