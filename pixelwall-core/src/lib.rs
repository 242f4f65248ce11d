//! Board-agnostic core logic for the Pixelwall LED matrix firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Plugin contract and lifecycle manager
//! - Day/night schedule engine
//! - Periodic fetch with backoff, plus the weather and stock sources
//! - Best-effort persistence helpers
//! - Device configuration
//! - The [`Device`] composition root tying them to the hardware ports

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

// must come first so the logging macros are visible everywhere
#[macro_use]
mod fmt;

pub mod config;
pub mod device;
pub mod fetch;
pub mod persist;
pub mod plugin;
pub mod schedule;

pub use config::DeviceConfig;
pub use device::{CommandError, Device, Peripherals, StatusSink};
pub use persist::MemoryStore;
pub use plugin::{Plugin, PluginId, PluginManager};
pub use schedule::{DayNightBounds, ScheduleEngine, ScheduleError, ScheduleItem};
