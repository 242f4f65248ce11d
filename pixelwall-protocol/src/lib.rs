//! Pixelwall control-surface protocol
//!
//! This crate defines the JSON messages exchanged between the firmware and
//! its control surfaces (web UI over WebSocket/HTTP, companion apps). The
//! transport itself lives in the board firmware; this crate only knows the
//! message shapes.
//!
//! # Message Overview
//!
//! Commands are JSON objects tagged by an `event` field:
//! ```text
//! {"event":"plugin","plugin":3}
//! {"event":"schedule-day","schedule":[{"pluginId":2,"duration":10}]}
//! {"event":"schedule-bounds","dayStart":"07:00","nightStart":"19:30"}
//! ```
//!
//! The firmware answers with an `info` status snapshot describing the
//! active plugin, both playlists, the day/night bounds and the plugin list.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod command;
pub mod error;
pub mod events;
pub mod schedule;
pub mod status;

pub use command::{Bound, Command};
pub use error::ProtocolError;
pub use events::ButtonPress;
pub use schedule::{parse_schedule, parse_schedule_str, schedule_to_json, ScheduleEntry};
pub use status::{Period, PluginInfo, StatusSnapshot, SystemStatus};
