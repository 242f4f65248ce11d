//! Status snapshot broadcast to control surfaces

use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::schedule::ScheduleEntry;

/// Overall system status
///
/// Anything other than [`SystemStatus::None`] pauses plugin rendering and
/// autonomous switching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    /// Nominal operation
    #[default]
    None,
    /// Firmware update in progress
    Update,
    /// Boot loading screen
    Loading,
    /// A control surface is streaming raw frames
    WsBinary,
}

impl SystemStatus {
    /// Check if the system is in nominal operation
    pub fn is_nominal(self) -> bool {
        self == SystemStatus::None
    }
}

/// Day/night classification of the current time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Night,
}

impl Period {
    /// Period for a day/night flag
    pub fn from_is_day(is_day: bool) -> Self {
        if is_day {
            Period::Day
        } else {
            Period::Night
        }
    }

    /// Check if this is the day period
    pub fn is_day(self) -> bool {
        self == Period::Day
    }
}

/// Registered plugin as listed in the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: u16,
    pub name: String,
}

/// Snapshot of engine state, serialized as an `info` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename = "info", rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// System status
    pub status: SystemStatus,
    /// Active plugin id, `-1` on the wire when none is active
    #[serde(
        serialize_with = "serialize_plugin",
        deserialize_with = "deserialize_plugin"
    )]
    pub plugin: Option<u16>,
    /// Panel brightness
    pub brightness: u8,
    /// Schedule engine running flag
    pub schedule_active: bool,
    /// Playlist for the current period
    pub schedule: Vec<ScheduleEntry>,
    /// Day playlist
    pub schedule_day: Vec<ScheduleEntry>,
    /// Night playlist
    pub schedule_night: Vec<ScheduleEntry>,
    /// Day start as `"HH:MM"`
    pub day_start: String,
    /// Night start as `"HH:MM"`
    pub night_start: String,
    /// Current period
    pub current_period: Period,
    /// Registered plugins in id order
    pub plugins: Vec<PluginInfo>,
}

impl StatusSnapshot {
    /// Render the snapshot as JSON text
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn serialize_plugin<S: Serializer>(plugin: &Option<u16>, serializer: S) -> Result<S::Ok, S::Error> {
    match plugin {
        Some(id) => serializer.serialize_i32(*id as i32),
        None => serializer.serialize_i32(-1),
    }
}

fn deserialize_plugin<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    let raw = i32::deserialize(deserializer)?;
    Ok(u16::try_from(raw).ok())
}
