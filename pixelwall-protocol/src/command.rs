//! Commands from control surfaces
//!
//! Every command is a JSON object whose `event` field selects the
//! operation. Schedule payloads are carried as raw JSON so that a payload
//! which is not a sequence can be rejected by the schedule engine without
//! failing the command decode.

use alloc::string::String;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// A day/night boundary as sent by a control surface
///
/// Either minutes since local midnight or an `"HH:MM"` clock string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    /// Minutes since local midnight
    Minutes(i64),
    /// `"HH:MM"` wall-clock time
    Clock(String),
}

/// Control-surface command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Command {
    /// Request a status snapshot
    #[serde(rename = "info")]
    Info,
    /// Activate a plugin by id (stops the schedule first)
    #[serde(rename = "plugin")]
    SetPlugin { plugin: u16 },
    /// Persist the active plugin as the boot default
    #[serde(rename = "persist-plugin")]
    PersistPlugin,
    /// Set panel brightness
    #[serde(rename = "brightness")]
    SetBrightness { brightness: u8 },
    /// Replace both playlists (legacy single-schedule mode)
    #[serde(rename = "schedule")]
    SetSchedule { schedule: Value },
    /// Replace the day playlist
    #[serde(rename = "schedule-day")]
    SetDaySchedule { schedule: Value },
    /// Replace the night playlist
    #[serde(rename = "schedule-night")]
    SetNightSchedule { schedule: Value },
    /// Move the day/night boundaries
    #[serde(rename = "schedule-bounds")]
    SetBounds {
        #[serde(rename = "dayStart")]
        day_start: Bound,
        #[serde(rename = "nightStart")]
        night_start: Bound,
    },
    /// Stop the schedule, optionally forgetting both playlists
    #[serde(rename = "schedule-clear")]
    ClearSchedule {
        #[serde(default)]
        erase: bool,
    },
    /// Start the schedule
    #[serde(rename = "schedule-start")]
    StartSchedule,
    /// Stop the schedule, keeping the active plugin
    #[serde(rename = "schedule-stop")]
    StopSchedule,
    /// Erase the whole persistent store
    #[serde(rename = "storage-clear")]
    ClearStorage,
}

impl Command {
    /// Decode a command from JSON text
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(|_| ProtocolError::Json)
    }

    /// Decode a command from an already-parsed JSON document
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        serde_json::from_value(value).map_err(|_| ProtocolError::Json)
    }

    /// Returns true if this command overrides the autonomous schedule
    pub fn is_manual_override(&self) -> bool {
        matches!(self, Command::SetPlugin { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_set_plugin() {
        let cmd = Command::from_json(r#"{"event":"plugin","plugin":3}"#).unwrap();
        assert_eq!(cmd, Command::SetPlugin { plugin: 3 });
        assert!(cmd.is_manual_override());
    }

    #[test]
    fn test_decode_unit_commands() {
        assert_eq!(Command::from_json(r#"{"event":"info"}"#), Ok(Command::Info));
        assert_eq!(
            Command::from_json(r#"{"event":"persist-plugin"}"#),
            Ok(Command::PersistPlugin)
        );
        assert_eq!(
            Command::from_json(r#"{"event":"schedule-start"}"#),
            Ok(Command::StartSchedule)
        );
        assert_eq!(
            Command::from_json(r#"{"event":"schedule-stop"}"#),
            Ok(Command::StopSchedule)
        );
        assert_eq!(
            Command::from_json(r#"{"event":"storage-clear"}"#),
            Ok(Command::ClearStorage)
        );
    }

    #[test]
    fn test_decode_clear_defaults_to_keep_storage() {
        assert_eq!(
            Command::from_json(r#"{"event":"schedule-clear"}"#),
            Ok(Command::ClearSchedule { erase: false })
        );
        assert_eq!(
            Command::from_json(r#"{"event":"schedule-clear","erase":true}"#),
            Ok(Command::ClearSchedule { erase: true })
        );
    }

    #[test]
    fn test_decode_schedule_keeps_raw_payload() {
        let cmd = Command::from_json(r#"{"event":"schedule-day","schedule":{"bad":1}}"#).unwrap();
        assert_eq!(
            cmd,
            Command::SetDaySchedule {
                schedule: json!({"bad": 1})
            }
        );
    }

    #[test]
    fn test_decode_bounds_both_forms() {
        let cmd =
            Command::from_json(r#"{"event":"schedule-bounds","dayStart":"06:30","nightStart":"22:00"}"#)
                .unwrap();
        assert_eq!(
            cmd,
            Command::SetBounds {
                day_start: Bound::Clock("06:30".into()),
                night_start: Bound::Clock("22:00".into()),
            }
        );

        let cmd =
            Command::from_value(json!({"event": "schedule-bounds", "dayStart": 390, "nightStart": 1320}))
                .unwrap();
        assert_eq!(
            cmd,
            Command::SetBounds {
                day_start: Bound::Minutes(390),
                night_start: Bound::Minutes(1320),
            }
        );
    }

    #[test]
    fn test_reject_unknown_or_malformed() {
        assert_eq!(
            Command::from_json(r#"{"event":"self-destruct"}"#),
            Err(ProtocolError::Json)
        );
        assert_eq!(
            Command::from_json(r#"{"event":"plugin"}"#),
            Err(ProtocolError::Json)
        );
        assert_eq!(Command::from_json("{"), Err(ProtocolError::Json));
    }
}
