//! Schedule payload shape
//!
//! A schedule payload is a JSON sequence of `{pluginId, duration}` objects,
//! with `duration` in seconds. Items that lack either field, carry a value
//! of the wrong type, or have a zero duration are dropped one by one; only a
//! payload that is not a sequence at all is rejected as a whole.

use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// One playlist entry as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduleEntry {
    /// Registered plugin id
    #[serde(rename = "pluginId")]
    pub plugin_id: u16,
    /// Time on screen in seconds
    pub duration: u32,
}

impl ScheduleEntry {
    /// Create an entry
    pub const fn new(plugin_id: u16, duration: u32) -> Self {
        Self {
            plugin_id,
            duration,
        }
    }

    fn from_value(item: &Value) -> Option<Self> {
        let plugin_id = u16::try_from(item.get("pluginId")?.as_u64()?).ok()?;
        let duration = u32::try_from(item.get("duration")?.as_u64()?).ok()?;
        if duration == 0 {
            return None;
        }
        Some(Self::new(plugin_id, duration))
    }
}

/// Extract the valid entries of a schedule payload, in order
pub fn parse_schedule(payload: &Value) -> Result<Vec<ScheduleEntry>, ProtocolError> {
    let items = payload.as_array().ok_or(ProtocolError::NotASequence)?;
    Ok(items.iter().filter_map(ScheduleEntry::from_value).collect())
}

/// Parse a schedule payload from JSON text
pub fn parse_schedule_str(json: &str) -> Result<Vec<ScheduleEntry>, ProtocolError> {
    let payload: Value = serde_json::from_str(json).map_err(|_| ProtocolError::Json)?;
    parse_schedule(&payload)
}

/// Render entries as a JSON schedule payload
pub fn schedule_to_json(entries: &[ScheduleEntry]) -> String {
    serde_json::to_string(entries).unwrap_or_default()
}
