//! Day/night classification

use core::fmt::Write;

use heapless::String;
use pixelwall_hal::clock::{minute_of_day, MINUTES_PER_DAY};
use pixelwall_protocol::Period;

/// Default day start, 07:00
pub const DEFAULT_DAY_START: u16 = 7 * 60;
/// Default night start, 19:00
pub const DEFAULT_NIGHT_START: u16 = 19 * 60;

/// Day and night start times in minutes since local midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DayNightBounds {
    pub day_start: u16,
    pub night_start: u16,
}

impl Default for DayNightBounds {
    fn default() -> Self {
        Self {
            day_start: DEFAULT_DAY_START,
            night_start: DEFAULT_NIGHT_START,
        }
    }
}

impl DayNightBounds {
    /// Create bounds, or `None` if either value is not a minute of the day
    pub fn new(day_start: u16, night_start: u16) -> Option<Self> {
        if day_start >= MINUTES_PER_DAY || night_start >= MINUTES_PER_DAY {
            return None;
        }
        Some(Self {
            day_start,
            night_start,
        })
    }

    /// Classify a minute of the day
    ///
    /// Equal bounds mean it is always day. When the day start is after the
    /// night start the day spans midnight.
    pub fn is_day(&self, minutes: u16) -> bool {
        let (day, night) = (self.day_start, self.night_start);
        if day == night {
            true
        } else if day < night {
            day <= minutes && minutes < night
        } else {
            minutes >= day || minutes < night
        }
    }

    /// Classify the current time; an unknown time counts as day
    pub fn is_day_now(&self, local_minutes: Option<u16>) -> bool {
        local_minutes.map_or(true, |m| self.is_day(m))
    }

    /// Period of the current time
    pub fn period(&self, local_minutes: Option<u16>) -> Period {
        Period::from_is_day(self.is_day_now(local_minutes))
    }
}

/// Parse an `"HH:MM"` clock string into minutes since midnight
///
/// Hours and minutes may have one or two digits.
pub fn parse_clock(text: &str) -> Option<u16> {
    let (hour, minute) = text.trim().split_once(':')?;
    let field = |s: &str| -> Option<u8> {
        if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    };
    minute_of_day(field(hour)?, field(minute)?)
}

/// Render minutes since midnight as `"HH:MM"`
pub fn format_clock(minutes: u16) -> String<5> {
    let minutes = minutes % MINUTES_PER_DAY;
    let mut out = String::new();
    // five characters always fit
    let _ = write!(out, "{:02}:{:02}", minutes / 60, minutes % 60);
    out
}
