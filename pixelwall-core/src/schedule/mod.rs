//! Day/night schedule engine
//!
//! Two independent playlists (day and night) rotate plugins over time. The
//! day/night bounds decide which one is active; crossing a bound while the
//! engine runs swaps playlists immediately.

mod engine;
mod item;
pub mod period;

pub use engine::{EngineState, ScheduleEngine};
pub use item::{entries_from_items, items_from_entries, ScheduleItem};
pub use period::{format_clock, parse_clock, DayNightBounds};

/// Schedule configuration errors
///
/// A failed call leaves the previous configuration untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// Payload is not a sequence of schedule entries
    Malformed,
    /// Encoded schedule exceeds what the store reads back
    TooLarge,
    /// A bound is outside `0..1440`
    BoundsOutOfRange,
    /// A bound is not a valid `"HH:MM"` string
    InvalidClock,
}
