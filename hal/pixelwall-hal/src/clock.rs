//! Time source abstractions

/// Minutes in a day; valid minute-of-day values are `0..MINUTES_PER_DAY`
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Time source for the engine
///
/// Uptime drives every interval and duration comparison. Wall-clock time
/// is only used to classify day and night and may be unavailable (for
/// example before the first network time sync).
pub trait Clock {
    /// Monotonic milliseconds since boot
    fn uptime_ms(&self) -> u64;

    /// Local time of day in minutes since midnight, if known
    fn local_minutes(&self) -> Option<u16>;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn uptime_ms(&self) -> u64 {
        (**self).uptime_ms()
    }

    fn local_minutes(&self) -> Option<u16> {
        (**self).local_minutes()
    }
}

/// Convert an hour/minute pair into minutes since midnight
///
/// Returns `None` when the pair is not a valid time of day.
pub fn minute_of_day(hour: u8, minute: u8) -> Option<u16> {
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(hour as u16 * 60 + minute as u16)
}
