//! Periodic network data with bounded retry
//!
//! A [`FetchScheduler`] owns one [`DataSource`], its last good reading and
//! the retry/backoff state. It is ticked from the main loop; every fetch is
//! a single all-or-nothing call into the source.

pub mod http;
pub mod stock;
pub mod weather;

pub use http::{HttpClient, HttpResponse};
pub use stock::{StockData, StockSource};
pub use weather::{MoonPhase, WeatherData, WeatherSource};

/// First retry delay after a failure
pub const BACKOFF_BASE_MS: u64 = 60_000;

/// Retry counter ceiling
pub const MAX_RETRY: u8 = 4;

const MS_PER_MINUTE: u64 = 60_000;

/// Errors from a single fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FetchError {
    /// No network link
    NotConnected,
    /// Server answered with a non-success status
    Http(u16),
    /// Request failed below HTTP (DNS, TLS, timeout)
    Transport,
    /// Response body could not be understood
    Parse,
    /// No API key configured
    MissingCredentials,
    /// Response was well-formed but held nothing usable
    NoData,
}

/// A remote value fetched on an interval
pub trait DataSource {
    type Output;

    /// Interval used when none (or zero) is configured
    const DEFAULT_INTERVAL_MINUTES: u16;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Fetch a fresh value
    fn fetch(&mut self) -> Result<Self::Output, FetchError>;
}

/// Last good value and when it was fetched
#[derive(Debug, Clone, PartialEq)]
pub struct Reading<T> {
    pub value: T,
    /// Uptime at fetch
    pub fetched_at_ms: u64,
}

impl<T> Reading<T> {
    /// Time since the value was fetched
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.fetched_at_ms)
    }
}

/// Delay before the next attempt after `retry_count` consecutive failures
///
/// Doubles from one minute and stops growing at [`MAX_RETRY`].
pub fn backoff_delay_ms(retry_count: u8) -> u64 {
    let step = retry_count.clamp(1, MAX_RETRY) - 1;
    BACKOFF_BASE_MS << step
}

/// Interval fetch with exponential backoff for one source
pub struct FetchScheduler<S: DataSource> {
    source: S,
    interval_ms: u64,
    last_fetch_ms: u64,
    retry_count: u8,
    next_retry_at: Option<u64>,
    reading: Option<Reading<S::Output>>,
}

impl<S: DataSource> FetchScheduler<S> {
    /// Create a scheduler with the source's default interval
    pub fn new(source: S) -> Self {
        Self {
            source,
            interval_ms: S::DEFAULT_INTERVAL_MINUTES as u64 * MS_PER_MINUTE,
            last_fetch_ms: 0,
            retry_count: 0,
            next_retry_at: None,
            reading: None,
        }
    }

    /// Set the re-fetch interval; zero selects the default
    pub fn set_interval_minutes(&mut self, minutes: u16) {
        let minutes = if minutes == 0 {
            S::DEFAULT_INTERVAL_MINUTES
        } else {
            minutes
        };
        self.interval_ms = minutes as u64 * MS_PER_MINUTE;
    }

    /// Fetch if a retry is due, or if the interval elapsed with no retry
    /// pending
    ///
    /// Returns `None` when nothing was attempted.
    pub fn maybe_fetch(&mut self, now_ms: u64) -> Option<Result<(), FetchError>> {
        let due = match self.next_retry_at {
            Some(at) => now_ms >= at,
            None => now_ms.saturating_sub(self.last_fetch_ms) >= self.interval_ms,
        };
        if due {
            Some(self.fetch_now(now_ms))
        } else {
            None
        }
    }

    /// Fetch immediately
    ///
    /// The next interval is measured from this attempt whatever the
    /// outcome. A failure arms the backoff, a success clears it.
    pub fn fetch_now(&mut self, now_ms: u64) -> Result<(), FetchError> {
        self.last_fetch_ms = now_ms;
        match self.source.fetch() {
            Ok(value) => {
                self.reading = Some(Reading {
                    value,
                    fetched_at_ms: now_ms,
                });
                self.retry_count = 0;
                self.next_retry_at = None;
                debug!("{} fetched", self.source.name());
                Ok(())
            }
            Err(e) => {
                self.retry_count = (self.retry_count + 1).min(MAX_RETRY);
                let delay = backoff_delay_ms(self.retry_count);
                self.next_retry_at = Some(now_ms + delay);
                warn!(
                    "{} fetch failed: {}, retry {} in {} ms",
                    self.source.name(),
                    e,
                    self.retry_count,
                    delay
                );
                Err(e)
            }
        }
    }

    /// Last good reading; never fetches
    pub fn cached(&self) -> Option<&Reading<S::Output>> {
        self.reading.as_ref()
    }

    /// Check if a good reading is held
    pub fn is_valid(&self) -> bool {
        self.reading.is_some()
    }

    /// Seed the cache with a reading kept from before a restart
    pub fn restore_cached(&mut self, reading: Reading<S::Output>) {
        self.reading = Some(reading);
    }

    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    pub fn next_retry_at(&self) -> Option<u64> {
        self.next_retry_at
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn last_fetch_ms(&self) -> u64 {
        self.last_fetch_ms
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
