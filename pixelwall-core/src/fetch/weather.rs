//! OpenWeather One Call source
//!
//! Requests One Call 3.0 and falls back to 2.5 for API keys without 3.0
//! access. A location that is not a `lat,lon` pair is resolved through the
//! geocoding API on every fetch.

use alloc::format;
use alloc::string::String;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use pixelwall_hal::{KeyValueStore, StorageKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::http::HttpClient;
use super::{DataSource, FetchError, Reading};
use crate::config::WeatherConfig;
use crate::persist;

const API_BASE: &str = "https://api.openweathermap.org";
const SECONDS_PER_DAY: i64 = 86_400;

/// Lunar phase, in eighths of the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MoonPhase {
    New,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    Full,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    /// Classify a cycle position (0 = new, 0.5 = full)
    pub fn from_cycle(phase: f64) -> Self {
        match phase {
            p if !(0.0625..=0.9375).contains(&p) => MoonPhase::New,
            p if p < 0.1875 => MoonPhase::WaxingCrescent,
            p if p < 0.3125 => MoonPhase::FirstQuarter,
            p if p < 0.4375 => MoonPhase::WaxingGibbous,
            p if p < 0.5625 => MoonPhase::Full,
            p if p < 0.6875 => MoonPhase::WaningGibbous,
            p if p < 0.8125 => MoonPhase::LastQuarter,
            _ => MoonPhase::WaningCrescent,
        }
    }

    /// Short label that fits the matrix
    pub fn label(self) -> &'static str {
        match self {
            MoonPhase::New => "New",
            MoonPhase::WaxingCrescent => "Wax Cres",
            MoonPhase::FirstQuarter => "First Q",
            MoonPhase::WaxingGibbous => "Wax Gib",
            MoonPhase::Full => "Full",
            MoonPhase::WaningGibbous => "Wan Gib",
            MoonPhase::LastQuarter => "Last Q",
            MoonPhase::WaningCrescent => "Wan Cres",
        }
    }
}

/// Illuminated fraction of the moon, in percent
///
/// `(1 - cos 2πp) / 2 = sin²(πp)`, with the sine from Bhaskara's
/// approximation (error below 0.2%).
pub fn moon_illumination(phase: f64) -> u8 {
    let p = phase.clamp(0.0, 1.0);
    let q = p * (1.0 - p);
    let sine = 16.0 * q / (5.0 - 4.0 * q);
    (sine * sine * 100.0 + 0.5) as u8
}

/// Current conditions
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherData {
    /// Rounded temperature in the configured units
    pub temperature: i16,
    /// OpenWeather condition id
    pub code: i16,
    /// Local sunrise, minutes since midnight
    pub sunrise_minutes: Option<u16>,
    /// Local sunset, minutes since midnight
    pub sunset_minutes: Option<u16>,
    /// Moon illumination percent
    pub moon_illumination: Option<u8>,
    pub moon_phase: Option<MoonPhase>,
}

/// Persisted subset of a weather reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct WeatherCache {
    temperature: i16,
    code: i16,
    fetched_at_ms: u64,
}

/// Keep the displayable part of a reading for the next boot
pub fn store_cache<S: KeyValueStore + ?Sized>(store: &mut S, reading: &Reading<WeatherData>) {
    let cache = WeatherCache {
        temperature: reading.value.temperature,
        code: reading.value.code,
        fetched_at_ms: reading.fetched_at_ms,
    };
    persist::store_postcard(store, StorageKey::WeatherCache, &cache);
}

/// Load the reading kept by [`store_cache`]
pub fn load_cache<S: KeyValueStore + ?Sized>(store: &mut S) -> Option<Reading<WeatherData>> {
    let cache: WeatherCache = persist::load_postcard(store, StorageKey::WeatherCache)?;
    Some(Reading {
        value: WeatherData {
            temperature: cache.temperature,
            code: cache.code,
            sunrise_minutes: None,
            sunset_minutes: None,
            moon_illumination: None,
            moon_phase: None,
        },
        fetched_at_ms: cache.fetched_at_ms,
    })
}

/// Weather source over an HTTP client
pub struct WeatherSource<H> {
    http: H,
    config: WeatherConfig,
}

impl<H: HttpClient> WeatherSource<H> {
    pub fn new(http: H, config: WeatherConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }

    pub fn http_mut(&mut self) -> &mut H {
        &mut self.http
    }

    fn coordinates(&mut self) -> Result<(String, String), FetchError> {
        let location = self.config.location.trim();
        if let Some((lat, lon)) = location.split_once(',') {
            let (lat, lon) = (lat.trim(), lon.trim());
            if lat.parse::<f64>().is_ok() && lon.parse::<f64>().is_ok() {
                return Ok((lat.into(), lon.into()));
            }
        }

        let url = format!(
            "{}/geo/1.0/direct?q={}&limit=1&appid={}",
            API_BASE,
            utf8_percent_encode(location, NON_ALPHANUMERIC),
            self.config.api_key
        );
        let body = self.http.get(&url)?.into_ok_body()?;
        let places: Value = serde_json::from_str(&body).map_err(|_| FetchError::Parse)?;
        let place = &places[0];
        match (place["lat"].as_f64(), place["lon"].as_f64()) {
            (Some(lat), Some(lon)) => {
                debug!("Geocoded location to {} {}", lat, lon);
                Ok((format!("{:.6}", lat), format!("{:.6}", lon)))
            }
            _ => Err(FetchError::NoData),
        }
    }

    fn onecall_url(&self, version: &str, lat: &str, lon: &str) -> String {
        format!(
            "{}/data/{}/onecall?lat={}&lon={}&exclude=minutely,hourly,alerts&units={}&lang={}&appid={}",
            API_BASE, version, lat, lon, self.config.units, self.config.lang, self.config.api_key
        )
    }
}

impl<H: HttpClient> DataSource for WeatherSource<H> {
    type Output = WeatherData;
    const DEFAULT_INTERVAL_MINUTES: u16 = 30;

    fn name(&self) -> &'static str {
        "weather"
    }

    fn fetch(&mut self) -> Result<WeatherData, FetchError> {
        if self.config.api_key.is_empty() {
            return Err(FetchError::MissingCredentials);
        }
        let (lat, lon) = self.coordinates()?;

        let url = self.onecall_url("3.0", &lat, &lon);
        let body = match self.http.get(&url).and_then(|r| r.into_ok_body()) {
            Ok(body) => body,
            Err(FetchError::NotConnected) => return Err(FetchError::NotConnected),
            Err(e) => {
                warn!("One Call 3.0 failed: {}, trying 2.5", e);
                let url = self.onecall_url("2.5", &lat, &lon);
                self.http.get(&url)?.into_ok_body()?
            }
        };
        parse_onecall(&body)
    }
}

/// Extract current conditions from a One Call response
pub fn parse_onecall(body: &str) -> Result<WeatherData, FetchError> {
    let doc: Value = serde_json::from_str(body).map_err(|_| FetchError::Parse)?;
    let current = &doc["current"];
    let temperature = current["temp"].as_f64().ok_or(FetchError::Parse)?;
    let code = current["weather"][0]["id"]
        .as_i64()
        .and_then(|id| i16::try_from(id).ok())
        .unwrap_or(0);

    let offset = doc["timezone_offset"].as_i64().unwrap_or(0);
    let local = |key: &str| {
        current[key]
            .as_i64()
            .filter(|t| *t > 0)
            .map(|t| local_minutes(t, offset))
    };

    let phase = doc["daily"][0]["moon_phase"]
        .as_f64()
        .filter(|p| *p >= 0.0);

    Ok(WeatherData {
        temperature: round_to_i16(temperature),
        code,
        sunrise_minutes: local("sunrise"),
        sunset_minutes: local("sunset"),
        moon_illumination: phase.map(moon_illumination),
        moon_phase: phase.map(MoonPhase::from_cycle),
    })
}

/// Minutes since local midnight of a unix timestamp
fn local_minutes(unix_seconds: i64, offset_seconds: i64) -> u16 {
    ((unix_seconds + offset_seconds).rem_euclid(SECONDS_PER_DAY) / 60) as u16
}

/// Round half away from zero
fn round_to_i16(value: f64) -> i16 {
    let rounded = if value >= 0.0 { value + 0.5 } else { value - 0.5 };
    rounded.clamp(i16::MIN as f64, i16::MAX as f64) as i16
}
