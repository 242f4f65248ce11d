//! Device configuration
//!
//! Parsed from TOML. A default configuration is compiled into the crate
//! and used when the board provides none.

use alloc::string::String;

use serde::Deserialize;

use crate::schedule::{parse_clock, DayNightBounds};

/// Configuration compiled into the firmware
pub const EMBEDDED_CONFIG: &str = include_str!("../device.toml");

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Not valid TOML, or a value has the wrong type
    Toml,
    /// A value is out of range
    Invalid,
}

/// Whole device configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub schedule: ScheduleConfig,
    pub weather: WeatherConfig,
    pub stock: StockConfig,
    pub status: StatusConfig,
}

/// Initial day/night bounds
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// `"HH:MM"`
    pub day_start: String,
    /// `"HH:MM"`
    pub night_start: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            day_start: "07:00".into(),
            night_start: "19:00".into(),
        }
    }
}

impl ScheduleConfig {
    /// Parse both clock strings
    pub fn bounds(&self) -> Result<DayNightBounds, ConfigError> {
        let day = parse_clock(&self.day_start).ok_or(ConfigError::Invalid)?;
        let night = parse_clock(&self.night_start).ok_or(ConfigError::Invalid)?;
        DayNightBounds::new(day, night).ok_or(ConfigError::Invalid)
    }
}

/// OpenWeather settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// `"lat,lon"` or a city name
    pub location: String,
    pub api_key: String,
    pub units: String,
    pub lang: String,
    /// Re-fetch interval, 0 for the default
    pub interval_minutes: u16,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            location: String::new(),
            api_key: String::new(),
            units: "metric".into(),
            lang: "en".into(),
            interval_minutes: 30,
        }
    }
}

/// Stock quote settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    pub symbol: String,
    /// Re-fetch interval, 0 for the default
    pub interval_minutes: u16,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            symbol: "aapl.us".into(),
            interval_minutes: 60,
        }
    }
}

/// Status broadcast settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub min_publish_interval_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            min_publish_interval_ms: 100,
        }
    }
}

impl DeviceConfig {
    /// Parse and validate a TOML document
    ///
    /// Missing sections and keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: DeviceConfig = toml::from_str(text).map_err(|_| ConfigError::Toml)?;
        config.schedule.bounds()?;
        Ok(config)
    }

    /// The configuration compiled into the firmware
    pub fn embedded_default() -> Self {
        match Self::from_toml(EMBEDDED_CONFIG) {
            Ok(config) => config,
            Err(e) => {
                error!("Embedded config is invalid: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_parses() {
        let config = DeviceConfig::from_toml(EMBEDDED_CONFIG).unwrap();
        assert_eq!(config.schedule.bounds(), Ok(DayNightBounds::default()));
        assert_eq!(config.weather.units, "metric");
        assert_eq!(config.weather.interval_minutes, 30);
        assert_eq!(config.stock.symbol, "aapl.us");
        assert_eq!(config.status.min_publish_interval_ms, 100);
        assert_eq!(DeviceConfig::embedded_default(), config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = DeviceConfig::from_toml("[stock]\nsymbol = \"msft\"\n").unwrap();
        assert_eq!(config.stock.symbol, "msft");
        assert_eq!(config.stock.interval_minutes, 60);
        assert_eq!(config.schedule, ScheduleConfig::default());
        assert_eq!(config.weather.lang, "en");
    }

    #[test]
    fn test_custom_bounds() {
        let config = DeviceConfig::from_toml(
            "[schedule]\nday_start = \"06:30\"\nnight_start = \"22:15\"\n",
        )
        .unwrap();
        assert_eq!(
            config.schedule.bounds(),
            Ok(DayNightBounds::new(390, 1335).unwrap())
        );
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            DeviceConfig::from_toml("[schedule]\nday_start = \"25:00\"\n"),
            Err(ConfigError::Invalid)
        );
        assert_eq!(
            DeviceConfig::from_toml("[stock]\ninterval_minutes = \"soon\"\n"),
            Err(ConfigError::Toml)
        );
        assert_eq!(DeviceConfig::from_toml("[stock"), Err(ConfigError::Toml));
    }
}
