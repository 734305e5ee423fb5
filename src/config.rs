use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::predict::Observer;
use crate::scheduler::WatchSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid duration for {field}: {message}")]
    Duration { field: &'static str, message: String },
    #[error("invalid coordinates: {0}")]
    Coordinates(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Shell command; `{output}` is replaced with the recording path.
    pub command: String,
    pub output_dir: PathBuf,
    pub extension: String,
    pub stop_grace: String,
    /// Write a YAML log next to each recording.
    pub pass_log: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            command: "arecord -q -f S16_LE -r 48000 -c 1 -t wav {output}".to_string(),
            output_dir: PathBuf::from("captures"),
            extension: "wav".to_string(),
            stop_grace: "5s".to_string(),
            pass_log: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub min_elevation_deg: f64,
    pub min_sleep: String,
    pub fallback_poll: String,
    pub near_poll: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_elevation_deg: 0.0,
            min_sleep: "60s".to_string(),
            fallback_poll: "30m".to_string(),
            near_poll: "1s".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn stop_grace(&self) -> Result<Duration, ConfigError> {
        parse_duration("capture.stop_grace", &self.capture.stop_grace)
    }

    pub fn watch_settings(&self) -> Result<WatchSettings, ConfigError> {
        Ok(WatchSettings {
            min_elevation: self.schedule.min_elevation_deg.to_radians(),
            min_sleep: parse_duration("schedule.min_sleep", &self.schedule.min_sleep)?,
            fallback_poll: parse_duration("schedule.fallback_poll", &self.schedule.fallback_poll)?,
            near_poll: parse_duration("schedule.near_poll", &self.schedule.near_poll)?,
            output_dir: self.capture.output_dir.clone(),
            extension: self.capture.extension.trim_start_matches('.').to_string(),
            pass_log: self.capture.pass_log,
        })
    }
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::Duration {
        field,
        message: e.to_string(),
    })
}

/// Observer from degrees north/east and metres above the ellipsoid.
/// Longitudes up to 360 are accepted as degrees east.
pub fn observer_from_degrees(
    latitude: f64,
    longitude: f64,
    altitude_m: f64,
) -> Result<Observer, ConfigError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ConfigError::Coordinates(format!(
            "latitude {} outside -90..90",
            latitude
        )));
    }
    if !(-180.0..=360.0).contains(&longitude) {
        return Err(ConfigError::Coordinates(format!(
            "longitude {} outside -180..360",
            longitude
        )));
    }
    if !altitude_m.is_finite() {
        return Err(ConfigError::Coordinates(format!(
            "altitude {} is not a number",
            altitude_m
        )));
    }
    Ok(Observer::from_degrees(latitude, longitude, altitude_m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        let settings = config.watch_settings().unwrap();
        assert_eq!(settings.min_sleep, Duration::from_secs(60));
        assert_eq!(settings.fallback_poll, Duration::from_secs(1800));
        assert_eq!(settings.near_poll, Duration::from_secs(1));
        assert_eq!(config.stop_grace().unwrap(), Duration::from_secs(5));
        assert!(config.capture.command.contains("{output}"));
    }

    #[test]
    fn partial_sections() {
        let config = Config::parse(
            "capture:\n  command: \"rtl_fm -f 137.1M - | sox -t raw -r 48k -e s -b 16 -c 1 - {output}\"\n  extension: .flac\nschedule:\n  min_elevation_deg: 10\n  fallback_poll: 5m\n",
        )
        .unwrap();
        let settings = config.watch_settings().unwrap();
        assert!(config.capture.command.starts_with("rtl_fm"));
        assert_eq!(settings.extension, "flac");
        assert!((settings.min_elevation - 10f64.to_radians()).abs() < 1e-12);
        assert_eq!(settings.fallback_poll, Duration::from_secs(300));
        assert_eq!(settings.min_sleep, Duration::from_secs(60));
        assert_eq!(settings.output_dir, PathBuf::from("captures"));
    }

    #[test]
    fn bad_duration_names_field() {
        let config = Config::parse("schedule:\n  near_poll: soon\n").unwrap();
        match config.watch_settings() {
            Err(ConfigError::Duration { field, .. }) => assert_eq!(field, "schedule.near_poll"),
            other => panic!("unexpected result {:?}", other.map(|s| s.near_poll)),
        }
    }

    #[test]
    fn unknown_yaml_shape_is_rejected() {
        assert!(matches!(
            Config::parse("capture: [1, 2]"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn coordinates_are_checked() {
        assert!(observer_from_degrees(52.5, -1.9, 120.0).is_ok());
        assert!(observer_from_degrees(-33.9, 350.0, 0.0).is_ok());
        assert!(matches!(
            observer_from_degrees(91.0, 0.0, 0.0),
            Err(ConfigError::Coordinates(_))
        ));
        assert!(matches!(
            observer_from_degrees(0.0, -200.0, 0.0),
            Err(ConfigError::Coordinates(_))
        ));
    }
}
