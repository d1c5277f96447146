use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::airports::{Airport, GeofenceMatcher};
use crate::flight_tracker::StateThresholds;

/// One airport in the geofence table. Order matters: overlapping zones
/// resolve to the first matching entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirportEntry {
    pub ident: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Optional boundary polygon as [lat, lon] vertices; when present it
    /// replaces the radius test for this airport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<Vec<[f64; 2]>>,
}

/// Top-level configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
    #[serde(default = "default_fetch_retry_delay")]
    pub fetch_retry_delay_secs: u64,
    #[serde(default = "default_geofence_radius_km")]
    pub geofence_radius_km: f64,
    #[serde(default = "default_ground_speed_threshold")]
    pub ground_speed_threshold_knots: f32,
    #[serde(default = "default_altitude_threshold")]
    pub altitude_threshold_ft: i32,
    /// Per-aircraft state older than this is dropped from memory
    #[serde(default = "default_state_max_age")]
    pub state_max_age_hours: i64,
    #[serde(default = "default_airports")]
    pub airports: Vec<AirportEntry>,
}

fn default_api_url() -> String {
    "https://opendata.adsb.fi/api/v2/lat/36.28/lon/-94.30/dist/25".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_fetch_retries() -> u32 {
    3
}

fn default_fetch_retry_delay() -> u64 {
    5
}

fn default_geofence_radius_km() -> f64 {
    1.0
}

fn default_ground_speed_threshold() -> f32 {
    30.0
}

fn default_altitude_threshold() -> i32 {
    2000
}

fn default_state_max_age() -> i64 {
    18
}

/// The Northwest Arkansas airports the feed covers by default.
fn default_airports() -> Vec<AirportEntry> {
    let entry = |ident: &str, name: &str, lat: f64, lon: f64| AirportEntry {
        ident: ident.to_string(),
        name: Some(name.to_string()),
        latitude_deg: lat,
        longitude_deg: lon,
        boundary: None,
    };
    vec![
        entry("FYV", "Drake Field", 36.0034, -94.1719),
        entry("ROG", "Rogers Executive", 36.372, -94.107),
        entry("XNA", "Northwest Arkansas National", 36.2806, -94.3046),
        entry("SPZ", "Springdale Municipal", 36.1740, -94.1222),
        entry("VBT", "Bentonville Municipal", 36.3458, -94.2198),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            poll_interval_secs: default_poll_interval(),
            fetch_retries: default_fetch_retries(),
            fetch_retry_delay_secs: default_fetch_retry_delay(),
            geofence_radius_km: default_geofence_radius_km(),
            ground_speed_threshold_knots: default_ground_speed_threshold(),
            altitude_threshold_ft: default_altitude_threshold(),
            state_max_age_hours: default_state_max_age(),
            airports: default_airports(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: Config =
            toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Load from the resolved config path, falling back to defaults when the
    /// file does not exist. The `SKYWATCH_API_URL` env var overrides the feed
    /// URL either way.
    pub fn load_or_default() -> Result<Self> {
        let path = config_path();
        let mut config = if path.exists() {
            info!("Loading configuration from {:?}", path);
            Self::load(&path)?
        } else {
            info!("No config file at {:?}, using defaults", path);
            Self::default()
        };
        if let Ok(url) = std::env::var("SKYWATCH_API_URL") {
            config.api_url = url;
        }
        Ok(config)
    }

    /// Build the geofence matcher from the configured airport table.
    pub fn matcher(&self) -> GeofenceMatcher {
        let airports = self
            .airports
            .iter()
            .map(|entry| {
                let mut airport =
                    Airport::new(&entry.ident, entry.latitude_deg, entry.longitude_deg);
                airport.name = entry.name.clone();
                if let Some(vertices) = &entry.boundary {
                    let vertices: Vec<(f64, f64)> =
                        vertices.iter().map(|v| (v[0], v[1])).collect();
                    airport = airport.with_boundary(&vertices);
                }
                airport
            })
            .collect();
        GeofenceMatcher::new(airports, self.geofence_radius_km * 1000.0)
    }

    pub fn thresholds(&self) -> StateThresholds {
        StateThresholds {
            ground_speed_knots: self.ground_speed_threshold_knots,
            altitude_ft: self.altitude_threshold_ft,
        }
    }
}

/// Resolve the config file path.
///
/// Priority:
/// 1. `SKYWATCH_CONFIG` env var
/// 2. `/etc/skywatch/skywatch.toml` (production/staging)
/// 3. `./skywatch.toml` (development)
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("SKYWATCH_CONFIG") {
        return PathBuf::from(path);
    }

    match std::env::var("SKYWATCH_ENV").as_deref() {
        Ok("production") | Ok("staging") => PathBuf::from("/etc/skywatch/skywatch.toml"),
        _ => PathBuf::from("./skywatch.toml"),
    }
}
