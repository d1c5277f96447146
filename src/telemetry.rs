use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// One aircraft's telemetry in one snapshot.
///
/// Samples reaching the core always carry a non-empty aircraft id and a
/// flight designator; decode filters the rest. Numeric fields that the feed
/// reports as non-numeric (e.g. `"alt_baro": "ground"`) are treated as absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub aircraft_id: String,
    pub flight_designator: Option<String>,
    pub squawk: Option<String>,
    pub aircraft_type: Option<String>,
    pub ground_speed_knots: Option<f32>,
    pub altitude_baro_ft: Option<i32>,
    pub altitude_geom_ft: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub track_degrees: Option<f32>,
    pub timestamp: DateTime<Utc>,
}

impl TelemetrySample {
    /// Position pair, present only when both coordinates are known.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// One fetch cycle's worth of telemetry, tagged with a monotonically
/// increasing sequence number assigned by the fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub sequence: u64,
    pub fetched_at: DateTime<Utc>,
    pub samples: Vec<TelemetrySample>,
}

/// Raw aircraft entry in the `{"ac": [...]}` feed format.
/// Numeric fields come in as Value because the feed mixes numbers and
/// strings ("ground") in the same position.
#[derive(Debug, Deserialize)]
struct RawAircraft {
    r: Option<String>,
    hex: Option<String>,
    flight: Option<String>,
    t: Option<String>,
    alt_baro: Option<Value>,
    alt_geom: Option<Value>,
    gs: Option<Value>,
    lat: Option<f64>,
    lon: Option<f64>,
    track: Option<Value>,
    squawk: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    ac: Vec<RawAircraft>,
}

fn value_to_f64(value: &Option<Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_to_f32(value: &Option<Value>) -> Option<f32> {
    value_to_f64(value).map(|v| v as f32)
}

fn value_to_i32(value: &Option<Value>) -> Option<i32> {
    match value {
        Some(Value::Number(n)) => n.as_f64().map(|v| v.round() as i32),
        Some(Value::String(s)) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

fn to_opt_string(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl TelemetrySnapshot {
    /// Decode a feed response body into a snapshot.
    ///
    /// Samples without an aircraft id or flight designator are dropped here
    /// so the core never sees them. A lone latitude or longitude drops the
    /// whole pair.
    pub fn from_json(sequence: u64, fetched_at: DateTime<Utc>, body: &str) -> Result<Self> {
        let raw: RawSnapshot =
            serde_json::from_str(body).context("Failed to decode telemetry snapshot JSON")?;

        let mut samples = Vec::with_capacity(raw.ac.len());
        for entry in raw.ac {
            let aircraft_id = match to_opt_string(entry.r.clone().or(entry.hex.clone())) {
                Some(id) => id,
                None => {
                    warn!("Skipping sample with missing aircraft id");
                    continue;
                }
            };

            let flight_designator = to_opt_string(entry.flight);
            if flight_designator.is_none() {
                debug!(
                    "Skipping sample for {} with missing flight designator",
                    aircraft_id
                );
                continue;
            }

            let (latitude, longitude) = match (entry.lat, entry.lon) {
                (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
                (None, None) => (None, None),
                _ => {
                    warn!(
                        "Dropping incomplete coordinate pair for aircraft {}",
                        aircraft_id
                    );
                    (None, None)
                }
            };

            samples.push(TelemetrySample {
                aircraft_id,
                flight_designator,
                squawk: to_opt_string(entry.squawk),
                aircraft_type: to_opt_string(entry.t),
                ground_speed_knots: value_to_f32(&entry.gs),
                altitude_baro_ft: value_to_i32(&entry.alt_baro),
                altitude_geom_ft: value_to_f64(&entry.alt_geom),
                latitude,
                longitude,
                track_degrees: value_to_f32(&entry.track),
                timestamp: fetched_at,
            });
        }

        Ok(Self {
            sequence,
            fetched_at,
            samples,
        })
    }
}
