use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::telemetry::TelemetrySample;

/// Identity triple for a unique flight occurrence.
///
/// A flight persists across snapshots for as long as the same aircraft keeps
/// reporting the same designator and squawk; any change to the triple starts
/// a new flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightIdentity {
    pub aircraft_id: String,
    pub flight_designator: String,
    pub squawk: String,
}

impl FlightIdentity {
    /// Build an identity from a telemetry sample.
    /// Returns None unless all three identity fields are present and non-empty.
    pub fn from_sample(sample: &TelemetrySample) -> Option<Self> {
        if sample.aircraft_id.trim().is_empty() {
            return None;
        }
        let flight_designator = sample
            .flight_designator
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        let squawk = sample
            .squawk
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;

        Some(Self {
            aircraft_id: sample.aircraft_id.trim().to_string(),
            flight_designator: flight_designator.to_string(),
            squawk: squawk.to_string(),
        })
    }
}

impl std::fmt::Display for FlightIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.aircraft_id, self.flight_designator, self.squawk
        )
    }
}

/// One observation of a flight: the telemetry fields we keep for the
/// first-detected and last-detected ends of a UniqueFlight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub time: DateTime<Utc>,
    pub sequence: u64,
    pub ground_speed_knots: Option<f32>,
    pub altitude_baro_ft: Option<i32>,
    pub altitude_geom_ft: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub track_degrees: Option<f32>,
}

impl TelemetryPoint {
    pub fn from_sample(sample: &TelemetrySample, sequence: u64) -> Self {
        Self {
            time: sample.timestamp,
            sequence,
            ground_speed_knots: sample.ground_speed_knots,
            altitude_baro_ft: sample.altitude_baro_ft,
            altitude_geom_ft: sample.altitude_geom_ft,
            latitude: sample.latitude,
            longitude: sample.longitude,
            track_degrees: sample.track_degrees,
        }
    }

    /// Position pair, present only when both coordinates are known.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// One continuous flight occurrence, keyed by the identity triple.
///
/// Created on the first observation of a new triple. Only the last-detected
/// side is updated afterwards, and only for strictly newer observations.
/// Once a new row for the same aircraft supersedes this one, this row is
/// never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueFlight {
    pub id: Uuid,
    pub identity: FlightIdentity,
    pub first: TelemetryPoint,
    pub last: TelemetryPoint,
}

impl UniqueFlight {
    /// Seed a new flight where first-detected == last-detected.
    pub fn new(identity: FlightIdentity, point: TelemetryPoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            first: point.clone(),
            last: point,
        }
    }
}

/// Kind of flight event derived from a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Takeoff,
    Landing,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Takeoff => write!(f, "takeoff"),
            EventKind::Landing => write!(f, "landing"),
        }
    }
}

/// A takeoff or landing attributed to an airport at a snapshot sequence.
///
/// At most one record exists per (kind, flight, airport); re-detections are
/// reconciled in place rather than duplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub flight_id: Uuid,
    pub airport: String,
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
}

impl FlightEvent {
    pub fn new(kind: EventKind, flight_id: Uuid, airport: &str, sequence: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            flight_id,
            airport: airport.to_string(),
            sequence,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(aircraft_id: &str, flight: Option<&str>, squawk: Option<&str>) -> TelemetrySample {
        TelemetrySample {
            aircraft_id: aircraft_id.to_string(),
            flight_designator: flight.map(|s| s.to_string()),
            squawk: squawk.map(|s| s.to_string()),
            aircraft_type: None,
            ground_speed_knots: None,
            altitude_baro_ft: None,
            altitude_geom_ft: None,
            latitude: None,
            longitude: None,
            track_degrees: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_identity_requires_all_fields() {
        assert!(
            FlightIdentity::from_sample(&sample("N123", Some("UAL100"), Some("1200"))).is_some()
        );
        assert!(FlightIdentity::from_sample(&sample("N123", None, Some("1200"))).is_none());
        assert!(FlightIdentity::from_sample(&sample("N123", Some("UAL100"), None)).is_none());
        assert!(FlightIdentity::from_sample(&sample("", Some("UAL100"), Some("1200"))).is_none());
        // Whitespace-only fields count as absent
        assert!(FlightIdentity::from_sample(&sample("N123", Some("   "), Some("1200"))).is_none());
    }

    #[test]
    fn test_identity_trims_fields() {
        let identity =
            FlightIdentity::from_sample(&sample("N123", Some("UAL100  "), Some(" 1200"))).unwrap();
        assert_eq!(identity.flight_designator, "UAL100");
        assert_eq!(identity.squawk, "1200");
    }

    #[test]
    fn test_new_flight_seeds_first_and_last() {
        let s = sample("N123", Some("UAL100"), Some("1200"));
        let identity = FlightIdentity::from_sample(&s).unwrap();
        let flight = UniqueFlight::new(identity, TelemetryPoint::from_sample(&s, 7));
        assert_eq!(flight.first.sequence, 7);
        assert_eq!(flight.last.sequence, 7);
        assert_eq!(flight.first.time, flight.last.time);
    }
}
