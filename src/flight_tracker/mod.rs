//! Per-aircraft ground/air state tracking.
//!
//! The tracker owns one [`AircraftState`] per aircraft id for the lifetime of
//! the process and applies the debounced three-state machine to every
//! incoming sample. Processing is strictly sequential per snapshot, so a
//! plain map with single-owner access is enough.

mod aircraft_state;
mod state_transitions;

pub use aircraft_state::{AircraftState, MotionState, STATE_HISTORY_LEN};
pub use state_transitions::{classify_raw, next_state, RawCondition, StateThresholds};

use chrono::{Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::telemetry::TelemetrySample;

/// Result of applying one sample to the state machine.
#[derive(Debug, Clone, Copy)]
pub struct StateUpdate {
    pub previous: MotionState,
    pub current: MotionState,
    /// True when the snapshot sequence skipped past the previously recorded
    /// one, which forces a fresh flight identity downstream.
    pub sequence_gap: bool,
}

/// Keyed store of per-aircraft motion state.
pub struct FlightTracker {
    states: HashMap<String, AircraftState>,
    thresholds: StateThresholds,
}

impl FlightTracker {
    pub fn new(thresholds: StateThresholds) -> Self {
        Self {
            states: HashMap::new(),
            thresholds,
        }
    }

    /// Apply one sample: classify the raw condition, step the state machine,
    /// append to the history, and record the last-known fields.
    ///
    /// The sequence gap is evaluated against the previously recorded sequence
    /// before it is overwritten. A smaller (out-of-order) sequence number is
    /// logged as an anomaly and reported as "no gap".
    pub fn update(&mut self, sample: &TelemetrySample, sequence: u64) -> StateUpdate {
        let state = self
            .states
            .entry(sample.aircraft_id.clone())
            .or_insert_with(AircraftState::new);

        let sequence_gap = state.has_sequence_gap(sequence);
        if let Some(prev) = state.last_sequence {
            if sequence <= prev {
                warn!(
                    "Out-of-order snapshot sequence {} (last seen {}) for aircraft {}",
                    sequence, prev, sample.aircraft_id
                );
            } else if sequence_gap {
                debug!(
                    "Snapshot gap for aircraft {}: {} -> {}",
                    sample.aircraft_id, prev, sequence
                );
            }
        }

        let raw = classify_raw(sample, &self.thresholds);
        let stepped = next_state(state.motion, raw);

        state.motion = stepped;
        state.push_history(stepped);
        state.last_ground_speed_knots = sample.ground_speed_knots;
        state.last_altitude_baro_ft = sample.altitude_baro_ft;
        state.last_altitude_geom_ft = sample.altitude_geom_ft;
        state.last_sequence = Some(state.last_sequence.map_or(sequence, |p| p.max(sequence)));
        state.last_update_time = Utc::now();

        // The history is seeded at construction, so after a push it always
        // holds the transition just taken.
        let (previous, current) = state
            .last_transition()
            .unwrap_or((stepped, stepped));

        StateUpdate {
            previous,
            current,
            sequence_gap,
        }
    }

    pub fn state(&self, aircraft_id: &str) -> Option<&AircraftState> {
        self.states.get(aircraft_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drop per-aircraft state not updated within the horizon.
    /// Returns the number of states removed.
    pub fn cleanup_stale(&mut self, max_age: Duration) -> usize {
        let now = Utc::now();
        let before = self.states.len();
        self.states.retain(|aircraft_id, state| {
            let elapsed = now.signed_duration_since(state.last_update_time);
            if elapsed > max_age {
                debug!(
                    "Removing stale state for aircraft {} (last update {} minutes ago)",
                    aircraft_id,
                    elapsed.num_minutes()
                );
                false
            } else {
                true
            }
        });
        before - self.states.len()
    }
}

impl Default for FlightTracker {
    fn default() -> Self {
        Self::new(StateThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(id: &str, gs: Option<f32>, alt: Option<i32>) -> TelemetrySample {
        TelemetrySample {
            aircraft_id: id.to_string(),
            flight_designator: Some("UAL100".to_string()),
            squawk: Some("1200".to_string()),
            aircraft_type: None,
            ground_speed_knots: gs,
            altitude_baro_ft: alt,
            altitude_geom_ft: alt.map(|a| a as f64),
            latitude: None,
            longitude: None,
            track_degrees: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_takeoff_passes_through_transitioning() {
        let mut tracker = FlightTracker::default();

        let u1 = tracker.update(&sample("N123", Some(5.0), Some(100)), 1);
        assert_eq!(u1.current, MotionState::OnGround);

        let u2 = tracker.update(&sample("N123", Some(45.0), Some(2500)), 2);
        assert_eq!(u2.previous, MotionState::OnGround);
        assert_eq!(u2.current, MotionState::Transitioning);

        let u3 = tracker.update(&sample("N123", Some(60.0), Some(3000)), 3);
        assert_eq!(u3.previous, MotionState::Transitioning);
        assert_eq!(u3.current, MotionState::InAir);
    }

    #[test]
    fn test_noisy_sample_does_not_flap_to_air() {
        let mut tracker = FlightTracker::default();
        tracker.update(&sample("N123", Some(5.0), Some(100)), 1);
        // One noisy airborne-looking reading
        tracker.update(&sample("N123", Some(90.0), Some(4000)), 2);
        // Back to grounded readings: confirmed state returns to OnGround
        let u = tracker.update(&sample("N123", Some(5.0), Some(100)), 3);
        assert_eq!(u.previous, MotionState::Transitioning);
        assert_eq!(u.current, MotionState::OnGround);
    }

    #[test]
    fn test_never_transitions_directly_between_ground_and_air() {
        // Alternate aggressively between grounded and airborne readings and
        // verify the recorded history never jumps OnGround <-> InAir.
        let mut tracker = FlightTracker::default();
        let readings = [
            (Some(5.0), Some(100)),
            (Some(90.0), Some(4000)),
            (Some(90.0), Some(4000)),
            (Some(2.0), Some(50)),
            (Some(150.0), Some(9000)),
            (None, None),
            (Some(200.0), Some(12000)),
            (Some(1.0), None),
        ];
        for (i, (gs, alt)) in readings.iter().enumerate() {
            tracker.update(&sample("N123", *gs, *alt), i as u64 + 1);
        }
        let history = &tracker.state("N123").unwrap().history;
        for pair in history.iter().zip(history.iter().skip(1)) {
            assert!(!matches!(
                pair,
                (MotionState::OnGround, MotionState::InAir)
                    | (MotionState::InAir, MotionState::OnGround)
            ));
        }
    }

    #[test]
    fn test_update_reports_the_recorded_history_transition() {
        let mut tracker = FlightTracker::default();
        tracker.update(&sample("N123", Some(5.0), Some(100)), 1);
        let u = tracker.update(&sample("N123", Some(45.0), Some(2500)), 2);
        assert_eq!(
            tracker.state("N123").unwrap().last_transition(),
            Some((u.previous, u.current))
        );
    }

    #[test]
    fn test_sequence_gap_reported_once() {
        let mut tracker = FlightTracker::default();
        assert!(!tracker.update(&sample("N123", None, None), 1).sequence_gap);
        assert!(!tracker.update(&sample("N123", None, None), 2).sequence_gap);
        assert!(tracker.update(&sample("N123", None, None), 5).sequence_gap);
        assert!(!tracker.update(&sample("N123", None, None), 6).sequence_gap);
    }

    #[test]
    fn test_out_of_order_sequence_is_no_gap() {
        let mut tracker = FlightTracker::default();
        tracker.update(&sample("N123", None, None), 5);
        let u = tracker.update(&sample("N123", None, None), 3);
        assert!(!u.sequence_gap);
        // Larger of the two sequences is retained
        assert_eq!(tracker.state("N123").unwrap().last_sequence, Some(5));
    }

    #[test]
    fn test_tracks_aircraft_independently() {
        let mut tracker = FlightTracker::default();
        tracker.update(&sample("N123", Some(60.0), Some(3000)), 1);
        tracker.update(&sample("N456", Some(2.0), Some(50)), 1);
        assert_eq!(tracker.len(), 2);
        assert_eq!(
            tracker.state("N123").unwrap().motion,
            MotionState::Transitioning
        );
        assert_eq!(tracker.state("N456").unwrap().motion, MotionState::OnGround);
    }

    #[test]
    fn test_cleanup_stale_keeps_fresh_states() {
        let mut tracker = FlightTracker::default();
        tracker.update(&sample("N123", None, None), 1);
        assert_eq!(tracker.cleanup_stale(Duration::hours(1)), 0);
        assert_eq!(tracker.len(), 1);

        // Backdate the state past the horizon
        tracker
            .states
            .get_mut("N123")
            .unwrap()
            .last_update_time = Utc::now() - Duration::hours(2);
        assert_eq!(tracker.cleanup_stale(Duration::hours(1)), 1);
        assert!(tracker.is_empty());
    }
}
