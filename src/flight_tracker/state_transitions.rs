use serde::{Deserialize, Serialize};

use super::aircraft_state::MotionState;
use crate::telemetry::TelemetrySample;

/// Raw ground/air condition classified from a single sample, before the
/// debounce is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawCondition {
    Grounded,
    Airborne,
}

/// Thresholds for the raw ground/air classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateThresholds {
    pub ground_speed_knots: f32,
    pub altitude_ft: i32,
}

impl Default for StateThresholds {
    fn default() -> Self {
        Self {
            ground_speed_knots: 30.0,
            altitude_ft: 2000,
        }
    }
}

/// Classify the raw ground condition of a sample.
///
/// Grounded iff speed is absent-or-low AND both altitudes are absent-or-low.
/// An absent field always counts as a grounded signal, never as a fault.
pub fn classify_raw(sample: &TelemetrySample, thresholds: &StateThresholds) -> RawCondition {
    let speed_low = sample
        .ground_speed_knots
        .map(|gs| gs < thresholds.ground_speed_knots)
        .unwrap_or(true);
    let baro_low = sample
        .altitude_baro_ft
        .map(|alt| alt < thresholds.altitude_ft)
        .unwrap_or(true);
    let geom_low = sample
        .altitude_geom_ft
        .map(|alt| alt < thresholds.altitude_ft as f64)
        .unwrap_or(true);

    if speed_low && baro_low && geom_low {
        RawCondition::Grounded
    } else {
        RawCondition::Airborne
    }
}

/// Step the motion state machine.
///
/// The two-step debounce means an aircraft must hold a raw condition for two
/// consecutive samples before the confirmed state flips.
pub fn next_state(current: MotionState, raw: RawCondition) -> MotionState {
    match (current, raw) {
        (MotionState::OnGround, RawCondition::Airborne) => MotionState::Transitioning,
        (MotionState::OnGround, RawCondition::Grounded) => MotionState::OnGround,
        (MotionState::Transitioning, RawCondition::Airborne) => MotionState::InAir,
        (MotionState::Transitioning, RawCondition::Grounded) => MotionState::OnGround,
        (MotionState::InAir, RawCondition::Airborne) => MotionState::InAir,
        (MotionState::InAir, RawCondition::Grounded) => MotionState::Transitioning,
    }
}
