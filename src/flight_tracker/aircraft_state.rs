use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Debounced ground/air motion state for one aircraft.
///
/// Transitions always pass through `Transitioning`; a direct
/// `OnGround` ↔ `InAir` step never occurs by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    OnGround,
    Transitioning,
    InAir,
}

/// Number of motion states kept in the rolling history.
pub const STATE_HISTORY_LEN: usize = 6;

/// Per-aircraft state kept for the lifetime of the process.
///
/// Holds the current motion state, a bounded history of recent states, the
/// last observed speed/altitudes, and the last snapshot sequence number used
/// for gap detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftState {
    pub motion: MotionState,
    /// Recent motion states, oldest first
    pub history: VecDeque<MotionState>,
    pub last_ground_speed_knots: Option<f32>,
    pub last_altitude_baro_ft: Option<i32>,
    pub last_altitude_geom_ft: Option<f64>,
    pub last_sequence: Option<u64>,
    /// Wall clock time of last update, used for stale-state cleanup
    pub last_update_time: DateTime<Utc>,
}

impl AircraftState {
    /// New aircraft start on the ground; the first airborne observation still
    /// has to pass through `Transitioning`.
    pub fn new() -> Self {
        let mut history = VecDeque::with_capacity(STATE_HISTORY_LEN);
        history.push_back(MotionState::OnGround);
        Self {
            motion: MotionState::OnGround,
            history,
            last_ground_speed_knots: None,
            last_altitude_baro_ft: None,
            last_altitude_geom_ft: None,
            last_sequence: None,
            last_update_time: Utc::now(),
        }
    }

    /// True iff a prior sequence number is recorded and the new one skips
    /// at least one snapshot. Out-of-order sequence numbers never report a
    /// gap; the caller logs those as anomalies.
    pub fn has_sequence_gap(&self, new_sequence: u64) -> bool {
        match self.last_sequence {
            Some(prev) => new_sequence > prev + 1,
            None => false,
        }
    }

    /// Append a state to the bounded history, dropping the oldest entry once
    /// the cap is reached.
    pub(crate) fn push_history(&mut self, state: MotionState) {
        if self.history.len() >= STATE_HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(state);
    }

    /// The last two history entries (previous, current), if present.
    pub fn last_transition(&self) -> Option<(MotionState, MotionState)> {
        let len = self.history.len();
        if len < 2 {
            return None;
        }
        Some((self.history[len - 2], self.history[len - 1]))
    }
}

impl Default for AircraftState {
    fn default() -> Self {
        Self::new()
    }
}
