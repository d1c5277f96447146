//! Derives takeoff/landing events from confirmed state transitions.

use crate::airports::GeofenceMatcher;
use crate::flight_tracker::{MotionState, StateUpdate};
use crate::flights::EventKind;
use crate::telemetry::TelemetrySample;

/// A takeoff or landing signal, not yet reconciled against the ledger.
#[derive(Debug, Clone)]
pub struct DetectedEvent {
    pub kind: EventKind,
    pub airport: String,
}

pub struct EventDetector {
    matcher: GeofenceMatcher,
}

impl EventDetector {
    pub fn new(matcher: GeofenceMatcher) -> Self {
        Self { matcher }
    }

    /// Check whether this update completed a takeoff or landing.
    ///
    /// Takeoff fires on `Transitioning -> InAir`, landing on
    /// `Transitioning -> OnGround`. The event is attributed using the current
    /// coordinates at the moment of transition, which are closest to the
    /// physical event. No position or no geofence match means no event;
    /// an aircraft never observed before simply has no transition yet.
    pub fn detect(&self, update: &StateUpdate, sample: &TelemetrySample) -> Option<DetectedEvent> {
        let kind = match (update.previous, update.current) {
            (MotionState::Transitioning, MotionState::InAir) => EventKind::Takeoff,
            (MotionState::Transitioning, MotionState::OnGround) => EventKind::Landing,
            _ => return None,
        };

        let (latitude, longitude) = sample.position()?;
        let airport = self.matcher.locate(latitude, longitude)?;

        Some(DetectedEvent {
            kind,
            airport: airport.ident.clone(),
        })
    }
}
