use anyhow::Result;
use std::collections::HashMap;
use uuid::Uuid;

use crate::flights::{EventKind, FlightEvent, FlightIdentity, TelemetryPoint, UniqueFlight};
use crate::telemetry::TelemetrySample;

/// Storage collaborator for unique flights and flight events.
///
/// The core treats every method as a synchronous return-or-fail operation and
/// never manages transactions itself; a transactional implementation is
/// expected to wrap one snapshot's worth of calls in a single atomic unit.
pub trait FlightLedgerStore {
    /// Fetch the current flight row for an identity triple, if one exists.
    fn get_flight_by_identity(&self, identity: &FlightIdentity) -> Result<Option<UniqueFlight>>;

    /// Insert a new flight row. If the identity triple already points at an
    /// older row, the index moves to the new row and the old row is left
    /// untouched forever.
    fn insert_flight(&mut self, flight: &UniqueFlight) -> Result<()>;

    /// Update only the last-detected side of a flight.
    /// Returns false when the flight id is unknown.
    fn update_last_detected(&mut self, flight_id: Uuid, last: &TelemetryPoint) -> Result<bool>;

    /// Fetch the authoritative event for a (kind, flight, airport) key.
    /// When a store holds duplicates, the lowest-sequence row is returned.
    fn get_event(
        &self,
        kind: EventKind,
        flight_id: Uuid,
        airport: &str,
    ) -> Result<Option<FlightEvent>>;

    fn insert_event(&mut self, event: &FlightEvent) -> Result<()>;

    /// Re-attribute an existing event to a different snapshot sequence.
    /// Returns false when the event id is unknown.
    fn update_event_sequence(&mut self, event_id: Uuid, sequence: u64) -> Result<bool>;

    /// Returns false when the event id is unknown.
    fn delete_event(&mut self, event_id: Uuid) -> Result<bool>;

    /// Delete all but the lowest-sequence event for a (kind, flight, airport)
    /// key. Returns the number of rows removed. Cleans up after stores where
    /// a racing insert-then-update path produced two rows.
    fn prune_duplicate_events(
        &mut self,
        kind: EventKind,
        flight_id: Uuid,
        airport: &str,
    ) -> Result<usize>;

    /// Archive one raw telemetry sample for a snapshot, identity or not.
    fn record_sample(&mut self, sequence: u64, sample: &TelemetrySample) -> Result<()>;
}

/// In-process ledger used by the binary and the tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    flights: HashMap<Uuid, UniqueFlight>,
    identity_index: HashMap<FlightIdentity, Uuid>,
    events: Vec<FlightEvent>,
    samples: Vec<(u64, TelemetrySample)>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flight_count(&self) -> usize {
        self.flights.len()
    }

    pub fn get_flight(&self, flight_id: Uuid) -> Option<&UniqueFlight> {
        self.flights.get(&flight_id)
    }

    pub fn events(&self) -> &[FlightEvent] {
        &self.events
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl FlightLedgerStore for MemoryLedger {
    fn get_flight_by_identity(&self, identity: &FlightIdentity) -> Result<Option<UniqueFlight>> {
        Ok(self
            .identity_index
            .get(identity)
            .and_then(|id| self.flights.get(id))
            .cloned())
    }

    fn insert_flight(&mut self, flight: &UniqueFlight) -> Result<()> {
        self.flights.insert(flight.id, flight.clone());
        self.identity_index
            .insert(flight.identity.clone(), flight.id);
        Ok(())
    }

    fn update_last_detected(&mut self, flight_id: Uuid, last: &TelemetryPoint) -> Result<bool> {
        match self.flights.get_mut(&flight_id) {
            Some(flight) => {
                flight.last = last.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get_event(
        &self,
        kind: EventKind,
        flight_id: Uuid,
        airport: &str,
    ) -> Result<Option<FlightEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.kind == kind && e.flight_id == flight_id && e.airport == airport)
            .min_by_key(|e| e.sequence)
            .cloned())
    }

    fn insert_event(&mut self, event: &FlightEvent) -> Result<()> {
        self.events.push(event.clone());
        Ok(())
    }

    fn update_event_sequence(&mut self, event_id: Uuid, sequence: u64) -> Result<bool> {
        match self.events.iter_mut().find(|e| e.id == event_id) {
            Some(event) => {
                event.sequence = sequence;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_event(&mut self, event_id: Uuid) -> Result<bool> {
        let before = self.events.len();
        self.events.retain(|e| e.id != event_id);
        Ok(self.events.len() < before)
    }

    fn prune_duplicate_events(
        &mut self,
        kind: EventKind,
        flight_id: Uuid,
        airport: &str,
    ) -> Result<usize> {
        let keep = self
            .events
            .iter()
            .filter(|e| e.kind == kind && e.flight_id == flight_id && e.airport == airport)
            .min_by_key(|e| e.sequence)
            .map(|e| e.id);

        let keep = match keep {
            Some(id) => id,
            None => return Ok(0),
        };

        let before = self.events.len();
        self.events.retain(|e| {
            e.id == keep || e.kind != kind || e.flight_id != flight_id || e.airport != airport
        });
        Ok(before - self.events.len())
    }

    fn record_sample(&mut self, sequence: u64, sample: &TelemetrySample) -> Result<()> {
        self.samples.push((sequence, sample.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn point(sequence: u64) -> TelemetryPoint {
        TelemetryPoint {
            time: Utc::now(),
            sequence,
            ground_speed_knots: Some(5.0),
            altitude_baro_ft: Some(100),
            altitude_geom_ft: Some(110.0),
            latitude: Some(36.0),
            longitude: Some(-94.0),
            track_degrees: None,
        }
    }

    fn identity() -> FlightIdentity {
        FlightIdentity {
            aircraft_id: "N123".to_string(),
            flight_designator: "UAL100".to_string(),
            squawk: "1200".to_string(),
        }
    }

    #[test]
    fn test_flight_roundtrip_and_last_detected_update() {
        let mut ledger = MemoryLedger::new();
        let flight = UniqueFlight::new(identity(), point(1));
        ledger.insert_flight(&flight).unwrap();

        let fetched = ledger.get_flight_by_identity(&identity()).unwrap().unwrap();
        assert_eq!(fetched.id, flight.id);

        assert!(ledger.update_last_detected(flight.id, &point(2)).unwrap());
        let fetched = ledger.get_flight_by_identity(&identity()).unwrap().unwrap();
        assert_eq!(fetched.last.sequence, 2);
        assert_eq!(fetched.first.sequence, 1);

        assert!(!ledger.update_last_detected(Uuid::new_v4(), &point(3)).unwrap());
    }

    #[test]
    fn test_new_row_supersedes_identity_index() {
        let mut ledger = MemoryLedger::new();
        let old = UniqueFlight::new(identity(), point(1));
        let new = UniqueFlight::new(identity(), point(5));
        ledger.insert_flight(&old).unwrap();
        ledger.insert_flight(&new).unwrap();

        // Index points at the new row; the old row still exists untouched
        let fetched = ledger.get_flight_by_identity(&identity()).unwrap().unwrap();
        assert_eq!(fetched.id, new.id);
        assert_eq!(ledger.flight_count(), 2);
        assert_eq!(ledger.get_flight(old.id).unwrap().last.sequence, 1);
    }

    #[test]
    fn test_get_event_returns_lowest_sequence() {
        let mut ledger = MemoryLedger::new();
        let flight_id = Uuid::new_v4();
        ledger
            .insert_event(&FlightEvent::new(EventKind::Takeoff, flight_id, "XNA", 9))
            .unwrap();
        ledger
            .insert_event(&FlightEvent::new(EventKind::Takeoff, flight_id, "XNA", 4))
            .unwrap();

        let event = ledger
            .get_event(EventKind::Takeoff, flight_id, "XNA")
            .unwrap()
            .unwrap();
        assert_eq!(event.sequence, 4);
    }

    #[test]
    fn test_prune_keeps_lowest_sequence() {
        let mut ledger = MemoryLedger::new();
        let flight_id = Uuid::new_v4();
        ledger
            .insert_event(&FlightEvent::new(EventKind::Landing, flight_id, "ROG", 12))
            .unwrap();
        ledger
            .insert_event(&FlightEvent::new(EventKind::Landing, flight_id, "ROG", 8))
            .unwrap();
        // A different kind for the same pair is untouched
        ledger
            .insert_event(&FlightEvent::new(EventKind::Takeoff, flight_id, "ROG", 3))
            .unwrap();

        let removed = ledger
            .prune_duplicate_events(EventKind::Landing, flight_id, "ROG")
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(ledger.events().len(), 2);
        let event = ledger
            .get_event(EventKind::Landing, flight_id, "ROG")
            .unwrap()
            .unwrap();
        assert_eq!(event.sequence, 8);
    }

    #[test]
    fn test_prune_with_no_duplicates_is_noop() {
        let mut ledger = MemoryLedger::new();
        let flight_id = Uuid::new_v4();
        assert_eq!(
            ledger
                .prune_duplicate_events(EventKind::Takeoff, flight_id, "XNA")
                .unwrap(),
            0
        );
        ledger
            .insert_event(&FlightEvent::new(EventKind::Takeoff, flight_id, "XNA", 4))
            .unwrap();
        assert_eq!(
            ledger
                .prune_duplicate_events(EventKind::Takeoff, flight_id, "XNA")
                .unwrap(),
            0
        );
    }
}
