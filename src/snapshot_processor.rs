//! The per-snapshot entry point tying the core components together.
//!
//! One snapshot is fully ingested, classified, and reconciled before the
//! next is fetched; nothing in here suspends or blocks. Store failures abort
//! the whole cycle and propagate to the orchestrating loop.

use anyhow::Result;
use chrono::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::airports::GeofenceMatcher;
use crate::event_detector::EventDetector;
use crate::flight_resolver;
use crate::flight_tracker::{FlightTracker, StateThresholds};
use crate::flights::FlightEvent;
use crate::ledger::FlightLedgerStore;
use crate::reconciler;
use crate::telemetry::TelemetrySnapshot;

/// Summary of one processed snapshot cycle.
#[derive(Debug, Default)]
pub struct SnapshotOutcome {
    pub sequence: u64,
    pub samples: usize,
    /// Samples without a complete identity triple, archived but not tracked
    pub untracked: usize,
    /// Stale (not strictly newer) observations that were ignored
    pub stale: usize,
    /// Ids of UniqueFlight rows created this cycle
    pub flights_created: Vec<Uuid>,
    /// Ids of rows whose last-detected side advanced this cycle
    pub flights_extended: Vec<Uuid>,
    /// Authoritative event records touched by this cycle's detections
    pub events: Vec<FlightEvent>,
}

/// Orchestrates tracker, resolver, detector, and reconciler over a store.
pub struct SnapshotProcessor<S: FlightLedgerStore> {
    tracker: FlightTracker,
    detector: EventDetector,
    store: S,
}

impl<S: FlightLedgerStore> SnapshotProcessor<S> {
    pub fn new(matcher: GeofenceMatcher, thresholds: StateThresholds, store: S) -> Self {
        Self {
            tracker: FlightTracker::new(thresholds),
            detector: EventDetector::new(matcher),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn tracker(&self) -> &FlightTracker {
        &self.tracker
    }

    /// Drop per-aircraft state not updated within the horizon.
    pub fn cleanup_stale_states(&mut self, max_age: Duration) -> usize {
        self.tracker.cleanup_stale(max_age)
    }

    /// Ingest one snapshot: update motion state per aircraft, resolve flight
    /// identities, detect takeoffs/landings, and reconcile them into the
    /// store. Returns the cycle's outcome for the caller to log or apply.
    pub fn process(&mut self, snapshot: &TelemetrySnapshot) -> Result<SnapshotOutcome> {
        let mut outcome = SnapshotOutcome {
            sequence: snapshot.sequence,
            samples: snapshot.samples.len(),
            ..Default::default()
        };

        for sample in &snapshot.samples {
            self.store.record_sample(snapshot.sequence, sample)?;

            let update = self.tracker.update(sample, snapshot.sequence);

            let resolved = match flight_resolver::resolve(
                &mut self.store,
                sample,
                snapshot.sequence,
                update.sequence_gap,
            )? {
                Some(resolved) => resolved,
                None => {
                    outcome.untracked += 1;
                    continue;
                }
            };

            if resolved.created {
                outcome.flights_created.push(resolved.flight.id);
                metrics::counter!("skywatch.flights_created_total").increment(1);
            } else if resolved.extended {
                outcome.flights_extended.push(resolved.flight.id);
            } else {
                // Stale observation: the ledger was not advanced, so the
                // transition cannot be attributed to this sample either.
                outcome.stale += 1;
                continue;
            }

            if let Some(detected) = self.detector.detect(&update, sample) {
                info!(
                    "Detected {} at {} for aircraft {} (flight {})",
                    detected.kind, detected.airport, sample.aircraft_id, resolved.flight.identity
                );
                let recorded = reconciler::record_event(
                    &mut self.store,
                    detected.kind,
                    resolved.flight.id,
                    &detected.airport,
                    snapshot.sequence,
                )?;
                metrics::counter!(
                    "skywatch.events_detected_total",
                    "kind" => detected.kind.to_string()
                )
                .increment(1);
                outcome.events.push(recorded.event);
            }
        }

        metrics::counter!("skywatch.snapshots_processed_total").increment(1);
        metrics::counter!("skywatch.samples_processed_total")
            .increment(outcome.samples as u64);
        metrics::gauge!("skywatch.tracked_aircraft").set(self.tracker.len() as f64);

        debug!(
            "Processed snapshot {}: {} samples, {} untracked, {} created, {} extended, {} events",
            outcome.sequence,
            outcome.samples,
            outcome.untracked,
            outcome.flights_created.len(),
            outcome.flights_extended.len(),
            outcome.events.len()
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::Airport;
    use crate::ledger::MemoryLedger;
    use crate::telemetry::TelemetrySample;
    use chrono::{Duration, Utc};

    fn processor() -> SnapshotProcessor<MemoryLedger> {
        let matcher = GeofenceMatcher::new(vec![Airport::new("XNA", 36.2806, -94.3046)], 1_000.0);
        SnapshotProcessor::new(matcher, StateThresholds::default(), MemoryLedger::new())
    }

    fn sample(gs: f32, alt: i32, offset_secs: i64) -> TelemetrySample {
        TelemetrySample {
            aircraft_id: "N123".to_string(),
            flight_designator: Some("UAL100".to_string()),
            squawk: Some("1200".to_string()),
            aircraft_type: Some("C172".to_string()),
            ground_speed_knots: Some(gs),
            altitude_baro_ft: Some(alt),
            altitude_geom_ft: Some(alt as f64),
            latitude: Some(36.2806),
            longitude: Some(-94.3046),
            track_degrees: Some(180.0),
            timestamp: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    fn snapshot(sequence: u64, samples: Vec<TelemetrySample>) -> TelemetrySnapshot {
        TelemetrySnapshot {
            sequence,
            fetched_at: Utc::now(),
            samples,
        }
    }

    #[test]
    fn test_untracked_sample_still_archived() {
        let mut p = processor();
        let mut s = sample(5.0, 100, 0);
        s.squawk = None;

        let outcome = p.process(&snapshot(1, vec![s])).unwrap();
        assert_eq!(outcome.untracked, 1);
        assert!(outcome.flights_created.is_empty());
        assert_eq!(p.store().sample_count(), 1);
        assert_eq!(p.store().flight_count(), 0);
    }

    #[test]
    fn test_stale_sample_skips_detection() {
        let mut p = processor();
        let s = sample(5.0, 100, 0);

        p.process(&snapshot(1, vec![s.clone()])).unwrap();
        // Identical timestamp: not strictly newer
        let outcome = p.process(&snapshot(2, vec![s])).unwrap();
        assert_eq!(outcome.stale, 1);
        assert!(outcome.flights_extended.is_empty());
    }

    #[test]
    fn test_outcome_carries_flight_mutations() {
        let mut p = processor();

        let first = p.process(&snapshot(1, vec![sample(5.0, 100, 0)])).unwrap();
        assert_eq!(first.flights_created.len(), 1);
        assert!(first.flights_extended.is_empty());
        let id = first.flights_created[0];
        assert!(p.store().get_flight(id).is_some());

        let second = p.process(&snapshot(2, vec![sample(5.0, 100, 1)])).unwrap();
        assert!(second.flights_created.is_empty());
        assert_eq!(second.flights_extended, vec![id]);
    }

    #[test]
    fn test_cleanup_delegates_to_tracker() {
        let mut p = processor();
        p.process(&snapshot(1, vec![sample(5.0, 100, 0)])).unwrap();
        assert_eq!(p.cleanup_stale_states(Duration::hours(1)), 0);
        assert_eq!(p.tracker().len(), 1);
    }
}
