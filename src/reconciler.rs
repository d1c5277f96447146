//! Idempotent application of detected events to the flight ledger.

use anyhow::Result;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::flights::{EventKind, FlightEvent};
use crate::ledger::FlightLedgerStore;

/// What `record_event` did with a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// First record for this (kind, flight, airport) key
    Inserted,
    /// Existing record re-attributed to an earlier snapshot
    Reattributed,
    /// Duplicate or later re-detection, discarded
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub event: FlightEvent,
    pub disposition: EventDisposition,
}

/// Record a takeoff/landing detection, keeping at most one authoritative
/// record per (kind, flight, airport) key.
///
/// The earliest-observed occurrence wins: a re-detection only overwrites the
/// stored record when its snapshot sequence is smaller than what is stored.
/// Calling this any number of times with the same arguments leaves exactly
/// one record. After the write, duplicate rows for the key are pruned down to
/// the lowest-sequence one.
pub fn record_event<S: FlightLedgerStore + ?Sized>(
    store: &mut S,
    kind: EventKind,
    flight_id: Uuid,
    airport: &str,
    sequence: u64,
) -> Result<RecordedEvent> {
    let recorded = match store.get_event(kind, flight_id, airport)? {
        None => {
            let event = FlightEvent::new(kind, flight_id, airport, sequence);
            store.insert_event(&event)?;
            RecordedEvent {
                event,
                disposition: EventDisposition::Inserted,
            }
        }
        Some(existing) if sequence < existing.sequence => {
            store.update_event_sequence(existing.id, sequence)?;
            debug!(
                "Re-attributed {} for flight {} at {} from sequence {} to {}",
                kind, flight_id, airport, existing.sequence, sequence
            );
            RecordedEvent {
                event: FlightEvent {
                    sequence,
                    ..existing
                },
                disposition: EventDisposition::Reattributed,
            }
        }
        Some(existing) => RecordedEvent {
            event: existing,
            disposition: EventDisposition::Unchanged,
        },
    };

    let pruned = store.prune_duplicate_events(kind, flight_id, airport)?;
    if pruned > 0 {
        warn!(
            "Pruned {} duplicate {} record(s) for flight {} at {}",
            pruned, kind, flight_id, airport
        );
    }

    Ok(recorded)
}
