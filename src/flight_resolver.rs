//! Maps incoming telemetry to a logical UniqueFlight row.

use anyhow::Result;
use tracing::{debug, info};

use crate::flights::{FlightIdentity, TelemetryPoint, UniqueFlight};
use crate::ledger::FlightLedgerStore;
use crate::telemetry::TelemetrySample;

/// Outcome of resolving one sample against the flight ledger.
#[derive(Debug, Clone)]
pub struct ResolvedFlight {
    /// For an extended flight this is the pre-update record, so callers still
    /// see the first-detected data during event detection.
    pub flight: UniqueFlight,
    pub created: bool,
    /// True when the sample was strictly newer and last-detected was updated.
    /// False together with `created == false` means a stale observation that
    /// left the row untouched.
    pub extended: bool,
}

/// Resolve a sample to its UniqueFlight, creating or extending as needed.
///
/// Returns None when the sample carries no complete identity triple; such
/// samples are still archived as raw telemetry by the store but are not
/// tracked as part of any flight.
///
/// `force_new` is set when the aircraft's snapshot sequence had a gap: the
/// lookup is skipped and a fresh row is inserted even for an identical
/// triple, so two physically distinct flights sharing a designator/squawk are
/// never merged. The superseded row is never mutated again.
pub fn resolve<S: FlightLedgerStore + ?Sized>(
    store: &mut S,
    sample: &TelemetrySample,
    sequence: u64,
    force_new: bool,
) -> Result<Option<ResolvedFlight>> {
    let identity = match FlightIdentity::from_sample(sample) {
        Some(identity) => identity,
        None => return Ok(None),
    };
    let point = TelemetryPoint::from_sample(sample, sequence);

    if force_new {
        let flight = UniqueFlight::new(identity, point);
        store.insert_flight(&flight)?;
        info!(
            "Snapshot gap for {}: started new unique flight {}",
            flight.identity, flight.id
        );
        return Ok(Some(ResolvedFlight {
            flight,
            created: true,
            extended: false,
        }));
    }

    match store.get_flight_by_identity(&identity)? {
        Some(existing) => {
            if point.time > existing.last.time {
                store.update_last_detected(existing.id, &point)?;
                Ok(Some(ResolvedFlight {
                    flight: existing,
                    created: false,
                    extended: true,
                }))
            } else {
                debug!(
                    "Stale observation for flight {} ({} not newer than {})",
                    existing.identity, point.time, existing.last.time
                );
                Ok(Some(ResolvedFlight {
                    flight: existing,
                    created: false,
                    extended: false,
                }))
            }
        }
        None => {
            let flight = UniqueFlight::new(identity, point);
            store.insert_flight(&flight)?;
            debug!("Created unique flight {} for {}", flight.id, flight.identity);
            Ok(Some(ResolvedFlight {
                flight,
                created: true,
                extended: false,
            }))
        }
    }
}
