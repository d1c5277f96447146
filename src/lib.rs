//! skywatch - snapshot-based aircraft telemetry ingestion with takeoff and
//! landing detection.
//!
//! The core is a per-aircraft ground/air state machine with a two-step
//! debounce, a unique-flight ledger keyed by aircraft/designator/squawk, and
//! a geofence-correlated event detector whose takeoffs and landings are
//! reconciled idempotently into a ledger store.

pub mod airports;
pub mod config;
pub mod event_detector;
pub mod fetch;
pub mod flight_resolver;
pub mod flight_tracker;
pub mod flights;
pub mod ledger;
pub mod reconciler;
pub mod snapshot_processor;
pub mod telemetry;

pub use airports::{Airport, GeofenceMatcher};
pub use config::Config;
pub use fetch::SnapshotFetcher;
pub use flight_tracker::{AircraftState, FlightTracker, MotionState, StateThresholds};
pub use flights::{EventKind, FlightEvent, FlightIdentity, TelemetryPoint, UniqueFlight};
pub use ledger::{FlightLedgerStore, MemoryLedger};
pub use snapshot_processor::{SnapshotOutcome, SnapshotProcessor};
pub use telemetry::{TelemetrySample, TelemetrySnapshot};
