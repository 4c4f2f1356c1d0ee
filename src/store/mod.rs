//! SQLite snapshot storage.
//!
//! Persists each run's observations to a local SQLite database with two
//! tables:
//! - snapshots: id, timestamp, observation_count, run_duration_ms
//! - observations: snapshot_id, kind, key, value, label
//!
//! Every save is one transaction, so the previous snapshot stays intact if a
//! run dies mid-write. History is append-only; each run is a discrete,
//! auditable revision.

pub mod diff;
pub mod snapshot;

pub use snapshot::{Snapshot, Store};
