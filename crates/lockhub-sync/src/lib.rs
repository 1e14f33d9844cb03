//! Sync protocol for LockHub devices.
//!
//! Devices are offline between check-ins; one sync uploads buffered status
//! and access logs and downloads pending commands in a single round trip.
//! This crate owns the wire envelopes and the coordinator that runs a
//! check-in as one store transaction.

pub mod coordinator;
pub mod envelope;

// Re-exports
pub use coordinator::{SyncCoordinator, SyncError, SyncOutcome};

pub use envelope::{
    AckRequest, AckUpload, AccessLogEntry, CommandDelivery, SyncPeriod, SyncRequest, SyncResponse,
    SyncResponseBody, SyncSession, SyncUpload,
};
