//! Device domain for the LockHub backend.
//!
//! Provides:
//! - Device, status, and access-record types
//! - The device registry (create-on-first-contact, soft deactivation)
//! - The best-effort TTL status cache

pub mod device;
pub mod registry;
pub mod status_cache;

// Re-exports
pub use device::{
    AccessRecord, ConnectionState, Device, DeviceError, DeviceStatus, DoorState, StatusSnapshot,
};

pub use registry::DeviceRegistry;

pub use status_cache::{CacheStats, StatusCache};
