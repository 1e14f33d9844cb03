//! Persistent store for the LockHub backend.
//!
//! SQLite via sqlx. This crate owns every SQL statement in the system; the
//! domain crates call the query methods on [`Database`] and never touch SQL
//! themselves. The command queries (`commands` module) carry the
//! transactional lease that the delivery protocol depends on.

pub mod access_logs;
pub mod commands;
pub mod db;
pub mod devices;
pub mod models;

pub use db::{Database, StorageError, unix_timestamp};
pub use models::{
    AccessLogRow, CommandRow, CommandStatRow, DeviceRow, DeviceStatusRow, FleetStatusRow,
    NewAccessLog, NewDeviceStatus, RetriedCommandRow,
};
