//! Command system for store-and-forward device control.
//!
//! Provides:
//! - Command data structures and the lifecycle state machine
//! - Typed command payloads with an opaque fallback
//! - The persistent command queue (enqueue, lease, acknowledge, cancel,
//!   retry)
//! - Batch acknowledgment processing

pub mod ack;
pub mod command;
pub mod queue;

// Re-exports
pub use command::{
    AckStatus, CommandPayload, CommandRecord, CommandStatus, CommandType, RfidAction,
    new_command_id,
};

pub use queue::{CommandError, CommandQueue, RetriedCommand};

pub use ack::{AckProcessor, CommandAck};
