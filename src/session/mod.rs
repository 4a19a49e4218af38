//! Audio test session management
//!
//! This module provides the `AudioTestSession` façade that manages:
//! - The four hardware test operations (DMIC/line-in record and playback)
//! - Single-listener progress/completion event delivery
//! - Result-code and last-error failure reporting
//! - Bounded submission of operations as awaitable tasks

mod listener;
mod params;
mod runner;
mod session;
mod stats;

pub use listener::{LogListener, TestListener};
pub use params::{Operation, OperationKind, DEFAULT_RECORD_SECS};
pub use runner::{OperationRunner, DEFAULT_MAX_IN_FLIGHT};
pub use session::{AudioTestSession, CODE_UNKNOWN_FAILURE};
pub use stats::SessionStats;
