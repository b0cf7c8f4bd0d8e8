//! State module for tracking a harvest run
//!
//! # Components
//!
//! - `Phase`: Where the pagination driver currently is
//! - `Termination`: How a run ended (exhausted, cancelled, failed)
//! - `RunStatus`: Caller-owned progress record with the stop flag
//! - `StopSignal`: Cloneable handle polled at every suspend point

mod phase;
mod run_status;

// Re-export main types
pub use phase::{Phase, Termination};
pub use run_status::{RunGuard, RunStatus, StopSignal, MAX_LOG_LINES};
