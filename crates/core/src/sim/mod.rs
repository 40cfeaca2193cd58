//! Trace-driven simulation.
//!
//! A minimal memory controller that feeds requests from a trace through the timing
//! engine: read/write queues with watermark-based bus turnaround, FR-FCFS selection, and
//! read responses at their ready time.

pub mod controller;
pub mod trace;

use thiserror::Error;

use crate::common::{ConfigError, DramError};

pub use controller::{SimReport, TraceController};
pub use trace::{TraceError, TraceRecord, check_bounds, load_trace, parse_trace};

/// Failures of a trace-driven run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fatal engine error during the run.
    #[error(transparent)]
    Dram(#[from] DramError),

    /// Unusable trace.
    #[error(transparent)]
    Trace(#[from] TraceError),
}
