//! Common types used throughout the DRAM engine.
//!
//! This module provides:
//! 1. **Time:** The `Tick` unit and ceiling-division helpers for clock conversion.
//! 2. **Error Handling:** Setup-time configuration errors and fatal runtime invariant violations.

/// Error types for configuration and runtime invariant violations.
pub mod error;

/// Simulated time representation.
pub mod time;

pub use error::{ConfigError, DramError, DramResult};
pub use time::{MAX_TICK, Tick, div_ceil};
