//! DRAM timing and command-scheduling engine.
//!
//! This crate models the timing behavior of a DRAM channel under a discrete-event clock:
//! 1. **Banks and ranks:** Per-bank eligibility watermarks, open-row tracking, and the
//!    rank-level refresh and power-state machines.
//! 2. **Command bus:** A slot-reservation arbiter shared by one or more timing engines.
//! 3. **Timing engine:** Activate/precharge/burst sequencing with every cross-bank and
//!    cross-rank minimum-delay constraint enforced exactly.
//! 4. **Scheduling:** First-ready/first-come request selection with a bank-preparation heuristic.
//! 5. **Simulation:** Configuration, statistics, and a trace-driven controller.

/// Common types (ticks, error enums).
pub mod common;
/// Engine configuration (defaults, enums, hierarchical config structures, validation).
pub mod config;
/// Banks, ranks, command bus, event queue, timing engine, and FR-FCFS scheduler.
pub mod dram;
/// Trace-driven memory controller built on the timing engine.
pub mod sim;
/// Burst, row-hit, latency, and power-state statistics.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Channel timing engine; construct with `TimingEngine::new`.
pub use crate::dram::TimingEngine;
