//! DRAM channel model.
//!
//! This module contains the timing engine and everything it owns:
//! 1. **Bank/Rank:** Eligibility watermarks, open rows, the activation window, and
//!    refresh/power state.
//! 2. **Bus:** Command-slot arbitration, shareable between engines.
//! 3. **Events:** The per-rank callback queue that drives the state machines.
//! 4. **Engine:** Activate, precharge, and burst sequencing.
//! 5. **Scheduler:** FR-FCFS selection and the bank-preparation heuristic.

/// Per-bank watermarks and open-row state.
pub mod bank;
/// Command/address bus arbitration.
pub mod bus;
/// Command log and power-sink interface.
pub mod command;
/// Timing engine: activate, precharge, and burst access.
pub mod engine;
/// Per-rank delayed callbacks.
pub mod event;
/// Controller seam consumed by the engine.
pub mod host;
/// Power-state machine handlers.
mod power;
/// Rank state and the activation window.
pub mod rank;
/// Refresh state machine handlers.
mod refresh;
/// Decoded requests and queues.
pub mod request;
/// FR-FCFS selection and bank preparation.
mod scheduler;

pub use bank::Bank;
pub use bus::{AddrBus, CommandBusArbiter, SharedBus};
pub use command::{Command, CommandRecorder, DramCommand, PowerSink, RecordedCommand};
pub use engine::TimingEngine;
pub use event::{EventId, EventQueue, RankEvent};
pub use host::{ControllerHost, DrainState, HostState};
pub use rank::{ActivationWindow, PowerState, Rank, RefreshState};
pub use request::{DramRequest, RequestQueue};
