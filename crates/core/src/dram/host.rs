//! Controller seam.
//!
//! The engine reacts to the state of the memory controller that drives it: which bus
//! direction is active, whether the controller has a scheduling or response event
//! pending, and whether the system is draining. [`ControllerHost`] exposes exactly that.

use crate::common::Tick;

/// Drain status of the surrounding system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainState {
    /// Normal operation.
    #[default]
    Running,
    /// Draining outstanding work.
    Draining,
    /// Fully drained.
    Drained,
}

/// What the engine consumes from the higher-level controller.
pub trait ControllerHost {
    /// Whether the data bus is (if `next`, will be) in the read direction.
    fn in_read_bus_state(&self, next: bool) -> bool;

    /// Whether the data bus is (if `next`, will be) in the write direction.
    fn in_write_bus_state(&self, next: bool) -> bool;

    /// Whether the controller has a request-scheduling event pending.
    fn request_event_scheduled(&self) -> bool;

    /// Whether the controller has a read-response event pending.
    fn respond_event_scheduled(&self) -> bool;

    /// Asks the controller to resume request scheduling at `at`.
    fn restart_scheduler(&mut self, at: Tick);

    /// Current drain status.
    fn drain_state(&self) -> DrainState;
}

/// Plain-data controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostState {
    /// Current bus direction is read.
    pub read_bus: bool,
    /// Bus direction after the pending switch, if any.
    pub next_read_bus: bool,
    /// A request-scheduling event is pending.
    pub request_scheduled: bool,
    /// A read-response event is pending.
    pub respond_scheduled: bool,
    /// Set by [`ControllerHost::restart_scheduler`]; earliest requested restart.
    pub restart_at: Option<Tick>,
    /// Drain status.
    pub drain: DrainState,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            read_bus: true,
            next_read_bus: true,
            request_scheduled: false,
            respond_scheduled: false,
            restart_at: None,
            drain: DrainState::Running,
        }
    }
}

impl HostState {
    /// Sets both the current and next bus direction.
    pub fn set_read_bus(&mut self, read: bool) {
        self.read_bus = read;
        self.next_read_bus = read;
    }

    /// Takes the pending restart request.
    pub fn take_restart(&mut self) -> Option<Tick> {
        self.restart_at.take()
    }
}

impl ControllerHost for HostState {
    fn in_read_bus_state(&self, next: bool) -> bool {
        if next { self.next_read_bus } else { self.read_bus }
    }

    fn in_write_bus_state(&self, next: bool) -> bool {
        !self.in_read_bus_state(next)
    }

    fn request_event_scheduled(&self) -> bool {
        self.request_scheduled
    }

    fn respond_event_scheduled(&self) -> bool {
        self.respond_scheduled
    }

    fn restart_scheduler(&mut self, at: Tick) {
        self.restart_at = Some(self.restart_at.map_or(at, |t| t.min(at)));
    }

    fn drain_state(&self) -> DrainState {
        self.drain
    }
}
