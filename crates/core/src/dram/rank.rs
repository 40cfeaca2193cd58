//! Rank bookkeeping and state definitions.
//!
//! This module holds the data side of a rank:
//! 1. **Banks:** The fixed set of [`Bank`] entries owned by the rank.
//! 2. **Activation window:** A ring buffer of the most recent activate ticks.
//! 3. **State machines:** Refresh and power state values plus the counters they consult.
//! 4. **Command log:** Issue-ordered commands awaiting delivery to a power sink.
//!
//! The transition logic lives on the engine (`refresh.rs` and `power.rs`) since it needs
//! the event queue and the controller host.

use std::fmt;

use super::bank::Bank;
use super::command::Command;
use crate::common::Tick;

/// Refresh state of a rank. Reads and writes may only be scheduled in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshState {
    /// No refresh in progress.
    Idle,
    /// Waiting for an in-flight access to this rank to finish.
    Drain,
    /// Leaving a power-down state ahead of the refresh.
    PdExit,
    /// Leaving self-refresh; holds the rank unavailable for `tXS`.
    SrefExit,
    /// Closing every open bank.
    Pre,
    /// Ready to issue the refresh command.
    Start,
    /// Refresh command issued, waiting `tRFC`.
    Run,
}

impl RefreshState {
    /// Short name used in logs and errors.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Drain => "drain",
            Self::PdExit => "powerdown-exit",
            Self::SrefExit => "self-refresh-exit",
            Self::Pre => "precharging",
            Self::Start => "starting",
            Self::Run => "running",
        }
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power state of a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    /// All banks closed, clocks running.
    Idle,
    /// Refreshing.
    Ref,
    /// Self-refresh.
    Sref,
    /// Precharge power-down.
    PrePdn,
    /// At least one bank open.
    Act,
    /// Active power-down.
    ActPdn,
}

impl PowerState {
    /// Number of power states, for residency tables.
    pub const COUNT: usize = 6;

    /// Every state in residency-table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Idle,
        Self::Ref,
        Self::Sref,
        Self::PrePdn,
        Self::Act,
        Self::ActPdn,
    ];

    /// Position of this state in residency tables.
    pub const fn index(self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Ref => 1,
            Self::Sref => 2,
            Self::PrePdn => 3,
            Self::Act => 4,
            Self::ActPdn => 5,
        }
    }

    /// Short name used in logs, errors, and statistics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ref => "refresh",
            Self::Sref => "self-refresh",
            Self::PrePdn => "precharge-power-down",
            Self::Act => "active",
            Self::ActPdn => "active-power-down",
        }
    }

    /// Whether the rank counts as idle for residency accounting.
    pub const fn is_low_power(self) -> bool {
        matches!(self, Self::PrePdn | Self::ActPdn | Self::Sref)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-capacity history of the most recent activate ticks.
///
/// `head` always indexes the oldest slot. Slots start empty, so the window constraint
/// only applies once `capacity` activates have been recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationWindow {
    slots: Vec<Option<Tick>>,
    head: usize,
}

impl ActivationWindow {
    /// Creates an empty window holding `capacity` activates.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            head: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Oldest activate still in the window.
    pub fn oldest(&self) -> Option<Tick> {
        self.slots.get(self.head).copied().flatten()
    }

    /// Replaces the oldest entry with `at`.
    pub fn record(&mut self, at: Tick) {
        if let Some(slot) = self.slots.get_mut(self.head) {
            *slot = Some(at);
            self.head = (self.head + 1) % self.slots.len();
        }
    }

    /// Recorded activates, newest first.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = Tick> + '_ {
        let n = self.slots.len();
        (1..=n).filter_map(move |i| self.slots[(self.head + n - i) % n])
    }
}

/// One rank of DRAM: banks plus refresh and power bookkeeping.
#[derive(Debug, Clone)]
pub struct Rank {
    /// Rank index within the channel.
    pub rank: u8,
    /// Banks, indexed by bank number.
    pub banks: Vec<Bank>,
    /// Banks with an open row.
    pub num_banks_active: u32,
    /// Recent activates, for the `tXAW` constraint.
    pub act_window: ActivationWindow,
    /// Tick of the last read or write burst.
    pub last_burst_at: Tick,
    /// Events that hold off power-down (read responses, write/precharge completion,
    /// refresh).
    pub outstanding_events: u32,
    /// Queued reads targeting this rank.
    pub read_entries: u32,
    /// Queued writes targeting this rank.
    pub write_entries: u32,
    /// Refresh state machine.
    pub refresh_state: RefreshState,
    /// Current power state.
    pub power_state: PowerState,
    /// Target of the pending (or last) power transition.
    pub power_state_trans: PowerState,
    /// Low-power state to return to after a refresh.
    pub power_state_post_refresh: PowerState,
    /// Tick the current power state was entered.
    pub power_state_at: Tick,
    /// In, or transitioning to, a low-power state.
    pub in_low_power: bool,
    /// Earliest tick a wake-up may start.
    pub wake_up_allowed_at: Tick,
    /// Tick the current refresh was due.
    pub refresh_due_at: Tick,
    /// Commands in issue order.
    pub cmd_list: Vec<Command>,
}

impl Rank {
    /// Creates a rank with every bank closed and both state machines idle.
    ///
    /// # Arguments
    ///
    /// * `rank` - Rank index.
    /// * `banks` - Banks per rank.
    /// * `bank_groups` - Bank groups per rank; 0 puts every bank in its own group.
    /// * `activation_limit` - Activates allowed per `tXAW` window.
    pub fn new(rank: u8, banks: u8, bank_groups: u8, activation_limit: usize) -> Self {
        let banks = (0..banks)
            .map(|b| {
                let group = if bank_groups > 0 { b % bank_groups } else { b };
                Bank::new(b, group)
            })
            .collect();

        Self {
            rank,
            banks,
            num_banks_active: 0,
            act_window: ActivationWindow::new(activation_limit),
            last_burst_at: 0,
            outstanding_events: 0,
            read_entries: 0,
            write_entries: 0,
            refresh_state: RefreshState::Idle,
            power_state: PowerState::Idle,
            power_state_trans: PowerState::Idle,
            power_state_post_refresh: PowerState::Idle,
            power_state_at: 0,
            in_low_power: false,
            wake_up_allowed_at: 0,
            refresh_due_at: 0,
            cmd_list: Vec::new(),
        }
    }

    /// Whether reads and writes may be scheduled to this rank.
    pub fn in_ref_idle_state(&self) -> bool {
        self.refresh_state == RefreshState::Idle
    }

    /// Whether all banks are closed and the rank is awake.
    pub fn in_pwr_idle_state(&self) -> bool {
        self.power_state == PowerState::Idle
    }
}
