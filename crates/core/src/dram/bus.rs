//! Command/address bus arbitration.
//!
//! The command bus is the one resource shared by every timing engine on a channel (and
//! by several engines in fan-out setups). Time is divided into slots of one command clock;
//! each slot is granted at most once.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::trace;

use crate::common::{Tick, div_ceil};

/// Bus handle shared between engines.
pub type SharedBus = Rc<RefCell<dyn AddrBus>>;

/// A command/address bus that grants issue slots.
pub trait AddrBus {
    /// Reserves the first free slot at or after `requested`.
    ///
    /// # Arguments
    ///
    /// * `requested` - Earliest acceptable issue tick.
    /// * `now` - Current simulated tick (used for pruning stale reservations).
    ///
    /// # Returns
    ///
    /// The granted tick, never earlier than `requested`.
    fn schedule_addr_bus(&mut self, requested: Tick, now: Tick) -> Tick;

    /// Reserves bandwidth for a command that occupies several bus cycles, or that must
    /// share a window with at most `max_commands` others.
    ///
    /// The default grants a single slot.
    fn verify_multi_cmd(
        &mut self,
        requested: Tick,
        now: Tick,
        window: Tick,
        max_commands: u32,
    ) -> Tick {
        let _ = (window, max_commands);
        self.schedule_addr_bus(requested, now)
    }
}

/// Slot-reservation arbiter at command-clock granularity.
#[derive(Debug, Clone)]
pub struct CommandBusArbiter {
    reserved: BTreeSet<u64>,
    t_ck: Tick,
    calls: u32,
    prune_interval: u32,
}

impl CommandBusArbiter {
    /// Creates an arbiter with empty reservations.
    ///
    /// # Arguments
    ///
    /// * `t_ck` - Slot width (command clock period), non-zero.
    /// * `prune_interval` - Grants between pruning passes.
    pub fn new(t_ck: Tick, prune_interval: u32) -> Self {
        Self {
            reserved: BTreeSet::new(),
            t_ck: t_ck.max(1),
            calls: 0,
            prune_interval,
        }
    }

    /// Creates an arbiter wrapped for sharing between engines.
    pub fn shared(t_ck: Tick, prune_interval: u32) -> SharedBus {
        Rc::new(RefCell::new(Self::new(t_ck, prune_interval)))
    }

    /// Number of currently held reservations.
    pub fn reserved_slots(&self) -> usize {
        self.reserved.len()
    }

    /// Whether the slot containing `at` is reserved.
    pub fn is_reserved(&self, at: Tick) -> bool {
        self.reserved.contains(&div_ceil(at, self.t_ck))
    }

    fn prune(&mut self, now: Tick) {
        let floor = div_ceil(now, self.t_ck);
        let before = self.reserved.len();
        self.reserved = self.reserved.split_off(&floor);
        trace!(
            removed = before - self.reserved.len(),
            floor,
            "pruned bus reservations"
        );
    }
}

impl AddrBus for CommandBusArbiter {
    fn schedule_addr_bus(&mut self, requested: Tick, now: Tick) -> Tick {
        self.calls += 1;
        if self.calls > self.prune_interval {
            self.prune(now);
            self.calls = 0;
        }

        let mut slot = div_ceil(requested, self.t_ck);
        while self.reserved.contains(&slot) {
            slot += 1;
        }
        let _ = self.reserved.insert(slot);

        slot * self.t_ck
    }
}
