//! Discrete-event queue for rank callbacks.
//!
//! Each rank owns six delayed callbacks. Instead of closures, a callback is an
//! [`EventId`] naming the rank and the [`RankEvent`] kind; the engine dispatches popped
//! ids with a `match`. At most one entry per id is pending at a time, and entries at the
//! same tick fire in the order they were (re)scheduled.

use std::collections::{BTreeMap, HashMap};

use crate::common::{DramError, DramResult, Tick};

/// Kinds of per-rank delayed callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RankEvent {
    /// Last outstanding write burst completed.
    WriteDone,
    /// An activate took effect; move to the active power state.
    Activate,
    /// Last scheduled precharge completed.
    Precharge,
    /// Step the refresh state machine.
    Refresh,
    /// Apply the pending power-state transition.
    Power,
    /// Low-power exit completed.
    WakeUp,
}

impl RankEvent {
    /// Short name used in logs and errors.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WriteDone => "write-done",
            Self::Activate => "activate",
            Self::Precharge => "precharge",
            Self::Refresh => "refresh",
            Self::Power => "power",
            Self::WakeUp => "wake-up",
        }
    }
}

/// A per-rank callback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    /// Owning rank.
    pub rank: u8,
    /// Callback kind.
    pub kind: RankEvent,
}

impl EventId {
    /// Names the `kind` callback of `rank`.
    pub const fn new(rank: u8, kind: RankEvent) -> Self {
        Self { rank, kind }
    }
}

/// Ordered queue of pending rank callbacks.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    queue: BTreeMap<(Tick, u64), EventId>,
    pending: HashMap<EventId, (Tick, u64)>,
    seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, id: EventId, at: Tick) {
        let key = (at, self.seq);
        self.seq += 1;
        let _ = self.queue.insert(key, id);
        let _ = self.pending.insert(id, key);
    }

    /// Schedules `id` at `at`.
    ///
    /// # Errors
    ///
    /// [`DramError::EventAlreadyScheduled`] if `id` is already pending.
    pub fn schedule(&mut self, id: EventId, at: Tick) -> DramResult<()> {
        if self.pending.contains_key(&id) {
            return Err(DramError::EventAlreadyScheduled {
                rank: id.rank,
                event: id.kind.as_str(),
            });
        }
        self.insert(id, at);
        Ok(())
    }

    /// Moves `id` to `at`, scheduling it if it was not pending.
    pub fn reschedule(&mut self, id: EventId, at: Tick) {
        let _ = self.deschedule(id);
        self.insert(id, at);
    }

    /// Cancels `id`. Returns whether it was pending.
    pub fn deschedule(&mut self, id: EventId) -> bool {
        match self.pending.remove(&id) {
            Some(key) => {
                let _ = self.queue.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Whether `id` is pending.
    pub fn is_scheduled(&self, id: EventId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Tick at which `id` fires, if pending.
    pub fn when(&self, id: EventId) -> Option<Tick> {
        self.pending.get(&id).map(|&(at, _)| at)
    }

    /// Schedules `id` at `at`, or pulls a pending entry earlier. Never delays it.
    pub fn schedule_or_advance(&mut self, id: EventId, at: Tick) {
        match self.when(id) {
            Some(when) if when <= at => {}
            _ => self.reschedule(id, at),
        }
    }

    /// Schedules `id` at `at`, or pushes a pending entry later. Never advances it.
    ///
    /// # Returns
    ///
    /// `true` if the entry was newly scheduled.
    pub fn schedule_or_extend(&mut self, id: EventId, at: Tick) -> bool {
        match self.when(id) {
            None => {
                self.insert(id, at);
                true
            }
            Some(when) => {
                if when < at {
                    self.reschedule(id, at);
                }
                false
            }
        }
    }

    /// Tick of the earliest pending entry.
    pub fn next_at(&self) -> Option<Tick> {
        self.queue.keys().next().map(|&(at, _)| at)
    }

    /// Removes and returns the earliest entry if it is due by `limit`.
    pub fn pop_due(&mut self, limit: Tick) -> Option<(Tick, EventId)> {
        let (&key, _) = self.queue.iter().next()?;
        if key.0 > limit {
            return None;
        }
        let id = self.queue.remove(&key)?;
        let _ = self.pending.remove(&id);
        Some((key.0, id))
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no entry is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
