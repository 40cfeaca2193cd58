//! Decoded requests as seen by the engine.

use std::collections::VecDeque;

use crate::common::Tick;

/// A decoded single-burst request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DramRequest {
    /// Controller-assigned id, unique among queued requests.
    pub id: u64,
    /// Target rank.
    pub rank: u8,
    /// Target bank within the rank.
    pub bank: u8,
    /// Target row.
    pub row: u32,
    /// Read (true) or write.
    pub is_read: bool,
    /// Tick the request entered the controller.
    pub entry_time: Tick,
    /// Data-ready tick, set once the burst is scheduled.
    pub ready_time: Tick,
}

impl DramRequest {
    /// Creates a request that has not been scheduled yet.
    pub const fn new(id: u64, rank: u8, bank: u8, row: u32, is_read: bool, entry_time: Tick) -> Self {
        Self {
            id,
            rank,
            bank,
            row,
            is_read,
            entry_time,
            ready_time: entry_time,
        }
    }

    /// Flat bank index across the channel.
    pub const fn bank_id(&self, banks_per_rank: usize) -> usize {
        self.rank as usize * banks_per_rank + self.bank as usize
    }
}

/// A request queue in arrival order.
pub type RequestQueue = VecDeque<DramRequest>;
