//! Per-bank timing state.
//!
//! A bank tracks its open row and four eligibility watermarks, one per command class.
//! Watermarks only move forward: every update takes the maximum of the current and the
//! proposed value.

use crate::common::Tick;

/// Timing state of a single DRAM bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bank {
    /// Bank index within its rank.
    pub bank: u8,
    /// Bank group this bank belongs to.
    pub bank_group: u8,
    /// Currently open row, if any.
    pub open_row: Option<u32>,
    /// Bytes transferred since the row was opened.
    pub bytes_accessed: u64,
    /// Column accesses since the row was opened.
    pub row_accesses: u32,
    act_allowed_at: Tick,
    pre_allowed_at: Tick,
    rd_allowed_at: Tick,
    wr_allowed_at: Tick,
}

impl Bank {
    /// Creates a closed bank with every watermark at zero.
    pub const fn new(bank: u8, bank_group: u8) -> Self {
        Self {
            bank,
            bank_group,
            open_row: None,
            bytes_accessed: 0,
            row_accesses: 0,
            act_allowed_at: 0,
            pre_allowed_at: 0,
            rd_allowed_at: 0,
            wr_allowed_at: 0,
        }
    }

    /// Earliest tick an activate may issue.
    pub const fn act_allowed_at(&self) -> Tick {
        self.act_allowed_at
    }

    /// Earliest tick a precharge may issue.
    pub const fn pre_allowed_at(&self) -> Tick {
        self.pre_allowed_at
    }

    /// Earliest tick a read burst may issue.
    pub const fn rd_allowed_at(&self) -> Tick {
        self.rd_allowed_at
    }

    /// Earliest tick a write burst may issue.
    pub const fn wr_allowed_at(&self) -> Tick {
        self.wr_allowed_at
    }

    /// Column watermark for the given direction.
    pub const fn col_allowed_at(&self, is_read: bool) -> Tick {
        if is_read {
            self.rd_allowed_at
        } else {
            self.wr_allowed_at
        }
    }

    /// Whether `row` is currently open.
    pub fn is_open(&self, row: u32) -> bool {
        self.open_row == Some(row)
    }

    pub(crate) fn raise_act(&mut self, at: Tick) {
        self.act_allowed_at = self.act_allowed_at.max(at);
    }

    pub(crate) fn raise_pre(&mut self, at: Tick) {
        self.pre_allowed_at = self.pre_allowed_at.max(at);
    }

    pub(crate) fn raise_rd(&mut self, at: Tick) {
        self.rd_allowed_at = self.rd_allowed_at.max(at);
    }

    pub(crate) fn raise_wr(&mut self, at: Tick) {
        self.wr_allowed_at = self.wr_allowed_at.max(at);
    }

    /// Raises all four watermarks, used on low-power exit.
    pub(crate) fn raise_all(&mut self, at: Tick) {
        self.raise_act(at);
        self.raise_pre(at);
        self.raise_rd(at);
        self.raise_wr(at);
    }
}
