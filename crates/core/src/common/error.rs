//! Error definitions.
//!
//! This module defines the two failure classes of the engine:
//! 1. **Configuration errors:** Inconsistent parameters detected at setup; the engine
//!    refuses to start.
//! 2. **Runtime invariant violations:** Indicate an upstream scheduling bug, never a
//!    modelable hardware condition. They are fatal; callers must abort the run.
//!
//! Expected delays (bus contention, a bank not yet eligible, a rank refreshing) are
//! never reported as errors.

use thiserror::Error;

use super::time::Tick;

/// Setup-time configuration violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Burst size in bytes is not a power of two.
    #[error("DRAM burst size {0} is not allowed, must be a power of two")]
    BurstSizeNotPowerOfTwo(u64),

    /// Rank count is not a power of two.
    #[error("DRAM rank count of {0} is not allowed, must be a power of two")]
    RankCountNotPowerOfTwo(u32),

    /// Refresh interval leaves no room for the precharge and the refresh itself.
    #[error("tREFI ({t_refi}) must be larger than tRP ({t_rp}) and tRFC ({t_rfc})")]
    RefreshIntervalTooShort {
        /// Configured refresh interval.
        t_refi: Tick,
        /// Configured precharge time.
        t_rp: Tick,
        /// Configured refresh cycle time.
        t_rfc: Tick,
    },

    /// More bank groups than banks.
    #[error("banks per rank ({banks}) must be equal to or larger than bank groups per rank ({groups})")]
    TooManyBankGroups {
        /// Banks per rank.
        banks: u32,
        /// Bank groups per rank.
        groups: u32,
    },

    /// Banks do not split evenly into bank groups.
    #[error("banks per rank ({banks}) must be evenly divisible by bank groups per rank ({groups})")]
    UnevenBankGroups {
        /// Banks per rank.
        banks: u32,
        /// Bank groups per rank.
        groups: u32,
    },

    /// A same-group column delay is shorter than one burst.
    #[error("{name} ({value}) should be larger than the minimum bus delay ({t_burst})")]
    ColumnDelayBelowBurst {
        /// Parameter name (`tCCD_L` or `tCCD_L_WR`).
        name: &'static str,
        /// Configured value.
        value: Tick,
        /// Burst duration it is compared against.
        t_burst: Tick,
    },

    /// Same-group activate spacing is shorter than the cross-group one.
    #[error("tRRD_L ({t_rrd_l}) should be larger than tRRD ({t_rrd})")]
    SameGroupActivateTooShort {
        /// Same-group activate spacing.
        t_rrd_l: Tick,
        /// Cross-group activate spacing.
        t_rrd: Tick,
    },

    /// Bank count outside the supported range.
    #[error("banks per rank must be between 1 and 64, got {0}")]
    BankCountOutOfRange(u32),

    /// Rank count outside the supported range.
    #[error("ranks per channel must be between 1 and 128, got {0}")]
    RankCountOutOfRange(u32),

    /// A parameter that must be positive is zero.
    #[error("{0} must be non-zero")]
    ZeroParameter(&'static str),

    /// Write drain thresholds are not strictly ordered.
    #[error("write low threshold {low} must be smaller than the high threshold {high}")]
    WriteThresholds {
        /// Low watermark.
        low: usize,
        /// High watermark.
        high: usize,
    },

    /// The configuration JSON could not be parsed.
    #[error("configuration parse error: {0}")]
    Parse(String),
}

/// Fatal runtime invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DramError {
    /// An activate would put more than `activation_limit` activates inside one tXAW window.
    #[error("rank {rank}: got {limit} activates in window {window} ({at} - {oldest}) which is smaller than {t_xaw}")]
    ActivationWindow {
        /// Rank index.
        rank: u8,
        /// Activates allowed per window.
        limit: u32,
        /// Span between the oldest tracked activate and this one.
        window: Tick,
        /// Tick of the offending activate.
        at: Tick,
        /// Oldest activate in the window.
        oldest: Tick,
        /// Configured window length.
        t_xaw: Tick,
    },

    /// Activate issued to a bank that still has a row open.
    #[error("rank {rank} bank {bank}: activate with row {open} still open")]
    RowAlreadyOpen {
        /// Rank index.
        rank: u8,
        /// Bank index.
        bank: u8,
        /// Row currently open.
        open: u32,
    },

    /// Precharge issued to a closed bank.
    #[error("rank {rank} bank {bank}: precharge with no open row")]
    NoOpenRow {
        /// Rank index.
        rank: u8,
        /// Bank index.
        bank: u8,
    },

    /// More banks marked active than the rank has.
    #[error("rank {rank}: active bank count would exceed {banks}")]
    ActiveBankOverflow {
        /// Rank index.
        rank: u8,
        /// Banks per rank.
        banks: u32,
    },

    /// Active bank count decremented below zero.
    #[error("rank {rank}: active bank count underflow")]
    ActiveBankUnderflow {
        /// Rank index.
        rank: u8,
    },

    /// Outstanding event count decremented below zero.
    #[error("rank {rank}: outstanding event count underflow")]
    OutstandingUnderflow {
        /// Rank index.
        rank: u8,
    },

    /// A power transition was requested while another is still pending.
    #[error("rank {rank}: power transition to {requested} at {at} while transition to {pending} is pending")]
    PowerEventConflict {
        /// Rank index.
        rank: u8,
        /// State requested now.
        requested: &'static str,
        /// State already pending.
        pending: &'static str,
        /// Tick of the new request.
        at: Tick,
    },

    /// An event that must be idle is already pending.
    #[error("rank {rank}: {event} event already scheduled")]
    EventAlreadyScheduled {
        /// Rank index.
        rank: u8,
        /// Event kind.
        event: &'static str,
    },

    /// A refresh finished after the next one was already due.
    #[error("rank {rank}: refresh was delayed so long we cannot catch up (due {due}, done {done})")]
    RefreshOverrun {
        /// Rank index.
        rank: u8,
        /// Tick the next refresh was due.
        due: Tick,
        /// Tick the delayed refresh completed.
        done: Tick,
    },

    /// An operation reached a rank in a power state that cannot handle it.
    #[error("rank {rank}: unexpected {what} in power state {state}")]
    InvalidPowerState {
        /// Rank index.
        rank: u8,
        /// The operation.
        what: &'static str,
        /// The current power state.
        state: &'static str,
    },

    /// Column access to a rank that is refreshing.
    #[error("rank {rank}: column access while refresh state is {state}")]
    RankNotIdle {
        /// Rank index.
        rank: u8,
        /// Current refresh state.
        state: &'static str,
    },

    /// Rank or bank index beyond the configured organization.
    #[error("rank {rank} bank {bank} out of range")]
    OutOfRange {
        /// Rank index.
        rank: u8,
        /// Bank index.
        bank: u8,
    },
}

/// Shorthand result type for engine operations.
pub type DramResult<T> = Result<T, DramError>;
