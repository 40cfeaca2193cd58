//! DRAM command stream for external energy models.
//!
//! Each rank logs the commands it issues in issue order. Because bank commands may be
//! placed in the future (an auto-precharge, a refresh precharge-all), the log is not
//! chronological. [`flush_commands`] sorts it and hands every entry at or before the
//! current tick to a [`PowerSink`], converted to command-clock cycles.

use serde::Serialize;

use crate::common::{Tick, div_ceil};

/// DRAM command kinds understood by the energy model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DramCommand {
    /// Activate.
    Act,
    /// Precharge one bank.
    Pre,
    /// Precharge all banks.
    Prea,
    /// Read burst.
    Rd,
    /// Write burst.
    Wr,
    /// Refresh.
    Ref,
    /// Enter active power-down.
    PdnFAct,
    /// Enter precharge power-down.
    PdnFPre,
    /// Exit active power-down.
    PupAct,
    /// Exit precharge power-down.
    PupPre,
    /// Enter self-refresh.
    Sren,
    /// Exit self-refresh.
    Srex,
}

impl DramCommand {
    /// Mnemonic as printed in command traces.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Act => "ACT",
            Self::Pre => "PRE",
            Self::Prea => "PREA",
            Self::Rd => "RD",
            Self::Wr => "WR",
            Self::Ref => "REF",
            Self::PdnFAct => "PDN_F_ACT",
            Self::PdnFPre => "PDN_F_PRE",
            Self::PupAct => "PUP_ACT",
            Self::PupPre => "PUP_PRE",
            Self::Sren => "SREN",
            Self::Srex => "SREX",
        }
    }
}

/// A logged command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Command kind.
    pub kind: DramCommand,
    /// Target bank; 0 for rank-wide commands.
    pub bank: u8,
    /// Issue tick.
    pub at: Tick,
}

impl Command {
    /// Creates a log entry.
    pub const fn new(kind: DramCommand, bank: u8, at: Tick) -> Self {
        Self { kind, bank, at }
    }
}

/// Consumer of the flushed command stream.
pub trait PowerSink {
    /// Receives one command.
    ///
    /// # Arguments
    ///
    /// * `rank` - Issuing rank.
    /// * `command` - Command kind.
    /// * `bank` - Target bank (0 for rank-wide commands).
    /// * `cycle` - Issue time in command-clock cycles, relative to startup.
    fn do_command(&mut self, rank: u8, command: DramCommand, bank: u8, cycle: u64);
}

/// One command as delivered to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordedCommand {
    /// Command-clock cycle.
    pub cycle: u64,
    /// Command kind.
    pub command: DramCommand,
    /// Target bank.
    pub bank: u8,
    /// Issuing rank.
    pub rank: u8,
}

/// In-memory sink that keeps every delivered command.
#[derive(Debug, Clone, Default)]
pub struct CommandRecorder {
    /// Commands in delivery order.
    pub commands: Vec<RecordedCommand>,
}

impl CommandRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded commands of `kind`.
    pub fn count(&self, kind: DramCommand) -> usize {
        self.commands.iter().filter(|c| c.command == kind).count()
    }
}

impl PowerSink for CommandRecorder {
    fn do_command(&mut self, rank: u8, command: DramCommand, bank: u8, cycle: u64) {
        self.commands.push(RecordedCommand {
            cycle,
            command,
            bank,
            rank,
        });
    }
}

/// Delivers every logged command at or before `now` and keeps the rest queued.
///
/// # Arguments
///
/// * `rank` - Rank that owns `log`.
/// * `log` - Rank command log; sorted in place, flushed prefix removed.
/// * `now` - Current tick.
/// * `t_ck` - Command clock period.
/// * `offset` - Startup offset in cycles.
/// * `sink` - Receiver of the flushed commands.
pub fn flush_commands(
    rank: u8,
    log: &mut Vec<Command>,
    now: Tick,
    t_ck: Tick,
    offset: u64,
    sink: &mut dyn PowerSink,
) {
    // stable, so same-tick commands keep issue order
    log.sort_by_key(|c| c.at);
    let due = log.partition_point(|c| c.at <= now);
    for cmd in log.drain(..due) {
        let cycle = div_ceil(cmd.at, t_ck).saturating_sub(offset);
        sink.do_command(rank, cmd.kind, cmd.bank, cycle);
    }
}
