//! Request trace loading.
//!
//! Traces are JSON lines, one already-decoded request per line:
//!
//! ```text
//! {"at": 0, "rank": 0, "bank": 3, "row": 5, "is_read": true}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::common::Tick;

/// One request of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TraceRecord {
    /// Arrival tick at the controller.
    pub at: Tick,
    /// Target rank.
    pub rank: u8,
    /// Target bank.
    pub bank: u8,
    /// Target row.
    pub row: u32,
    /// Read (true) or write.
    pub is_read: bool,
}

/// Trace loading failures.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The trace could not be opened or read.
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    /// A line is not a valid record.
    #[error("trace line {line}: {message}")]
    Parse {
        /// One-based line number.
        line: usize,
        /// Decoder message.
        message: String,
    },

    /// A record addresses a rank or bank the device does not have.
    #[error("trace record {index}: rank {rank} bank {bank} outside the configured device")]
    OutOfRange {
        /// Position of the record after sorting.
        index: usize,
        /// Requested rank.
        rank: u8,
        /// Requested bank.
        bank: u8,
    },
}

/// Parses a JSON-lines trace.
///
/// # Returns
///
/// The records sorted by arrival tick; equal ticks keep file order.
pub fn parse_trace<R: Read>(reader: R) -> Result<Vec<TraceRecord>, TraceError> {
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: TraceRecord =
            serde_json::from_str(trimmed).map_err(|e| TraceError::Parse {
                line: idx + 1,
                message: e.to_string(),
            })?;
        records.push(record);
    }
    records.sort_by_key(|r| r.at);
    Ok(records)
}

/// Loads a JSON-lines trace from disk.
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<TraceRecord>, TraceError> {
    parse_trace(fs::File::open(path)?)
}

/// Checks that every record targets an existing rank and bank.
pub fn check_bounds(records: &[TraceRecord], ranks: u32, banks: u32) -> Result<(), TraceError> {
    match records
        .iter()
        .position(|r| u32::from(r.rank) >= ranks || u32::from(r.bank) >= banks)
    {
        Some(i) => Err(TraceError::OutOfRange {
            index: i,
            rank: records[i].rank,
            bank: records[i].bank,
        }),
        None => Ok(()),
    }
}
