//! Reshaping of wide export rows into normalized records.
//!
//! - [`allocation`]: allocation export → configurations and details
//! - [`transfers`]: transfer matrix → time periods and transfers
//! - [`grouper`]: sharing-group export → grouped production/consumption graph
//! - [`pipeline`]: full runs over files or in-memory content

pub mod allocation;
pub mod grouper;
pub mod pipeline;
pub mod transfers;

use serde::Serialize;
use std::fmt;

pub use allocation::{reshape_allocations, AllocationLayout, AllocationOutput};
pub use grouper::{groups_from_export, groups_from_file, rows_to_groups};
pub use pipeline::{ingest_files, ingest_str, load_sharing_groups, CsvInfo, IngestResult, IngestSummary};
pub use transfers::{parse_header, reshape_transfers, StationPair, TransferOutput};

/// A row, slot or cell that produced no record.
///
/// Skips are a normal outcome of lenient parsing, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    /// 1-based line in the source file
    pub line: usize,
    pub reason: SkipReason,
}

impl SkippedRow {
    pub fn new(line: usize, reason: SkipReason) -> Self {
        Self { line, reason }
    }
}

/// Why nothing was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SkipReason {
    /// Row has fewer fields than the shape needs.
    ShortRow { found: usize, required: usize },
    /// Referenced EAN is not in the station registry.
    UnknownStation { column: String, ean: String },
    /// Optional numeric cell did not parse.
    UnparseableValue { column: String, text: String },
    /// Header label of a value column is not a `to-from` pair.
    UnmappedColumn { column: String },
}

impl fmt::Display for SkippedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SkipReason::ShortRow { found, required } => {
                write!(f, "Line {}: {} fields, need at least {}", self.line, found, required)
            }
            SkipReason::UnknownStation { column, ean } => {
                write!(f, "Line {}, column '{}': unknown station '{}'", self.line, column, ean)
            }
            SkipReason::UnparseableValue { column, text } => {
                write!(f, "Line {}, column '{}': not a number '{}'", self.line, column, text)
            }
            SkipReason::UnmappedColumn { column } => {
                write!(f, "Line {}, column '{}': not a station pair", self.line, column)
            }
        }
    }
}
