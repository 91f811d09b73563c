//! Error types for the EDC ingestion pipeline.
//!
//! - [`CsvError`] - reading and decoding an export file
//! - [`FormatError`] - a single scalar (date, time, number) that does not parse
//! - [`IngestError`] - top-level errors of the station/transfer run
//! - [`SharingError`] - errors of the sharing-group path
//!
//! Row shape problems are never errors: they end up as
//! [`SkippedRow`](crate::transform::SkippedRow) records instead.

use thiserror::Error;

// =============================================================================
// CSV Reading Errors
// =============================================================================

/// Errors while reading an export file into raw rows.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Encoding name not known to the decoder.
    #[error("Unsupported encoding: {0}")]
    EncodingError(String),

    /// Empty file (not even a header line).
    #[error("CSV file is empty")]
    EmptyFile,
}

// =============================================================================
// Scalar Format Errors
// =============================================================================

/// A required scalar value did not match its expected format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse '{text}' as {expected}")]
pub struct FormatError {
    /// The offending text, as found in the file.
    pub text: String,
    /// Human readable description of the expected shape.
    pub expected: &'static str,
}

impl FormatError {
    pub fn new(text: impl Into<String>, expected: &'static str) -> Self {
        Self {
            text: text.into(),
            expected,
        }
    }
}

// =============================================================================
// Ingestion Errors (top-level)
// =============================================================================

/// Errors of a station / configuration / transfer run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The export file could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// A required value in an otherwise well-shaped row did not parse.
    #[error("Line {line}, column '{column}': {source}")]
    Format {
        line: usize,
        column: &'static str,
        #[source]
        source: FormatError,
    },
}

impl IngestError {
    pub fn format(line: usize, column: &'static str, source: FormatError) -> Self {
        Self::Format {
            line,
            column,
            source,
        }
    }
}

// =============================================================================
// Sharing Group Errors
// =============================================================================

/// Errors of the sharing-group path.
#[derive(Debug, Error)]
pub enum SharingError {
    /// The export file could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// An allocation key did not parse.
    #[error("Line {line}, column '{column}': {source}")]
    Format {
        line: usize,
        column: String,
        #[source]
        source: FormatError,
    },

    /// Operation exists in the API but has no implementation.
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for file reading.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for scalar parsing.
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type for the sharing-group path.
pub type SharingResult<T> = Result<T, SharingError>;
