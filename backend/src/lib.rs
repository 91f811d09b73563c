//! # EDC Ingest - energy-sharing exports to a normalized station graph
//!
//! Reads the semicolon-separated exports of the EDC portal (allocation
//! configurations, the quarter-hour transfer matrix, sharing groups) and
//! turns them into stations, share rules and energy transfers that
//! reference each other by id.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV Files  │────▶│   Parser    │────▶│  Registry   │────▶│  Transform  │
//! │ (1250/UTF8) │     │  (auto-enc) │     │ (EAN → id)  │     │ (reshapers) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use edc_ingest::{ingest_files, IngestOptions};
//!
//! let result = ingest_files("alokace.csv", "prenosy.csv", &IngestOptions::default())?;
//! println!("{}", result.summary());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`config`] - Ingestion options
//! - [`logs`] - Pipeline log broadcasting
//! - [`models`] - Domain models (Station, AllocationConfiguration, SharingGroup)
//! - [`parser`] - Export decoding and scalar parsing
//! - [`registry`] - Station identity registry
//! - [`transform`] - Reshapers and pipeline

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Station identities
pub mod registry;

// Transformation
pub mod transform;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CsvError, FormatError, IngestError, SharingError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Allocation, AllocationConfiguration, AllocationDetail, ConsumptionEan, EnergyTransfer,
    ProductionEan, SharingGroup, SharingOperation, Station, StationKind, TimePeriod,
};

// =============================================================================
// Re-exports - Parser
// =============================================================================

pub use parser::{
    parse_date, parse_fraction, parse_optional_date, parse_time_of_day, read_table_file, RawRow,
    RawTable,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use config::IngestOptions;
pub use registry::StationRegistry;
pub use transform::{
    ingest_files, ingest_str, load_sharing_groups, AllocationLayout, IngestResult, IngestSummary,
    SkipReason, SkippedRow,
};
