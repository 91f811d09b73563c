//! High-level pipeline API for EDC export ingestion.
//!
//! Combines all steps of a run: reading both exports, populating the
//! station registry, and reshaping allocations and transfers.
//!
//! # Example
//!
//! ```rust,ignore
//! use edc_ingest::{ingest_files, IngestOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = ingest_files("alokace.csv", "prenosy.csv", &IngestOptions::from_env())?;
//!     println!("{}", result.summary());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::fmt;
use std::path::Path;

use super::allocation::reshape_allocations;
use super::grouper::groups_from_file;
use super::transfers::reshape_transfers;
use super::SkippedRow;
use crate::config::IngestOptions;
use crate::error::{IngestError, SharingResult};
use crate::logs::{
    log_error, log_info, log_info_indent, log_success, log_success_indent, log_warning,
    log_warning_indent,
};
use crate::models::{AllocationConfiguration, EnergyTransfer, SharingGroup, Station, TimePeriod};
use crate::parser::{parse_table, read_table_file, RawTable};
use crate::registry::StationRegistry;

/// Encoding reported for content handed over as `&str`.
const IN_MEMORY_ENCODING: &str = "utf-8";

/// CSV file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub column_count: usize,
    pub row_count: usize,
}

impl CsvInfo {
    fn of(table: &RawTable) -> Self {
        Self {
            encoding: table.encoding.clone(),
            delimiter: table.delimiter,
            column_count: table.header.len(),
            row_count: table.rows.len(),
        }
    }
}

/// Everything produced by one ingestion run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    /// Stations in id order
    pub stations: Vec<Station>,

    pub configurations: Vec<AllocationConfiguration>,

    pub periods: Vec<TimePeriod>,

    pub transfers: Vec<EnergyTransfer>,

    /// Rows and slots of the allocation export that produced nothing
    pub allocation_skipped: Vec<SkippedRow>,

    /// Rows and cells of the transfer matrix that produced nothing
    pub transfer_skipped: Vec<SkippedRow>,

    pub allocation_info: CsvInfo,

    pub transfer_info: CsvInfo,
}

impl IngestResult {
    pub fn station(&self, id: u32) -> Option<&Station> {
        (id as usize)
            .checked_sub(1)
            .and_then(|idx| self.stations.get(idx))
            .filter(|s| s.id == id)
    }

    pub fn station_by_ean(&self, ean: &str) -> Option<&Station> {
        let ean = ean.trim();
        self.stations.iter().find(|s| s.ean == ean)
    }

    pub fn period(&self, id: u32) -> Option<&TimePeriod> {
        (id as usize)
            .checked_sub(1)
            .and_then(|idx| self.periods.get(idx))
            .filter(|p| p.id == id)
    }

    /// Transfers sent by a station, in file order.
    pub fn transfers_from(&self, station_id: u32) -> impl Iterator<Item = &EnergyTransfer> + '_ {
        self.transfers.iter().filter(move |t| t.from_station_id == station_id)
    }

    /// Transfers received by a station, in file order.
    pub fn transfers_to(&self, station_id: u32) -> impl Iterator<Item = &EnergyTransfer> + '_ {
        self.transfers.iter().filter(move |t| t.to_station_id == station_id)
    }

    pub fn summary(&self) -> IngestSummary {
        IngestSummary {
            stations: self.stations.len(),
            configurations: self.configurations.len(),
            details: self.configurations.iter().map(|c| c.allocation_details.len()).sum(),
            periods: self.periods.len(),
            transfers: self.transfers.len(),
            skipped: self.allocation_skipped.len() + self.transfer_skipped.len(),
        }
    }
}

/// Entity counts of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub stations: usize,
    pub configurations: usize,
    pub details: usize,
    pub periods: usize,
    pub transfers: usize,
    pub skipped: usize,
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stations, {} configurations ({} details), {} periods, {} transfers, {} skipped",
            self.stations, self.configurations, self.details, self.periods, self.transfers, self.skipped
        )
    }
}

/// Ingest both exports from disk.
pub fn ingest_files<A: AsRef<Path>, T: AsRef<Path>>(
    allocations: A,
    transfers: T,
    options: &IngestOptions,
) -> Result<IngestResult, IngestError> {
    log_info(format!("📖 Reading {}", allocations.as_ref().display()));
    let allocation_table = read_table_file(allocations, options)?;
    log_info(format!("📖 Reading {}", transfers.as_ref().display()));
    let transfer_table = read_table_file(transfers, options)?;

    ingest_tables(allocation_table, transfer_table, options)
}

/// Ingest both exports already held in memory.
pub fn ingest_str(
    allocations: &str,
    transfers: &str,
    options: &IngestOptions,
) -> Result<IngestResult, IngestError> {
    let in_memory = |content: &str| -> Result<RawTable, IngestError> {
        let (header, rows) = parse_table(content, options.delimiter)?;
        Ok(RawTable {
            header,
            rows,
            encoding: IN_MEMORY_ENCODING.to_string(),
            delimiter: options.delimiter,
        })
    };

    ingest_tables(in_memory(allocations)?, in_memory(transfers)?, options)
}

/// Read a sharing-group export and fold it into groups.
pub fn load_sharing_groups<P: AsRef<Path>>(path: P, options: &IngestOptions) -> SharingResult<Vec<SharingGroup>> {
    log_info(format!("📖 Reading {}", path.as_ref().display()));
    let groups = groups_from_file(path, options).map_err(|e| {
        log_error(e.to_string());
        e
    })?;

    for group in &groups {
        log_info_indent(
            format!(
                "{} [{}]: {} consumption, {} production",
                group.id,
                group.operation.map(|op| op.to_code()).unwrap_or("-"),
                group.consumption_eans.len(),
                group.production_eans.len()
            ),
            1,
        );
    }

    let production: usize = groups.iter().map(|g| g.production_eans.len()).sum();
    log_success(format!("{} sharing groups, {} production points", groups.len(), production));
    Ok(groups)
}

fn ingest_tables(
    allocation_table: RawTable,
    transfer_table: RawTable,
    options: &IngestOptions,
) -> Result<IngestResult, IngestError> {
    let allocation_info = CsvInfo::of(&allocation_table);
    let transfer_info = CsvInfo::of(&transfer_table);
    log_csv_info("Allocations", &allocation_info);
    log_csv_info("Transfers", &transfer_info);

    log_info("🏷️  Registering stations...");
    let mut registry = StationRegistry::new();
    let from_allocations = registry.populate_from_allocations(&allocation_table.rows, options.layout);
    let from_header = registry.populate_from_transfer_header(&transfer_table.header);
    log_success_indent(format!("{} from allocations, {} from transfer header", from_allocations, from_header), 1);

    log_info("⚙️  Reshaping allocations...");
    let allocations = reshape_allocations(&allocation_table.rows, options.layout, &mut registry)
        .map_err(log_fatal)?;
    log_success_indent(
        format!(
            "{} configurations, {} details",
            allocations.configurations.len(),
            allocations.detail_count()
        ),
        1,
    );
    log_skipped(&allocations.skipped);

    log_info("⚙️  Reshaping transfers...");
    let transfers = reshape_transfers(&transfer_table.header, &transfer_table.rows, &registry)
        .map_err(log_fatal)?;
    log_success_indent(
        format!("{} periods, {} transfers", transfers.periods.len(), transfers.transfers.len()),
        1,
    );
    log_skipped(&transfers.skipped);

    let result = IngestResult {
        stations: registry.stations().to_vec(),
        configurations: allocations.configurations,
        periods: transfers.periods,
        transfers: transfers.transfers,
        allocation_skipped: allocations.skipped,
        transfer_skipped: transfers.skipped,
        allocation_info,
        transfer_info,
    };

    log_success(format!("✅ {}", result.summary()));
    Ok(result)
}

fn log_csv_info(label: &str, info: &CsvInfo) {
    log_info_indent(
        format!(
            "{}: {} rows, {} columns, encoding {}, separator '{}'",
            label,
            info.row_count,
            info.column_count,
            info.encoding,
            format_delimiter(info.delimiter)
        ),
        1,
    );
}

fn log_skipped(skipped: &[SkippedRow]) {
    if skipped.is_empty() {
        return;
    }

    log_warning(format!("{} skipped", skipped.len()));
    for skip in skipped {
        log_warning_indent(skip.to_string(), 1);
    }
}

fn log_fatal(e: IngestError) -> IngestError {
    log_error(e.to_string());
    e
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}
