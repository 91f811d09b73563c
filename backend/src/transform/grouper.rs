//! Group sharing-group export rows into [`SharingGroup`]s.
//!
//! Every row names one consumption EAN and up to five production EANs with
//! their allocation keys. Rows with the same group id fold into one group,
//! and a production EAN met on several rows folds into one node that
//! collects all its allocations.
//!
//! ```text
//! 22313;;C1;...;P1;50;P2;50        group 22313
//! 22313;;C2;...;P1;25          →     consumption: [C1, C2]
//! 40001;;C3;...;P3;100               production:  [P1 → (C1 50%, C2 25%), P2 → (C1 50%)]
//!                                  group 40001 ...
//! ```
//!
//! Groups keep their own entity space: nothing here touches the station
//! registry.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;

use crate::config::IngestOptions;
use crate::error::{FormatError, SharingError, SharingResult};
use crate::models::{Allocation, ConsumptionEan, ProductionEan, SharingGroup, SharingOperation};
use crate::parser::{parse_fraction, parse_table, read_table_file, RawRow};

const GROUP_COL: usize = 0;
const OPERATION_COL: usize = 1;
const CONSUMPTION_COL: usize = 2;

/// Production slots per row, numbered from 1.
const SLOTS: std::ops::RangeInclusive<usize> = 1..=5;

fn production_col(slot: usize) -> usize {
    3 + 2 * slot
}

fn key_col(slot: usize) -> usize {
    4 + 2 * slot
}

/// Parse a whole sharing-group export held in memory.
pub fn groups_from_export(content: &str, options: &IngestOptions) -> SharingResult<Vec<SharingGroup>> {
    let (_, rows) = parse_table(content, options.delimiter)?;
    rows_to_groups(&rows)
}

/// Read and parse a sharing-group export file.
pub fn groups_from_file<P: AsRef<Path>>(path: P, options: &IngestOptions) -> SharingResult<Vec<SharingGroup>> {
    let table = read_table_file(path, options)?;
    rows_to_groups(&table.rows)
}

/// Fold data rows (header removed) into groups, in first-appearance order.
pub fn rows_to_groups(rows: &[RawRow]) -> SharingResult<Vec<SharingGroup>> {
    let mut order: Vec<String> = Vec::new();
    let mut builders: HashMap<String, GroupBuilder> = HashMap::new();

    for row in rows {
        let key = row.field(GROUP_COL).trim().to_string();
        let builder = builders.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            GroupBuilder::new(key, row)
        });
        builder.add_row(row)?;
    }

    Ok(order
        .into_iter()
        .filter_map(|key| builders.remove(&key))
        .map(GroupBuilder::build)
        .collect())
}

/// Convert an allocation key (percent) to percent × 100, truncated.
fn allocation_value(text: &str) -> Result<i32, FormatError> {
    if text.trim().is_empty() {
        return Ok(0);
    }

    let percent = parse_fraction(text)?;
    percent
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|value| value.trunc().to_i32())
        .ok_or_else(|| FormatError::new(text, "allocation key within range"))
}

/// Accumulates nodes of one group while rows are folded in.
struct GroupBuilder {
    id: String,
    operation: Option<SharingOperation>,
    consumption: Vec<ConsumptionEan>,
    consumption_idx: HashMap<String, usize>,
    production: Vec<ProductionEan>,
    production_idx: HashMap<String, usize>,
}

impl GroupBuilder {
    fn new(id: String, first_row: &RawRow) -> Self {
        Self {
            id,
            operation: SharingOperation::from_code(first_row.field(OPERATION_COL)),
            consumption: Vec::new(),
            consumption_idx: HashMap::new(),
            production: Vec::new(),
            production_idx: HashMap::new(),
        }
    }

    fn consumption_node(&mut self, ean: &str) -> &ConsumptionEan {
        let idx = match self.consumption_idx.get(ean) {
            Some(&idx) => idx,
            None => {
                self.consumption.push(ConsumptionEan::new(ean));
                self.consumption_idx.insert(ean.to_string(), self.consumption.len() - 1);
                self.consumption.len() - 1
            }
        };
        &self.consumption[idx]
    }

    fn production_node(&mut self, ean: &str) -> &mut ProductionEan {
        let idx = match self.production_idx.get(ean) {
            Some(&idx) => idx,
            None => {
                self.production.push(ProductionEan::new(ean));
                self.production_idx.insert(ean.to_string(), self.production.len() - 1);
                self.production.len() - 1
            }
        };
        &mut self.production[idx]
    }

    fn add_row(&mut self, row: &RawRow) -> SharingResult<()> {
        let consumption_ean = self
            .consumption_node(row.field(CONSUMPTION_COL).trim())
            .ean
            .clone();

        for slot in SLOTS {
            let production_ean = row.field(production_col(slot)).trim();
            if production_ean.is_empty() {
                continue;
            }

            let value = allocation_value(row.field(key_col(slot))).map_err(|source| SharingError::Format {
                line: row.line,
                column: format!("Key{}", slot),
                source,
            })?;

            self.production_node(production_ean)
                .allocations
                .push(Allocation::new(consumption_ean.clone(), value));
        }

        Ok(())
    }

    fn build(self) -> SharingGroup {
        SharingGroup {
            id: self.id,
            description: String::new(),
            operation: self.operation,
            consumption_eans: self.consumption,
            production_eans: self.production,
        }
    }
}
