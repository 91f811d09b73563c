//! Allocation export → configurations with details.
//!
//! # Row layout
//!
//! ```text
//! 0        1          2          3          4        5           6     ...  13          14
//! GroupId; Operation; OriginEAN; ValidFrom; ValidTo; TargetEAN1; Key1; ...; TargetEAN5; Key5
//! ```
//!
//! That is the [`AllocationLayout::Interleaved`] layout of the portal export.
//! Older exports put all five targets first (`5..=9`) and all keys after
//! them (`10..=14`): [`AllocationLayout::Blocked`]. Keys are percentages;
//! details store them as fractions.
//!
//! Rows narrower than [`MIN_ALLOCATION_FIELDS`] are skipped. A malformed date
//! in a well-shaped row aborts the whole run.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{SkipReason, SkippedRow};
use crate::error::IngestError;
use crate::models::{AllocationConfiguration, AllocationDetail, StationKind};
use crate::parser::{parse_date, parse_fraction, parse_optional_date, RawRow};
use crate::registry::StationRegistry;

/// Narrowest row that is treated as a configuration row.
pub const MIN_ALLOCATION_FIELDS: usize = 13;

pub const ORIGIN_COL: usize = 2;
pub const VALID_FROM_COL: usize = 3;
pub const VALID_TO_COL: usize = 4;

/// Number of (target, key) slots per row.
pub const SLOT_COUNT: usize = 5;

/// First column after the fixed part of the row.
const FIRST_SLOT_COL: usize = 5;

/// Placement of the five (target, key) slots in a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationLayout {
    /// `TargetEAN1;Key1;TargetEAN2;Key2;...`
    #[default]
    Interleaved,
    /// `TargetEAN1;...;TargetEAN5;Key1;...;Key5`
    Blocked,
}

impl AllocationLayout {
    pub fn target_col(&self, slot: usize) -> usize {
        match self {
            Self::Interleaved => FIRST_SLOT_COL + 2 * slot,
            Self::Blocked => FIRST_SLOT_COL + slot,
        }
    }

    pub fn key_col(&self, slot: usize) -> usize {
        match self {
            Self::Interleaved => FIRST_SLOT_COL + 2 * slot + 1,
            Self::Blocked => FIRST_SLOT_COL + SLOT_COUNT + slot,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "interleaved" => Some(Self::Interleaved),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

/// Configurations produced from one allocation export.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationOutput {
    pub configurations: Vec<AllocationConfiguration>,
    pub skipped: Vec<SkippedRow>,
}

impl AllocationOutput {
    pub fn detail_count(&self) -> usize {
        self.configurations.iter().map(|c| c.allocation_details.len()).sum()
    }
}

/// Reshape allocation rows (header already removed).
///
/// Origins are registered as they are met; targets are only looked up, so a
/// detail never introduces a station.
pub fn reshape_allocations(
    rows: &[RawRow],
    layout: AllocationLayout,
    registry: &mut StationRegistry,
) -> Result<AllocationOutput, IngestError> {
    let mut output = AllocationOutput::default();
    let mut next_detail_id: u32 = 1;

    for row in rows {
        if row.width() < MIN_ALLOCATION_FIELDS {
            output.skipped.push(SkippedRow::new(
                row.line,
                SkipReason::ShortRow { found: row.width(), required: MIN_ALLOCATION_FIELDS },
            ));
            continue;
        }

        let origin = row.field(ORIGIN_COL).trim();
        let origin_id = registry.get_or_create(origin, Some(StationKind::Consumption)).id;

        let valid_from = parse_date(row.field(VALID_FROM_COL))
            .map_err(|e| IngestError::format(row.line, "ValidFrom", e))?;
        let valid_to = parse_optional_date(row.field(VALID_TO_COL))
            .map_err(|e| IngestError::format(row.line, "ValidTo", e))?;

        let config_id = output.configurations.len() as u32 + 1;
        let mut config = AllocationConfiguration {
            id: config_id,
            name: format!("Config for {}", origin),
            origin_station_id: origin_id,
            valid_from,
            valid_to,
            allocation_details: Vec::new(),
        };

        for slot in 0..SLOT_COUNT {
            let target = row.field(layout.target_col(slot)).trim();
            let key = row.field(layout.key_col(slot)).trim();
            if target.is_empty() || key.is_empty() {
                continue;
            }

            let Some(station) = registry.lookup(target) else {
                output.skipped.push(SkippedRow::new(
                    row.line,
                    SkipReason::UnknownStation {
                        column: format!("TargetEAN{}", slot + 1),
                        ean: target.to_string(),
                    },
                ));
                continue;
            };

            let percent = match parse_fraction(key) {
                Ok(p) => p,
                Err(_) => {
                    output.skipped.push(SkippedRow::new(
                        row.line,
                        SkipReason::UnparseableValue {
                            column: format!("Key{}", slot + 1),
                            text: key.to_string(),
                        },
                    ));
                    continue;
                }
            };

            config.allocation_details.push(AllocationDetail {
                id: next_detail_id,
                allocation_configuration_id: config_id,
                energy_station_id: station.id,
                share: percent / Decimal::ONE_HUNDRED,
            });
            next_detail_id += 1;
        }

        output.configurations.push(config);
    }

    Ok(output)
}
