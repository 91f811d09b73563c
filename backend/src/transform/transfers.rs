//! Transfer matrix → time periods and energy transfers.
//!
//! # Layout
//!
//! ```text
//! Datum;      Od;    Do;    <ToEAN>-<FromEAN>; <ToEAN>-<FromEAN>; ...
//! 21.06.2025; 00:00; 00:15; 0,012;             ;                  ...
//! ```
//!
//! The header is parsed once into optional station pairs; data cells are
//! matched to it by position. Unlike the allocation export, a bad value
//! cell only drops that cell.

use chrono::NaiveTime;
use serde::Serialize;

use super::{SkipReason, SkippedRow};
use crate::error::IngestError;
use crate::models::{EnergyTransfer, TimePeriod, TRANSFER_UNIT};
use crate::parser::{parse_date, parse_fraction, parse_time_of_day, RawRow};
use crate::registry::StationRegistry;

/// Columns before the first value column.
pub const FIXED_COLUMNS: usize = 3;

/// Narrowest row that carries at least one value cell.
pub const MIN_TRANSFER_FIELDS: usize = FIXED_COLUMNS + 1;

/// Receiving and sending EAN of one value column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationPair {
    pub to: String,
    pub from: String,
}

impl StationPair {
    /// Parse a `to-from` label. Anything not splitting into exactly two
    /// parts on `-` is not a pair.
    pub fn parse(label: &str) -> Option<Self> {
        let mut parts = label.split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(to), Some(from), None) => Some(Self {
                to: to.trim().to_string(),
                from: from.trim().to_string(),
            }),
            _ => None,
        }
    }
}

/// Station pairs of every header column; `None` for the fixed columns and
/// for labels that are not pairs.
pub fn parse_header(header: &[String]) -> Vec<Option<StationPair>> {
    header
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            if idx < FIXED_COLUMNS {
                None
            } else {
                StationPair::parse(label)
            }
        })
        .collect()
}

/// Records produced from one transfer matrix.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutput {
    pub periods: Vec<TimePeriod>,
    pub transfers: Vec<EnergyTransfer>,
    pub skipped: Vec<SkippedRow>,
}

/// Reshape the transfer matrix.
///
/// Stations are only looked up, never created.
pub fn reshape_transfers(
    header: &[String],
    rows: &[RawRow],
    registry: &StationRegistry,
) -> Result<TransferOutput, IngestError> {
    let columns = parse_header(header);
    let mut output = TransferOutput::default();

    for row in rows {
        if row.width() < MIN_TRANSFER_FIELDS {
            output.skipped.push(SkippedRow::new(
                row.line,
                SkipReason::ShortRow { found: row.width(), required: MIN_TRANSFER_FIELDS },
            ));
            continue;
        }

        let date = parse_date(row.field(0)).map_err(|e| IngestError::format(row.line, "Date", e))?;
        let time_from =
            parse_time_of_day(row.field(1)).map_err(|e| IngestError::format(row.line, "TimeFrom", e))?;
        let time_to =
            parse_time_of_day(row.field(2)).map_err(|e| IngestError::format(row.line, "TimeTo", e))?;

        let midnight = date.and_time(NaiveTime::MIN);
        let period = TimePeriod {
            id: output.periods.len() as u32 + 1,
            start: midnight + time_from,
            end: midnight + time_to,
        };

        for (idx, cell) in row.fields.iter().enumerate().skip(FIXED_COLUMNS) {
            let text = cell.trim();
            if text.is_empty() {
                continue;
            }

            let column_name = || header.get(idx).map(|h| h.trim().to_string()).unwrap_or_else(|| format!("#{}", idx));

            let value = match parse_fraction(text) {
                Ok(v) => v,
                Err(_) => {
                    output.skipped.push(SkippedRow::new(
                        row.line,
                        SkipReason::UnparseableValue { column: column_name(), text: text.to_string() },
                    ));
                    continue;
                }
            };

            let Some(pair) = columns.get(idx).and_then(Option::as_ref) else {
                output.skipped.push(SkippedRow::new(
                    row.line,
                    SkipReason::UnmappedColumn { column: column_name() },
                ));
                continue;
            };

            let (to, from) = match (registry.lookup(&pair.to), registry.lookup(&pair.from)) {
                (Some(to), Some(from)) => (to, from),
                (to, _) => {
                    let missing = if to.is_none() { &pair.to } else { &pair.from };
                    output.skipped.push(SkippedRow::new(
                        row.line,
                        SkipReason::UnknownStation { column: column_name(), ean: missing.clone() },
                    ));
                    continue;
                }
            };

            output.transfers.push(EnergyTransfer {
                id: output.transfers.len() as u32 + 1,
                from_station_id: from.id,
                to_station_id: to.id,
                time_period_id: period.id,
                value,
                unit: TRANSFER_UNIT.to_string(),
            });
        }

        output.periods.push(period);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn header(text: &str) -> Vec<String> {
        text.split(';').map(str::to_string).collect()
    }

    fn row(line: usize, text: &str) -> RawRow {
        RawRow::new(line, text.split(';').map(str::to_string).collect())
    }

    fn registry_for(header: &[String]) -> StationRegistry {
        let mut registry = StationRegistry::new();
        registry.populate_from_transfer_header(header);
        registry
    }

    #[test]
    fn test_station_pair_parse() {
        assert_eq!(
            StationPair::parse(" C1 - P1 "),
            Some(StationPair { to: "C1".into(), from: "P1".into() })
        );
        assert_eq!(StationPair::parse("Suma"), None);
        assert_eq!(StationPair::parse("a-b-c"), None);
    }

    #[test]
    fn test_header_fixed_columns_are_never_pairs() {
        let columns = parse_header(&header("a-b;c-d;e-f;C1-P1"));
        assert_eq!(columns.len(), 4);
        assert!(columns[..3].iter().all(Option::is_none));
        assert!(columns[3].is_some());
    }

    #[test]
    fn test_transfer_edge_inversion() {
        let header = header("Datum;Od;Do;A-B");
        let registry = registry_for(&header);
        let rows = vec![row(2, "21.06.2025;00:00;00:15;0,5")];

        let output = reshape_transfers(&header, &rows, &registry).unwrap();

        assert_eq!(output.transfers.len(), 1);
        let transfer = &output.transfers[0];
        assert_eq!(transfer.to_station_id, registry.lookup("A").unwrap().id);
        assert_eq!(transfer.from_station_id, registry.lookup("B").unwrap().id);
        assert_eq!(transfer.value, dec!(0.5));
        assert_eq!(transfer.unit, "MWh");
    }

    #[test]
    fn test_time_period_per_row() {
        let header = header("Datum;Od;Do;A-B");
        let registry = registry_for(&header);
        let rows = vec![
            row(2, "21.06.2025;00:00;00:15;1"),
            row(3, "21.06.2025;00:00;00:15;2"),
            row(4, "21.06.2025;23:45;24:00;"),
        ];

        let output = reshape_transfers(&header, &rows, &registry).unwrap();

        assert_eq!(output.periods.len(), 3);
        assert_ne!(output.periods[0].id, output.periods[1].id);
        let day = NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();
        assert_eq!(output.periods[0].start, day.and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(output.periods[0].end, day.and_hms_opt(0, 15, 0).unwrap());
        assert_eq!(
            output.periods[2].end,
            NaiveDate::from_ymd_opt(2025, 6, 22).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(output.transfers[1].time_period_id, output.periods[1].id);
        assert_eq!(output.transfers.len(), 2);
    }

    #[test]
    fn test_bad_cell_keeps_the_rest_of_the_row() {
        let header = header("Datum;Od;Do;A-B;C-B;D-B");
        let registry = registry_for(&header);
        let rows = vec![row(2, "21.06.2025;00:00;00:15;0,1;n/a;0.3")];

        let output = reshape_transfers(&header, &rows, &registry).unwrap();

        let values: Vec<_> = output.transfers.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![dec!(0.1), dec!(0.3)]);
        assert_eq!(output.skipped.len(), 1);
        assert!(matches!(
            output.skipped[0].reason,
            SkipReason::UnparseableValue { ref column, .. } if column == "C-B"
        ));
    }

    #[test]
    fn test_unmapped_and_extra_columns_skipped() {
        let header = header("Datum;Od;Do;A-B;Suma");
        let registry = registry_for(&header);
        let rows = vec![row(2, "21.06.2025;00:00;00:15;1;2;3")];

        let output = reshape_transfers(&header, &rows, &registry).unwrap();

        assert_eq!(output.transfers.len(), 1);
        assert_eq!(output.skipped.len(), 2);
        assert!(output
            .skipped
            .iter()
            .all(|s| matches!(s.reason, SkipReason::UnmappedColumn { .. })));
    }

    #[test]
    fn test_unregistered_endpoint_dropped() {
        let header = header("Datum;Od;Do;A-B;C-D");
        let mut registry = StationRegistry::new();
        registry.get_or_create("A", None);
        registry.get_or_create("B", None);
        registry.get_or_create("C", None);
        let rows = vec![row(2, "21.06.2025;00:00;00:15;1;2")];

        let output = reshape_transfers(&header, &rows, &registry).unwrap();

        assert_eq!(output.transfers.len(), 1);
        assert!(registry.lookup("D").is_none());
        assert!(matches!(
            output.skipped[0].reason,
            SkipReason::UnknownStation { ref ean, .. } if ean == "D"
        ));
    }

    #[test]
    fn test_short_rows_skipped() {
        let header = header("Datum;Od;Do;A-B");
        let registry = registry_for(&header);
        let rows = vec![row(2, "21.06.2025;00:00;00:15")];

        let output = reshape_transfers(&header, &rows, &registry).unwrap();

        assert!(output.periods.is_empty());
        assert!(matches!(output.skipped[0].reason, SkipReason::ShortRow { found: 3, required: 4 }));
    }

    #[test]
    fn test_malformed_time_is_fatal() {
        let header = header("Datum;Od;Do;A-B");
        let registry = registry_for(&header);
        let rows = vec![row(5, "21.06.2025;midnight;00:15;1")];

        let err = reshape_transfers(&header, &rows, &registry).unwrap_err();
        assert!(matches!(err, IngestError::Format { line: 5, column: "TimeFrom", .. }));
    }
}
