//! Domain models produced by the ingestion pipeline.
//!
//! Station graph (both export files, shared [`StationRegistry`](crate::registry::StationRegistry)):
//!
//! - [`Station`] - one metering point (EAN)
//! - [`AllocationConfiguration`] / [`AllocationDetail`] - time-bounded share rules
//! - [`TimePeriod`] / [`EnergyTransfer`] - measured flows between stations
//!
//! Sharing groups (independent entity space):
//!
//! - [`SharingGroup`], [`ConsumptionEan`], [`ProductionEan`], [`Allocation`]

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{SharingError, SharingResult};

/// Unit of every energy transfer value in the exports.
pub const TRANSFER_UNIT: &str = "MWh";

// =============================================================================
// Stations
// =============================================================================

/// Role a station had when it was first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationKind {
    /// Consumption point ("ODBER")
    Consumption,
    /// Production point ("VYROBA")
    Production,
}

impl StationKind {
    /// Code used by the distribution operator.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Consumption => "ODBER",
            Self::Production => "VYROBA",
        }
    }
}

/// A metering point, unique by EAN within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: u32,
    pub ean: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<StationKind>,
}

// =============================================================================
// Allocation configurations
// =============================================================================

/// Share rule for one origin station over a validity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationConfiguration {
    pub id: u32,
    pub name: String,
    pub origin_station_id: u32,
    pub valid_from: NaiveDate,
    /// `None` means open-ended.
    pub valid_to: Option<NaiveDate>,
    pub allocation_details: Vec<AllocationDetail>,
}

impl AllocationConfiguration {
    /// Sum of all detail shares (1.0 when the origin is fully allocated).
    pub fn total_share(&self) -> Decimal {
        self.allocation_details.iter().map(|d| d.share).sum()
    }
}

/// One target of an allocation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDetail {
    pub id: u32,
    pub allocation_configuration_id: u32,
    pub energy_station_id: u32,
    /// Fraction in [0, 1].
    pub share: Decimal,
}

// =============================================================================
// Time series
// =============================================================================

/// Half-open reporting interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub id: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Energy moved from one station to another during a time period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyTransfer {
    pub id: u32,
    pub from_station_id: u32,
    pub to_station_id: u32,
    pub time_period_id: u32,
    pub value: Decimal,
    pub unit: String,
}

// =============================================================================
// Sharing groups
// =============================================================================

/// Operation column of the sharing-group export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharingOperation {
    Edit,
    New,
    Terminate,
    Cancel,
}

impl SharingOperation {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "Editovat" => Some(Self::Edit),
            "Novy" => Some(Self::New),
            "Ukonceni" => Some(Self::Terminate),
            "Zrusit" => Some(Self::Cancel),
            _ => None,
        }
    }

    pub fn to_code(&self) -> &'static str {
        match self {
            Self::Edit => "Editovat",
            Self::New => "Novy",
            Self::Terminate => "Ukonceni",
            Self::Cancel => "Zrusit",
        }
    }
}

/// Consumption point of a sharing group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionEan {
    pub ean: String,
    #[serde(default)]
    pub description: String,
}

impl ConsumptionEan {
    pub fn new(ean: impl Into<String>) -> Self {
        Self {
            ean: ean.into(),
            description: String::new(),
        }
    }
}

/// Production point of a sharing group with its allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionEan {
    pub ean: String,
    #[serde(default)]
    pub description: String,
    pub allocations: Vec<Allocation>,
}

impl ProductionEan {
    pub fn new(ean: impl Into<String>) -> Self {
        Self {
            ean: ean.into(),
            description: String::new(),
            allocations: Vec::new(),
        }
    }
}

/// Part of a production point allocated to one consumption point.
///
/// `allocation_percent` is percent × 100, truncated toward zero
/// (`12,345` % becomes `1234`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub target_ean: String,
    pub allocation_percent: i32,
}

impl Allocation {
    pub fn new(target_ean: impl Into<String>, allocation_percent: i32) -> Self {
        Self {
            target_ean: target_ean.into(),
            allocation_percent,
        }
    }
}

/// A sharing group with its consumption and production points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingGroup {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<SharingOperation>,
    pub consumption_eans: Vec<ConsumptionEan>,
    pub production_eans: Vec<ProductionEan>,
}

impl SharingGroup {
    pub fn production(&self, ean: &str) -> Option<&ProductionEan> {
        self.production_eans.iter().find(|p| p.ean == ean)
    }

    pub fn consumption(&self, ean: &str) -> Option<&ConsumptionEan> {
        self.consumption_eans.iter().find(|c| c.ean == ean)
    }

    /// Serialize back to the export format.
    ///
    /// Not supported: the export cannot be rebuilt from the folded model.
    pub fn to_export_file(&self) -> SharingResult<String> {
        Err(SharingError::NotImplemented("sharing group export serialization"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> AllocationConfiguration {
        AllocationConfiguration {
            id: 1,
            name: "Config for 859182400302838511".into(),
            origin_station_id: 1,
            valid_from: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            valid_to: None,
            allocation_details: vec![
                AllocationDetail { id: 1, allocation_configuration_id: 1, energy_station_id: 2, share: dec!(0.6) },
                AllocationDetail { id: 2, allocation_configuration_id: 1, energy_station_id: 3, share: dec!(0.4) },
            ],
        }
    }

    #[test]
    fn test_total_share() {
        assert_eq!(config().total_share(), dec!(1.0));
    }

    #[test]
    fn test_station_kind_codes() {
        assert_eq!(StationKind::Consumption.code(), "ODBER");
        assert_eq!(StationKind::Production.code(), "VYROBA");
    }

    #[test]
    fn test_sharing_operation_codes() {
        assert_eq!(SharingOperation::from_code("Novy"), Some(SharingOperation::New));
        assert_eq!(SharingOperation::Cancel.to_code(), "Zrusit");
        assert_eq!(SharingOperation::from_code(""), None);
    }

    #[test]
    fn test_export_is_not_implemented() {
        let group = SharingGroup {
            id: "22313".into(),
            description: String::new(),
            operation: None,
            consumption_eans: vec![ConsumptionEan::new("A")],
            production_eans: vec![ProductionEan::new("P")],
        };
        assert!(matches!(group.to_export_file(), Err(SharingError::NotImplemented(_))));
    }

    #[test]
    fn test_station_serialization_omits_empty_options() {
        let station = Station { id: 1, ean: "859182400302838511".into(), name: None, kind: None };
        let json = serde_json::to_value(&station).unwrap();
        assert_eq!(json["ean"], "859182400302838511");
        assert!(json.get("name").is_none());
        assert!(json.get("kind").is_none());
    }
}
