//! Station Registry - stable identities for EAN codes
//!
//! Stations live in an arena in creation order; an index maps the trimmed
//! EAN to its slot. Ids start at 1 and follow first-sight order.

use std::collections::HashMap;

use crate::models::{Station, StationKind};
use crate::parser::RawRow;
use crate::transform::allocation::{AllocationLayout, MIN_ALLOCATION_FIELDS, ORIGIN_COL, SLOT_COUNT};
use crate::transform::transfers::parse_header;

/// Registry of all stations seen during a run
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    /// Stations in creation order (id = index + 1)
    stations: Vec<Station>,
    /// Trimmed EAN -> index into `stations`
    by_ean: HashMap<String, usize>,
}

impl StationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the station for `ean`, registering it on first sight.
    ///
    /// `kind` is only used when the station is created.
    pub fn get_or_create(&mut self, ean: &str, kind: Option<StationKind>) -> &Station {
        let key = ean.trim();

        let idx = match self.by_ean.get(key) {
            Some(&idx) => idx,
            None => {
                let idx = self.stations.len();
                self.stations.push(Station {
                    id: (idx + 1) as u32,
                    ean: key.to_string(),
                    name: None,
                    kind,
                });
                self.by_ean.insert(key.to_string(), idx);
                idx
            }
        };

        &self.stations[idx]
    }

    /// Find a station without registering it.
    pub fn lookup(&self, ean: &str) -> Option<&Station> {
        self.by_ean.get(ean.trim()).map(|&idx| &self.stations[idx])
    }

    /// Station by id.
    pub fn get(&self, id: u32) -> Option<&Station> {
        (id as usize)
            .checked_sub(1)
            .and_then(|idx| self.stations.get(idx))
    }

    /// All stations in creation order.
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Discovery pass over the allocation export.
    ///
    /// Registers the origin and every non-blank target of each row wide
    /// enough to be a configuration row. Returns the number of new stations.
    pub fn populate_from_allocations(&mut self, rows: &[RawRow], layout: AllocationLayout) -> usize {
        let before = self.len();

        for row in rows.iter().filter(|r| r.width() >= MIN_ALLOCATION_FIELDS) {
            let origin = row.field(ORIGIN_COL).trim();
            if !origin.is_empty() {
                self.get_or_create(origin, Some(StationKind::Consumption));
            }

            for slot in 0..SLOT_COUNT {
                let target = row.field(layout.target_col(slot)).trim();
                if !target.is_empty() {
                    self.get_or_create(target, Some(StationKind::Production));
                }
            }
        }

        self.len() - before
    }

    /// Discovery pass over the transfer matrix header.
    ///
    /// Registers both sides of every `to-from` column label, the sending
    /// side first. Returns the number of new stations.
    pub fn populate_from_transfer_header(&mut self, header: &[String]) -> usize {
        let before = self.len();

        for pair in parse_header(header).into_iter().flatten() {
            self.get_or_create(&pair.from, Some(StationKind::Production));
            self.get_or_create(&pair.to, Some(StationKind::Consumption));
        }

        self.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(line: usize, text: &str) -> RawRow {
        RawRow::new(line, text.split(';').map(str::to_string).collect())
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut registry = StationRegistry::new();

        let first = registry.get_or_create("859182400302838511", None).id;
        let second = registry.get_or_create(" 859182400302838511 ", None).id;

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_eans_get_distinct_ids() {
        let mut registry = StationRegistry::new();

        let a = registry.get_or_create("A", None).id;
        let b = registry.get_or_create("B", None).id;

        assert_ne!(a, b);
        assert_eq!(registry.get(a).unwrap().ean, "A");
        assert_eq!(registry.get(b).unwrap().ean, "B");
    }

    #[test]
    fn test_lookup_never_creates() {
        let mut registry = StationRegistry::new();
        registry.get_or_create("A", None);

        assert!(registry.lookup("B").is_none());
        assert!(registry.lookup(" A").is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_kind_fixed_on_first_sight() {
        let mut registry = StationRegistry::new();
        registry.get_or_create("A", Some(StationKind::Consumption));
        registry.get_or_create("A", Some(StationKind::Production));

        assert_eq!(registry.lookup("A").unwrap().kind, Some(StationKind::Consumption));
    }

    #[test]
    fn test_get_unknown_id() {
        let registry = StationRegistry::new();
        assert!(registry.get(0).is_none());
        assert!(registry.get(1).is_none());
    }

    #[test]
    fn test_populate_from_allocations() {
        let rows = vec![
            row(2, "22313;;O1;01.06.2025;31.12.9999;T1;50;T2;50;;;;;;"),
            row(3, "22313;;O2;01.06.2025;31.12.9999; T1 ;100;;;;;;;;"),
            row(4, "short;row;O3"),
        ];
        let mut registry = StationRegistry::new();

        let added = registry.populate_from_allocations(&rows, AllocationLayout::Interleaved);

        assert_eq!(added, 4);
        assert!(registry.lookup("O1").is_some());
        assert!(registry.lookup("O2").is_some());
        assert!(registry.lookup("T1").is_some());
        assert!(registry.lookup("T2").is_some());
        assert!(registry.lookup("O3").is_none());
        assert_eq!(registry.lookup("T1").unwrap().kind, Some(StationKind::Production));
        assert!(registry.lookup("50").is_none());
    }

    #[test]
    fn test_populate_from_blocked_allocations() {
        let rows = vec![row(2, "22313;;O1;01.06.2025;31.12.9999;T1;T2;;;;50;50;;;")];
        let mut registry = StationRegistry::new();

        let added = registry.populate_from_allocations(&rows, AllocationLayout::Blocked);

        assert_eq!(added, 3);
        assert!(registry.lookup("T2").is_some());
    }

    #[test]
    fn test_populate_from_transfer_header() {
        let header: Vec<String> = ["Datum", "Od", "Do", "C1-P1", "C2-P1", "Suma", "a-b-c"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut registry = StationRegistry::new();

        let added = registry.populate_from_transfer_header(&header);

        assert_eq!(added, 3);
        assert_eq!(registry.lookup("P1").unwrap().kind, Some(StationKind::Production));
        assert_eq!(registry.lookup("C2").unwrap().kind, Some(StationKind::Consumption));
        assert!(registry.lookup("Suma").is_none());
    }
}
