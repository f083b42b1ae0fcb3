use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::models::{
    EmissionKey, EmissionRecord, FleetSnapshot, ReferenceCoefficientRow, Vessel, VesselEmissions,
    VesselId,
};

/// Datastore contract for vessels, emission records and reference rows.
///
/// Upserts are keyed by natural key (IMO number, emission key, row id) and
/// the last write wins, so re-importing the same source is idempotent.
pub trait EmissionStore {
    fn upsert_vessel(&mut self, vessel: Vessel) -> Result<(), StoreError>;
    fn list_vessels(&self) -> Result<Vec<Vessel>, StoreError>;
    fn load_vessel(&self, id: &VesselId) -> Result<Option<Vessel>, StoreError>;

    /// Replace the whole reference dataset.
    fn replace_reference_rows(&mut self, rows: Vec<ReferenceCoefficientRow>) -> Result<(), StoreError>;
    fn list_reference_rows(&self) -> Result<Vec<ReferenceCoefficientRow>, StoreError>;

    /// Fails with [`StoreError::UnknownVessel`] when the vessel is not stored.
    fn upsert_emission(&mut self, vessel_id: &VesselId, record: EmissionRecord) -> Result<(), StoreError>;
    /// Records of one vessel, ascending by `to_utc`.
    fn list_emissions(&self, vessel_id: &VesselId) -> Result<Vec<EmissionRecord>, StoreError>;

    /// A consistent copy of everything the engine needs.
    fn snapshot(&self) -> Result<FleetSnapshot, StoreError> {
        let vessels = self
            .list_vessels()?
            .into_iter()
            .map(|vessel| {
                let records = self.list_emissions(&vessel.imo_no)?;
                Ok(VesselEmissions { vessel, records })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(FleetSnapshot {
            vessels,
            reference_rows: self.list_reference_rows()?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    vessels: BTreeMap<VesselId, Vessel>,
    reference_rows: BTreeMap<i64, ReferenceCoefficientRow>,
    emissions: BTreeMap<VesselId, BTreeMap<EmissionKey, EmissionRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emission_count(&self) -> usize {
        self.emissions.values().map(BTreeMap::len).sum()
    }
}

impl EmissionStore for InMemoryStore {
    fn upsert_vessel(&mut self, vessel: Vessel) -> Result<(), StoreError> {
        self.vessels.insert(vessel.imo_no.clone(), vessel);
        Ok(())
    }

    fn list_vessels(&self) -> Result<Vec<Vessel>, StoreError> {
        Ok(self.vessels.values().cloned().collect())
    }

    fn load_vessel(&self, id: &VesselId) -> Result<Option<Vessel>, StoreError> {
        Ok(self.vessels.get(id).cloned())
    }

    fn replace_reference_rows(&mut self, rows: Vec<ReferenceCoefficientRow>) -> Result<(), StoreError> {
        self.reference_rows = rows.into_iter().map(|row| (row.row_id, row)).collect();
        Ok(())
    }

    fn list_reference_rows(&self) -> Result<Vec<ReferenceCoefficientRow>, StoreError> {
        Ok(self.reference_rows.values().cloned().collect())
    }

    fn upsert_emission(&mut self, vessel_id: &VesselId, record: EmissionRecord) -> Result<(), StoreError> {
        if !self.vessels.contains_key(vessel_id) {
            return Err(StoreError::UnknownVessel(vessel_id.clone()));
        }
        self.emissions
            .entry(vessel_id.clone())
            .or_default()
            .insert(record.key.clone(), record);
        Ok(())
    }

    fn list_emissions(&self, vessel_id: &VesselId) -> Result<Vec<EmissionRecord>, StoreError> {
        let mut records: Vec<EmissionRecord> = self
            .emissions
            .get(vessel_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|record| record.to_utc);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::tests::row;
    use crate::models::EmissionQuantities;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn record(eid: &str, day: u32, tot_co2: f64) -> EmissionRecord {
        let to = Utc.with_ymd_and_hms(2023, 3, day, 0, 0, 0).unwrap();
        EmissionRecord::new(
            EmissionKey::new(eid, "1"),
            to - Duration::hours(12),
            to,
            EmissionQuantities::with_total_co2(tot_co2),
        )
        .unwrap()
    }

    fn store_with_vessel() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store
            .upsert_vessel(Vessel::new("9321483", "Nordic Star", 7, Some(dec!(80000))))
            .unwrap();
        store
    }

    #[test]
    fn test_upsert_vessel_last_write_wins() {
        let mut store = store_with_vessel();
        store
            .upsert_vessel(Vessel::new("9321483", "Nordic Star II", 7, None))
            .unwrap();

        let vessels = store.list_vessels().unwrap();
        assert_eq!(vessels.len(), 1);
        assert_eq!(vessels[0].name, "Nordic Star II");
        assert_eq!(
            store.load_vessel(&VesselId::from("9321483")).unwrap().unwrap().dwt,
            None
        );
        assert!(store.load_vessel(&VesselId::from("1")).unwrap().is_none());
    }

    #[test]
    fn test_upsert_emission_overwrites_same_key() {
        let mut store = store_with_vessel();
        let id = VesselId::from("9321483");
        store.upsert_emission(&id, record("1", 5, 10.0)).unwrap();
        store.upsert_emission(&id, record("1", 5, 12.5)).unwrap();
        store.upsert_emission(&id, record("2", 6, 8.0)).unwrap();

        let records = store.list_emissions(&id).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].quantities.tot_co2, 12.5);
        assert_eq!(store.emission_count(), 2);
    }

    #[test]
    fn test_upsert_emission_unknown_vessel() {
        let mut store = InMemoryStore::new();
        let id = VesselId::from("404");
        let result = store.upsert_emission(&id, record("1", 5, 10.0));
        assert_eq!(result, Err(StoreError::UnknownVessel(id)));
    }

    #[test]
    fn test_list_emissions_ascending() {
        let mut store = store_with_vessel();
        let id = VesselId::from("9321483");
        // Key order and time order disagree on purpose
        store.upsert_emission(&id, record("a", 28, 3.0)).unwrap();
        store.upsert_emission(&id, record("b", 2, 1.0)).unwrap();
        store.upsert_emission(&id, record("c", 14, 2.0)).unwrap();

        let order: Vec<String> = store
            .list_emissions(&id)
            .unwrap()
            .into_iter()
            .map(|r| r.key.eid)
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_replace_reference_rows() {
        let mut store = InMemoryStore::new();
        store
            .replace_reference_rows(vec![
                row(1, dec!(1), dec!(0), dec!(0), dec!(0)),
                row(2, dec!(2), dec!(0), dec!(0), dec!(0)),
            ])
            .unwrap();
        store
            .replace_reference_rows(vec![row(3, dec!(3), dec!(0), dec!(0), dec!(0))])
            .unwrap();

        let ids: Vec<i64> = store
            .list_reference_rows()
            .unwrap()
            .iter()
            .map(|r| r.row_id)
            .collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_snapshot() {
        let mut store = store_with_vessel();
        store
            .upsert_vessel(Vessel::new("9000001", "Aurora", 3, None))
            .unwrap();
        store
            .upsert_emission(&VesselId::from("9321483"), record("1", 5, 10.0))
            .unwrap();
        store
            .replace_reference_rows(vec![row(1, dec!(1), dec!(0), dec!(0), dec!(0))])
            .unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.vessels.len(), 2);
        assert_eq!(snapshot.vessels[0].vessel.imo_no, VesselId::from("9000001"));
        assert!(snapshot.vessels[0].records.is_empty());
        assert_eq!(snapshot.vessels[1].records.len(), 1);
        assert_eq!(snapshot.reference_rows.len(), 1);
    }
}
