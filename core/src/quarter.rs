//! Calendar-quarter bucketing of emission records.
//!
//! Records are assigned to the quarter of their end timestamp (UTC). Each
//! bucket is represented by its latest-ending record: the quarter's closing
//! snapshot, not an average over the quarter.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, Utc};

use crate::models::EmissionRecord;

/// A calendar quarter. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuarterKey {
    pub year: i32,
    /// Quarter of the year, 1 through 4
    pub quarter: u8,
}

impl QuarterKey {
    pub fn from_timestamp(ts: &DateTime<Utc>) -> Self {
        // ceil(month / 3) for months 1..=12
        let quarter = ts.month().div_ceil(3) as u8;
        Self {
            year: ts.year(),
            quarter,
        }
    }

    /// Short label used in reports, e.g. `Q3`.
    pub fn label(&self) -> String {
        format!("Q{}", self.quarter)
    }
}

impl fmt::Display for QuarterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

/// Records of one vessel falling into one quarter, ascending by `to_utc`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterBucket<'a> {
    pub key: QuarterKey,
    pub records: Vec<&'a EmissionRecord>,
}

impl<'a> QuarterBucket<'a> {
    /// The latest-ending record of the quarter.
    pub fn representative(&self) -> Option<&'a EmissionRecord> {
        self.records.last().copied()
    }
}

/// Group records by the calendar quarter of their end timestamp.
///
/// Records are stably sorted by `to_utc` first, so input that is already
/// ascending keeps its order and records ending at the same instant keep
/// their input order. Buckets come back in chronological order.
pub fn group_by_quarter(records: &[EmissionRecord]) -> Vec<QuarterBucket<'_>> {
    let mut ordered: Vec<&EmissionRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.to_utc);

    let mut buckets: BTreeMap<QuarterKey, Vec<&EmissionRecord>> = BTreeMap::new();
    for record in ordered {
        buckets
            .entry(QuarterKey::from_timestamp(&record.to_utc))
            .or_default()
            .push(record);
    }

    buckets
        .into_iter()
        .map(|(key, records)| QuarterBucket { key, records })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmissionKey, EmissionQuantities};
    use chrono::{Duration, TimeZone};

    fn record(eid: &str, year: i32, month: u32, day: u32, tot_co2: f64) -> EmissionRecord {
        let to = Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap();
        EmissionRecord::new(
            EmissionKey::new(eid, "1"),
            to - Duration::days(1),
            to,
            EmissionQuantities::with_total_co2(tot_co2),
        )
        .unwrap()
    }

    #[test]
    fn test_quarter_key_from_month() {
        let expected = [1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4];
        for (month, quarter) in (1..=12).zip(expected) {
            let ts = Utc.with_ymd_and_hms(2023, month, 15, 12, 0, 0).unwrap();
            assert_eq!(
                QuarterKey::from_timestamp(&ts),
                QuarterKey { year: 2023, quarter },
                "month {month}"
            );
        }
    }

    #[test]
    fn test_quarter_boundaries_use_utc() {
        let last_instant = Utc.with_ymd_and_hms(2023, 3, 31, 23, 59, 59).unwrap();
        assert_eq!(QuarterKey::from_timestamp(&last_instant).quarter, 1);

        let first_instant = Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap();
        assert_eq!(QuarterKey::from_timestamp(&first_instant).quarter, 2);

        let new_year = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            QuarterKey::from_timestamp(&new_year),
            QuarterKey { year: 2024, quarter: 1 }
        );
    }

    #[test]
    fn test_quarter_key_display_and_order() {
        let q4 = QuarterKey { year: 2022, quarter: 4 };
        let q1 = QuarterKey { year: 2023, quarter: 1 };
        assert!(q4 < q1);
        assert_eq!(q1.to_string(), "2023-Q1");
        assert_eq!(q1.label(), "Q1");
    }

    #[test]
    fn test_group_by_quarter() {
        let records = vec![
            record("1", 2023, 1, 10, 10.0),
            record("2", 2023, 3, 5, 20.0),
            record("3", 2023, 3, 28, 30.0),
            record("4", 2023, 5, 2, 40.0),
            record("5", 2024, 2, 1, 50.0),
        ];

        let buckets = group_by_quarter(&records);
        let keys: Vec<String> = buckets.iter().map(|b| b.key.to_string()).collect();
        assert_eq!(keys, vec!["2023-Q1", "2023-Q2", "2024-Q1"]);

        let q1: Vec<&str> = buckets[0].records.iter().map(|r| r.key.eid.as_str()).collect();
        assert_eq!(q1, vec!["1", "2", "3"]);
        assert_eq!(buckets[1].records.len(), 1);
        assert_eq!(buckets[2].records.len(), 1);
    }

    #[test]
    fn test_representative_is_latest_record() {
        let records = vec![record("early", 2023, 3, 5, 20.0), record("late", 2023, 3, 28, 30.0)];
        let buckets = group_by_quarter(&records);
        assert_eq!(buckets.len(), 1);

        let representative = buckets[0].representative().unwrap();
        assert_eq!(representative.key.eid, "late");
        assert_eq!(representative.quantities.tot_co2, 30.0);
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let records = vec![
            record("late", 2023, 3, 28, 30.0),
            record("mid", 2023, 2, 14, 25.0),
            record("early", 2023, 1, 2, 20.0),
        ];
        let buckets = group_by_quarter(&records);
        let order: Vec<&str> = buckets[0].records.iter().map(|r| r.key.eid.as_str()).collect();
        assert_eq!(order, vec!["early", "mid", "late"]);
        assert_eq!(buckets[0].representative().unwrap().key.eid, "late");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = vec![record("first", 2023, 6, 30, 1.0), record("second", 2023, 6, 30, 2.0)];
        let buckets = group_by_quarter(&records);
        let order: Vec<&str> = buckets[0].records.iter().map(|r| r.key.eid.as_str()).collect();
        assert_eq!(order, vec!["first", "second"]);
    }

    #[test]
    fn test_group_empty() {
        assert!(group_by_quarter(&[]).is_empty());
    }
}
