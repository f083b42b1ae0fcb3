use std::collections::{BTreeMap, HashMap};

use crate::models::ReferenceCoefficientRow;

/// Lookup of reference rows for one vessel.
///
/// Both keys match exactly; `category` is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveQuery<'a> {
    pub vessel_type_id: i32,
    pub category: &'a str,
}

/// In-memory index over a reference dataset.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCurveRepository {
    rows: BTreeMap<i64, ReferenceCoefficientRow>,
    by_type_and_category: HashMap<(i32, String), Vec<ReferenceCoefficientRow>>,
}

impl ReferenceCurveRepository {
    /// Index `rows`. A repeated row id replaces the earlier row.
    pub fn new(rows: impl IntoIterator<Item = ReferenceCoefficientRow>) -> Self {
        let rows: BTreeMap<i64, ReferenceCoefficientRow> =
            rows.into_iter().map(|row| (row.row_id, row)).collect();

        let mut by_type_and_category: HashMap<(i32, String), Vec<ReferenceCoefficientRow>> =
            HashMap::new();
        // BTreeMap iteration keeps each match list ordered by row id
        for row in rows.values() {
            by_type_and_category
                .entry((row.vessel_type_id, row.category.clone()))
                .or_default()
                .push(row.clone());
        }

        Self {
            rows,
            by_type_and_category,
        }
    }

    /// All rows for the vessel type and category; empty when none exist.
    pub fn find_matching(&self, query: CurveQuery<'_>) -> &[ReferenceCoefficientRow] {
        self.by_type_and_category
            .get(&(query.vessel_type_id, query.category.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The single row for a fully specified curve, if present.
    pub fn find_exact(
        &self,
        query: CurveQuery<'_>,
        size: &str,
        trajectory: &str,
    ) -> Option<&ReferenceCoefficientRow> {
        self.find_matching(query)
            .iter()
            .find(|row| row.size == size && row.trajectory == trajectory)
    }

    pub fn get(&self, row_id: i64) -> Option<&ReferenceCoefficientRow> {
        self.rows.get(&row_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
