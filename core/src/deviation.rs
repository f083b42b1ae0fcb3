//! Quarterly deviation of actual emissions from the reference baseline.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::baseline::{BaselineBound, BaselineCalculator};
use crate::curve::{BaselineCurve, PowerLawCurve};
use crate::models::{
    QuarterlyDeviation, ReferenceCoefficientRow, VesselEmissions, VesselSummary,
    DEFAULT_DEADWEIGHT, POSEIDON_PRINCIPLES_CATEGORY,
};
use crate::observer::{EngineEvent, EngineObserver, TracingObserver};
use crate::quarter::{group_by_quarter, QuarterBucket};
use crate::reference::{CurveQuery, ReferenceCurveRepository};

/// Signed percentage deviation of `actual` from `baseline`.
///
/// A baseline that is zero or negative leaves the deviation undefined; it is
/// reported as exactly `0.0`.
pub fn percentage_deviation(actual: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        (actual - baseline) / baseline * 100.0
    } else {
        0.0
    }
}

pub struct DeviationReporter<C = PowerLawCurve, O = TracingObserver> {
    calculator: BaselineCalculator<C>,
    observer: O,
    category: String,
    default_deadweight: Decimal,
    bound: BaselineBound,
}

impl<C: BaselineCurve, O: EngineObserver> DeviationReporter<C, O> {
    pub fn new(calculator: BaselineCalculator<C>, observer: O) -> Self {
        Self {
            calculator,
            observer,
            category: POSEIDON_PRINCIPLES_CATEGORY.to_string(),
            default_deadweight: DEFAULT_DEADWEIGHT,
            bound: BaselineBound::Min,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_default_deadweight(mut self, deadweight: Decimal) -> Self {
        self.default_deadweight = deadweight;
        self
    }

    pub fn with_bound(mut self, bound: BaselineBound) -> Self {
        self.bound = bound;
        self
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// One deviation per vessel quarter, sorted ascending by representative
    /// date. The sort is stable, so equal dates keep vessel-then-quarter order.
    ///
    /// Vessels without reference rows and quarters whose baseline cannot be
    /// evaluated are reported to the observer and left out; they never
    /// affect the other vessels.
    pub fn compute_all(
        &self,
        vessels: &[VesselEmissions],
        repo: &ReferenceCurveRepository,
    ) -> Vec<QuarterlyDeviation> {
        let mut deviations = Vec::new();

        for entry in vessels {
            let vessel = &entry.vessel;
            let rows = repo.find_matching(CurveQuery {
                vessel_type_id: vessel.vessel_type_code,
                category: &self.category,
            });

            if rows.is_empty() {
                self.observer.observe(EngineEvent::MissingReferenceData {
                    vessel_id: vessel.imo_no.clone(),
                    vessel_name: vessel.name.clone(),
                    vessel_type_code: vessel.vessel_type_code,
                    category: self.category.clone(),
                });
                continue;
            }

            let deadweight = vessel.deadweight_or(self.default_deadweight);
            for bucket in group_by_quarter(&entry.records) {
                if let Some(deviation) = self.bucket_deviation(entry, &bucket, rows, deadweight) {
                    deviations.push(deviation);
                }
            }
        }

        deviations.sort_by_key(|deviation| deviation.date);
        self.observer.observe(EngineEvent::RunCompleted {
            deviations: deviations.len(),
        });
        deviations
    }

    fn bucket_deviation(
        &self,
        entry: &VesselEmissions,
        bucket: &QuarterBucket<'_>,
        rows: &[ReferenceCoefficientRow],
        deadweight: Decimal,
    ) -> Option<QuarterlyDeviation> {
        let representative = bucket.representative()?;
        let vessel = &entry.vessel;

        let baseline = match self
            .calculator
            .evaluate(rows, bucket.key.year, deadweight)
            .map(|range| range.bound(self.bound))
        {
            Ok(value) => value,
            Err(err) => {
                self.observer.observe(EngineEvent::BaselineFailed {
                    vessel_id: vessel.imo_no.clone(),
                    quarter: bucket.key,
                    reason: err.to_string(),
                });
                return None;
            }
        };
        let Some(baseline) = baseline.to_f64() else {
            self.observer.observe(EngineEvent::BaselineFailed {
                vessel_id: vessel.imo_no.clone(),
                quarter: bucket.key,
                reason: format!("baseline {} is not representable as f64", baseline),
            });
            return None;
        };

        let actual = representative.quantities.tot_co2;
        Some(QuarterlyDeviation {
            vessel_id: vessel.imo_no.clone(),
            vessel_name: vessel.name.clone(),
            quarter: bucket.key.quarter,
            year: bucket.key.year,
            actual_emissions: actual,
            baseline,
            deviation: percentage_deviation(actual, baseline),
            date: representative.to_utc,
        })
    }
}

/// Every vessel with the number of emission records it owns.
///
/// Vessels without a tonnage on record are listed with `default_deadweight`,
/// the value their baselines are evaluated at.
pub fn list_vessels_summary(vessels: &[VesselEmissions], default_deadweight: Decimal) -> Vec<VesselSummary> {
    vessels
        .iter()
        .map(|entry| VesselSummary::new(&entry.vessel, default_deadweight, entry.records.len()))
        .collect()
}
