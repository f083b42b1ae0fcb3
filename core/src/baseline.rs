//! Baseline evaluation over the reference rows matching a vessel.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::curve::{BaselineCurve, PowerLawCurve};
use crate::error::EngineError;
use crate::models::ReferenceCoefficientRow;

/// Spread of baseline values across all matching reference rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaselineRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl BaselineRange {
    fn single(value: Decimal) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    fn widen(self, value: Decimal) -> Self {
        Self {
            min: self.min.min(value),
            max: self.max.max(value),
        }
    }

    pub fn bound(&self, bound: BaselineBound) -> Decimal {
        match bound {
            BaselineBound::Min => self.min,
            BaselineBound::Max => self.max,
        }
    }
}

/// Which end of a [`BaselineRange`] is reported as the baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineBound {
    /// Compliance baseline: the strictest matching trajectory.
    #[default]
    Min,
    Max,
}

#[derive(Debug, Clone, Default)]
pub struct BaselineCalculator<C = PowerLawCurve> {
    curve: C,
}

impl<C: BaselineCurve> BaselineCalculator<C> {
    pub fn new(curve: C) -> Self {
        Self { curve }
    }

    pub fn curve(&self) -> &C {
        &self.curve
    }

    /// Evaluate every row at (`year`, `deadweight`) and return the range.
    ///
    /// Fails with [`EngineError::NoMatchingCurve`] on an empty row set and
    /// with [`EngineError::CurveEvaluation`] on the first row that cannot be
    /// evaluated.
    pub fn evaluate(
        &self,
        rows: &[ReferenceCoefficientRow],
        year: i32,
        deadweight: Decimal,
    ) -> Result<BaselineRange, EngineError> {
        if rows.is_empty() {
            return Err(EngineError::NoMatchingCurve);
        }
        if deadweight <= Decimal::ZERO {
            return Err(EngineError::InvalidDeadweight(deadweight));
        }

        let mut range: Option<BaselineRange> = None;
        for row in rows {
            let value = self
                .curve
                .evaluate(row, year, deadweight)
                .map_err(|source| EngineError::CurveEvaluation {
                    row_id: row.row_id,
                    source,
                })?;
            range = Some(match range {
                Some(range) => range.widen(value),
                None => BaselineRange::single(value),
            });
        }

        range.ok_or(EngineError::NoMatchingCurve)
    }
}
