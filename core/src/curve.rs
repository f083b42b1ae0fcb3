//! Baseline curve families.
//!
//! A [`BaselineCurve`] turns one reference row into an expected emissions
//! value for a (year, deadweight) point. The regulatory curve form is carried
//! by the reference data rather than fixed here, so the family is a strategy:
//!
//! - [`PowerLawCurve`] (default):
//!   `f(year, dwt) = a * dwt^(-c) * (1 - d)^(year - e) + b`,
//!   i.e. an IMO reference line `a * dwt^-c` reduced by `d` per year since
//!   reference year `e`, shifted by `b`.
//! - [`ExpressionCurve`]: any expression over `year`, `dwt`, `a`..`e`.
//!
//! Substituting the authoritative trajectory formula, if it differs from the
//! default, only needs an expression in the engine configuration.

use rust_decimal::Decimal;

use crate::error::CurveError;
use crate::expression::{self, evaluate, power, Expr, VariableProvider};
use crate::models::ReferenceCoefficientRow;

/// Variables a curve expression may reference.
pub const CURVE_VARIABLES: [&str; 7] = ["year", "dwt", "a", "b", "c", "d", "e"];

pub trait BaselineCurve {
    fn evaluate(
        &self,
        row: &ReferenceCoefficientRow,
        year: i32,
        deadweight: Decimal,
    ) -> Result<Decimal, CurveError>;
}

impl<F> BaselineCurve for F
where
    F: Fn(&ReferenceCoefficientRow, i32, Decimal) -> Result<Decimal, CurveError>,
{
    fn evaluate(
        &self,
        row: &ReferenceCoefficientRow,
        year: i32,
        deadweight: Decimal,
    ) -> Result<Decimal, CurveError> {
        self(row, year, deadweight)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerLawCurve;

impl BaselineCurve for PowerLawCurve {
    fn evaluate(
        &self,
        row: &ReferenceCoefficientRow,
        year: i32,
        deadweight: Decimal,
    ) -> Result<Decimal, CurveError> {
        let overflow = |what: &str| CurveError::Overflow(format!("{} of row {}", what, row.row_id));

        let dwt_multiplier = power(deadweight, -row.c)?;
        let elapsed = Decimal::from(year)
            .checked_sub(row.e)
            .ok_or_else(|| overflow("elapsed years"))?;
        let retained = Decimal::ONE
            .checked_sub(row.d)
            .ok_or_else(|| overflow("reduction factor"))?;
        let trajectory = power(retained, elapsed)?;

        row.a
            .checked_mul(dwt_multiplier)
            .and_then(|v| v.checked_mul(trajectory))
            .and_then(|v| v.checked_add(row.b))
            .ok_or_else(|| overflow("baseline"))
    }
}

/// Variable bindings for one curve evaluation.
struct CurvePoint<'a> {
    row: &'a ReferenceCoefficientRow,
    year: i32,
    deadweight: Decimal,
}

impl VariableProvider for CurvePoint<'_> {
    fn get(&self, name: &str) -> Option<Decimal> {
        match name {
            "year" => Some(Decimal::from(self.year)),
            "dwt" => Some(self.deadweight),
            "a" => Some(self.row.a),
            "b" => Some(self.row.b),
            "c" => Some(self.row.c),
            "d" => Some(self.row.d),
            "e" => Some(self.row.e),
            _ => None,
        }
    }
}

/// A curve defined by a user-supplied expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionCurve {
    source: String,
    expr: Expr,
}

impl ExpressionCurve {
    /// Parse `source`, rejecting variables other than [`CURVE_VARIABLES`].
    pub fn parse(source: &str) -> Result<Self, CurveError> {
        let expr = expression::parse(source)?;
        expression::check_variables(&expr, &CURVE_VARIABLES)?;
        Ok(Self {
            source: source.trim().to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl BaselineCurve for ExpressionCurve {
    fn evaluate(
        &self,
        row: &ReferenceCoefficientRow,
        year: i32,
        deadweight: Decimal,
    ) -> Result<Decimal, CurveError> {
        let point = CurvePoint {
            row,
            year,
            deadweight,
        };
        evaluate(&self.expr, &point)
    }
}

/// The curve selected by an engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfiguredCurve {
    PowerLaw(PowerLawCurve),
    Expression(ExpressionCurve),
}

impl Default for ConfiguredCurve {
    fn default() -> Self {
        ConfiguredCurve::PowerLaw(PowerLawCurve)
    }
}

impl BaselineCurve for ConfiguredCurve {
    fn evaluate(
        &self,
        row: &ReferenceCoefficientRow,
        year: i32,
        deadweight: Decimal,
    ) -> Result<Decimal, CurveError> {
        match self {
            ConfiguredCurve::PowerLaw(curve) => curve.evaluate(row, year, deadweight),
            ConfiguredCurve::Expression(curve) => curve.evaluate(row, year, deadweight),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn row(row_id: i64, a: Decimal, c: Decimal, d: Decimal, e: Decimal) -> ReferenceCoefficientRow {
        ReferenceCoefficientRow {
            row_id,
            category: "PP".to_string(),
            vessel_type_id: 7,
            size: "60000-99999".to_string(),
            trajectory: "min".to_string(),
            a,
            b: Decimal::ZERO,
            c,
            d,
            e,
        }
    }

    #[test]
    fn test_power_law_flat_curve() {
        let flat = row(1, dec!(100), dec!(0), dec!(0), dec!(2023));
        let value = PowerLawCurve.evaluate(&flat, 2023, dec!(80000)).unwrap();
        assert_eq!(value, dec!(100));

        // No reduction rate means the year does not matter
        let value = PowerLawCurve.evaluate(&flat, 2030, dec!(80000)).unwrap();
        assert_eq!(value, dec!(100));
    }

    #[test]
    fn test_power_law_integral_exponent_is_exact() {
        let line = row(1, dec!(4000), dec!(1), dec!(0), dec!(2023));
        let value = PowerLawCurve.evaluate(&line, 2023, dec!(80000)).unwrap();
        assert_eq!(value, dec!(0.05));
    }

    #[test]
    fn test_power_law_annual_reduction() {
        let line = row(1, dec!(100), dec!(0), dec!(0.02), dec!(2021));
        let value = PowerLawCurve.evaluate(&line, 2023, dec!(80000)).unwrap();
        assert_eq!(value, dec!(96.04));

        // Years before the reference year scale the line up
        let value = PowerLawCurve.evaluate(&line, 2020, dec!(80000)).unwrap();
        assert!(value > dec!(100));
    }

    #[test]
    fn test_power_law_offset() {
        let mut line = row(1, dec!(100), dec!(0), dec!(0), dec!(2023));
        line.b = dec!(-5.5);
        let value = PowerLawCurve.evaluate(&line, 2023, dec!(80000)).unwrap();
        assert_eq!(value, dec!(94.5));
    }

    #[test]
    fn test_power_law_reference_line() {
        // IMO bulk carrier style reference line: 4745 * dwt^-0.622
        let line = row(1, dec!(4745), dec!(0.622), dec!(0), dec!(2019));
        let value = PowerLawCurve.evaluate(&line, 2019, dec!(80000)).unwrap();
        assert!(value > dec!(4.0) && value < dec!(4.5), "got {value}");
    }

    #[test]
    fn test_power_law_does_not_mutate_row() {
        let line = row(3, dec!(4745), dec!(0.622), dec!(0.01), dec!(2019));
        let before = line.clone();
        PowerLawCurve.evaluate(&line, 2024, dec!(80000)).unwrap();
        assert_eq!(line, before);
    }

    #[test]
    fn test_expression_curve_matches_power_law() {
        let curve = ExpressionCurve::parse("a * dwt ^ (0 - c) * (1 - d) ^ (year - e) + b").unwrap();
        let line = row(1, dec!(4000), dec!(1), dec!(0.02), dec!(2021));

        let expected = PowerLawCurve.evaluate(&line, 2023, dec!(80000)).unwrap();
        let actual = curve.evaluate(&line, 2023, dec!(80000)).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_expression_curve_rejects_unknown_variables() {
        let result = ExpressionCurve::parse("a * draft");
        assert_eq!(result, Err(CurveError::UnknownVariable("draft".to_string())));
    }

    #[test]
    fn test_closure_curve() {
        let curve = |row: &ReferenceCoefficientRow,
                     _year: i32,
                     _dwt: Decimal|
         -> Result<Decimal, CurveError> { Ok(row.a * dec!(2)) };
        let line = row(1, dec!(45), dec!(0), dec!(0), dec!(0));
        assert_eq!(curve.evaluate(&line, 2023, dec!(1)).unwrap(), dec!(90));
    }
}
