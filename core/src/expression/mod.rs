//! Expression engine for user-defined baseline curves.
//!
//! Curves are written as arithmetic over the reference row parameters and
//! the evaluation point. Evaluation runs entirely in `rust_decimal`, so a
//! curve that only uses `+ - * /` and integral powers is exact.
//!
//! # Supported Grammar
//!
//! - Arithmetic: `+ - * / ^ ( )`, with `^` right-associative
//! - Unary minus: `-x`
//! - Functions: `min(a,b)`, `max(a,b)`, `abs(x)`, `pow(x,y)`, `sqrt(x)`, `ln(x)`, `exp(x)`, `round(x,n)`
//!
//! # Example
//!
//! ```
//! use emissions_compute::expression::{validate, compute};
//! use rust_decimal::Decimal;
//!
//! let formula = "a * dwt ^ -c";
//! validate(formula).expect("Formula should be valid");
//!
//! let vars = |name: &str| match name {
//!     "a" => Some(Decimal::from(1000)),
//!     "c" => Some(Decimal::ONE),
//!     "dwt" => Some(Decimal::from(50)),
//!     _ => None,
//! };
//! let result = compute(formula, &vars).expect("Should compute");
//! assert_eq!(result, Decimal::from(20));
//! ```

pub mod ast;
pub mod evaluator;
pub mod parser;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use evaluator::{evaluate, power, supported_functions, FunctionInfo, VariableProvider};
pub use parser::parse;

use rust_decimal::Decimal;

use crate::error::CurveError;

/// Validate an expression without evaluating it.
///
/// This checks that the expression parses but not that its variables exist.
pub fn validate(expression: &str) -> Result<(), CurveError> {
    parse(expression)?;
    Ok(())
}

/// Validate an expression and check that all variables are available.
pub fn validate_with_variables(expression: &str, available: &[&str]) -> Result<(), CurveError> {
    let ast = parse(expression)?;
    check_variables(&ast, available)
}

pub(crate) fn check_variables(expr: &Expr, available: &[&str]) -> Result<(), CurveError> {
    match expr
        .variables()
        .into_iter()
        .find(|name| !available.contains(name))
    {
        Some(name) => Err(CurveError::UnknownVariable(name.to_string())),
        None => Ok(()),
    }
}

/// Parse and evaluate an expression in one step.
pub fn compute<V: VariableProvider>(expression: &str, vars: &V) -> Result<Decimal, CurveError> {
    let ast = parse(expression)?;
    evaluate(&ast, vars)
}
