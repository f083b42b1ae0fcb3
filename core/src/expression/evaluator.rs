use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};

use crate::error::CurveError;
use crate::expression::ast::{BinaryOp, Expr, UnaryOp};

/// Largest number of decimal places `round` accepts.
const MAX_ROUND_DP: u32 = 28;

/// Trait for providing variable values during evaluation.
pub trait VariableProvider {
    fn get(&self, name: &str) -> Option<Decimal>;
}

impl<F> VariableProvider for F
where
    F: Fn(&str) -> Option<Decimal>,
{
    fn get(&self, name: &str) -> Option<Decimal> {
        self(name)
    }
}

/// Evaluate an expression with the given variable provider.
pub fn evaluate<V: VariableProvider>(expr: &Expr, vars: &V) -> Result<Decimal, CurveError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Variable(name) => vars
            .get(name)
            .ok_or_else(|| CurveError::UnknownVariable(name.clone())),
        Expr::Binary { op, left, right } => {
            let left_val = evaluate(left, vars)?;
            let right_val = evaluate(right, vars)?;
            evaluate_binary(*op, left_val, right_val)
        }
        Expr::Unary { op, expr } => {
            let val = evaluate(expr, vars)?;
            match op {
                UnaryOp::Neg => Ok(-val),
            }
        }
        Expr::FunctionCall { name, args } => {
            let arg_values: Result<Vec<Decimal>, _> =
                args.iter().map(|a| evaluate(a, vars)).collect();
            evaluate_function(name, &arg_values?)
        }
    }
}

fn evaluate_binary(op: BinaryOp, l: Decimal, r: Decimal) -> Result<Decimal, CurveError> {
    let overflow = || CurveError::Overflow(format!("{} {} {}", l, op.symbol(), r));
    match op {
        BinaryOp::Add => l.checked_add(r).ok_or_else(overflow),
        BinaryOp::Sub => l.checked_sub(r).ok_or_else(overflow),
        BinaryOp::Mul => l.checked_mul(r).ok_or_else(overflow),
        BinaryOp::Div => {
            if r.is_zero() {
                Err(CurveError::DivisionByZero)
            } else {
                l.checked_div(r).ok_or_else(overflow)
            }
        }
        BinaryOp::Pow => power(l, r),
    }
}

/// `base ^ exponent` in decimal arithmetic.
///
/// Integral exponents are computed by repeated multiplication and stay exact;
/// fractional exponents go through `exp(ln(base) * exponent)` and require a
/// positive base. A result too small to represent is zero.
pub fn power(base: Decimal, exponent: Decimal) -> Result<Decimal, CurveError> {
    let overflow = || CurveError::Overflow(format!("{} ^ {}", base, exponent));
    let unrepresentable = || {
        let magnitude = base.abs();
        let vanishes = (magnitude < Decimal::ONE && exponent.is_sign_positive())
            || (magnitude > Decimal::ONE && exponent.is_sign_negative());
        if vanishes {
            Ok(Decimal::ZERO)
        } else {
            Err(overflow())
        }
    };

    if exponent.fract().is_zero() {
        let exp = exponent.to_i64().ok_or_else(overflow)?;
        if base.is_zero() && exp < 0 {
            return Err(CurveError::DivisionByZero);
        }
        return base.checked_powi(exp).map_or_else(unrepresentable, Ok);
    }

    if base.is_zero() {
        return if exponent.is_sign_positive() {
            Ok(Decimal::ZERO)
        } else {
            Err(CurveError::DivisionByZero)
        };
    }
    if base.is_sign_negative() {
        return Err(CurveError::Domain(format!("{} ^ {}", base, exponent)));
    }
    base.checked_powd(exponent).map_or_else(unrepresentable, Ok)
}

fn expect_args(name: &str, args: &[Decimal], expected: usize) -> Result<(), CurveError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CurveError::InvalidArgCount {
            function: name.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn evaluate_function(name: &str, args: &[Decimal]) -> Result<Decimal, CurveError> {
    match name.to_lowercase().as_str() {
        "min" => {
            expect_args("min", args, 2)?;
            Ok(args[0].min(args[1]))
        }
        "max" => {
            expect_args("max", args, 2)?;
            Ok(args[0].max(args[1]))
        }
        "abs" => {
            expect_args("abs", args, 1)?;
            Ok(args[0].abs())
        }
        "pow" => {
            expect_args("pow", args, 2)?;
            power(args[0], args[1])
        }
        "sqrt" => {
            expect_args("sqrt", args, 1)?;
            args[0]
                .sqrt()
                .ok_or_else(|| CurveError::Domain(format!("sqrt({})", args[0])))
        }
        "ln" => {
            expect_args("ln", args, 1)?;
            if args[0] <= Decimal::ZERO {
                return Err(CurveError::Domain(format!("ln({})", args[0])));
            }
            Ok(args[0].ln())
        }
        "exp" => {
            expect_args("exp", args, 1)?;
            match args[0].checked_exp() {
                Some(value) => Ok(value),
                None if args[0].is_sign_negative() => Ok(Decimal::ZERO),
                None => Err(CurveError::Overflow(format!("exp({})", args[0]))),
            }
        }
        "round" => {
            expect_args("round", args, 2)?;
            let places = args[1]
                .to_u32()
                .filter(|dp| *dp <= MAX_ROUND_DP && args[1].fract().is_zero())
                .ok_or_else(|| CurveError::Domain(format!("round(x, {})", args[1])))?;
            Ok(args[0].round_dp(places))
        }
        _ => Err(CurveError::UnknownFunction(name.to_string())),
    }
}

/// Information about a supported function.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FunctionInfo {
    pub name: String,
    pub signature: String,
    pub description: String,
    pub arg_count: u32,
}

impl FunctionInfo {
    fn new(name: &str, signature: &str, description: &str, arg_count: u32) -> Self {
        Self {
            name: name.to_string(),
            signature: signature.to_string(),
            description: description.to_string(),
            arg_count,
        }
    }
}

/// List of supported built-in functions.
pub fn supported_functions() -> Vec<FunctionInfo> {
    vec![
        FunctionInfo::new("min", "min(a, b)", "Returns the smaller of two values", 2),
        FunctionInfo::new("max", "max(a, b)", "Returns the larger of two values", 2),
        FunctionInfo::new("abs", "abs(x)", "Returns the absolute value of x", 1),
        FunctionInfo::new("pow", "pow(x, y)", "Raises x to the power y, same as x ^ y", 2),
        FunctionInfo::new("sqrt", "sqrt(x)", "Returns the square root of x", 1),
        FunctionInfo::new("ln", "ln(x)", "Returns the natural logarithm of x", 1),
        FunctionInfo::new("exp", "exp(x)", "Returns e raised to the power x", 1),
        FunctionInfo::new("round", "round(x, n)", "Rounds x to n decimal places", 2),
    ]
}
