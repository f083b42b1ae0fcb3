use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, recognize, value},
    error::ErrorKind,
    multi::separated_list0,
    number::complete::recognize_float,
    sequence::{delimited, pair},
    IResult, Parser,
};
use rust_decimal::Decimal;

use crate::error::CurveError;
use crate::expression::ast::{BinaryOp, Expr, UnaryOp};

type ParseErr<'a> = nom::error::Error<&'a str>;

/// Parse a curve expression string into an AST.
pub fn parse(input: &str) -> Result<Expr, CurveError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CurveError::EmptyExpression);
    }

    match parse_expr(input) {
        Ok((remaining, expr)) => {
            let remaining = remaining.trim();
            if remaining.is_empty() {
                Ok(expr)
            } else {
                Err(CurveError::ParseError {
                    position: input.len() - remaining.len(),
                    message: format!("unexpected characters: '{}'", remaining),
                })
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(CurveError::ParseError {
            position: input.len() - e.input.len(),
            message: format!("expected {:?}", e.code),
        }),
        Err(nom::Err::Incomplete(_)) => Err(CurveError::ParseError {
            position: input.len(),
            message: "unexpected end of expression".to_string(),
        }),
    }
}

fn sp(input: &str) -> IResult<&str, &str> {
    multispace0(input)
}

fn symbol<'a>(c: char) -> impl Parser<&'a str, Output = char, Error = ParseErr<'a>> {
    delimited(multispace0, char(c), multispace0)
}

fn parse_expr(input: &str) -> IResult<&str, Expr> {
    let (input, left) = parse_multiplicative(input)?;
    parse_binary_chain(input, left, parse_additive_op, parse_multiplicative)
}

fn parse_additive_op(input: &str) -> IResult<&str, BinaryOp> {
    alt((
        value(BinaryOp::Add, symbol('+')),
        value(BinaryOp::Sub, symbol('-')),
    ))
    .parse(input)
}

fn parse_multiplicative(input: &str) -> IResult<&str, Expr> {
    let (input, left) = parse_unary(input)?;
    parse_binary_chain(input, left, parse_multiplicative_op, parse_unary)
}

fn parse_multiplicative_op(input: &str) -> IResult<&str, BinaryOp> {
    alt((
        value(BinaryOp::Mul, symbol('*')),
        value(BinaryOp::Div, symbol('/')),
    ))
    .parse(input)
}

fn parse_binary_chain<'a, F, G>(
    mut input: &'a str,
    mut left: Expr,
    mut op_parser: F,
    mut expr_parser: G,
) -> IResult<&'a str, Expr>
where
    F: FnMut(&'a str) -> IResult<&'a str, BinaryOp>,
    G: FnMut(&'a str) -> IResult<&'a str, Expr>,
{
    loop {
        match op_parser(input) {
            Ok((remaining, op)) => {
                let (remaining, right) = expr_parser(remaining)?;
                left = Expr::binary(op, left, right);
                input = remaining;
            }
            Err(_) => return Ok((input, left)),
        }
    }
}

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    let (input, _) = sp(input)?;

    if let Ok((input, _)) = symbol('-').parse(input) {
        let (input, expr) = parse_unary(input)?;
        return Ok((input, Expr::unary(UnaryOp::Neg, expr)));
    }

    parse_power(input)
}

// `^` is right-associative and binds tighter than a leading minus:
// `-x ^ 2` is `-(x ^ 2)`, `2 ^ -1` is `2 ^ (-1)`.
fn parse_power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = parse_primary(input)?;
    match symbol('^').parse(input) {
        Ok((input, _)) => {
            let (input, exponent) = parse_unary(input)?;
            Ok((input, Expr::binary(BinaryOp::Pow, base, exponent)))
        }
        Err(_) => Ok((input, base)),
    }
}

fn parse_primary(input: &str) -> IResult<&str, Expr> {
    let (input, _) = sp(input)?;

    alt((
        parse_parenthesized,
        parse_function_call,
        parse_number,
        parse_variable,
    ))
    .parse(input)
}

fn parse_parenthesized(input: &str) -> IResult<&str, Expr> {
    delimited(symbol('('), parse_expr, symbol(')')).parse(input)
}

fn parse_number(input: &str) -> IResult<&str, Expr> {
    let (rest, literal) = recognize_float::<&str, ParseErr<'_>>(input)?;
    match decimal_literal(literal) {
        Some(n) => Ok((rest, Expr::Number(n))),
        None => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::Float,
        ))),
    }
}

fn decimal_literal(literal: &str) -> Option<Decimal> {
    if literal.contains(|c: char| c == 'e' || c == 'E') {
        Decimal::from_scientific(literal).ok()
    } else {
        Decimal::from_str(literal).ok()
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn parse_variable(input: &str) -> IResult<&str, Expr> {
    map(identifier, |s: &str| Expr::Variable(s.to_string())).parse(input)
}

fn parse_function_call(input: &str) -> IResult<&str, Expr> {
    let (input, name) = identifier(input)?;
    let (input, _) = symbol('(').parse(input)?;
    let (input, args) = separated_list0(symbol(','), parse_expr).parse(input)?;
    let (input, _) = symbol(')').parse(input)?;

    Ok((input, Expr::function_call(name, args)))
}
