//! Abstract syntax tree for curve expressions.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

/// Expression nodes in the AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal, kept exact
    Number(Decimal),
    /// Variable reference (e.g., `dwt`)
    Variable(String),
    /// Binary operation (e.g., `a * dwt`)
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation (e.g., `-c`)
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// Function call (e.g., `pow(dwt, c)`)
    FunctionCall { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn number(n: Decimal) -> Self {
        Expr::Number(n)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn function_call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::FunctionCall {
            name: name.into(),
            args,
        }
    }

    /// Names of every variable referenced by the expression.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                names.insert(name.as_str());
            }
            Expr::Binary { left, right, .. } => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            Expr::Unary { expr, .. } => expr.collect_variables(names),
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_variables(names);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_binary_op_symbol() {
        assert_eq!(BinaryOp::Pow.symbol(), "^");
        assert_eq!(BinaryOp::Div.symbol(), "/");
    }

    #[test]
    fn test_expr_variables() {
        let expr = Expr::binary(
            BinaryOp::Mul,
            Expr::variable("a"),
            Expr::function_call(
                "pow",
                vec![Expr::variable("dwt"), Expr::unary(UnaryOp::Neg, Expr::variable("c"))],
            ),
        );
        let names: Vec<&str> = expr.variables().into_iter().collect();
        assert_eq!(names, vec!["a", "c", "dwt"]);

        assert!(Expr::number(dec!(1.5)).variables().is_empty());
    }
}
