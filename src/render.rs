//! Turning an [`Expression`] back into text.
//!
//! Numbers are written using Rust's shortest round-trip float formatting, so
//! parsing a rendered constant with [`str::parse()`] gives back exactly the
//! same `f64`.

use crate::Expression;
use std::fmt::{self, Display, Formatter};

/// The infix form. Every binary operation is wrapped in parentheses, so the
/// text is unambiguous without knowing any precedence rules.
impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(value) => write_number(*value, f),
            Expression::Variable(variable) => write!(f, "{}", variable),
            Expression::Binary { left, right, op } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            },
            Expression::Negate(inner) => {
                if needs_parens_when_negated(inner) {
                    write!(f, "-({})", inner)
                } else {
                    write!(f, "-{}", inner)
                }
            },
            Expression::FunctionCall { function, argument } => {
                write!(f, "{}({})", function.name(), argument)
            },
        }
    }
}

/// Renders an [`Expression`] in reverse-polish notation, created by
/// [`Expression::postfix()`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Postfix<'a>(pub &'a Expression);

impl<'a> Display for Postfix<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expression::Constant(value) => write_number(*value, f),
            Expression::Variable(variable) => write!(f, "{}", variable),
            Expression::Binary { left, right, op } => write!(
                f,
                "{} {} {}",
                Postfix(left),
                Postfix(right),
                op.symbol()
            ),
            Expression::Negate(inner) => write!(f, "{} neg", Postfix(inner)),
            Expression::FunctionCall { function, argument } => {
                write!(f, "{} {}", Postfix(argument), function.name())
            },
        }
    }
}

fn write_number(value: f64, f: &mut Formatter<'_>) -> fmt::Result {
    // Debug always includes a decimal point or exponent (3.0, 1e-7) and
    // prints the shortest digits which round-trip.
    write!(f, "{:?}", value)
}

fn needs_parens_when_negated(expr: &Expression) -> bool {
    match expr {
        Expression::Negate(_) => true,
        Expression::Constant(value) => value.is_sign_negative(),
        _ => false,
    }
}
