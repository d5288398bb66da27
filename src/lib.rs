//! Immutable expression trees which can be evaluated, differentiated,
//! constant-folded, simplified, and rendered as text.
//!
//! ```rust
//! use expressions::{Expression, Variable};
//! use std::collections::HashMap;
//!
//! let x = Expression::variable("x");
//! let expr = x.clone() * x;
//!
//! let derivative = expr.differentiate("x").simplify();
//! assert_eq!(derivative.infix_string(), "(2.0 * x)");
//!
//! let mut bindings = HashMap::new();
//! bindings.insert(Variable::named("x"), 3.0);
//! assert_eq!(derivative.eval(&bindings).unwrap(), 6.0);
//! ```

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod bindings;
mod expr;
mod gradient;
pub mod ops;
#[cfg(test)]
mod proptests;
mod render;

pub use bindings::Bindings;
pub use expr::{BinaryOperation, Builtin, Expression, Variable, Variables};
pub use gradient::{Gradient, Iter as GradientIter};
pub use ops::EvaluationError;
pub use render::Postfix;
