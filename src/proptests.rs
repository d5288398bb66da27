//! Property-based tests for the invariants every [`Expression`] operation
//! should uphold.

use crate::{ops, BinaryOperation, Builtin, Expression, Variable};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

const NAMES: [&str; 3] = ["x", "y", "z"];

// Small, "nice" constants so trees don't immediately overflow
fn constant() -> impl Strategy<Value = Expression> {
    (-20i32..20).prop_map(|n| Expression::Constant(f64::from(n) / 4.0))
}

fn variable() -> impl Strategy<Value = Expression> {
    prop::sample::select(NAMES.to_vec()).prop_map(Expression::variable)
}

fn expression() -> impl Strategy<Value = Expression> {
    let leaf = prop_oneof![constant(), variable()];

    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (
                inner.clone(),
                inner.clone(),
                prop::sample::select(BinaryOperation::ALL.to_vec())
            )
                .prop_map(|(left, right, op)| Expression::binary(
                    left, op, right
                )),
            inner.clone().prop_map(|e| -e),
            (prop::sample::select(Builtin::ALL.to_vec()), inner)
                .prop_map(|(function, argument)| Expression::call(
                    function, argument
                )),
        ]
    })
}

fn complete_bindings() -> impl Strategy<Value = HashMap<Variable, f64>> {
    prop::collection::vec(-3.0..3.0_f64, NAMES.len()).prop_map(|values| {
        NAMES
            .iter()
            .map(|&name| Variable::named(name))
            .zip(values)
            .collect()
    })
}

/// Bit-for-bit equality, treating all NaNs as equal.
fn same_float(left: f64, right: f64) -> bool {
    left.to_bits() == right.to_bits() || (left.is_nan() && right.is_nan())
}

fn children(expr: &Expression) -> Vec<&Expression> {
    match expr {
        Expression::Constant(_) | Expression::Variable(_) => Vec::new(),
        Expression::Binary { left, right, .. } => vec![&**left, &**right],
        Expression::Negate(inner) => vec![&**inner],
        Expression::FunctionCall { argument, .. } => vec![&**argument],
    }
}

proptest! {
    #[test]
    fn constants_evaluate_to_themselves(
        value in any::<f64>(),
        bindings in complete_bindings(),
    ) {
        let got = Expression::Constant(value).eval(&bindings).unwrap();

        prop_assert!(same_float(got, value));
    }

    #[test]
    fn dependencies_are_the_union_of_the_children(expr in expression()) {
        let got = expr.dependencies();

        let should_be: BTreeSet<Variable> = match &expr {
            Expression::Variable(v) => std::iter::once(v.clone()).collect(),
            other => children(other)
                .into_iter()
                .flat_map(|child| child.dependencies())
                .collect(),
        };

        prop_assert_eq!(got, should_be);
    }

    #[test]
    fn op_count_is_one_per_operator(expr in expression()) {
        let children = children(&expr);
        let from_children: usize =
            children.iter().map(|child| child.op_count()).sum();
        let own = if children.is_empty() { 0 } else { 1 };

        prop_assert_eq!(expr.op_count(), own + from_children);
    }

    #[test]
    fn independent_derivatives_evaluate_to_zero(
        expr in expression(),
        bindings in complete_bindings(),
    ) {
        // "w" never appears in a generated expression
        let derivative = expr.differentiate("w");

        prop_assert_eq!(derivative.eval(&bindings).unwrap(), 0.0);
    }

    #[test]
    fn simplify_is_idempotent(expr in expression()) {
        let once = ops::simplify(&expr);
        let twice = ops::simplify(&once);

        // compare the rendered text so folded NaNs compare equal
        prop_assert_eq!(once.to_string(), twice.to_string());
    }

    #[test]
    fn simplified_derivatives_are_idempotent(expr in expression()) {
        let once = expr.differentiate("x").simplify();
        let twice = once.simplify();

        prop_assert_eq!(once.to_string(), twice.to_string());
    }

    #[test]
    fn optimizing_with_complete_bindings_gives_the_evaluated_constant(
        expr in expression(),
        bindings in complete_bindings(),
    ) {
        let should_be = expr.eval(&bindings).unwrap();

        match ops::optimize(&expr, &bindings) {
            Expression::Constant(got) => prop_assert!(
                same_float(got, should_be),
                "{} != {}",
                got,
                should_be
            ),
            other => prop_assert!(false, "{} isn't a constant", other),
        }
    }

    #[test]
    fn optimize_is_referentially_transparent(
        expr in expression(),
        y in -3.0..3.0_f64,
    ) {
        let mut bindings = HashMap::new();
        bindings.insert(Variable::named("y"), y);

        let first = ops::optimize(&expr, &bindings);
        let second = ops::optimize(&expr, &bindings);

        prop_assert_eq!(first.to_string(), second.to_string());
        prop_assert!(!first.depends_on("y"));
        prop_assert!(first.op_count() <= expr.op_count());
    }

    #[test]
    fn optimize_without_bindings_keeps_variables(expr in expression()) {
        let empty: HashMap<Variable, f64> = HashMap::new();

        let got = ops::optimize(&expr, &empty);

        prop_assert_eq!(got.dependencies(), expr.dependencies());
    }

    #[test]
    fn numbers_round_trip_through_text(value in any::<f64>()) {
        let rendered = Expression::Constant(value).infix_string();
        let parsed: f64 = rendered.parse().unwrap();

        prop_assert!(same_float(parsed, value), "{}", rendered);
        prop_assert_eq!(
            Expression::Constant(value).postfix_string(),
            rendered
        );
    }
}
