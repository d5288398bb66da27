//! [`Expression`] operations.

use crate::{BinaryOperation, Bindings, Builtin, Expression, Variable};
use smol_str::SmolStr;
use std::{
    collections::BTreeSet,
    error::Error,
    fmt::{self, Display, Formatter},
};
use tracing::{debug, trace};

/// Things that can go wrong while evaluating an [`Expression`].
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// The expression refers to a variable which hasn't been given a value.
    UnboundVariable { name: SmolStr },
}

impl Display for EvaluationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationError::UnboundVariable { name } => {
                write!(f, "No value was provided for \"{}\"", name)
            },
        }
    }
}

impl Error for EvaluationError {}

/// Evaluate an [`Expression`], looking up variables in `bindings`.
///
/// Every variable in the tree must be bound. Check with
/// [`unbound_variables()`] first if you aren't sure.
pub fn evaluate<B>(
    expr: &Expression,
    bindings: &B,
) -> Result<f64, EvaluationError>
where
    B: Bindings + ?Sized,
{
    match expr {
        Expression::Constant(value) => Ok(*value),
        Expression::Variable(variable) => {
            bindings.get(variable.name()).ok_or_else(|| {
                EvaluationError::UnboundVariable {
                    name: variable.name().into(),
                }
            })
        },
        Expression::Binary { left, right, op } => {
            let left = evaluate(left, bindings)?;
            let right = evaluate(right, bindings)?;
            Ok(op.apply(left, right))
        },
        Expression::Negate(inner) => Ok(-evaluate(inner, bindings)?),
        Expression::FunctionCall { function, argument } => {
            Ok(function.apply(evaluate(argument, bindings)?))
        },
    }
}

/// Find the variables an [`Expression`] needs which aren't in `bindings`.
pub fn unbound_variables<B>(
    expr: &Expression,
    bindings: &B,
) -> BTreeSet<Variable>
where
    B: Bindings + ?Sized,
{
    expr.variables()
        .filter(|variable| !bindings.has(variable.name()))
        .cloned()
        .collect()
}

/// Replace every subtree whose variables are all bound with the constant it
/// evaluates to.
///
/// Subtrees with at least one unbound variable keep their shape (only their
/// children get folded). No algebraic rewrites happen here, that's what
/// [`simplify()`] is for.
pub fn optimize<B>(expr: &Expression, bindings: &B) -> Expression
where
    B: Bindings + ?Sized,
{
    let optimized = fold_bound_subtrees(expr, bindings);

    debug!(
        before = expr.op_count(),
        after = optimized.op_count(),
        result = %optimized,
        "Optimized an expression"
    );

    optimized
}

fn fold_bound_subtrees<B>(expr: &Expression, bindings: &B) -> Expression
where
    B: Bindings + ?Sized,
{
    // Folding bottom-up applies exactly the same floating point operations
    // as evaluate(), so the folded constants are bit-for-bit identical.
    match expr {
        Expression::Constant(_) => expr.clone(),
        Expression::Variable(variable) => match bindings.get(variable.name())
        {
            Some(value) => Expression::Constant(value),
            None => expr.clone(),
        },
        Expression::Binary { left, right, op } => {
            let left = fold_bound_subtrees(left, bindings);
            let right = fold_bound_subtrees(right, bindings);

            match (left, right) {
                (Expression::Constant(l), Expression::Constant(r)) => {
                    Expression::Constant(op.apply(l, r))
                },
                (left, right) => Expression::binary(left, *op, right),
            }
        },
        Expression::Negate(inner) => {
            match fold_bound_subtrees(inner, bindings) {
                Expression::Constant(value) => Expression::Constant(-value),
                other => -other,
            }
        },
        Expression::FunctionCall { function, argument } => {
            match fold_bound_subtrees(argument, bindings) {
                Expression::Constant(value) => {
                    Expression::Constant(function.apply(value))
                },
                other => Expression::call(*function, other),
            }
        },
    }
}

/// Simplify an expression using algebraic identities which hold no matter
/// what values the variables take.
///
/// Children are simplified first, then the parent's rules are applied to the
/// simplified children. Any node built by a rule is itself simplified, so
/// the result is a fixed point and `simplify(&simplify(e)) == simplify(e)`.
pub fn simplify(expr: &Expression) -> Expression {
    let simplified = simplify_tree(expr);

    debug!(
        before = expr.op_count(),
        after = simplified.op_count(),
        result = %simplified,
        "Simplified an expression"
    );

    simplified
}

fn simplify_tree(expr: &Expression) -> Expression {
    match expr {
        Expression::Constant(_) | Expression::Variable(_) => expr.clone(),
        Expression::Binary { left, right, op } => {
            simplify_binary_op(simplify_tree(left), simplify_tree(right), *op)
        },
        Expression::Negate(inner) => simplify_negation(simplify_tree(inner)),
        Expression::FunctionCall { function, argument } => {
            simplify_function_call(*function, simplify_tree(argument))
        },
    }
}

/// Apply the identity rules for a binary operation whose operands have
/// already been simplified.
fn simplify_binary_op(
    left: Expression,
    right: Expression,
    op: BinaryOperation,
) -> Expression {
    match (left, right, op) {
        // Evaluate in-place
        (Expression::Constant(l), Expression::Constant(r), op) => {
            Expression::Constant(op.apply(l, r))
        },

        // x + 0 = x
        (Expression::Constant(l), right, BinaryOperation::Plus)
            if l == 0.0 =>
        {
            right
        },
        (left, Expression::Constant(r), BinaryOperation::Plus)
            if r == 0.0 =>
        {
            left
        },
        // x + -y = x - y
        (left, Expression::Negate(right), BinaryOperation::Plus) => {
            simplify_binary_op(left, *right, BinaryOperation::Minus)
        },
        // x + x = 2x
        (left, right, BinaryOperation::Plus) if left == right => {
            simplify_binary_op(
                Expression::Constant(2.0),
                right,
                BinaryOperation::Times,
            )
        },

        // x - 0 = x
        (left, Expression::Constant(r), BinaryOperation::Minus)
            if r == 0.0 =>
        {
            left
        },
        // 0 - x = -x
        (Expression::Constant(l), right, BinaryOperation::Minus)
            if l == 0.0 =>
        {
            simplify_negation(right)
        },
        // x - -y = x + y
        (left, Expression::Negate(right), BinaryOperation::Minus) => {
            simplify_binary_op(left, *right, BinaryOperation::Plus)
        },
        // x - x = 0
        (left, right, BinaryOperation::Minus) if left == right => {
            Expression::Constant(0.0)
        },

        // 0 * x = 0
        (Expression::Constant(l), _, BinaryOperation::Times) if l == 0.0 => {
            Expression::Constant(0.0)
        },
        (_, Expression::Constant(r), BinaryOperation::Times) if r == 0.0 => {
            Expression::Constant(0.0)
        },
        // 1 * x = x
        (Expression::Constant(l), right, BinaryOperation::Times)
            if l == 1.0 =>
        {
            right
        },
        (left, Expression::Constant(r), BinaryOperation::Times)
            if r == 1.0 =>
        {
            left
        },
        // x * 3 = 3 * x
        (left, Expression::Constant(r), BinaryOperation::Times) => {
            simplify_binary_op(
                Expression::Constant(r),
                left,
                BinaryOperation::Times,
            )
        },
        // a * (b * x) = (a*b) * x
        (
            Expression::Constant(a),
            Expression::Binary {
                left: inner_left,
                right: inner_right,
                op: BinaryOperation::Times,
            },
            BinaryOperation::Times,
        ) => match *inner_left {
            Expression::Constant(b) => simplify_binary_op(
                Expression::Constant(a * b),
                *inner_right,
                BinaryOperation::Times,
            ),
            inner_left => {
                Expression::Constant(a)
                    * Expression::binary(
                        inner_left,
                        BinaryOperation::Times,
                        *inner_right,
                    )
            },
        },

        // 0 / x = 0
        (Expression::Constant(l), _, BinaryOperation::Divide) if l == 0.0 => {
            Expression::Constant(0.0)
        },
        // x / 1 = x
        (left, Expression::Constant(r), BinaryOperation::Divide)
            if r == 1.0 =>
        {
            left
        },
        // x / x = 1
        (left, right, BinaryOperation::Divide) if left == right => {
            Expression::Constant(1.0)
        },

        // x^0 = 1
        (_, Expression::Constant(r), BinaryOperation::Power) if r == 0.0 => {
            Expression::Constant(1.0)
        },
        // x^1 = x
        (left, Expression::Constant(r), BinaryOperation::Power)
            if r == 1.0 =>
        {
            left
        },
        // 1^x = 1
        (Expression::Constant(l), _, BinaryOperation::Power) if l == 1.0 => {
            Expression::Constant(1.0)
        },

        // Oh well, we tried
        (left, right, op) => Expression::binary(left, op, right),
    }
}

fn simplify_negation(inner: Expression) -> Expression {
    match inner {
        Expression::Constant(value) => Expression::Constant(-value),
        // double negative
        Expression::Negate(inner) => *inner,
        other => -other,
    }
}

fn simplify_function_call(
    function: Builtin,
    argument: Expression,
) -> Expression {
    match (function, argument) {
        (function, Expression::Constant(value)) => {
            Expression::Constant(function.apply(value))
        },
        (
            Builtin::NaturalLog,
            Expression::FunctionCall {
                function: Builtin::Exp,
                argument,
            },
        ) => *argument,
        (function, argument) => Expression::call(function, argument),
    }
}

/// Replace all references to a [`Variable`] with an [`Expression`].
pub fn substitute(
    expression: &Expression,
    variable: &Variable,
    value: &Expression,
) -> Expression {
    match expression {
        Expression::Variable(v) => {
            if v == variable {
                value.clone()
            } else {
                Expression::Variable(v.clone())
            }
        },
        Expression::Constant(value) => Expression::Constant(*value),
        Expression::Binary { left, right, op } => {
            let left = substitute(left, variable, value);
            let right = substitute(right, variable, value);
            Expression::binary(left, *op, right)
        },
        Expression::Negate(inner) => -substitute(inner, variable, value),
        Expression::FunctionCall { function, argument } => {
            Expression::call(*function, substitute(argument, variable, value))
        },
    }
}

/// Calculate an [`Expression`]'s partial derivative with respect to the
/// variable called `name`.
///
/// The result isn't simplified, pass it through [`simplify()`] to get
/// something a human would write.
pub fn partial_derivative(expr: &Expression, name: &str) -> Expression {
    let derivative = derivative_of(expr, name);
    trace!(%expr, wrt = name, %derivative, "Differentiated an expression");

    derivative
}

fn derivative_of(expr: &Expression, name: &str) -> Expression {
    // Anything independent of the variable is a constant as far as we're
    // concerned, even if it would evaluate to infinity or NaN.
    if !expr.depends_on(name) {
        return Expression::Constant(0.0);
    }

    match expr {
        Expression::Constant(_) => Expression::Constant(0.0),
        Expression::Variable(v) => {
            if v.name() == name {
                Expression::Constant(1.0)
            } else {
                Expression::Constant(0.0)
            }
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Plus,
        } => derivative_of(left, name) + derivative_of(right, name),
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Minus,
        } => derivative_of(left, name) - derivative_of(right, name),
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Times,
        } => {
            // The product rule
            let d_left = derivative_of(left, name);
            let d_right = derivative_of(right, name);
            let left = Expression::clone(left);
            let right = Expression::clone(right);

            d_left * right + left * d_right
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Divide,
        } => {
            // The quotient rule
            let d_left = derivative_of(left, name);
            let d_right = derivative_of(right, name);
            let left = Expression::clone(left);
            let right = Expression::clone(right);

            (d_left * right.clone() - left * d_right)
                / right.pow(Expression::Constant(2.0))
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Power,
        } => power_rule(left, right, name),
        Expression::Negate(inner) => -derivative_of(inner, name),
        Expression::FunctionCall { function, argument } => {
            // implement the chain rule: (f o g)' = (f' o g) * g'
            let f_dash_of_g = builtin_derivative(*function, argument);
            let g_dash = derivative_of(argument, name);

            f_dash_of_g * g_dash
        },
    }
}

fn power_rule(
    base: &Expression,
    exponent: &Expression,
    name: &str,
) -> Expression {
    let ln = |e: &Expression| Expression::call(Builtin::NaturalLog, e.clone());
    let f_to_the_g = base.clone().pow(exponent.clone());

    match (base.depends_on(name), exponent.depends_on(name)) {
        // d/dx f^c = c * f^(c-1) * f'
        (_, false) => {
            let reduced = match exponent.as_constant() {
                Some(c) => Expression::Constant(c - 1.0),
                None => exponent.clone() - Expression::Constant(1.0),
            };

            exponent.clone() * base.clone().pow(reduced)
                * derivative_of(base, name)
        },
        // d/dx c^g = c^g * ln(c) * g'
        (false, true) => {
            f_to_the_g * ln(base) * derivative_of(exponent, name)
        },
        // d/dx f^g = f^g * (g' * ln(f) + g * f' / f)
        (true, true) => {
            let d_base = derivative_of(base, name);
            let d_exponent = derivative_of(exponent, name);

            f_to_the_g
                * (d_exponent * ln(base)
                    + exponent.clone() * d_base / base.clone())
        },
    }
}

/// For some builtin function, `f`, get `f'(argument)`.
fn builtin_derivative(
    function: Builtin,
    argument: &Expression,
) -> Expression {
    let u = || argument.clone();
    let one = || Expression::Constant(1.0);
    let squared = |e: Expression| e.pow(Expression::Constant(2.0));

    match function {
        Builtin::Sqrt => {
            Expression::Constant(0.5) / Expression::call(Builtin::Sqrt, u())
        },
        Builtin::Sine => Expression::call(Builtin::Cosine, u()),
        Builtin::Cosine => -Expression::call(Builtin::Sine, u()),
        Builtin::Tangent => {
            one() / squared(Expression::call(Builtin::Cosine, u()))
        },
        Builtin::ArcSine => {
            one() / Expression::call(Builtin::Sqrt, one() - squared(u()))
        },
        Builtin::ArcCosine => {
            -(one() / Expression::call(Builtin::Sqrt, one() - squared(u())))
        },
        Builtin::ArcTangent => one() / (one() + squared(u())),
        Builtin::Exp => Expression::call(Builtin::Exp, u()),
        Builtin::NaturalLog => one() / u(),
    }
}
