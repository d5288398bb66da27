use crate::{
    bindings::Bindings,
    ops::{self, EvaluationError},
    render::Postfix,
};
use approx::{AbsDiffEq, RelativeEq};
use smol_str::SmolStr;
use std::{
    borrow::Borrow,
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
    ops::{Add, Div, Mul, Neg, Sub},
};

/// An immutable expression tree.
///
/// Every operator node exclusively owns its children, so a tree is never
/// shared or mutated after construction. Transformations like
/// [`Expression::simplify()`] always hand back a new tree.
///
/// Equality is structural. `x + 0` and `x` are different expressions even
/// though they always evaluate to the same thing.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(f64),
    Variable(Variable),
    /// An expression involving two operands.
    Binary {
        left: Box<Expression>,
        right: Box<Expression>,
        op: BinaryOperation,
    },
    /// Negate the expression.
    Negate(Box<Expression>),
    /// Invoke a builtin function.
    FunctionCall {
        function: Builtin,
        argument: Box<Expression>,
    },
}

impl Expression {
    pub fn constant(value: f64) -> Self { Expression::Constant(value) }

    pub fn variable<S: Into<SmolStr>>(name: S) -> Self {
        Expression::Variable(Variable::named(name))
    }

    pub fn binary(
        left: Expression,
        op: BinaryOperation,
        right: Expression,
    ) -> Self {
        Expression::Binary {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    pub fn call(function: Builtin, argument: Expression) -> Self {
        Expression::FunctionCall {
            function,
            argument: Box::new(argument),
        }
    }

    /// Raise this expression to some power.
    pub fn pow(self, exponent: Expression) -> Self {
        Expression::binary(self, BinaryOperation::Power, exponent)
    }

    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Constant(_) => true,
            _ => false,
        }
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Expression::Constant(value) => Some(*value),
            _ => None,
        }
    }

    /// The number of operators in this tree, a rough measure of how expensive
    /// it is to evaluate.
    pub fn op_count(&self) -> usize {
        match self {
            Expression::Constant(_) | Expression::Variable(_) => 0,
            Expression::Binary { left, right, .. } => {
                1 + left.op_count() + right.op_count()
            },
            Expression::Negate(inner) => 1 + inner.op_count(),
            Expression::FunctionCall { argument, .. } => {
                1 + argument.op_count()
            },
        }
    }

    /// Iterate over every [`Variable`] reference in this tree, in
    /// left-to-right order. A variable used twice is yielded twice.
    pub fn variables(&self) -> Variables<'_> {
        Variables {
            pending: vec![self],
        }
    }

    /// The set of free variables this expression needs before it can be
    /// evaluated.
    pub fn dependencies(&self) -> BTreeSet<Variable> {
        self.variables().cloned().collect()
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.variables().any(|v| v.name() == name)
    }

    /// Evaluate this expression, looking up each [`Variable`] in `bindings`.
    pub fn eval<B>(&self, bindings: &B) -> Result<f64, EvaluationError>
    where
        B: Bindings + ?Sized,
    {
        ops::evaluate(self, bindings)
    }

    /// Fold every subtree whose variables are all bound into a constant.
    ///
    /// See [`ops::optimize()`].
    pub fn optimize<B>(&self, bindings: &B) -> Expression
    where
        B: Bindings + ?Sized,
    {
        ops::optimize(self, bindings)
    }

    /// See [`ops::simplify()`].
    pub fn simplify(&self) -> Expression { ops::simplify(self) }

    /// The (unsimplified) derivative of this expression with respect to the
    /// variable called `name`.
    pub fn differentiate(&self, name: &str) -> Expression {
        ops::partial_derivative(self, name)
    }

    pub fn substitute(
        &self,
        variable: &Variable,
        value: &Expression,
    ) -> Expression {
        ops::substitute(self, variable, value)
    }

    /// The fully parenthesized, human readable form (e.g. `(x + 3.0)`).
    pub fn infix_string(&self) -> String { self.to_string() }

    /// The reverse-polish form (e.g. `x 3.0 +`).
    pub fn postfix_string(&self) -> String { self.postfix().to_string() }

    pub fn postfix(&self) -> Postfix<'_> { Postfix(self) }

    /// Compare two trees node-by-node, using `constants_match` for the
    /// numeric leaves.
    fn same_shape<F>(&self, other: &Expression, constants_match: &F) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        match (self, other) {
            (Expression::Constant(left), Expression::Constant(right)) => {
                constants_match(*left, *right)
            },
            (Expression::Variable(left), Expression::Variable(right)) => {
                left == right
            },
            (
                Expression::Binary {
                    left: left_a,
                    right: right_a,
                    op: op_a,
                },
                Expression::Binary {
                    left: left_b,
                    right: right_b,
                    op: op_b,
                },
            ) => {
                op_a == op_b
                    && left_a.same_shape(left_b, constants_match)
                    && right_a.same_shape(right_b, constants_match)
            },
            (Expression::Negate(a), Expression::Negate(b)) => {
                a.same_shape(b, constants_match)
            },
            (
                Expression::FunctionCall {
                    function: function_a,
                    argument: argument_a,
                },
                Expression::FunctionCall {
                    function: function_b,
                    argument: argument_b,
                },
            ) => {
                function_a == function_b
                    && argument_a.same_shape(argument_b, constants_match)
            },
            _ => false,
        }
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self { Expression::Constant(value) }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self { Expression::Variable(variable) }
}

/// Structural comparison which tolerates small differences between
/// constants.
impl AbsDiffEq for Expression {
    type Epsilon = f64;

    fn default_epsilon() -> f64 { f64::default_epsilon() }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.same_shape(other, &|left, right| {
            left.abs_diff_eq(&right, epsilon)
        })
    }
}

impl RelativeEq for Expression {
    fn default_max_relative() -> f64 { f64::default_max_relative() }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: f64,
        max_relative: f64,
    ) -> bool {
        self.same_shape(other, &|left, right| {
            left.relative_eq(&right, epsilon, max_relative)
        })
    }
}

/// A named unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(SmolStr);

impl Variable {
    pub fn named<S: Into<SmolStr>>(name: S) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty(), "Variables must have a name");
        Variable(name)
    }

    pub fn name(&self) -> &str { &self.0 }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for Variable {
    fn borrow(&self) -> &str { self.name() }
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self { Variable::named(name) }
}

/// An iterator over the [`Variable`]s in an [`Expression`], created by
/// [`Expression::variables()`].
#[derive(Debug, Clone)]
pub struct Variables<'a> {
    pending: Vec<&'a Expression>,
}

impl<'a> Iterator for Variables<'a> {
    type Item = &'a Variable;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(expr) = self.pending.pop() {
            match expr {
                Expression::Variable(variable) => return Some(variable),
                Expression::Constant(_) => {},
                Expression::Binary { left, right, .. } => {
                    // push the right side first so we visit the left first
                    self.pending.push(right);
                    self.pending.push(left);
                },
                Expression::Negate(inner)
                | Expression::FunctionCall {
                    argument: inner, ..
                } => self.pending.push(inner),
            }
        }

        None
    }
}

/// An operation that can be applied to two arguments.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOperation {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

impl BinaryOperation {
    pub const ALL: [BinaryOperation; 5] = [
        BinaryOperation::Plus,
        BinaryOperation::Minus,
        BinaryOperation::Times,
        BinaryOperation::Divide,
        BinaryOperation::Power,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperation::Plus => "+",
            BinaryOperation::Minus => "-",
            BinaryOperation::Times => "*",
            BinaryOperation::Divide => "/",
            BinaryOperation::Power => "^",
        }
    }

    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOperation::Plus => left + right,
            BinaryOperation::Minus => left - right,
            BinaryOperation::Times => left * right,
            BinaryOperation::Divide => left / right,
            BinaryOperation::Power => left.powf(right),
        }
    }
}

impl Display for BinaryOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Various builtin functions. Angles are in radians.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Builtin {
    Sqrt,
    Sine,
    Cosine,
    Tangent,
    ArcSine,
    ArcCosine,
    ArcTangent,
    Exp,
    NaturalLog,
}

impl Builtin {
    pub const ALL: [Builtin; 9] = [
        Builtin::Sqrt,
        Builtin::Sine,
        Builtin::Cosine,
        Builtin::Tangent,
        Builtin::ArcSine,
        Builtin::ArcCosine,
        Builtin::ArcTangent,
        Builtin::Exp,
        Builtin::NaturalLog,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sqrt => "sqrt",
            Builtin::Sine => "sin",
            Builtin::Cosine => "cos",
            Builtin::Tangent => "tan",
            Builtin::ArcSine => "asin",
            Builtin::ArcCosine => "acos",
            Builtin::ArcTangent => "atan",
            Builtin::Exp => "exp",
            Builtin::NaturalLog => "ln",
        }
    }

    pub fn apply(self, argument: f64) -> f64 {
        match self {
            Builtin::Sqrt => argument.sqrt(),
            Builtin::Sine => argument.sin(),
            Builtin::Cosine => argument.cos(),
            Builtin::Tangent => argument.tan(),
            Builtin::ArcSine => argument.asin(),
            Builtin::ArcCosine => argument.acos(),
            Builtin::ArcTangent => argument.atan(),
            Builtin::Exp => argument.exp(),
            Builtin::NaturalLog => argument.ln(),
        }
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// define some operator overloads to make constructing an expression easier.

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        Expression::binary(self, BinaryOperation::Plus, rhs)
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        Expression::binary(self, BinaryOperation::Minus, rhs)
    }
}

impl Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        Expression::binary(self, BinaryOperation::Times, rhs)
    }
}

impl Div for Expression {
    type Output = Expression;

    fn div(self, rhs: Expression) -> Expression {
        Expression::binary(self, BinaryOperation::Divide, rhs)
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output { Expression::Negate(Box::new(self)) }
}
