use crate::{
    ops::{self, EvaluationError},
    Bindings, Expression, Variable,
};
use nalgebra::DVector as Vector;
use std::slice;
use tracing::trace;

/// The partial derivatives of an [`Expression`] with respect to a list of
/// [`Variable`]s.
///
/// Each component is simplified once, up front, so it is cheap to evaluate
/// the gradient repeatedly (e.g. when plotting slopes or doing gradient
/// descent).
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    components: Box<[Expression]>,
    variables: Box<[Variable]>,
}

impl Gradient {
    /// Differentiate with respect to every variable the expression depends
    /// on, in sorted order.
    pub fn of(expr: &Expression) -> Self {
        let variables: Vec<_> = expr.dependencies().into_iter().collect();
        Gradient::with_respect_to(expr, &variables)
    }

    pub fn with_respect_to(expr: &Expression, variables: &[Variable]) -> Self {
        let mut components = Vec::with_capacity(variables.len());

        for variable in variables {
            let component = if expr.depends_on(variable.name()) {
                let derivative =
                    ops::partial_derivative(expr, variable.name());
                ops::simplify(&derivative)
            } else {
                Expression::Constant(0.0)
            };

            trace!(wrt = %variable, %component, "Gradient component");
            components.push(component);
        }

        Gradient {
            components: components.into_boxed_slice(),
            variables: variables.into(),
        }
    }

    pub fn variables(&self) -> &[Variable] { &self.variables }

    pub fn components(&self) -> &[Expression] { &self.components }

    pub fn len(&self) -> usize { self.components.len() }

    pub fn is_empty(&self) -> bool { self.components.is_empty() }

    /// Get the partial derivative with respect to a particular variable.
    pub fn component(&self, name: &str) -> Option<&Expression> {
        self.variables
            .iter()
            .position(|v| v.name() == name)
            .map(|ix| &self.components[ix])
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            variables: self.variables.iter(),
            components: self.components.iter(),
        }
    }

    /// Evaluate each component, returning the gradient vector at the point
    /// described by `bindings`.
    pub fn evaluate<B>(
        &self,
        bindings: &B,
    ) -> Result<Vector<f64>, EvaluationError>
    where
        B: Bindings + ?Sized,
    {
        let mut values = Vec::with_capacity(self.components.len());

        for component in self.components.iter() {
            values.push(ops::evaluate(component, bindings)?);
        }

        Ok(Vector::from_vec(values))
    }
}

impl<'a> IntoIterator for &'a Gradient {
    type IntoIter = Iter<'a>;
    type Item = (&'a Variable, &'a Expression);

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

/// An iterator over the `(variable, partial derivative)` pairs in a
/// [`Gradient`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    variables: slice::Iter<'a, Variable>,
    components: slice::Iter<'a, Expression>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Variable, &'a Expression);

    fn next(&mut self) -> Option<Self::Item> {
        Some((self.variables.next()?, self.components.next()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Builtin;
    use std::collections::HashMap;

    fn var(name: &str) -> Expression { Expression::variable(name) }

    fn c(value: f64) -> Expression { Expression::Constant(value) }

    #[test]
    fn gradient_of_a_known_function() {
        // f(a, b, c) = 4*a*a - 2*sin(b*c)
        let expr = c(4.0) * var("a") * var("a")
            - c(2.0) * Expression::call(Builtin::Sine, var("b") * var("c"));

        let got = Gradient::of(&expr);

        let names: Vec<_> =
            got.variables().iter().map(Variable::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(got.component("a").unwrap(), &(c(8.0) * var("a")));

        let mut bindings = HashMap::new();
        bindings.insert("a", 1.5);
        bindings.insert("b", 0.5);
        bindings.insert("c", 2.0);
        let values = got.evaluate(&bindings).unwrap();

        let should_be = Vector::from_vec(vec![
            8.0 * 1.5,
            -2.0 * 1_f64.cos() * 2.0,
            -2.0 * 1_f64.cos() * 0.5,
        ]);
        approx::assert_relative_eq!(values, should_be, epsilon = 1e-12);
    }

    #[test]
    fn unused_variables_get_a_zero_component() {
        let expr = var("x") * c(5.0);
        let variables = [Variable::named("x"), Variable::named("y")];

        let got = Gradient::with_respect_to(&expr, &variables);

        let pairs: Vec<_> = got.iter().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (&variables[0], &c(5.0)));
        assert_eq!(pairs[1], (&variables[1], &c(0.0)));
        assert!(got.component("z").is_none());
    }

    #[test]
    fn constants_have_an_empty_gradient() {
        let got = Gradient::of(&c(42.0));

        assert!(got.is_empty());
        let bindings: HashMap<Variable, f64> = HashMap::new();
        assert_eq!(got.evaluate(&bindings).unwrap().len(), 0);
    }

    #[test]
    fn evaluating_needs_every_variable() {
        let expr = var("x") * var("y");
        let got = Gradient::of(&expr);
        let bindings = [("x", 2.0)];

        let err = got.evaluate(&bindings[..]).unwrap_err();

        assert_eq!(err, EvaluationError::UnboundVariable { name: "y".into() });
    }
}
