//! Looking up the values of [`Variable`]s.
//!
//! [`Variable`]: crate::Variable

use std::{
    borrow::Borrow,
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
};

/// A read-only mapping from variable names to their values.
///
/// The store is owned by the caller. Expression operations only read from it
/// for the duration of a single call and never enumerate or modify it.
pub trait Bindings {
    /// Get the value bound to `name`, if there is one.
    fn get(&self, name: &str) -> Option<f64>;

    fn has(&self, name: &str) -> bool { self.get(name).is_some() }
}

impl<K, S> Bindings for HashMap<K, f64, S>
where
    K: Borrow<str> + Hash + Eq,
    S: BuildHasher,
{
    fn get(&self, name: &str) -> Option<f64> {
        HashMap::get(self, name).copied()
    }

    fn has(&self, name: &str) -> bool { self.contains_key(name) }
}

impl<K> Bindings for BTreeMap<K, f64>
where
    K: Borrow<str> + Ord,
{
    fn get(&self, name: &str) -> Option<f64> {
        BTreeMap::get(self, name).copied()
    }

    fn has(&self, name: &str) -> bool { self.contains_key(name) }
}

/// A handful of `(name, value)` pairs. Lookups are a linear search and the
/// first match wins.
impl<S> Bindings for [(S, f64)]
where
    S: AsRef<str>,
{
    fn get(&self, name: &str) -> Option<f64> {
        self.iter()
            .find(|(candidate, _)| candidate.as_ref() == name)
            .map(|(_, value)| *value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Variable;

    #[test]
    fn hash_map_keyed_by_variable() {
        let mut bindings = HashMap::new();
        bindings.insert(Variable::named("x"), 2.5);

        assert!(bindings.has("x"));
        assert_eq!(Bindings::get(&bindings, "x"), Some(2.5));
        assert!(!bindings.has("y"));
        assert_eq!(Bindings::get(&bindings, "y"), None);
    }

    #[test]
    fn btree_map_keyed_by_string() {
        let mut bindings = BTreeMap::new();
        bindings.insert(String::from("pi"), std::f64::consts::PI);

        assert_eq!(Bindings::get(&bindings, "pi"), Some(std::f64::consts::PI));
        assert!(!bindings.has("tau"));
    }

    #[test]
    fn slice_of_pairs() {
        let bindings = [("x", 1.0), ("y", 2.0), ("x", 3.0)];
        let bindings = &bindings[..];

        // slices have their own inherent `get()`
        assert_eq!(Bindings::get(bindings, "y"), Some(2.0));
        assert_eq!(Bindings::get(bindings, "x"), Some(1.0));
        assert!(bindings.has("x"));
        assert!(!bindings.has("z"));
    }
}
