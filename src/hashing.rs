//! This module provides a deterministic hasher and `HashMap` and `HashSet`
//! variants that use it. The hashing data structures in the standard library
//! are randomly seeded per instance, which makes the iteration order of a set
//! differ between two runs of the same program. Iteration order matters here:
//! clearing the infected set and replaying a quasi-stationary snapshot both
//! iterate a `HashSet` while consuming random numbers, so a seeded simulation
//! is only reproducible if that order is fixed.
//!
//! `HashMap<K, V, S>` with a non-default hasher state does not have a `new`
//! method; use `HashMap::default()` or bring the `HashMapExt` / `HashSetExt`
//! extension traits into scope for a `new` with the familiar signature.

use std::collections::hash_map::DefaultHasher;
use std::hash::BuildHasherDefault;

/// A `HashMap` with a fixed-state hasher: identical insertions produce
/// identical iteration order across runs.
pub type HashMap<K, V> = std::collections::HashMap<K, V, BuildHasherDefault<DefaultHasher>>;
/// A `HashSet` with a fixed-state hasher.
pub type HashSet<T> = std::collections::HashSet<T, BuildHasherDefault<DefaultHasher>>;

pub trait HashMapExt {
    fn new() -> Self;
    fn with_capacity(capacity: usize) -> Self;
}

impl<K, V> HashMapExt for HashMap<K, V> {
    fn new() -> Self {
        Self::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, BuildHasherDefault::default())
    }
}

pub trait HashSetExt {
    fn new() -> Self;
    fn with_capacity(capacity: usize) -> Self;
}

impl<T> HashSetExt for HashSet<T> {
    fn new() -> Self {
        Self::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, BuildHasherDefault::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_order_is_reproducible() {
        let mut a: HashSet<usize> = HashSet::new();
        let mut b: HashSet<usize> = HashSet::new();
        for value in [17, 3, 99, 42, 8, 23, 64] {
            a.insert(value);
            b.insert(value);
        }
        let order_a: Vec<usize> = a.iter().copied().collect();
        let order_b: Vec<usize> = b.iter().copied().collect();
        assert_eq!(order_a, order_b);
    }

    #[test]
    fn map_ext_new() {
        let mut map: HashMap<u32, &str> = HashMap::new();
        map.insert(1, "one");
        assert_eq!(map.get(&1), Some(&"one"));
    }
}
