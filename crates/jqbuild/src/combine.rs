use indexmap::{IndexMap, IndexSet};
use std::hash::Hash;
use std::path::PathBuf;

pub trait Combine {
    /// Combine two configuration layers, preferring the values in `self`.
    ///
    /// `self` is the higher precedence layer. Only keys a layer actually sets
    /// are `Some`, so a layer can set a key back to its built-in default.
    #[must_use]
    fn combine(self, other: Self) -> Self;
}

macro_rules! impl_combine_or {
    ($name:ty) => {
        impl Combine for Option<$name> {
            fn combine(self, other: Option<$name>) -> Option<$name> {
                self.or(other)
            }
        }
    };
}

impl_combine_or!(String);
impl_combine_or!(PathBuf);

/// Lists replace each other whole: a minifier command line or the slim
/// exclusion list only makes sense as written in one layer.
impl<T> Combine for Option<Vec<T>> {
    fn combine(self, other: Option<Vec<T>>) -> Option<Vec<T>> {
        self.or(other)
    }
}

impl<T> Combine for Option<IndexSet<T>>
where
    T: Eq + Hash,
{
    fn combine(self, other: Option<IndexSet<T>>) -> Option<IndexSet<T>> {
        self.or(other)
    }
}

impl<K, V> Combine for Option<IndexMap<K, V>>
where
    K: Eq + Hash,
{
    /// Merge keyed tables entry by entry; entries in `self` replace the entry
    /// of the same key in `other`.
    fn combine(self, other: Option<IndexMap<K, V>>) -> Option<IndexMap<K, V>> {
        match (self, other) {
            (Some(higher), Some(mut lower)) => {
                lower.extend(higher);
                Some(lower)
            }
            (a, b) => a.or(b),
        }
    }
}
