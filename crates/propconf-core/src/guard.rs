//! Circular definition detection
//!
//! A [`ResolutionGuard`] records the keys being expanded on the current
//! call chain. Extending it returns a new guard, so sibling placeholders in
//! one value only ever see their common ancestors.

use indexmap::IndexSet;

use crate::error::Error;

/// Ordered, immutable set of keys on the active resolution chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionGuard {
    keys: IndexSet<String>,
}

impl ResolutionGuard {
    /// Create an empty guard for a new top-level resolution
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `key` is already being resolved further up the chain
    pub fn is_visited(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Return a new guard with `key` appended to the chain
    pub fn with_key(&self, key: &str) -> Self {
        let mut keys = self.keys.clone();
        keys.insert(key.to_string());
        Self { keys }
    }

    /// Keys on the chain, in visit order
    pub fn chain(&self) -> Vec<String> {
        self.keys.iter().cloned().collect()
    }

    pub fn depth(&self) -> usize {
        self.keys.len()
    }

    /// Build the circular definition error for `key` re-entering the chain
    pub fn circular_error(&self, key: &str) -> Error {
        let mut chain = self.chain();
        chain.push(key.to_string());
        Error::circular_reference(key, chain)
    }
}
