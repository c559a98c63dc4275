//! Captured route parameters.
//!
//! Named captures (`:id`) and positional captures (`(.*)`, `*`) live in
//! two separate collections. Lookups never cross between them: a named
//! parameter called `"0"` and the wildcard at index 0 are different values.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    named: HashMap<String, String>,
    positional: Vec<String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a named parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Value of a positional capture, counting unnamed groups from zero.
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    /// Inserts a named parameter, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.named.insert(name.into(), value.into());
    }

    pub(crate) fn set_positional(&mut self, values: Vec<String>) {
        self.positional = values;
    }

    pub fn named(&self) -> impl Iterator<Item = (&str, &str)> {
        self.named.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn positionals(&self) -> &[String] {
        &self.positional
    }

    pub fn len(&self) -> usize {
        self.named.len() + self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }
}
