//! Shared wire primitives used across service crates.

use serde::{Deserialize, Serialize};

/// The `{"items": [...]}` envelope the platform wraps around every
/// collection: activity streams, file lists, channel pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemCollection<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> ItemCollection<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> From<Vec<T>> for ItemCollection<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}
