// 🏷️ Category Name Registry - which transaction names are categories
//
// A transaction is only categorized when its Name is a known category name.
// The registry is a plain value handed to the Category Linker, so tests and
// deployments can each bring their own list.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Built-in category names, in display order
///
/// Structure:
/// - Food & Dining: Restaurants, Fast Food, Café, Groceries
/// - Transportation: Gas & Fuel, Uber/Lyft
/// - Shopping: General, Online Shopping
/// - Income: Salary, Business Income
/// - Transfer: Account Transfer
pub const DEFAULT_CATEGORY_NAMES: &[&str] = &[
    "Food & Dining",
    "Restaurants",
    "Fast Food",
    "Café",
    "Groceries",
    "Transportation",
    "Gas & Fuel",
    "Uber/Lyft",
    "Shopping",
    "General",
    "Online Shopping",
    "Income",
    "Salary",
    "Business Income",
    "Transfer",
    "Account Transfer",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNameRegistry {
    /// Names in the order they were registered
    names: Vec<String>,
    lookup: HashSet<String>,
}

impl CategoryNameRegistry {
    /// Create registry from any list of names (duplicates are dropped)
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = CategoryNameRegistry {
            names: Vec::new(),
            lookup: HashSet::new(),
        };
        for name in names {
            registry.register(name.into());
        }
        registry
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CATEGORY_NAMES.iter().copied())
    }

    /// Load names from a JSON array of strings
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read category names file: {:?}", path.as_ref()))?;

        let names: Vec<String> =
            serde_json::from_str(&content).context("Failed to parse category names JSON")?;

        Ok(Self::new(names))
    }

    /// Register a name; returns false if it was already known
    pub fn register(&mut self, name: String) -> bool {
        if self.lookup.contains(&name) {
            return false;
        }
        self.lookup.insert(name.clone());
        self.names.push(name);
        true
    }

    /// Exact, case-sensitive membership test
    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for CategoryNameRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// TESTS
// ============================================================================
