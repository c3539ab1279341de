//! Parsed shopping request: normalized items with quantity and unit.

use serde::{Deserialize, Serialize};

/// One requested item, normalized. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestItem {
    /// Normalized product name (lowercase, spaces replaced with underscores).
    pub name: String,
    /// Requested quantity in `unit`.
    pub quantity: f64,
    /// Requested unit (e.g. "kg", "l", "pieces").
    pub unit: String,
}

impl RequestItem {
    /// Creates an item, normalizing the name.
    pub fn new(name: impl AsRef<str>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            quantity,
            unit: unit.into(),
        }
    }
}

/// Full parsed request: the raw utterance plus its items in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedRequest {
    pub raw_input: String,
    pub items: Vec<RequestItem>,
}

/// Normalizes a product name to its cart-key form.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}
