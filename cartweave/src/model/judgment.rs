//! Reasoning judgment: the chosen variant plus confidence and rationale.

use serde::{Deserialize, Serialize};

use super::product::Variant;

/// The reasoning gateway's choice for one product.
///
/// Consumed exactly once by the decision validator; an accepted judgment
/// becomes a cart entry, a rejected one triggers bounded re-reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub product_name: String,
    /// Vendor the chosen variant was sourced from.
    pub vendor: String,
    /// The chosen variant itself.
    pub variant: Variant,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Free-text rationale; carried into the cart entry.
    pub rationale: String,
}
