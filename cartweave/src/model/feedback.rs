//! Feedback classification results and recompare output.
//!
//! The reasoning gateway maps one utterance onto exactly one action from a
//! closed set; the mutator never branches on raw free text.

use serde::{Deserialize, Serialize};

/// Closed set of actions a feedback utterance can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackActionKind {
    /// Re-plan one existing entry against a new requirement.
    Modify,
    /// Delete one entry by product name.
    Remove,
    /// Pure read: compare the current choice against alternatives.
    Recompare,
    /// Parse and pipeline new items into the existing cart.
    Add,
    /// Finalize the cart.
    Checkout,
    /// No known action or no identifiable target.
    Unrecognized,
}

/// Parameters extracted alongside the action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackParams {
    /// Requirement text for a modify (e.g. "organic type").
    pub requirement: Option<String>,
    /// Raw text naming the items to add.
    pub new_items_text: Option<String>,
    /// The question behind a recompare (e.g. "why not zepto").
    pub question: Option<String>,
}

/// Classifier output: the action, its targets, and parameters.
///
/// `target_products` are drawn from the cart keys the classifier was shown,
/// never from a fixed vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackDirective {
    pub action: FeedbackActionKind,
    pub target_products: Vec<String>,
    pub parameters: FeedbackParams,
}

/// One vendor's position in a recompare, relative to the current entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorComparison {
    pub vendor: String,
    pub brand: String,
    /// Best unit price this vendor offers for the product.
    pub unit_price: f64,
    /// `unit_price - current_unit_price`; negative means cheaper than the
    /// current selection.
    pub delta: f64,
}
