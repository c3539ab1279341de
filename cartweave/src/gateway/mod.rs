//! External capability interfaces: catalog search and reasoning.
//!
//! Both gateways are opaque to the orchestration core — it relies only on
//! their declared output shapes and on every failure carrying a
//! transient/permanent classification. Real transports (HTTP catalogs, LLM
//! backends) live outside this crate; `mock` provides in-crate
//! implementations for tests and the CLI demo.

mod mock;

pub use mock::{MockCatalog, MockReasoning};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{FeedbackDirective, Judgment, RequestItem, Variant};

/// Whether a failed call is worth retrying.
///
/// A first-class decision made at the failure site, not inferred from an
/// error's type: timeouts, resets and 5xx-equivalents are transient;
/// malformed input, 4xx-equivalents and validation failures are permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Permanent,
}

/// Failure of a gateway call, carrying its retry classification.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: FailureKind,
    pub message: String,
}

impl GatewayError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            message: message.into(),
        }
    }
}

/// Vendor product catalog.
///
/// One call searches one vendor; the variant collector fans out across the
/// configured vendor list and wraps each call in the retry executor
/// individually, so one vendor's exhaustion never blocks the others.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Searches `vendor` for `product_name`. An empty result is a successful
    /// "no offerings", not a failure.
    async fn search(&self, vendor: &str, product_name: &str)
        -> Result<Vec<Variant>, GatewayError>;
}

/// Opaque reasoning capability.
///
/// Given structured input, returns a structured judgment with a confidence
/// score. The core never interprets reasoning content, only its shape.
#[async_trait]
pub trait ReasoningGateway: Send + Sync {
    /// Chooses a variant for `product_name` from `variants`.
    ///
    /// `requirement` carries extra context: the requester's modify text, or
    /// a validator rejection reason on re-reasoning.
    async fn reason(
        &self,
        product_name: &str,
        variants: &[Variant],
        requirement: Option<&str>,
    ) -> Result<Judgment, GatewayError>;

    /// Maps one feedback utterance onto the closed action set, given the
    /// product names actually in the cart.
    async fn classify_feedback(
        &self,
        text: &str,
        cart_products: &[String],
    ) -> Result<FeedbackDirective, GatewayError>;

    /// Parses free text into an ordered set of request items.
    async fn parse_request(&self, text: &str) -> Result<Vec<RequestItem>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Constructors set the classification and Display shows
    /// the message.
    #[test]
    fn gateway_error_classification() {
        let t = GatewayError::transient("timeout");
        let p = GatewayError::permanent("bad request");
        assert_eq!(t.kind, FailureKind::Transient);
        assert_eq!(p.kind, FailureKind::Permanent);
        assert_eq!(t.to_string(), "timeout");
    }
}
