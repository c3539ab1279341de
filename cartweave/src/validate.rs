//! Decision validator: deterministic gate between reasoning and the cart.
//!
//! Checks hard constraints only — it never re-ranks or overrides a judgment.
//! The first failing check short-circuits with its specific reason, which the
//! reasoning step receives as context for bounded re-reasoning.

use thiserror::Error;

use crate::model::Judgment;

/// Why a judgment was rejected. Surfaced to the router as a retryable
/// condition, not a hard failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    /// The chosen vendor was not among those actually queried for the product.
    #[error("vendor '{vendor}' was not queried for '{product}'")]
    UnknownVendor { product: String, vendor: String },

    /// The chosen variant's price is not strictly positive.
    #[error("chosen variant has non-positive price {price}")]
    NonPositivePrice { price: f64 },

    /// Confidence fell below the configured floor.
    #[error("confidence {confidence:.2} is below the floor {floor:.2}")]
    LowConfidence { confidence: f64, floor: f64 },
}

/// Deterministic judgment gate. No external calls.
#[derive(Debug, Clone)]
pub struct Validator {
    pub confidence_floor: f64,
}

impl Validator {
    pub fn new(confidence_floor: f64) -> Self {
        Self { confidence_floor }
    }

    /// Checks, in order: vendor membership, positive price, confidence floor.
    pub fn validate(&self, judgment: &Judgment, queried_vendors: &[String]) -> Result<(), Rejection> {
        if !queried_vendors.iter().any(|v| v == &judgment.vendor) {
            return Err(Rejection::UnknownVendor {
                product: judgment.product_name.clone(),
                vendor: judgment.vendor.clone(),
            });
        }
        if judgment.variant.price <= 0.0 {
            return Err(Rejection::NonPositivePrice {
                price: judgment.variant.price,
            });
        }
        if judgment.confidence < self.confidence_floor {
            return Err(Rejection::LowConfidence {
                confidence: judgment.confidence,
                floor: self.confidence_floor,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Variant;

    fn judgment(vendor: &str, price: f64, confidence: f64) -> Judgment {
        Judgment {
            product_name: "basmati_rice".to_string(),
            vendor: vendor.to_string(),
            variant: Variant {
                vendor: vendor.to_string(),
                product_name: "basmati_rice".to_string(),
                brand: "India Gate".to_string(),
                weight: 1.0,
                unit: "kg".to_string(),
                price,
                in_stock: true,
            },
            confidence,
            rationale: "premium brand".to_string(),
        }
    }

    fn queried() -> Vec<String> {
        vec!["blinkit".to_string(), "zepto".to_string()]
    }

    /// **Scenario**: A high-confidence judgment for a pricier vendor still
    /// passes — the validator gates, it does not re-rank.
    #[test]
    fn validator_is_a_gate_not_a_reranker() {
        let validator = Validator::new(0.6);
        // 330/kg vendor while 310/kg exists elsewhere; confidence 0.95.
        assert!(validator.validate(&judgment("zepto", 330.0, 0.95), &queried()).is_ok());
    }

    /// **Scenario**: A vendor never queried for the product is rejected
    /// first, before price or confidence are looked at.
    #[test]
    fn unknown_vendor_short_circuits() {
        let validator = Validator::new(0.6);
        let err = validator
            .validate(&judgment("groceryhub", -1.0, 0.0), &queried())
            .unwrap_err();
        assert!(matches!(err, Rejection::UnknownVendor { .. }));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let validator = Validator::new(0.6);
        let err = validator
            .validate(&judgment("zepto", 0.0, 0.9), &queried())
            .unwrap_err();
        assert_eq!(err, Rejection::NonPositivePrice { price: 0.0 });
    }

    #[test]
    fn confidence_below_floor_is_rejected() {
        let validator = Validator::new(0.6);
        let err = validator
            .validate(&judgment("zepto", 310.0, 0.5), &queried())
            .unwrap_err();
        assert!(matches!(err, Rejection::LowConfidence { floor, .. } if floor == 0.6));
        // Exactly at the floor passes.
        assert!(validator.validate(&judgment("zepto", 310.0, 0.6), &queried()).is_ok());
    }
}
