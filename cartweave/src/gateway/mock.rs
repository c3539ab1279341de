//! Mock gateways for tests and the CLI demo.
//!
//! `MockCatalog` serves canned variants per (vendor, product) and can be
//! scripted to fail transiently or permanently per vendor. `MockReasoning`
//! picks deterministically from the ranked variants and classifies feedback
//! with fixed rules, so sessions are fully reproducible offline.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{
    normalize_name, FeedbackActionKind, FeedbackDirective, FeedbackParams, Judgment, RequestItem,
    Variant,
};

use super::{CatalogGateway, GatewayError, ReasoningGateway};

/// Canned catalog: variants per (vendor, product) plus scriptable failures.
///
/// Builder-style setup; failure scripts are consumed one per call so a vendor
/// can fail twice then succeed, matching retry-executor tests.
#[derive(Default)]
pub struct MockCatalog {
    variants: HashMap<(String, String), Vec<Variant>>,
    /// Queued failures per vendor, popped before serving variants.
    failures: Mutex<HashMap<String, VecDeque<GatewayError>>>,
    /// Vendors that fail permanently on every call.
    dead_vendors: Vec<String>,
    calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one offering (builder).
    pub fn with_offer(
        mut self,
        vendor: &str,
        product: &str,
        brand: &str,
        weight: f64,
        unit: &str,
        price: f64,
    ) -> Self {
        let product = normalize_name(product);
        self.variants
            .entry((vendor.to_string(), product.clone()))
            .or_default()
            .push(Variant {
                vendor: vendor.to_string(),
                product_name: product,
                brand: brand.to_string(),
                weight,
                unit: unit.to_string(),
                price,
                in_stock: true,
            });
        self
    }

    /// Adds a fully specified variant (builder).
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants
            .entry((variant.vendor.clone(), variant.product_name.clone()))
            .or_default()
            .push(variant);
        self
    }

    /// Queues `count` transient failures for `vendor` (builder).
    pub fn with_transient_failures(self, vendor: &str, count: usize) -> Self {
        {
            let mut failures = self.failures.lock().unwrap();
            let queue = failures.entry(vendor.to_string()).or_default();
            for _ in 0..count {
                queue.push_back(GatewayError::transient(format!("{vendor}: timeout")));
            }
        }
        self
    }

    /// Makes every call to `vendor` fail permanently (builder).
    pub fn with_dead_vendor(mut self, vendor: &str) -> Self {
        self.dead_vendors.push(vendor.to_string());
        self
    }

    /// Total search calls issued so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogGateway for MockCatalog {
    async fn search(
        &self,
        vendor: &str,
        product_name: &str,
    ) -> Result<Vec<Variant>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.dead_vendors.iter().any(|v| v == vendor) {
            return Err(GatewayError::permanent(format!("{vendor}: unknown vendor")));
        }
        if let Some(err) = self
            .failures
            .lock()
            .unwrap()
            .get_mut(vendor)
            .and_then(|q| q.pop_front())
        {
            return Err(err);
        }
        Ok(self
            .variants
            .get(&(vendor.to_string(), normalize_name(product_name)))
            .cloned()
            .unwrap_or_default())
    }
}

/// Deterministic reasoning mock.
///
/// `reason` returns the first (top-ranked) variant with a fixed confidence,
/// unless a scripted judgment is queued for the product. `classify_feedback`
/// applies fixed keyword rules over the actual cart keys; `parse_request`
/// splits on commas with a quantity/unit prefix.
pub struct MockReasoning {
    confidence: f64,
    /// Scripted judgments per product, consumed first.
    scripted: Mutex<HashMap<String, VecDeque<Judgment>>>,
    calls: AtomicUsize,
}

impl Default for MockReasoning {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReasoning {
    pub fn new() -> Self {
        Self {
            confidence: 0.9,
            scripted: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fixed confidence for default judgments (builder).
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Queues a judgment returned verbatim for the product's next reasoning
    /// call (builder). Later calls fall back to the default choice, so a
    /// rejected judgment can be followed by an acceptable one.
    pub fn with_scripted_judgment(self, product: &str, judgment: Judgment) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .entry(normalize_name(product))
            .or_default()
            .push_back(judgment);
        self
    }

    /// Total reasoning calls issued so far.
    pub fn reason_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

static QUANTITY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(kg|g|l|ml|pieces|pcs)?\s+(.+)$").expect("valid regex")
});

#[async_trait]
impl ReasoningGateway for MockReasoning {
    async fn reason(
        &self,
        product_name: &str,
        variants: &[Variant],
        requirement: Option<&str>,
    ) -> Result<Judgment, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let product = normalize_name(product_name);
        if let Some(judgment) = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&product)
            .and_then(|q| q.pop_front())
        {
            return Ok(judgment);
        }
        let chosen = variants
            .first()
            .ok_or_else(|| GatewayError::permanent(format!("no variants for {product}")))?;
        let rationale = match requirement {
            Some(req) => format!(
                "{} from {} best matches '{}' at {:.2} per unit",
                chosen.brand,
                chosen.vendor,
                req,
                chosen.unit_price()
            ),
            None => format!(
                "{} from {} is cheapest at {:.2} per unit",
                chosen.brand,
                chosen.vendor,
                chosen.unit_price()
            ),
        };
        Ok(Judgment {
            product_name: product,
            vendor: chosen.vendor.clone(),
            variant: chosen.clone(),
            confidence: self.confidence,
            rationale,
        })
    }

    async fn classify_feedback(
        &self,
        text: &str,
        cart_products: &[String],
    ) -> Result<FeedbackDirective, GatewayError> {
        let lower = text.to_lowercase();
        let targets: Vec<String> = cart_products
            .iter()
            .filter(|p| lower.contains(&p.replace('_', " ")) || lower.contains(p.as_str()))
            .cloned()
            .collect();

        let action = if ["checkout", "confirm", "proceed"]
            .iter()
            .any(|w| lower.contains(w))
        {
            FeedbackActionKind::Checkout
        } else if lower.contains("remove") || lower.contains("delete") || lower.contains("drop ") {
            FeedbackActionKind::Remove
        } else if lower.starts_with("add") || lower.contains(" add ") {
            FeedbackActionKind::Add
        } else if lower.contains("why not") || lower.contains("compare") || lower.contains("cheaper")
        {
            FeedbackActionKind::Recompare
        } else if !targets.is_empty() {
            FeedbackActionKind::Modify
        } else {
            FeedbackActionKind::Unrecognized
        };

        let new_items_text = lower
            .split_once("add")
            .map(|(_, rest)| rest.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(FeedbackDirective {
            action,
            target_products: targets,
            parameters: FeedbackParams {
                requirement: Some(text.to_string()),
                new_items_text,
                question: Some(text.to_string()),
            },
        })
    }

    async fn parse_request(&self, text: &str) -> Result<Vec<RequestItem>, GatewayError> {
        let mut items = Vec::new();
        for part in text.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Some(caps) = QUANTITY_PREFIX.captures(part) {
                let quantity: f64 = caps[1].parse().unwrap_or(1.0);
                let unit = caps
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "pieces".to_string());
                items.push(RequestItem::new(&caps[3], quantity, unit));
            } else {
                items.push(RequestItem::new(part, 1.0, "pieces"));
            }
        }
        if items.is_empty() {
            return Err(GatewayError::permanent("no items recognized"));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Scripted transient failures are consumed before canned
    /// variants are served.
    #[tokio::test]
    async fn catalog_failures_are_consumed_in_order() {
        let catalog = MockCatalog::new()
            .with_offer("zepto", "basmati rice", "Daawat", 1.0, "kg", 310.0)
            .with_transient_failures("zepto", 1);
        assert!(catalog.search("zepto", "basmati rice").await.is_err());
        let variants = catalog.search("zepto", "basmati rice").await.unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(catalog.call_count(), 2);
    }

    /// **Scenario**: A dead vendor fails permanently on every call.
    #[tokio::test]
    async fn dead_vendor_is_permanent() {
        let catalog = MockCatalog::new().with_dead_vendor("blinkit");
        let err = catalog.search("blinkit", "sugar").await.unwrap_err();
        assert_eq!(err.kind, crate::gateway::FailureKind::Permanent);
    }

    /// **Scenario**: Default reasoning picks the first (top-ranked) variant.
    #[tokio::test]
    async fn reasoning_picks_top_ranked_by_default() {
        let reasoning = MockReasoning::new();
        let variants = vec![
            Variant {
                vendor: "zepto".into(),
                product_name: "basmati_rice".into(),
                brand: "Daawat".into(),
                weight: 1.0,
                unit: "kg".into(),
                price: 310.0,
                in_stock: true,
            },
            Variant {
                vendor: "blinkit".into(),
                product_name: "basmati_rice".into(),
                brand: "India Gate".into(),
                weight: 1.0,
                unit: "kg".into(),
                price: 320.0,
                in_stock: true,
            },
        ];
        let judgment = reasoning
            .reason("basmati_rice", &variants, None)
            .await
            .unwrap();
        assert_eq!(judgment.vendor, "zepto");
        assert_eq!(judgment.confidence, 0.9);
    }

    /// **Scenario**: Feedback naming a cart product with "remove" classifies
    /// as Remove targeting only that product.
    #[tokio::test]
    async fn classify_remove_targets_named_product() {
        let reasoning = MockReasoning::new();
        let cart = vec!["basmati_rice".to_string(), "fabric_conditioner".to_string()];
        let directive = reasoning
            .classify_feedback("remove basmati rice", &cart)
            .await
            .unwrap();
        assert_eq!(directive.action, FeedbackActionKind::Remove);
        assert_eq!(directive.target_products, vec!["basmati_rice".to_string()]);
    }

    /// **Scenario**: "1kg sugar, 500 g tea" parses into two items with units.
    #[tokio::test]
    async fn parse_request_splits_quantity_and_name() {
        let reasoning = MockReasoning::new();
        let items = reasoning.parse_request("1kg sugar, 500 g tea").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "sugar");
        assert_eq!(items[0].quantity, 1.0);
        assert_eq!(items[0].unit, "kg");
        assert_eq!(items[1].name, "tea");
        assert_eq!(items[1].quantity, 500.0);
        assert_eq!(items[1].unit, "g");
    }
}
