//! Variant collection and ranking.
//!
//! Fans one product search out across every configured vendor concurrently,
//! each call individually wrapped by the retry executor so one vendor's
//! exhaustion never blocks the others. All per-vendor results are joined
//! before ranking; there is no partial ranking on first-arriving vendors.

use futures::future::join_all;

use crate::gateway::CatalogGateway;
use crate::model::Variant;
use crate::retry::{self, RetryPolicy};

/// Result of collecting one product across vendors.
#[derive(Debug, Clone, Default)]
pub struct CollectOutcome {
    /// Surviving variants, ranked cheapest-per-base-unit first.
    pub variants: Vec<Variant>,
    /// Vendors whose search answered (possibly with zero offerings).
    pub queried_vendors: Vec<String>,
    /// Vendors whose search failed for good, with the reason.
    pub failed_vendors: Vec<(String, String)>,
}

impl CollectOutcome {
    /// True when no vendor produced a usable variant.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Collects and ranks variants for one product.
///
/// Out-of-stock variants are dropped before ranking. An entirely failed
/// collection is returned as an empty outcome; the caller marks the plan
/// step failed without aborting sibling items.
pub async fn collect_for_product(
    catalog: &dyn CatalogGateway,
    vendors: &[String],
    retry: &RetryPolicy,
    product: &str,
) -> CollectOutcome {
    let searches = vendors.iter().map(|vendor| async move {
        let result = retry::execute(retry, || catalog.search(vendor, product)).await;
        (vendor.clone(), result)
    });
    let results = join_all(searches).await;

    let mut outcome = CollectOutcome::default();
    for (vendor, result) in results {
        match result {
            Ok(variants) => {
                let usable = variants.into_iter().filter(|v| v.in_stock);
                outcome.variants.extend(usable);
                outcome.queried_vendors.push(vendor);
            }
            Err(err) => {
                tracing::warn!(vendor = %vendor, product = %product, error = %err, "vendor search failed");
                outcome.failed_vendors.push((vendor, err.to_string()));
            }
        }
    }

    rank_variants(&mut outcome.variants);
    tracing::info!(
        product = %product,
        variants = outcome.variants.len(),
        vendors_ok = outcome.queried_vendors.len(),
        vendors_failed = outcome.failed_vendors.len(),
        "collection complete"
    );
    outcome
}

/// Ranks variants ascending by normalized unit price; ties broken by vendor
/// name so the order is reproducible.
pub fn rank_variants(variants: &mut [Variant]) {
    variants.sort_by(|a, b| {
        a.unit_price()
            .partial_cmp(&b.unit_price())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.vendor.cmp(&b.vendor))
    });
}
