//! Cart: uniqueness-constrained line items with recomputed aggregates.
//!
//! `recompute_totals` is the single source of truth for the aggregate fields;
//! no caller adjusts totals incrementally. Entry order is insertion order so
//! user-facing summaries are stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accepted line item. Mutated only through `Cart` methods and the
/// feedback mutator; never by the router or the gateways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Unique key within a cart.
    pub product_name: String,
    pub brand: String,
    pub vendor: String,
    /// Price of one pack.
    pub unit_price: f64,
    /// Number of packs.
    pub quantity: f64,
    /// Pack size description (e.g. "1kg").
    pub unit: String,
    /// `unit_price * quantity`; recomputed, never set directly.
    pub line_total: f64,
    /// Why this variant was chosen.
    pub rationale: String,
}

/// Mutable collection of accepted line items plus recomputed aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    /// Ordered; at most one entry per product name.
    pub entries: Vec<CartEntry>,
    /// Always `Σ entry.line_total` after any mutation completes.
    pub total_price: f64,
    /// Always `Σ entry.quantity` after any mutation completes.
    pub item_count: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for `product`, if present.
    pub fn entry(&self, product: &str) -> Option<&CartEntry> {
        self.entries.iter().find(|e| e.product_name == product)
    }

    /// Product names in entry order (the real keys feedback matches against).
    pub fn product_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.product_name.clone()).collect()
    }

    /// Inserts or replaces the entry for its product name, then recomputes.
    ///
    /// A second entry for an already-present product replaces it; duplicates
    /// never exist.
    pub fn upsert(&mut self, entry: CartEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.product_name == entry.product_name)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.recompute_totals();
    }

    /// Removes the entry for `product`. Returns the removed entry, or None
    /// when absent (callers surface that as an item-not-found outcome, not a
    /// silent no-op).
    pub fn remove(&mut self, product: &str) -> Option<CartEntry> {
        let pos = self.entries.iter().position(|e| e.product_name == product)?;
        let removed = self.entries.remove(pos);
        self.recompute_totals();
        Some(removed)
    }

    /// Recomputes line totals and aggregates from scratch.
    pub fn recompute_totals(&mut self) {
        for entry in &mut self.entries {
            entry.line_total = entry.unit_price * entry.quantity;
        }
        self.total_price = self.entries.iter().map(|e| e.line_total).sum();
        self.item_count = self.entries.iter().map(|e| e.quantity).sum();
        self.last_updated = Some(Utc::now());
    }

    /// Checks the aggregate invariant. Divergence is fatal to the session.
    pub fn check_invariant(&self) -> Result<(), String> {
        let expected_total: f64 = self
            .entries
            .iter()
            .map(|e| e.unit_price * e.quantity)
            .sum();
        let expected_count: f64 = self.entries.iter().map(|e| e.quantity).sum();
        if (self.total_price - expected_total).abs() > 1e-9 {
            return Err(format!(
                "cart total {} diverged from entry sum {}",
                self.total_price, expected_total
            ));
        }
        if (self.item_count - expected_count).abs() > 1e-9 {
            return Err(format!(
                "cart count {} diverged from quantity sum {}",
                self.item_count, expected_count
            ));
        }
        Ok(())
    }

    /// Finalized, immutable order snapshot for checkout.
    pub fn to_order_summary(&self) -> OrderSummary {
        OrderSummary {
            lines: self
                .entries
                .iter()
                .map(|e| OrderLine {
                    product_name: e.product_name.clone(),
                    brand: e.brand.clone(),
                    vendor: e.vendor.clone(),
                    quantity: e.quantity,
                    unit: e.unit.clone(),
                    line_total: e.line_total,
                })
                .collect(),
            total_price: self.total_price,
            item_count: self.item_count,
            placed_at: Utc::now(),
        }
    }
}

/// One line of a finalized order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_name: String,
    pub brand: String,
    pub vendor: String,
    pub quantity: f64,
    pub unit: String,
    pub line_total: f64,
}

/// Immutable snapshot of the cart produced at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub lines: Vec<OrderLine>,
    pub total_price: f64,
    pub item_count: f64,
    pub placed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(product: &str, unit_price: f64, quantity: f64) -> CartEntry {
        CartEntry {
            product_name: product.to_string(),
            brand: "Brand".to_string(),
            vendor: "zepto".to_string(),
            unit_price,
            quantity,
            unit: "1kg".to_string(),
            line_total: 0.0,
            rationale: "cheapest per kg".to_string(),
        }
    }

    /// **Scenario**: After any sequence of upserts and removals, the aggregate
    /// total equals the sum of line totals and the count equals the quantity sum.
    #[test]
    fn aggregates_track_entry_sums() {
        let mut cart = Cart::new();
        cart.upsert(entry("basmati_rice", 310.0, 5.0));
        cart.upsert(entry("fabric_conditioner", 220.0, 1.0));
        assert_eq!(cart.total_price, 310.0 * 5.0 + 220.0);
        assert_eq!(cart.item_count, 6.0);

        cart.remove("basmati_rice");
        assert_eq!(cart.total_price, 220.0);
        assert_eq!(cart.item_count, 1.0);
        cart.check_invariant().unwrap();
    }

    /// **Scenario**: Repeated upserts of the same product replace the entry;
    /// a cart never holds two entries with one name.
    #[test]
    fn upsert_replaces_instead_of_duplicating() {
        let mut cart = Cart::new();
        cart.upsert(entry("basmati_rice", 310.0, 5.0));
        cart.upsert(entry("basmati_rice", 330.0, 5.0));
        assert_eq!(cart.entries.len(), 1);
        assert_eq!(cart.entries[0].unit_price, 330.0);
        assert_eq!(cart.total_price, 1650.0);
    }

    /// **Scenario**: Removing an absent product returns None and leaves the
    /// cart unchanged.
    #[test]
    fn remove_absent_product_is_reported() {
        let mut cart = Cart::new();
        cart.upsert(entry("basmati_rice", 310.0, 5.0));
        assert!(cart.remove("basmati_rice").is_some());
        let before = cart.clone();
        assert!(cart.remove("basmati_rice").is_none());
        assert_eq!(cart.entries.len(), before.entries.len());
        assert_eq!(cart.total_price, before.total_price);
    }

    #[test]
    fn invariant_detects_divergence() {
        let mut cart = Cart::new();
        cart.upsert(entry("basmati_rice", 310.0, 5.0));
        cart.total_price += 1.0;
        assert!(cart.check_invariant().is_err());
    }

    #[test]
    fn order_summary_snapshots_lines_and_totals() {
        let mut cart = Cart::new();
        cart.upsert(entry("basmati_rice", 310.0, 5.0));
        let order = cart.to_order_summary();
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.total_price, 1550.0);
        assert_eq!(order.item_count, 5.0);
    }
}
