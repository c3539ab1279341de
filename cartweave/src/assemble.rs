//! Cart assembly: accepted judgments become cart entries.
//!
//! The assembler is the only pipeline component that writes to the cart, and
//! it always goes through `Cart::upsert` so the uniqueness invariant and the
//! aggregate recomputation hold after every change.

use crate::model::{Cart, CartEntry, Judgment, RequestItem};

/// Number of packs of `variant` needed to cover the requested amount.
///
/// Quantities are compared on a common base (kg for weights, l for volumes);
/// when the requested unit and the pack unit have different bases the
/// requested quantity is taken as a pack count.
pub fn packs_needed(requested: &RequestItem, judgment: &Judgment) -> f64 {
    let requested_base = to_base(requested.quantity, &requested.unit);
    let pack_base = to_base(judgment.variant.weight, &judgment.variant.unit);
    match (requested_base, pack_base) {
        (Some((req, req_basis)), Some((pack, pack_basis)))
            if req_basis == pack_basis && pack > 0.0 =>
        {
            (req / pack).ceil().max(1.0)
        }
        _ => requested.quantity.max(1.0),
    }
}

fn to_base(quantity: f64, unit: &str) -> Option<(f64, &'static str)> {
    match unit.to_lowercase().as_str() {
        "kg" => Some((quantity, "kg")),
        "g" => Some((quantity / 1000.0, "kg")),
        "l" => Some((quantity, "l")),
        "ml" => Some((quantity / 1000.0, "l")),
        _ => None,
    }
}

/// Builds the cart entry for an accepted judgment.
pub fn entry_from_judgment(judgment: &Judgment, requested: &RequestItem) -> CartEntry {
    let quantity = packs_needed(requested, judgment);
    CartEntry {
        product_name: judgment.product_name.clone(),
        brand: judgment.variant.brand.clone(),
        vendor: judgment.vendor.clone(),
        unit_price: judgment.variant.price,
        quantity,
        unit: format!("{}{}", judgment.variant.weight, judgment.variant.unit),
        line_total: 0.0,
        rationale: judgment.rationale.clone(),
    }
}

/// Upserts the entry for an accepted judgment and recomputes aggregates.
pub fn assemble_into_cart(cart: &mut Cart, judgment: &Judgment, requested: &RequestItem) {
    let entry = entry_from_judgment(judgment, requested);
    tracing::info!(
        product = %entry.product_name,
        vendor = %entry.vendor,
        quantity = entry.quantity,
        "assembling cart entry"
    );
    cart.upsert(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Variant;

    fn judgment(weight: f64, unit: &str, price: f64) -> Judgment {
        Judgment {
            product_name: "basmati_rice".to_string(),
            vendor: "zepto".to_string(),
            variant: Variant {
                vendor: "zepto".to_string(),
                product_name: "basmati_rice".to_string(),
                brand: "Daawat".to_string(),
                weight,
                unit: unit.to_string(),
                price,
                in_stock: true,
            },
            confidence: 0.9,
            rationale: "cheapest per kg".to_string(),
        }
    }

    #[test]
    fn packs_cover_requested_quantity() {
        let requested = RequestItem::new("basmati rice", 5.0, "kg");
        assert_eq!(packs_needed(&requested, &judgment(1.0, "kg", 310.0)), 5.0);
        // 500g packs for 5kg: 10 packs.
        assert_eq!(packs_needed(&requested, &judgment(500.0, "g", 160.0)), 10.0);
        // 2kg packs for 5kg: round up to 3.
        assert_eq!(packs_needed(&requested, &judgment(2.0, "kg", 600.0)), 3.0);
    }

    #[test]
    fn incompatible_bases_fall_back_to_pack_count() {
        let requested = RequestItem::new("eggs", 12.0, "pieces");
        assert_eq!(packs_needed(&requested, &judgment(1.0, "kg", 80.0)), 12.0);
    }

    /// **Scenario**: Assembling twice for the same product replaces the entry
    /// and the totals follow the recomputation invariant.
    #[test]
    fn assembly_replaces_and_recomputes() {
        let mut cart = Cart::new();
        let requested = RequestItem::new("basmati rice", 5.0, "kg");

        assemble_into_cart(&mut cart, &judgment(1.0, "kg", 310.0), &requested);
        assert_eq!(cart.total_price, 1550.0);

        assemble_into_cart(&mut cart, &judgment(1.0, "kg", 330.0), &requested);
        assert_eq!(cart.entries.len(), 1);
        assert_eq!(cart.total_price, 1650.0);
        assert_eq!(cart.item_count, 5.0);
        cart.check_invariant().unwrap();
    }
}
