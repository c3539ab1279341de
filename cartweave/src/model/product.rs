//! Catalog variants: one vendor's concrete offering for a product.

use serde::{Deserialize, Serialize};

/// One vendor's offering for a product. Produced by the catalog gateway;
/// read-only to the orchestration core — replaced by fresh fetches, never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub vendor: String,
    pub product_name: String,
    pub brand: String,
    /// Pack size in `unit`.
    pub weight: f64,
    pub unit: String,
    /// Price of the whole pack.
    pub price: f64,
    pub in_stock: bool,
}

impl Variant {
    /// Price per base unit (kg for weights, l for volumes, per-piece
    /// otherwise), used for deterministic ranking across pack sizes.
    ///
    /// A non-positive pack size ranks last rather than dividing by zero.
    pub fn unit_price(&self) -> f64 {
        let base_quantity = match self.unit.to_lowercase().as_str() {
            "kg" => self.weight,
            "g" => self.weight / 1000.0,
            "l" => self.weight,
            "ml" => self.weight / 1000.0,
            _ => self.weight,
        };
        if base_quantity <= 0.0 {
            f64::INFINITY
        } else {
            self.price / base_quantity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(unit: &str, weight: f64, price: f64) -> Variant {
        Variant {
            vendor: "zepto".into(),
            product_name: "basmati_rice".into(),
            brand: "Daawat".into(),
            weight,
            unit: unit.into(),
            price,
            in_stock: true,
        }
    }

    #[test]
    fn unit_price_normalizes_grams_to_kg() {
        // 500g at 160 == 320/kg
        assert_eq!(variant("g", 500.0, 160.0).unit_price(), 320.0);
        assert_eq!(variant("kg", 1.0, 320.0).unit_price(), 320.0);
    }

    #[test]
    fn unit_price_normalizes_ml_to_l() {
        assert_eq!(variant("ml", 250.0, 50.0).unit_price(), 200.0);
    }

    #[test]
    fn zero_weight_ranks_last() {
        assert!(variant("kg", 0.0, 100.0).unit_price().is_infinite());
    }
}
