//! Shared fixtures: a stocked mock catalog and a session config with fast
//! retries, so integration tests run without real delays.

use std::time::Duration;

use cartweave::{MockCatalog, OrchestratorConfig, RetryPolicy};

/// Vendors used across the integration tests.
pub fn vendors() -> Vec<String> {
    vec![
        "bigbasket".to_string(),
        "blinkit".to_string(),
        "swiggy_instamart".to_string(),
        "zepto".to_string(),
    ]
}

/// Config with millisecond retries and the default validation thresholds.
pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        vendors: vendors(),
        retry: RetryPolicy::new(3, Duration::from_millis(1), 2.0),
        ..OrchestratorConfig::default()
    }
}

/// Catalog with a basmati-rice price spread (310/320/330/315 per kg basis)
/// plus fabric conditioner and sugar.
pub fn stocked_catalog() -> MockCatalog {
    MockCatalog::new()
        .with_offer("bigbasket", "basmati rice", "Daawat", 1.0, "kg", 310.0)
        .with_offer("blinkit", "basmati rice", "India Gate", 1.0, "kg", 320.0)
        .with_offer("zepto", "basmati rice", "Fortune", 1.0, "kg", 330.0)
        .with_offer("swiggy_instamart", "basmati rice", "Daawat", 1.0, "kg", 315.0)
        .with_offer("zepto", "fabric conditioner", "Comfort", 1.0, "l", 220.0)
        .with_offer("blinkit", "fabric conditioner", "Softouch", 1.0, "l", 240.0)
        .with_offer("zepto", "sugar", "Madhur", 1.0, "kg", 45.0)
        .with_offer("bigbasket", "sugar", "Fresho", 1.0, "kg", 44.0)
}
