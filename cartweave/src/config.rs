//! Orchestrator configuration: vendor list, validation thresholds, retry
//! policy. Loadable from a TOML file; missing keys fall back to defaults.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Configuration for one orchestrator instance.
///
/// A configuration value, not mutated at runtime; cloned into sessions.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Vendors the collector queries, in the order fetches are issued.
    pub vendors: Vec<String>,
    /// Minimum judgment confidence the validator accepts.
    pub confidence_floor: f64,
    /// How many times a rejected judgment may be re-reasoned before the step
    /// fails (a step therefore sees at most `max_revalidations + 1` reasoning
    /// calls).
    pub max_revalidations: usize,
    /// Retry policy applied to every external gateway call.
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            vendors: vec![
                "bigbasket".to_string(),
                "blinkit".to_string(),
                "swiggy_instamart".to_string(),
                "zepto".to_string(),
            ],
            confidence_floor: 0.6,
            max_revalidations: 2,
            retry: RetryPolicy::default(),
        }
    }
}

/// Error loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config: {0}")]
    Read(std::io::Error),
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    vendors: Option<Vec<String>>,
    confidence_floor: Option<f64>,
    max_revalidations: Option<usize>,
    retry: Option<RetryFile>,
}

#[derive(Debug, Deserialize)]
struct RetryFile {
    max_attempts: Option<usize>,
    initial_delay_ms: Option<u64>,
    multiplier: Option<f64>,
    max_delay_ms: Option<u64>,
    jitter_ms: Option<u64>,
}

impl OrchestratorConfig {
    /// Parses TOML, overlaying present keys on the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut config = Self::default();
        if let Some(vendors) = file.vendors {
            config.vendors = vendors;
        }
        if let Some(floor) = file.confidence_floor {
            config.confidence_floor = floor;
        }
        if let Some(n) = file.max_revalidations {
            config.max_revalidations = n;
        }
        if let Some(retry) = file.retry {
            if let Some(n) = retry.max_attempts {
                config.retry.max_attempts = n;
            }
            if let Some(ms) = retry.initial_delay_ms {
                config.retry.initial_delay = Duration::from_millis(ms);
            }
            if let Some(m) = retry.multiplier {
                config.retry.multiplier = m;
            }
            if let Some(ms) = retry.max_delay_ms {
                config.retry.max_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = retry.jitter_ms {
                config.retry.jitter = Some(Duration::from_millis(ms));
            }
        }
        Ok(config)
    }

    /// Loads from a TOML file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::from_toml_str(&text)
    }
}
