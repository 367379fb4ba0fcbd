//! TOML configuration for travel times, rest rules and constraint weights.
//!
//! Every field has a default, so an empty document is a valid configuration.
//!
//! # Examples
//!
//! ```
//! use planning_core::config::PlanningConfig;
//!
//! let config = PlanningConfig::from_toml_str(r#"
//!     random_seed = 7
//!
//!     [routing]
//!     average_speed_kmph = 40.0
//!
//!     [constraint_weights]
//!     "minimizeTravelTime" = 2
//! "#).unwrap();
//!
//! assert_eq!(config.routing.average_speed_kmph, 40.0);
//! assert_eq!(config.scheduling.min_rest_minutes, 600);
//! assert_eq!(config.constraint_weights["minimizeTravelTime"], 2);
//! ```
//!
//! Use defaults when the file is missing:
//!
//! ```
//! use planning_core::config::PlanningConfig;
//!
//! let config = PlanningConfig::load("planning.toml").unwrap_or_default();
//! assert!(config.validate().is_ok());
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Average driving speed in km/h for travel time estimation.
pub const DEFAULT_AVERAGE_SPEED_KMPH: f64 = 50.0;

/// Minimum rest between two shifts of one employee (10 hours).
pub const DEFAULT_MIN_REST_MINUTES: i64 = 600;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PlanningConfig {
    /// Seed for generated benchmark instances.
    #[serde(default)]
    pub random_seed: Option<u64>,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub scheduling: SchedulingConfig,

    /// Weight overrides keyed by constraint name.
    #[serde(default)]
    pub constraint_weights: HashMap<String, i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RoutingConfig {
    #[serde(default = "default_average_speed")]
    pub average_speed_kmph: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            average_speed_kmph: DEFAULT_AVERAGE_SPEED_KMPH,
        }
    }
}

fn default_average_speed() -> f64 {
    DEFAULT_AVERAGE_SPEED_KMPH
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulingConfig {
    #[serde(default = "default_min_rest")]
    pub min_rest_minutes: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            min_rest_minutes: DEFAULT_MIN_REST_MINUTES,
        }
    }
}

fn default_min_rest() -> i64 {
    DEFAULT_MIN_REST_MINUTES
}

impl PlanningConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let speed = self.routing.average_speed_kmph;
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "routing.average_speed_kmph must be positive, got {}",
                speed
            )));
        }
        if self.scheduling.min_rest_minutes < 0 {
            return Err(ConfigError::Invalid(format!(
                "scheduling.min_rest_minutes must not be negative, got {}",
                self.scheduling.min_rest_minutes
            )));
        }
        if let Some((name, weight)) = self.constraint_weights.iter().find(|(_, weight)| **weight < 0) {
            return Err(ConfigError::Invalid(format!(
                "constraint weight for '{}' must not be negative, got {}",
                name, weight
            )));
        }
        Ok(())
    }

    pub fn with_average_speed(mut self, kmph: f64) -> Self {
        self.routing.average_speed_kmph = kmph;
        self
    }

    pub fn with_min_rest_minutes(mut self, minutes: i64) -> Self {
        self.scheduling.min_rest_minutes = minutes;
        self
    }

    pub fn with_constraint_weight(mut self, name: impl Into<String>, weight: i64) -> Self {
        self.constraint_weights.insert(name.into(), weight);
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
}
