//! Engine configuration.
//!
//! [`EngineConfig`] gathers every tunable the engine reads. It deserializes
//! from JSON with per-field defaults, so a config file only needs to name the
//! values it overrides.
//!
//! # Examples
//!
//! ```
//! use halberd::config::EngineConfig;
//!
//! let config: EngineConfig = serde_json::from_str(r#"{"parallelism": 2}"#).unwrap();
//! assert_eq!(config.parallelism, 2);
//! assert!(config.range_zero_is_open);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HalberdError, Result};

/// Upper bound on the default evaluation fan-out.
pub const DEFAULT_MAX_PARALLELISM: usize = 8;

/// Configuration shared by every search a [`crate::search::SearchEngine`] runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads used to evaluate documents concurrently.
    pub parallelism: usize,

    /// Documents pulled from a loader iterator per parallel evaluation round.
    pub batch_size: usize,

    /// Maximum nesting depth of subqueries.
    pub max_subquery_depth: usize,

    /// Treat a range bucket bound of `to == 0` as an open upper bound.
    pub range_zero_is_open: bool,

    /// Compiled templates kept by the engine's template cache.
    pub template_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            parallelism: num_cpus::get().clamp(1, DEFAULT_MAX_PARALLELISM),
            batch_size: 256,
            max_subquery_depth: 4,
            range_zero_is_open: true,
            template_cache_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Override the evaluation fan-out.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(HalberdError::configuration(
                "parallelism must be greater than zero",
            ));
        }
        if self.batch_size == 0 {
            return Err(HalberdError::configuration(
                "batch_size must be greater than zero",
            ));
        }
        Ok(())
    }
}
