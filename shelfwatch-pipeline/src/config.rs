//! Serializable pipeline configuration.

use crate::source::YearWindow;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// What to do when a single region's fetch fails.
///
/// Regions are independent and a partial dataset degrades gracefully, so
/// `Skip` is the default; deployments that prefer all-or-nothing runs opt
/// into `Abort` explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure, omit the region, continue with the rest.
    Skip,
    /// Fail the whole run on the first region failure.
    Abort,
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How many years of history to request, counting back from the
    /// current year.
    pub years_back: i32,

    /// Ask the provider to compute change figures (feeds the trend view).
    pub calculations: bool,

    /// Ask the provider for annual-average pseudo-periods. Off: the
    /// normalizer treats them as malformed.
    pub annual_average: bool,

    /// Also write one object per (region, item) pair.
    pub per_item_projections: bool,

    pub on_region_failure: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            years_back: 20,
            calculations: true,
            annual_average: false,
            per_item_projections: false,
            on_region_failure: FailurePolicy::Skip,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// The inclusive year window to request, ending at `end_year`.
    pub fn year_window(&self, end_year: i32) -> YearWindow {
        YearWindow {
            start: end_year - self.years_back,
            end: end_year,
        }
    }
}
