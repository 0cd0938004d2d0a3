//! Step configuration
//!
//! Loaded from an optional YAML file; the CLI layers flag and environment
//! overrides on top before the job starts.

use rankstep_core::{
    AggregateOptions, MissingRankPolicy, ViolationPolicy, DEFAULT_DAMPING_FACTOR,
    DEFAULT_SHARE_TOLERANCE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Config file is not valid YAML for [`StepConfig`]
    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Damping factor outside [0, 1]
    #[error("Damping factor must be within [0, 1], got {0}")]
    DampingOutOfRange(f64),

    /// Share tolerance negative or not finite
    #[error("Share tolerance must be a non-negative number, got {0}")]
    InvalidTolerance(f64),

    /// Worker pool of size zero
    #[error("Thread count must be at least 1")]
    ZeroThreads,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for one iteration step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepConfig {
    /// Damping factor (beta); `1 - beta` of each page's rank is redistributed
    pub damping_factor: f64,
    /// Handling of sources with edges but no prior rank
    pub missing_rank: MissingRankPolicy,
    /// Handling of groups that break a numeric invariant
    pub on_violation: ViolationPolicy,
    /// Allowed distance of a source's share sum from 1.0
    pub share_tolerance: f64,
    /// Worker threads for aggregation (None = rayon default)
    pub threads: Option<usize>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            damping_factor: DEFAULT_DAMPING_FACTOR,
            missing_rank: MissingRankPolicy::Zero,
            on_violation: ViolationPolicy::PassThrough,
            share_tolerance: DEFAULT_SHARE_TOLERANCE,
            threads: None,
        }
    }
}

impl StepConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: StepConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a YAML config file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.damping_factor) {
            return Err(ConfigError::DampingOutOfRange(self.damping_factor));
        }
        if !(self.share_tolerance.is_finite() && self.share_tolerance >= 0.0) {
            return Err(ConfigError::InvalidTolerance(self.share_tolerance));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(())
    }

    /// Options handed to every aggregation call
    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            damping_factor: self.damping_factor,
            missing_rank: self.missing_rank,
            on_violation: self.on_violation,
            share_tolerance: self.share_tolerance,
        }
    }
}
