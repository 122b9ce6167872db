//! Harness configuration.
//!
//! Layering, lowest to highest priority: built-in defaults, `stdprop.toml`,
//! `STDPROP_*` environment variables, command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::diagnostics::ConfigError;

pub const CONFIG_FILE: &str = "stdprop.toml";
pub const ENV_SEED: &str = "STDPROP_SEED";
pub const ENV_EXAMPLES: &str = "STDPROP_EXAMPLES";
pub const ENV_TIMEOUT: &str = "STDPROP_TIMEOUT";

/// Relative weight of boundary values versus uniform values when drawing
/// integers and repeat counts in random mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasConfig {
    pub boundary_weight: u32,
    pub uniform_weight: u32,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self { boundary_weight: 1, uniform_weight: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Valid (non-rejected) examples per property.
    pub max_examples: usize,
    /// Wall-clock budget per property, in seconds.
    pub timeout_secs: f64,
    pub workers: usize,
    pub seed: Option<u64>,
    pub size_budget: usize,
    pub max_draws: usize,
    pub max_shrink_attempts: usize,
    /// Rejections allowed per requested example before giving up.
    pub max_rejection_ratio: usize,
    /// Failure database directory. `None` keeps failures in memory only.
    pub database: Option<PathBuf>,
    pub bias: BiasConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get().min(8))
            .unwrap_or(1);
        Self {
            max_examples: 100,
            timeout_secs: 30.0,
            workers,
            seed: None,
            size_budget: 160,
            max_draws: 4096,
            max_shrink_attempts: 2000,
            max_rejection_ratio: 10,
            database: Some(PathBuf::from(".stdprop/failures")),
            bias: BiasConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load from an explicit path, or from `stdprop.toml` in the current
    /// directory when it exists, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let contents = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_SEED) {
            self.seed = Some(parse_env(ENV_SEED, &value)?);
        }
        if let Some(value) = lookup(ENV_EXAMPLES) {
            self.max_examples = parse_env(ENV_EXAMPLES, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT) {
            self.timeout_secs = parse_env(ENV_TIMEOUT, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_examples == 0 {
            return Err(ConfigError::Invalid("max_examples must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if !(self.timeout_secs.is_finite() && self.timeout_secs > 0.0) {
            return Err(ConfigError::Invalid("timeout_secs must be a positive number".into()));
        }
        if Duration::try_from_secs_f64(self.timeout_secs).is_err() {
            return Err(ConfigError::Invalid("timeout_secs is too large".into()));
        }
        if self.max_draws == 0 {
            return Err(ConfigError::Invalid("max_draws must be at least 1".into()));
        }
        if self.bias.boundary_weight == 0 && self.bias.uniform_weight == 0 {
            return Err(ConfigError::Invalid(
                "bias weights cannot both be zero".into(),
            ));
        }
        Ok(())
    }

    /// Saturates at `Duration::MAX` for settings that skipped `validate`.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::MAX)
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_string(),
        value: value.to_string(),
    })
}
