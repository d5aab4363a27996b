//! Session configuration
//!
//! Settings come from an optional JSON file, then environment variables:
//! - `HUSH_MODEL_TYPE` - model variant (`small_fast`, `small_slow`, `large_fast`)
//! - `HUSH_MODEL_DIR` - directory holding model weight files
//! - `HUSH_CHUNK_MILLIS` - chunk length fed to the session, in milliseconds

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DenoiseError, Result};
use crate::neural::ModelType;
use crate::session::MINIMUM_CHUNK_MILLIS;

pub const ENV_MODEL_TYPE: &str = "HUSH_MODEL_TYPE";
pub const ENV_MODEL_DIR: &str = "HUSH_MODEL_DIR";
pub const ENV_CHUNK_MILLIS: &str = "HUSH_CHUNK_MILLIS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    /// Model variant loaded when the session starts
    pub model_type: ModelType,

    /// Where model weight files live, if not bundled
    pub model_dir: Option<PathBuf>,

    /// Extension of model weight files
    pub model_extension: String,

    /// Length of each chunk handed to the session
    pub chunk_millis: u64,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::default(),
            model_dir: None,
            model_extension: "pt".to_string(),
            chunk_millis: MINIMUM_CHUNK_MILLIS,
        }
    }
}

impl DenoiseConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overlaid with a config file when given, then the environment
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        base.with_env()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Apply `HUSH_*` environment overrides
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup(ENV_MODEL_TYPE) {
            self.model_type = value.parse().map_err(|_| DenoiseError::Config {
                reason: format!("{} has unknown model type '{}'", ENV_MODEL_TYPE, value),
            })?;
        }

        if let Some(value) = lookup(ENV_MODEL_DIR) {
            self.model_dir = Some(PathBuf::from(value));
        }

        if let Some(value) = lookup(ENV_CHUNK_MILLIS) {
            self.chunk_millis = value.trim().parse().map_err(|_| DenoiseError::Config {
                reason: format!(
                    "{} must be a whole number of milliseconds, got '{}'",
                    ENV_CHUNK_MILLIS, value
                ),
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_millis == 0 {
            return Err(DenoiseError::Config {
                reason: "chunk_millis must be greater than 0".to_string(),
            });
        }
        if self.model_extension.trim_start_matches('.').is_empty() {
            return Err(DenoiseError::Config {
                reason: "model_extension must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
