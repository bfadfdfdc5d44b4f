use anyhow::{Context, Result};
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::de::DeserializeOwned;
use std::env;
use std::path::{Path, PathBuf};

pub type Number = f32;

pub const DEFAULT_DIMENSIONS: usize = 4096;
pub const DEFAULT_TOP_K: usize = 5;

/// Reads `key`, treating only a missing key as `None`. Values that are
/// present but do not parse are errors naming the `VEKTA_*` variable.
fn optional<T: DeserializeOwned>(config: &Config, key: &str) -> Result<Option<T>> {
    match config.get::<T>(key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(err) => Err(err).with_context(|| {
            format!(
                "VEKTA_{} has an invalid value in config or environment",
                key.to_uppercase()
            )
        }),
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub path: PathBuf,
    pub dimensions: usize,
    pub top_k: usize,
    /// Largest squared distance the CLI still treats as an answer.
    pub max_distance: Option<Number>,
}

impl Settings {
    /// Loads settings from `vekta_config.*` and `VEKTA_*` environment variables.
    pub fn new() -> Result<Self> {
        let mut config = Config::default();
        #[allow(deprecated)]
        {
            config.merge(ConfigFile::with_name("vekta_config").required(false))?;
            config.merge(Environment::with_prefix("VEKTA"))?;
        }

        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let path: String =
            optional(config, "path")?.context("VEKTA_PATH not set in config or environment")?;
        let dimensions = optional(config, "dimensions")?.unwrap_or(DEFAULT_DIMENSIONS);
        let top_k = optional(config, "top_k")?.unwrap_or(DEFAULT_TOP_K);
        let max_distance = optional(config, "max_distance")?;

        let settings = Self {
            path: PathBuf::from(path),
            dimensions,
            top_k,
            max_distance,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_path(path: impl AsRef<Path>, dimensions: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            dimensions,
            top_k: DEFAULT_TOP_K,
            max_distance: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 || u32::try_from(self.dimensions).is_err() {
            anyhow::bail!("VEKTA_DIMENSIONS must be between 1 and {}.", u32::MAX);
        }
        if let Some(max_distance) = self.max_distance {
            if !max_distance.is_finite() || max_distance < 0.0 {
                anyhow::bail!("VEKTA_MAX_DISTANCE must be a non-negative number.");
            }
        }
        Ok(())
    }

    pub fn print_config(&self) {
        println!("path={}", self.path.display());
        println!("dimensions={}", self.dimensions);
        println!("top_k={}", self.top_k);
        match self.max_distance {
            Some(max_distance) => println!("max_distance={}", max_distance),
            None => println!("max_distance=none"),
        }
    }
}

pub fn verbose_enabled() -> bool {
    env::var("VEKTA_VERBOSE").unwrap_or_else(|_| "false".to_string()) == "true"
}
