use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::inference::preprocess::ModelFamily;

pub const CONFIG_ENV: &str = "OSTEOSCAN_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/server.yaml";

/// Weight each model gets in the ensemble unless the config says otherwise.
pub const DEFAULT_ENSEMBLE_WEIGHT: f32 = 0.33;

/// Per-model records every prediction reports, before the ensemble record.
pub const DEFAULT_REPORT_WIDTH: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("No models configured")]
    NoModels,
    #[error("Expected {expected} ensemble weights, found {found}")]
    WeightCount { expected: usize, found: usize },
    #[error("Ensemble weights must be finite, non-negative and sum above zero")]
    InvalidWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_image_size")]
    pub image_size: [u32; 2],
    pub models: Vec<ModelConfig>,
    #[serde(default)]
    pub ensemble_weights: Option<Vec<f32>>,
    /// Deployments with fewer models repeat the first model's record up to
    /// this many entries.
    #[serde(default = "default_report_width")]
    pub report_width: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub path: PathBuf,
    pub family: ModelFamily,
    /// Set when the exported graph ends in logits rather than a softmax layer.
    #[serde(default)]
    pub softmax: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("src/upload")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("frontend/dist")
}

fn default_image_size() -> [u32; 2] {
    [512, 512]
}

fn default_report_width() -> usize {
    DEFAULT_REPORT_WIDTH
}

impl ServerConfig {
    /// Reads the YAML file named by `OSTEOSCAN_CONFIG` (or the default path),
    /// then applies `HOST`, `PORT`, `UPLOAD_DIR` and `STATIC_DIR` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = serde_yaml::from_str(config_str)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = env::var("HOST") {
            self.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            self.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "PORT",
                value: port.clone(),
            })?;
        }
        if let Ok(dir) = env::var("UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("STATIC_DIR") {
            self.static_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::NoModels);
        }
        let weights = self.ensemble_weights();
        if weights.len() != self.models.len() {
            return Err(ConfigError::WeightCount {
                expected: self.models.len(),
                found: weights.len(),
            });
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f32>() <= 0.0
        {
            return Err(ConfigError::InvalidWeights);
        }
        Ok(())
    }

    pub fn ensemble_weights(&self) -> Vec<f32> {
        self.ensemble_weights
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_ENSEMBLE_WEIGHT; self.models.len()])
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
