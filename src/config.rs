//! Scanner configuration. One JSON file shared by the server and the evaluation tool.

use crate::error::ConfigError;
use crate::features::FeatureVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Where to look for classifier/scaler/PCA artifacts
    pub model: ModelConfig,
    /// Decision threshold
    pub decision: DecisionConfig,
    /// External feature extractor
    pub extractor: ExtractorConfig,
    /// HTTP boundary
    pub server: ServerConfig,
    /// Batch evaluation
    pub harness: HarnessConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base directories searched in order. Empty means the built-in search order.
    pub search_dirs: Vec<PathBuf>,
    /// Pin one artifact generation; otherwise ember2024 is tried before ember2018.
    pub generation: Option<FeatureVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Probability strictly above this is labelled malicious (0.0–1.0)
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Program that reads file bytes on stdin and prints the feature vector
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Feature version the program emits
    pub version: FeatureVersion,
    /// Wall-clock limit per extraction (seconds); the program is killed past it
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Upload size limit for POST /predict
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Full URL of the predict endpoint
    pub endpoint: String,
    /// Maximum submissions in flight
    pub workers: usize,
    /// Per-submission timeout (seconds)
    pub timeout_secs: u64,
    pub malware_dir: PathBuf,
    pub benign_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            version: FeatureVersion::Ember2024,
            timeout_secs: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/predict".to_string(),
            workers: 4,
            timeout_secs: 60,
            malware_dir: PathBuf::from("malware_samples"),
            benign_dir: PathBuf::from("benign_samples"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl ScannerConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config path from `MALSCAN_CONFIG_PATH`, falling back to `malscan.json`.
    pub fn default_path() -> PathBuf {
        std::env::var("MALSCAN_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("malscan.json"))
    }

    /// Apply `MALSCAN_*` environment overrides on top of the file values.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MALSCAN_THRESHOLD") {
            self.decision.threshold = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                field: "MALSCAN_THRESHOLD",
                reason: format!("not a number: {raw:?}"),
            })?;
        }
        if let Some(dir) = lookup("MALSCAN_MODEL_DIR") {
            self.model.search_dirs = vec![PathBuf::from(dir)];
        }
        if let Some(bind) = lookup("MALSCAN_BIND") {
            self.server.bind = bind;
        }
        if let Some(cmd) = lookup("MALSCAN_EXTRACTOR") {
            self.extractor.command = Some(cmd);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.decision.threshold;
        if !t.is_finite() || !(0.0..=1.0).contains(&t) {
            return Err(ConfigError::Invalid {
                field: "decision.threshold",
                reason: format!("{t} is outside [0, 1]"),
            });
        }
        if self.harness.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "harness.workers",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.extractor.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "extractor.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.harness.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "harness.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
