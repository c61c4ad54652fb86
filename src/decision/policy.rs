//! Combines the classifier score with the configured threshold; produces the verdict.

use crate::config::DecisionConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Malicious,
    Benign,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Malicious => "malicious",
            Verdict::Benign => "benign",
        }
    }

    /// Parse a boundary label; anything other than the two verdicts is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "malicious" => Some(Verdict::Malicious),
            "benign" => Some(Verdict::Benign),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `malicious` iff probability > threshold.
///
/// Lowering the threshold (0.35 instead of 0.5, say) trades precision for recall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    threshold: f32,
}

impl DecisionPolicy {
    pub fn new(threshold: f32) -> Result<Self, ConfigError> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                field: "decision.threshold",
                reason: format!("{threshold} is outside [0, 1]"),
            });
        }
        Ok(Self { threshold })
    }

    pub fn from_config(config: &DecisionConfig) -> Result<Self, ConfigError> {
        Self::new(config.threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn decide(&self, probability: f32) -> Verdict {
        if probability > self.threshold {
            Verdict::Malicious
        } else {
            Verdict::Benign
        }
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}
