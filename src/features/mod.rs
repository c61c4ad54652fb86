//! Feature vectors and the extractor contract.
//!
//! The extractor itself is opaque: this crate only pins what it promises
//! (a [`FeatureVersion`] and therefore an exact vector length) and consumes
//! its output.

mod command;

pub use command::CommandExtractor;

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};

/// EMBER feature-set generation. Each generation has its own artifact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureVersion {
    /// EMBER 2018 (feature version 2): scaler, PCA, classifier
    Ember2018,
    /// EMBER 2024 (feature version 3): scaler, classifier
    Ember2024,
}

impl FeatureVersion {
    /// Length of every vector this generation produces.
    pub const fn dim(self) -> usize {
        match self {
            FeatureVersion::Ember2018 => 2381,
            FeatureVersion::Ember2024 => 2568,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            FeatureVersion::Ember2018 => "ember2018",
            FeatureVersion::Ember2024 => "ember2024",
        }
    }
}

impl std::fmt::Display for FeatureVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw extractor output. Entries may be NaN or infinite until sanitized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn has_non_finite(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// Turns raw file bytes into a fixed-length feature vector.
///
/// Implementations must be deterministic and safe to call from many threads.
pub trait FeatureExtractor: Send + Sync {
    /// Feature generation this extractor emits.
    fn version(&self) -> FeatureVersion;

    /// Declared output length.
    fn dim(&self) -> usize {
        self.version().dim()
    }

    fn extract(&self, bytes: &[u8]) -> Result<FeatureVector, ExtractionError>;
}
