//! Classifiers scoring a transformed feature vector.
//!
//! - [`XgbForest`]: native evaluation of an XGBoost JSON model dump
//! - [`OnnxClassifier`]: ONNX Runtime session for exported classifiers

mod onnx;
mod xgboost;

pub use onnx::OnnxClassifier;
pub use xgboost::{LoadError, Objective, XgbForest};

use crate::error::{ArtifactError, ScoringError};
use serde::Serialize;
use std::path::Path;

/// Classifier output for the malicious class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Score {
    /// Calibrated probability in [0, 1]
    Probability(f32),
    /// Predicted class coerced to 0.0 or 1.0; the model has no probability output
    HardLabel(f32),
}

impl Score {
    pub fn value(&self) -> f32 {
        match *self {
            Score::Probability(p) | Score::HardLabel(p) => p,
        }
    }

    pub fn is_probability(&self) -> bool {
        matches!(self, Score::Probability(_))
    }
}

pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Input length the model was fitted on, if the artifact declares it.
    fn num_features(&self) -> Option<usize>;

    fn supports_probability(&self) -> bool;

    /// Probability of the malicious class.
    fn predict_proba(&self, features: &[f32]) -> Result<f32, ScoringError>;

    /// Predicted class: `true` for malicious.
    fn predict_label(&self, features: &[f32]) -> Result<bool, ScoringError>;

    /// Probability when the model supports it, otherwise the hard label as 0.0/1.0.
    fn score(&self, features: &[f32]) -> Result<Score, ScoringError> {
        if self.supports_probability() {
            let p = self.predict_proba(features)?;
            if !p.is_finite() {
                return Err(ScoringError::NonFinite);
            }
            Ok(Score::Probability(p.clamp(0.0, 1.0)))
        } else {
            let malicious = self.predict_label(features)?;
            Ok(Score::HardLabel(if malicious { 1.0 } else { 0.0 }))
        }
    }
}

/// Load a classifier artifact, choosing the backend by file extension.
pub fn load_classifier(
    path: &Path,
    expected_features: usize,
) -> Result<Box<dyn Classifier>, ArtifactError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Box::new(XgbForest::from_file(path)?)),
        Some("onnx") => Ok(Box::new(OnnxClassifier::load(path, expected_features)?)),
        _ => Err(ArtifactError::invalid(
            path,
            "unsupported classifier format (expected .json or .onnx)",
        )),
    }
}
