//! ONNX Runtime inference for exported classifiers. Input: [1, feature_dim] f32.
//! Outputs: a label tensor and, when the exporter produced one, a probabilities tensor.
//! Graphs whose probabilities are a ZipMap sequence fall back to the label output.

use super::Classifier;
use crate::error::{ArtifactError, ScoringError};
use ndarray::Array2;
use ort::session::Session;
use ort::value::{Tensor, ValueType};
use std::path::Path;
use std::sync::Mutex;

pub struct OnnxClassifier {
    /// ONNX Runtime needs exclusive access per run
    session: Mutex<Session>,
    probability_output: Option<String>,
    label_output: Option<String>,
    feature_dim: usize,
}

impl OnnxClassifier {
    /// Load model from path. The feature dimension comes from the transform chain.
    pub fn load(path: &Path, feature_dim: usize) -> Result<Self, ArtifactError> {
        let session = Session::builder()
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| ArtifactError::invalid(path, format!("onnx session: {e}")))?;

        let probability_output = session
            .outputs
            .iter()
            .find(|o| {
                o.name.to_ascii_lowercase().contains("prob")
                    && matches!(o.output_type, ValueType::Tensor { .. })
            })
            .map(|o| o.name.clone());
        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.to_ascii_lowercase().contains("label"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone());

        if probability_output.is_none() && label_output.is_none() {
            return Err(ArtifactError::invalid(path, "onnx graph has no outputs"));
        }
        tracing::info!(
            path = %path.display(),
            probability = probability_output.is_some(),
            "onnx classifier loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            probability_output,
            label_output,
            feature_dim,
        })
    }

    /// Run the session and copy one named output out as f32 values.
    fn run_output(&self, features: &[f32], output: &str) -> Result<Vec<f32>, ScoringError> {
        if features.len() != self.feature_dim {
            return Err(ScoringError::InputLength {
                expected: self.feature_dim,
                actual: features.len(),
            });
        }
        let arr = Array2::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| ScoringError::Runtime(e.to_string()))?;
        let input = Tensor::from_array(arr).map_err(|e| ScoringError::Runtime(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ScoringError::Runtime("session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| ScoringError::Runtime(e.to_string()))?;
        let value = outputs
            .get(output)
            .ok_or_else(|| ScoringError::Runtime(format!("missing output {output}")))?;

        if let Ok((_, data)) = value.try_extract_tensor::<f32>() {
            return Ok(data.to_vec());
        }
        let (_, data) = value
            .try_extract_tensor::<i64>()
            .map_err(|e| ScoringError::Runtime(e.to_string()))?;
        Ok(data.iter().map(|&v| v as f32).collect())
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn num_features(&self) -> Option<usize> {
        Some(self.feature_dim)
    }

    fn supports_probability(&self) -> bool {
        self.probability_output.is_some()
    }

    fn predict_proba(&self, features: &[f32]) -> Result<f32, ScoringError> {
        let Some(ref name) = self.probability_output else {
            return Err(ScoringError::Unsupported("graph has no probability tensor"));
        };
        let probs = self.run_output(features, name)?;
        // [p_benign, p_malicious] or a single malicious probability
        match probs.as_slice() {
            [_, p] => Ok(*p),
            [p] => Ok(*p),
            other => Err(ScoringError::Runtime(format!(
                "expected 1 or 2 probabilities, got {}",
                other.len()
            ))),
        }
    }

    fn predict_label(&self, features: &[f32]) -> Result<bool, ScoringError> {
        let Some(ref name) = self.label_output else {
            return Err(ScoringError::Unsupported("graph has no label output"));
        };
        let labels = self.run_output(features, name)?;
        labels
            .first()
            .map(|&l| l > 0.5)
            .ok_or_else(|| ScoringError::Runtime("empty label output".to_string()))
    }
}
