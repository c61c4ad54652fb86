//! Standardization with parameters exported from a fitted scikit-learn `StandardScaler`.

use super::{narrow, Transform};
use crate::error::ArtifactError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    mean: Option<Vec<f64>>,
    scale: Option<Vec<f64>>,
    n_features_in: Option<usize>,
}

/// `y = (x - mean) / scale`
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// `mean` and `scale` must have equal length. Zero or non-finite scales act as 1.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, String> {
        if mean.len() != scale.len() {
            return Err(format!(
                "mean has {} entries, scale has {}",
                mean.len(),
                scale.len()
            ));
        }
        if mean.iter().any(|m| !m.is_finite()) {
            return Err("mean contains non-finite values".to_string());
        }
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s })
            .collect();
        Ok(Self { mean, scale })
    }

    pub fn from_file(path: &Path) -> Result<Self, ArtifactError> {
        let data = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: ScalerArtifact =
            serde_json::from_str(&data).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let n = artifact
            .n_features_in
            .or(artifact.mean.as_ref().map(Vec::len))
            .or(artifact.scale.as_ref().map(Vec::len))
            .ok_or_else(|| ArtifactError::invalid(path, "scaler declares no dimensionality"))?;

        // with_mean=False / with_std=False exports leave the field null.
        let mean = artifact.mean.unwrap_or_else(|| vec![0.0; n]);
        let scale = artifact.scale.unwrap_or_else(|| vec![1.0; n]);
        if mean.len() != n || scale.len() != n {
            return Err(ArtifactError::invalid(
                path,
                format!(
                    "n_features_in is {n} but mean/scale have {}/{} entries",
                    mean.len(),
                    scale.len()
                ),
            ));
        }
        Self::new(mean, scale).map_err(|reason| ArtifactError::invalid(path, reason))
    }
}

impl Transform for StandardScaler {
    fn name(&self) -> &str {
        "scaler"
    }

    fn input_dim(&self) -> usize {
        self.mean.len()
    }

    fn output_dim(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, input: &[f32]) -> Vec<f32> {
        input
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&m, &s))| narrow((x as f64 - m) / s))
            .collect()
    }
}
