//! Linear projection exported from a fitted scikit-learn `PCA`.

use super::{narrow, Transform};
use crate::error::ArtifactError;
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PcaArtifact {
    components: Vec<Vec<f64>>,
    mean: Vec<f64>,
    #[serde(default)]
    whiten: bool,
    #[serde(default)]
    explained_variance: Option<Vec<f64>>,
}

/// `y = components · (x - mean)`, optionally whitened.
#[derive(Debug, Clone)]
pub struct Pca {
    /// n_components × n_features
    components: Array2<f64>,
    mean: Array1<f64>,
    /// Per-component divisor; all ones unless whitening
    divisor: Array1<f64>,
}

impl Pca {
    pub fn new(
        components: Array2<f64>,
        mean: Array1<f64>,
        whiten_variance: Option<Array1<f64>>,
    ) -> Result<Self, String> {
        let (n_components, n_features) = components.dim();
        if n_components == 0 || n_features == 0 {
            return Err("empty component matrix".to_string());
        }
        if mean.len() != n_features {
            return Err(format!(
                "mean has {} entries, components have {} columns",
                mean.len(),
                n_features
            ));
        }
        let divisor = match whiten_variance {
            Some(var) => {
                if var.len() != n_components {
                    return Err(format!(
                        "explained_variance has {} entries, expected {}",
                        var.len(),
                        n_components
                    ));
                }
                var.mapv(|v| if v > 0.0 { v.sqrt() } else { 1.0 })
            }
            None => Array1::ones(n_components),
        };
        Ok(Self {
            components,
            mean,
            divisor,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ArtifactError> {
        let data = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: PcaArtifact =
            serde_json::from_str(&data).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let rows = artifact.components.len();
        let cols = artifact.components.first().map(Vec::len).unwrap_or(0);
        if artifact.components.iter().any(|r| r.len() != cols) {
            return Err(ArtifactError::invalid(path, "ragged component matrix"));
        }
        let flat: Vec<f64> = artifact.components.into_iter().flatten().collect();
        let components = Array2::from_shape_vec((rows, cols), flat)
            .map_err(|e| ArtifactError::invalid(path, e.to_string()))?;

        let whiten = if artifact.whiten {
            let var = artifact.explained_variance.ok_or_else(|| {
                ArtifactError::invalid(path, "whiten is set but explained_variance is missing")
            })?;
            Some(Array1::from(var))
        } else {
            None
        };

        Self::new(components, Array1::from(artifact.mean), whiten)
            .map_err(|reason| ArtifactError::invalid(path, reason))
    }
}

impl Transform for Pca {
    fn name(&self) -> &str {
        "pca"
    }

    fn input_dim(&self) -> usize {
        self.components.ncols()
    }

    fn output_dim(&self) -> usize {
        self.components.nrows()
    }

    fn transform(&self, input: &[f32]) -> Vec<f32> {
        let x: Array1<f64> = input.iter().map(|&v| v as f64).collect();
        let centered = x - &self.mean;
        let projected = self.components.dot(&centered) / &self.divisor;
        projected.iter().map(|&v| narrow(v)).collect()
    }
}
