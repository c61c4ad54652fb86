//! Preprocessing chain: sanitize → fitted transforms (scaler, optional PCA).

mod pca;
mod scaler;

pub use pca::Pca;
pub use scaler::StandardScaler;

use crate::error::ShapeMismatchError;
use crate::features::FeatureVector;

/// Replacement for +inf entries
pub const POS_INF_CEILING: f32 = 1e10;
/// Replacement for -inf entries
pub const NEG_INF_FLOOR: f32 = -1e10;

/// A vector with only finite entries. Only [`sanitize`] creates one.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedVector(Vec<f32>);

impl SanitizedVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

/// NaN → 0, +inf → [`POS_INF_CEILING`], -inf → [`NEG_INF_FLOOR`].
pub fn sanitize(vector: FeatureVector) -> SanitizedVector {
    let values = vector
        .values
        .into_iter()
        .map(|v| {
            if v.is_nan() {
                0.0
            } else if v == f32::INFINITY {
                POS_INF_CEILING
            } else if v == f32::NEG_INFINITY {
                NEG_INF_FLOOR
            } else {
                v
            }
        })
        .collect();
    SanitizedVector(values)
}

/// Narrow a step output back to `f32`, keeping it inside the sanitized range.
pub(crate) fn narrow(v: f64) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(NEG_INF_FLOOR as f64, POS_INF_CEILING as f64) as f32
    }
}

/// A fitted, immutable vector-to-vector transform.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;
    fn input_dim(&self) -> usize;
    fn output_dim(&self) -> usize;

    /// Caller guarantees `input.len() == self.input_dim()`. Output entries are finite.
    fn transform(&self, input: &[f32]) -> Vec<f32>;
}

/// Ordered fitted transforms, fixed at load time.
pub struct TransformChain {
    steps: Vec<Box<dyn Transform>>,
}

impl std::fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|s| (s.name(), s.input_dim(), s.output_dim())))
            .finish()
    }
}

impl TransformChain {
    /// Build a chain; adjacent steps must agree on dimensionality.
    pub fn new(steps: Vec<Box<dyn Transform>>) -> Result<Self, ShapeMismatchError> {
        for pair in steps.windows(2) {
            if pair[0].output_dim() != pair[1].input_dim() {
                return Err(ShapeMismatchError::new(
                    pair[1].name(),
                    pair[1].input_dim(),
                    pair[0].output_dim(),
                ));
            }
        }
        Ok(Self { steps })
    }

    /// Chain with no steps; vectors pass through unchanged.
    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Expected input length, or `None` for an empty chain.
    pub fn input_dim(&self) -> Option<usize> {
        self.steps.first().map(|s| s.input_dim())
    }

    /// Output length for a given input length.
    pub fn output_dim(&self, input_dim: usize) -> usize {
        self.steps.last().map(|s| s.output_dim()).unwrap_or(input_dim)
    }

    /// Check a declared extractor length against the chain at load time.
    pub fn validate_input_dim(&self, dim: usize) -> Result<(), ShapeMismatchError> {
        match self.steps.first() {
            Some(first) if first.input_dim() != dim => {
                Err(ShapeMismatchError::new(first.name(), first.input_dim(), dim))
            }
            _ => Ok(()),
        }
    }

    /// Run every step in order. Never pads or truncates.
    pub fn apply(&self, vector: &SanitizedVector) -> Result<Vec<f32>, ShapeMismatchError> {
        let mut current = vector.as_slice().to_vec();
        for step in &self.steps {
            if current.len() != step.input_dim() {
                return Err(ShapeMismatchError::new(
                    step.name(),
                    step.input_dim(),
                    current.len(),
                ));
            }
            current = step.transform(&current);
        }
        Ok(current)
    }
}
