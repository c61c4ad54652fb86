//! Inference pipeline: extract → sanitize → transform → score → decide.
//!
//! Every request ends in a decision. Stage failures come back as
//! [`PipelineError`] values and are translated into degraded labels only in
//! [`InferencePipeline::classify`].

mod result;

pub use result::{ClassificationResult, Label};

use crate::artifacts::LoadedModel;
use crate::decision::{DecisionPolicy, Verdict};
use crate::error::{ModelUnavailableError, PipelineError};
use crate::features::{FeatureExtractor, FeatureVersion};
use crate::model::Score;
use crate::transform::sanitize;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Terminal state of one request.
#[derive(Debug)]
pub enum Decision {
    Decided { verdict: Verdict, score: Score },
    Failed(PipelineError),
    ModelNotLoaded,
    ExtractorUnavailable,
}

impl Decision {
    pub fn result(&self) -> ClassificationResult {
        match self {
            Decision::Decided { verdict, score } => ClassificationResult {
                label: (*verdict).into(),
                confidence: score.value(),
            },
            Decision::Failed(e) => {
                ClassificationResult::degraded(Label::for_failed_stage(e.stage()))
            }
            Decision::ModelNotLoaded => ClassificationResult::degraded(Label::ModelNotLoaded),
            Decision::ExtractorUnavailable => {
                ClassificationResult::degraded(Label::ExtractorUnavailable)
            }
        }
    }
}

/// Snapshot for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub model_loaded: bool,
    pub extractor_available: bool,
    pub model_version: Option<FeatureVersion>,
    pub threshold: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_error: Option<String>,
}

pub struct InferencePipeline {
    model: Option<Arc<LoadedModel>>,
    extractor: Option<Arc<dyn FeatureExtractor>>,
    policy: DecisionPolicy,
    model_error: Option<String>,
}

impl InferencePipeline {
    /// Capture the startup load result. A model whose input length disagrees
    /// with the extractor's declared output is refused, so the pipeline
    /// answers "model not loaded" instead of scoring misaligned vectors.
    pub fn new(
        model: Result<LoadedModel, ModelUnavailableError>,
        extractor: Option<Arc<dyn FeatureExtractor>>,
        policy: DecisionPolicy,
    ) -> Self {
        let (model, model_error) = match model {
            Ok(m) => match check_extractor(&m, extractor.as_deref()) {
                Ok(()) => (Some(Arc::new(m)), None),
                Err(reason) => {
                    error!(reason = %reason, "model refused");
                    (None, Some(reason))
                }
            },
            Err(e) => {
                warn!(error = %e, "model not loaded; every request will be answered as such");
                (None, Some(e.to_string()))
            }
        };
        Self {
            model,
            extractor,
            policy,
            model_error,
        }
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_error(&self) -> Option<&str> {
        self.model_error.as_deref()
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            model_loaded: self.model.is_some(),
            extractor_available: self.extractor.is_some(),
            model_version: self.model.as_ref().map(|m| m.generation()),
            threshold: self.policy.threshold(),
            model_error: self.model_error.clone(),
        }
    }

    /// Classify and translate any failure into a degraded result.
    pub fn classify(&self, bytes: &[u8]) -> ClassificationResult {
        let decision = self.classify_detailed(bytes);
        match &decision {
            Decision::Failed(e) => {
                warn!(stage = %e.stage(), error = %e, "classification degraded")
            }
            Decision::Decided { verdict, score } => {
                debug!(
                    verdict = %verdict,
                    score = score.value(),
                    calibrated = score.is_probability(),
                    "classified"
                )
            }
            Decision::ModelNotLoaded | Decision::ExtractorUnavailable => {}
        }
        decision.result()
    }

    /// Run the stage machine and return its terminal state.
    pub fn classify_detailed(&self, bytes: &[u8]) -> Decision {
        // Short-circuit before any extraction work.
        let Some(model) = self.model.as_deref() else {
            return Decision::ModelNotLoaded;
        };
        let Some(extractor) = self.extractor.as_deref() else {
            return Decision::ExtractorUnavailable;
        };
        match self.run_stages(model, extractor, bytes) {
            Ok(score) => Decision::Decided {
                verdict: self.policy.decide(score.value()),
                score,
            },
            Err(e) => Decision::Failed(e),
        }
    }

    fn run_stages(
        &self,
        model: &LoadedModel,
        extractor: &dyn FeatureExtractor,
        bytes: &[u8],
    ) -> Result<Score, PipelineError> {
        let raw = extractor.extract(bytes)?;
        let clean = sanitize(raw);
        let transformed = model.chain().apply(&clean)?;
        Ok(model.classifier().score(&transformed)?)
    }
}

fn check_extractor(
    model: &LoadedModel,
    extractor: Option<&dyn FeatureExtractor>,
) -> Result<(), String> {
    let Some(extractor) = extractor else {
        return Ok(());
    };
    if extractor.version() != model.generation() {
        return Err(format!(
            "extractor emits {} features but the artifacts are {}",
            extractor.version(),
            model.generation()
        ));
    }
    model
        .chain()
        .validate_input_dim(extractor.dim())
        .map_err(|e| format!("extractor declares {} features: {e}", extractor.dim()))?;
    if let Some(n) = model.classifier().num_features() {
        let out = model.chain().output_dim(extractor.dim());
        if n != out {
            return Err(format!("classifier expects {n} features, chain produces {out}"));
        }
    }
    Ok(())
}
