//! Boundary-facing classification result.

use crate::decision::Verdict;
use crate::error::Stage;
use serde::{Serialize, Serializer};

/// Label returned at the boundary: a verdict or a degraded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Malicious,
    Benign,
    ModelNotLoaded,
    ExtractorUnavailable,
    ExtractionError,
    TransformError,
    ScoringError,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Malicious => "malicious",
            Label::Benign => "benign",
            Label::ModelNotLoaded => "model not loaded",
            Label::ExtractorUnavailable => "feature extractor not available",
            Label::ExtractionError => "extraction error",
            Label::TransformError => "transform error",
            Label::ScoringError => "scoring error",
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Label::Malicious => Some(Verdict::Malicious),
            Label::Benign => Some(Verdict::Benign),
            _ => None,
        }
    }

    pub fn for_failed_stage(stage: Stage) -> Self {
        match stage {
            Stage::Extracting => Label::ExtractionError,
            Stage::Transforming => Label::TransformError,
            Stage::Scoring => Label::ScoringError,
        }
    }
}

impl From<Verdict> for Label {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Malicious => Label::Malicious,
            Verdict::Benign => Label::Benign,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub label: Label,
    /// Malicious-class score in [0, 1]; 0.0 for degraded results
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn degraded(label: Label) -> Self {
        Self {
            label,
            confidence: 0.0,
        }
    }

    pub fn is_verdict(&self) -> bool {
        self.label.verdict().is_some()
    }
}
