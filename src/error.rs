//! Error taxonomy for the scanner: per-stage pipeline failures, artifact and
//! model loading failures, harness submission failures, configuration.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Feature extraction failed; the input could not be turned into a vector.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to run feature extractor: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("feature extractor rejected input: {0}")]
    Rejected(String),

    #[error("unparseable extractor output: {0}")]
    Output(String),

    #[error("feature extractor did not finish within {0:?}")]
    Timeout(Duration),
}

/// A vector length disagrees with what a fitted step expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage}: expected {expected} features, got {actual}")]
pub struct ShapeMismatchError {
    pub stage: String,
    pub expected: usize,
    pub actual: usize,
}

impl ShapeMismatchError {
    pub fn new(stage: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self {
            stage: stage.into(),
            expected,
            actual,
        }
    }
}

/// The classifier call failed.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("classifier expects {expected} features, got {actual}")]
    InputLength { expected: usize, actual: usize },

    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("onnx runtime: {0}")]
    Runtime(String),

    #[error("classifier produced a non-finite score")]
    NonFinite,
}

/// One artifact file could not be read or understood.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

impl ArtifactError {
    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Required model artifacts are missing or unusable. Raised once at startup.
#[derive(Debug, Error)]
pub enum ModelUnavailableError {
    #[error("no complete artifact set found; searched {}", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("incompatible artifacts: {0}")]
    Incompatible(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stage in which a classification request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Transforming,
    Scoring,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extracting => "extraction",
            Stage::Transforming => "transform",
            Stage::Scoring => "scoring",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request failure, tagged by stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatchError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Extraction(_) => Stage::Extracting,
            PipelineError::ShapeMismatch(_) => Stage::Transforming,
            PipelineError::Scoring(_) => Stage::Scoring,
        }
    }
}

/// A single harness submission failed. Recorded, never propagated.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("submission task failed: {0}")]
    Aborted(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
