//! malscan: static PE malware classification service and evaluation harness.
//!
//! Modular structure:
//! - [`features`]: Feature extractor contract and the external-command extractor
//! - [`transform`]: Sanitizing, scaling and dimensionality reduction
//! - [`model`]: XGBoost and ONNX classifiers
//! - [`decision`]: Threshold policy
//! - [`artifacts`]: Artifact discovery and startup loading
//! - [`pipeline`]: Per-request stage machine with degraded labels
//! - [`server`]: HTTP boundary
//! - [`harness`]: Batch evaluation against a running server
//! - [`logging`]: Structured JSON logging

pub mod artifacts;
pub mod config;
pub mod decision;
pub mod error;
pub mod features;
pub mod harness;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod transform;

pub use artifacts::{load_model, LoadedModel};
pub use config::ScannerConfig;
pub use decision::{DecisionPolicy, Verdict};
pub use features::{FeatureExtractor, FeatureVector, FeatureVersion};
pub use harness::{AggregateMetrics, EvaluationRecord, Harness};
pub use logging::StructuredLogger;
pub use pipeline::{ClassificationResult, InferencePipeline, Label};
