//! Shared fixtures: tiny XGBoost dumps, identity scalers, scripted extractors.

#![allow(dead_code)]

use malscan::artifacts::LoadedModel;
use malscan::error::ExtractionError;
use malscan::features::{FeatureExtractor, FeatureVector, FeatureVersion};
use malscan::model::XgbForest;
use malscan::transform::{StandardScaler, Transform, TransformChain};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One tree: `f0 < 0.5` goes to leaf -1.0, otherwise leaf 2.0.
/// With base_score 0.5 the logistic margin is exactly the leaf value.
pub fn forest_json(num_feature: usize, objective: &str) -> String {
    format!(
        r#"{{
  "learner": {{
    "learner_model_param": {{ "base_score": "5E-1", "num_class": "0", "num_feature": "{num_feature}" }},
    "gradient_booster": {{
      "name": "gbtree",
      "model": {{
        "trees": [{{
          "left_children": [1, -1, -1],
          "right_children": [2, -1, -1],
          "split_indices": [0, 0, 0],
          "split_conditions": [0.5, -1.0, 2.0],
          "default_left": [1, 0, 0],
          "split_type": [0, 0, 0]
        }}]
      }}
    }},
    "objective": {{ "name": "{objective}" }}
  }}
}}"#
    )
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Scaler artifact that leaves values unchanged.
pub fn identity_scaler_json(n: usize) -> String {
    format!(r#"{{ "mean": null, "scale": null, "n_features_in": {n} }}"#)
}

pub fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), contents).unwrap();
}

/// Complete ember2024 artifact set in `dir`.
pub fn write_ember2024_set(dir: &Path) {
    let dim = FeatureVersion::Ember2024.dim();
    write(dir, "model_ember2024.json", &forest_json(dim, "binary:logistic"));
    write(dir, "scaler_ember2024.json", &identity_scaler_json(dim));
}

/// Complete ember2018 artifact set in `dir` (no PCA).
pub fn write_ember2018_set(dir: &Path) {
    let dim = FeatureVersion::Ember2018.dim();
    write(dir, "malware_model.json", &forest_json(dim, "binary:logistic"));
    write(dir, "malware_scaler.json", &identity_scaler_json(dim));
}

/// Loaded model with an identity scaler and the fixture forest.
pub fn loaded_model(version: FeatureVersion, objective: &str) -> LoadedModel {
    let dim = version.dim();
    let scaler = StandardScaler::new(vec![0.0; dim], vec![1.0; dim]).unwrap();
    let chain = TransformChain::new(vec![Box::new(scaler) as Box<dyn Transform>]).unwrap();
    let forest = XgbForest::from_json(&forest_json(dim, objective)).unwrap();
    LoadedModel::new(version, chain, Box::new(forest)).unwrap()
}

/// Vector of the right length with `f0` set.
pub fn vector_with_f0(version: FeatureVersion, f0: f32) -> Vec<f32> {
    let mut v = vec![0.0; version.dim()];
    v[0] = f0;
    v
}

/// Returns a fixed vector (or error) and counts calls.
pub struct ScriptedExtractor {
    pub version: FeatureVersion,
    pub output: Result<Vec<f32>, String>,
    pub calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn returning(version: FeatureVersion, values: Vec<f32>) -> Self {
        Self {
            version,
            output: Ok(values),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(version: FeatureVersion, reason: &str) -> Self {
        Self {
            version,
            output: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FeatureExtractor for ScriptedExtractor {
    fn version(&self) -> FeatureVersion {
        self.version
    }

    fn extract(&self, _bytes: &[u8]) -> Result<FeatureVector, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.output {
            Ok(values) => Ok(FeatureVector::new(values.clone())),
            Err(reason) => Err(ExtractionError::Rejected(reason.clone())),
        }
    }
}

/// Decides by the first byte: 0x01 gives a malicious vector, anything else benign.
pub struct ByteExtractor {
    pub version: FeatureVersion,
}

impl FeatureExtractor for ByteExtractor {
    fn version(&self) -> FeatureVersion {
        self.version
    }

    fn extract(&self, bytes: &[u8]) -> Result<FeatureVector, ExtractionError> {
        let f0 = if bytes.first() == Some(&0x01) { 1.0 } else { 0.0 };
        Ok(FeatureVector::new(vector_with_f0(self.version, f0)))
    }
}
