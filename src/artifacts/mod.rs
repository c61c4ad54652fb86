//! Model artifact discovery and loading.
//!
//! Loading is an explicit startup step producing an immutable [`LoadedModel`].
//! Each feature generation has its own artifact names; a classifier and a
//! scaler must sit in the same directory so versions are never mixed.

use crate::config::ModelConfig;
use crate::error::{ModelUnavailableError, ShapeMismatchError};
use crate::features::FeatureVersion;
use crate::model::{load_classifier, Classifier};
use crate::transform::{Pca, StandardScaler, Transform, TransformChain};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File names tried in order inside one directory.
struct ArtifactNames {
    classifier: &'static [&'static str],
    scaler: &'static [&'static str],
    reducer: &'static [&'static str],
}

fn artifact_names(generation: FeatureVersion) -> ArtifactNames {
    match generation {
        FeatureVersion::Ember2024 => ArtifactNames {
            classifier: &[
                "model_ember2024_latest.json",
                "model_ember2024.json",
                "model.json",
                "model_ember2024.onnx",
                "model.onnx",
            ],
            scaler: &[
                "scaler_ember2024_latest.json",
                "scaler_ember2024.json",
                "scaler.json",
            ],
            reducer: &[],
        },
        FeatureVersion::Ember2018 => ArtifactNames {
            classifier: &[
                "malware_model.json",
                "model_ember2018.json",
                "malware_model.onnx",
            ],
            scaler: &["malware_scaler.json", "scaler_ember2018.json"],
            reducer: &["malware_pca.json", "pca_ember2018.json"],
        },
    }
}

/// One generation's artifacts, all from the same directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub generation: FeatureVersion,
    pub dir: PathBuf,
    pub classifier: PathBuf,
    pub scaler: PathBuf,
    pub reducer: Option<PathBuf>,
}

/// Built-in base directories, in search order.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut out = vec![PathBuf::from("models")];
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    {
        out.push(exe_dir.join("models"));
    }
    out.push(PathBuf::from("xgboost_model_results"));
    if let Some(data) = dirs::data_dir() {
        out.push(data.join("malscan").join("models"));
    }
    out
}

/// Each base directory, then its per-generation subdirectory.
pub fn candidate_dirs(bases: &[PathBuf], generation: FeatureVersion) -> Vec<PathBuf> {
    bases
        .iter()
        .flat_map(|base| [base.clone(), base.join(generation.as_str())])
        .collect()
}

fn first_existing(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|n| dir.join(n)).find(|p| p.is_file())
}

/// Look for a complete artifact set of `generation` in one directory.
pub fn find_in_dir(dir: &Path, generation: FeatureVersion) -> Option<ArtifactSet> {
    if !dir.is_dir() {
        return None;
    }
    let names = artifact_names(generation);
    let classifier = first_existing(dir, names.classifier)?;
    let scaler = first_existing(dir, names.scaler)?;
    Some(ArtifactSet {
        generation,
        dir: dir.to_path_buf(),
        classifier,
        scaler,
        reducer: first_existing(dir, names.reducer),
    })
}

/// All complete artifact sets in search order, plus every directory looked at.
pub fn discover(
    bases: &[PathBuf],
    generations: &[FeatureVersion],
) -> (Vec<ArtifactSet>, Vec<PathBuf>) {
    let mut found = Vec::new();
    let mut searched = Vec::new();
    for &generation in generations {
        for dir in candidate_dirs(bases, generation) {
            if let Some(set) = find_in_dir(&dir, generation) {
                found.push(set);
            }
            if !searched.contains(&dir) {
                searched.push(dir);
            }
        }
    }
    (found, searched)
}

/// Fitted chain plus classifier for one generation. Immutable after load.
pub struct LoadedModel {
    generation: FeatureVersion,
    chain: TransformChain,
    classifier: Box<dyn Classifier>,
    artifacts: Option<ArtifactSet>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("generation", &self.generation)
            .field("chain", &self.chain)
            .field("classifier", &self.classifier.name())
            .field("artifacts", &self.artifacts)
            .finish()
    }
}

impl LoadedModel {
    /// Assemble and validate: chain input must equal the generation's vector
    /// length and the classifier must accept the chain's output.
    pub fn new(
        generation: FeatureVersion,
        chain: TransformChain,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self, ModelUnavailableError> {
        chain
            .validate_input_dim(generation.dim())
            .map_err(|e| incompatible(generation, e))?;
        let chain_out = chain.output_dim(generation.dim());
        if let Some(n) = classifier.num_features() {
            if n != chain_out {
                return Err(incompatible(
                    generation,
                    ShapeMismatchError::new(classifier.name(), n, chain_out),
                ));
            }
        }
        Ok(Self {
            generation,
            chain,
            classifier,
            artifacts: None,
        })
    }

    pub fn generation(&self) -> FeatureVersion {
        self.generation
    }

    pub fn chain(&self) -> &TransformChain {
        &self.chain
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn artifacts(&self) -> Option<&ArtifactSet> {
        self.artifacts.as_ref()
    }
}

fn incompatible(generation: FeatureVersion, e: ShapeMismatchError) -> ModelUnavailableError {
    ModelUnavailableError::Incompatible(format!("{generation} artifacts: {e}"))
}

/// Read every file of one artifact set and validate the result.
pub fn load(set: &ArtifactSet) -> Result<LoadedModel, ModelUnavailableError> {
    let mut steps: Vec<Box<dyn Transform>> = Vec::with_capacity(2);
    steps.push(Box::new(StandardScaler::from_file(&set.scaler)?));
    if let Some(ref reducer) = set.reducer {
        steps.push(Box::new(Pca::from_file(reducer)?));
    }
    let chain = TransformChain::new(steps).map_err(|e| incompatible(set.generation, e))?;
    let classifier = load_classifier(&set.classifier, chain.output_dim(set.generation.dim()))?;

    let mut model = LoadedModel::new(set.generation, chain, classifier)?;
    model.artifacts = Some(set.clone());
    Ok(model)
}

/// Discover and load the first usable artifact set for `config`.
pub fn load_model(config: &ModelConfig) -> Result<LoadedModel, ModelUnavailableError> {
    let bases = if config.search_dirs.is_empty() {
        default_search_dirs()
    } else {
        config.search_dirs.clone()
    };
    let generations = match config.generation {
        Some(g) => vec![g],
        None => vec![FeatureVersion::Ember2024, FeatureVersion::Ember2018],
    };

    let (sets, searched) = discover(&bases, &generations);
    let mut last_err = None;
    for set in &sets {
        match load(set) {
            Ok(model) => {
                info!(
                    generation = %set.generation,
                    classifier = %set.classifier.display(),
                    scaler = %set.scaler.display(),
                    reducer = ?set.reducer,
                    steps = ?model.chain.step_names(),
                    "model artifacts loaded"
                );
                return Ok(model);
            }
            Err(e) => {
                warn!(dir = %set.dir.display(), error = %e, "artifact set rejected");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(ModelUnavailableError::NotFound { searched }))
}
