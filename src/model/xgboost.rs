//! Gradient-boosted tree ensemble read from XGBoost's JSON model format
//! (`Booster.save_model("model.json")`). Evaluated natively, numeric splits only.

use super::Classifier;
use crate::error::{ArtifactError, ScoringError};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Deserialize)]
struct Learner {
    learner_model_param: LearnerModelParam,
    gradient_booster: Booster,
    objective: ObjectiveSpec,
}

#[derive(Deserialize)]
struct LearnerModelParam {
    base_score: Param,
    #[serde(default)]
    num_class: Option<Param>,
    num_feature: Param,
}

#[derive(Deserialize)]
struct ObjectiveSpec {
    name: String,
}

#[derive(Deserialize)]
struct Booster {
    name: String,
    #[serde(default)]
    model: Option<TreeModel>,
    /// dart wraps a gbtree
    #[serde(default)]
    gbtree: Option<Box<Booster>>,
    #[serde(default)]
    weight_drop: Vec<f32>,
}

#[derive(Deserialize)]
struct TreeModel {
    trees: Vec<TreeDump>,
}

#[derive(Deserialize)]
struct TreeDump {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<i64>,
}

/// Scalar params are strings in most dumps (`"5E-1"`, `"[5E-1]"` in 3.x).
#[derive(Deserialize)]
#[serde(untagged)]
enum Param {
    Number(f64),
    Text(String),
}

impl Param {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Param::Number(n) => Some(*n),
            Param::Text(s) => s
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(',')
                .next()?
                .trim()
                .parse()
                .ok(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn as_bool(&self) -> bool {
        match *self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

/// Learning objective; decides whether a probability output exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// `binary:logistic`, `reg:logistic`: sigmoid of the margin
    Logistic,
    /// `binary:logitraw`: raw margin only
    LogitRaw,
    /// `binary:hinge`: 0/1 predictions only
    Hinge,
}

impl Objective {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "binary:logistic" | "reg:logistic" => Some(Objective::Logistic),
            "binary:logitraw" => Some(Objective::LogitRaw),
            "binary:hinge" => Some(Objective::Hinge),
            _ => None,
        }
    }
}

const LEAF: i32 = -1;

#[derive(Debug, Clone, Copy)]
struct Node {
    left: i32,
    right: i32,
    feature: usize,
    /// Split threshold, or the leaf value on leaves
    value: f32,
    default_left: bool,
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_dump(dump: TreeDump, num_feature: usize) -> Result<Self, String> {
        let n = dump.left_children.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if dump.right_children.len() != n
            || dump.split_indices.len() != n
            || dump.split_conditions.len() != n
            || dump.default_left.len() != n
        {
            return Err("node arrays have different lengths".to_string());
        }
        if dump.split_type.iter().any(|&t| t != 0) {
            return Err("categorical splits are not supported".to_string());
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = dump.left_children[i];
            let right = dump.right_children[i];
            let is_leaf = left == LEAF;
            if !is_leaf {
                // Children always come after their parent, which also rules out cycles.
                let in_range = |c: i32| c > i as i32 && (c as usize) < n;
                if !in_range(left) || !in_range(right) {
                    return Err(format!("node {i} has invalid children {left}/{right}"));
                }
                let feature = dump.split_indices[i];
                if feature < 0 || feature as usize >= num_feature {
                    return Err(format!("node {i} splits on feature {feature}"));
                }
            }
            nodes.push(Node {
                left,
                right,
                feature: if is_leaf { 0 } else { dump.split_indices[i] as usize },
                value: dump.split_conditions[i],
                default_left: dump.default_left[i].as_bool(),
            });
        }
        Ok(Self { nodes })
    }

    fn leaf_value(&self, x: &[f32]) -> f32 {
        let mut idx = 0usize;
        loop {
            let node = self.nodes[idx];
            if node.left == LEAF {
                return node.value;
            }
            let v = x[node.feature];
            let go_left = if v.is_nan() {
                node.default_left
            } else {
                v < node.value
            };
            let next = if go_left { node.left } else { node.right };
            idx = next as usize;
        }
    }
}

/// Binary gradient-boosted tree classifier.
#[derive(Debug, Clone)]
pub struct XgbForest {
    trees: Vec<Tree>,
    /// Per-tree output weight (dart); 1.0 for gbtree
    weights: Vec<f32>,
    base_margin: f32,
    num_feature: usize,
    objective: Objective,
}

impl XgbForest {
    pub fn from_file(path: &Path) -> Result<Self, ArtifactError> {
        let data = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data).map_err(|e| match e {
            LoadError::Parse(source) => ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            },
            LoadError::Invalid(reason) => ArtifactError::invalid(path, reason),
        })
    }

    pub fn from_json(data: &str) -> Result<Self, LoadError> {
        let file: ModelFile = serde_json::from_str(data).map_err(LoadError::Parse)?;
        let learner = file.learner;
        let param = learner.learner_model_param;

        let num_class = param.num_class.as_ref().and_then(Param::as_f64).unwrap_or(0.0);
        if num_class > 1.0 {
            return Err(LoadError::Invalid(format!(
                "multi-class model ({num_class} classes); only binary models are supported"
            )));
        }
        let num_feature = param
            .num_feature
            .as_f64()
            .filter(|n| *n >= 1.0)
            .ok_or_else(|| LoadError::Invalid("missing num_feature".to_string()))?
            as usize;

        let objective = Objective::parse(&learner.objective.name).ok_or_else(|| {
            LoadError::Invalid(format!("unsupported objective {}", learner.objective.name))
        })?;

        let base_score = param
            .base_score
            .as_f64()
            .ok_or_else(|| LoadError::Invalid("missing base_score".to_string()))?;
        let base_margin = match objective {
            Objective::Logistic => {
                if !(base_score > 0.0 && base_score < 1.0) {
                    return Err(LoadError::Invalid(format!(
                        "base_score {base_score} outside (0, 1) for a logistic objective"
                    )));
                }
                (base_score / (1.0 - base_score)).ln() as f32
            }
            Objective::LogitRaw | Objective::Hinge => base_score as f32,
        };

        let booster = learner.gradient_booster;
        let (dumps, weight_drop) = match booster.name.as_str() {
            "gbtree" => (booster.model, Vec::new()),
            "dart" => {
                let inner = booster
                    .gbtree
                    .ok_or_else(|| LoadError::Invalid("dart booster without gbtree".to_string()))?;
                (inner.model, booster.weight_drop)
            }
            other => return Err(LoadError::Invalid(format!("unsupported booster {other}"))),
        };
        let dumps = dumps
            .ok_or_else(|| LoadError::Invalid("booster has no tree model".to_string()))?
            .trees;

        let trees = dumps
            .into_iter()
            .enumerate()
            .map(|(i, d)| {
                Tree::from_dump(d, num_feature)
                    .map_err(|r| LoadError::Invalid(format!("tree {i}: {r}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let weights = if weight_drop.is_empty() {
            vec![1.0; trees.len()]
        } else if weight_drop.len() == trees.len() {
            weight_drop
        } else {
            return Err(LoadError::Invalid(format!(
                "{} dart weights for {} trees",
                weight_drop.len(),
                trees.len()
            )));
        };

        Ok(Self {
            trees,
            weights,
            base_margin,
            num_feature,
            objective,
        })
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw additive score before the objective's link function.
    pub fn margin(&self, features: &[f32]) -> Result<f32, ScoringError> {
        if features.len() != self.num_feature {
            return Err(ScoringError::InputLength {
                expected: self.num_feature,
                actual: features.len(),
            });
        }
        let sum = self
            .trees
            .iter()
            .zip(&self.weights)
            .fold(self.base_margin, |acc, (tree, w)| acc + w * tree.leaf_value(features));
        Ok(sum)
    }
}

/// Failure reading a model dump that is not tied to a file path yet.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Parse(serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Classifier for XgbForest {
    fn name(&self) -> &str {
        "xgboost"
    }

    fn num_features(&self) -> Option<usize> {
        Some(self.num_feature)
    }

    fn supports_probability(&self) -> bool {
        self.objective == Objective::Logistic
    }

    fn predict_proba(&self, features: &[f32]) -> Result<f32, ScoringError> {
        match self.objective {
            Objective::Logistic => Ok(sigmoid(self.margin(features)?)),
            Objective::LogitRaw | Objective::Hinge => Err(ScoringError::Unsupported(
                "objective has no probability output",
            )),
        }
    }

    fn predict_label(&self, features: &[f32]) -> Result<bool, ScoringError> {
        Ok(self.margin(features)? > 0.0)
    }
}
