mod common;

use common::{forest_json, sigmoid};
use malscan::error::{ArtifactError, ScoringError};
use malscan::model::{load_classifier, Classifier, Objective, Score, XgbForest};

const EPS: f32 = 1e-6;

#[test]
fn logistic_forest_scores_probability() {
    let forest = XgbForest::from_json(&forest_json(3, "binary:logistic")).unwrap();
    assert_eq!(forest.objective(), Objective::Logistic);
    assert_eq!(forest.num_trees(), 1);
    assert_eq!(forest.num_features(), Some(3));
    assert!(forest.supports_probability());

    let low = forest.predict_proba(&[0.0, 9.0, 9.0]).unwrap();
    let high = forest.predict_proba(&[1.0, 0.0, 0.0]).unwrap();
    assert!((low - sigmoid(-1.0)).abs() < EPS);
    assert!((high - sigmoid(2.0)).abs() < EPS);
    assert!(!forest.predict_label(&[0.0, 0.0, 0.0]).unwrap());
    assert!(forest.predict_label(&[1.0, 0.0, 0.0]).unwrap());
}

#[test]
fn split_is_strict_less_than() {
    let forest = XgbForest::from_json(&forest_json(1, "binary:logistic")).unwrap();
    // equal to the threshold goes right
    assert!((forest.margin(&[0.5]).unwrap() - 2.0).abs() < EPS);
    assert!((forest.margin(&[0.4999]).unwrap() + 1.0).abs() < EPS);
}

#[test]
fn missing_value_follows_default_direction() {
    let forest = XgbForest::from_json(&forest_json(1, "binary:logistic")).unwrap();
    assert!((forest.margin(&[f32::NAN]).unwrap() + 1.0).abs() < EPS);
}

#[test]
fn wrong_input_length_is_a_scoring_error() {
    let forest = XgbForest::from_json(&forest_json(3, "binary:logistic")).unwrap();
    assert!(matches!(
        forest.score(&[0.0, 0.0]),
        Err(ScoringError::InputLength { expected: 3, actual: 2 })
    ));
}

#[test]
fn hinge_falls_back_to_hard_label() {
    let forest = XgbForest::from_json(&forest_json(1, "binary:hinge")).unwrap();
    assert!(!forest.supports_probability());
    assert!(matches!(
        forest.predict_proba(&[1.0]),
        Err(ScoringError::Unsupported(_))
    ));
    // base_score 0.5 is added as a raw margin
    assert_eq!(forest.score(&[0.0]).unwrap(), Score::HardLabel(0.0));
    assert_eq!(forest.score(&[1.0]).unwrap(), Score::HardLabel(1.0));
}

#[test]
fn logistic_score_is_probability() {
    let forest = XgbForest::from_json(&forest_json(1, "binary:logistic")).unwrap();
    let score = forest.score(&[1.0]).unwrap();
    assert!(score.is_probability());
    assert!((score.value() - sigmoid(2.0)).abs() < EPS);
}

#[test]
fn dart_weights_scale_tree_output() {
    let json = r#"{
      "learner": {
        "learner_model_param": { "base_score": "[5E-1]", "num_feature": "1" },
        "gradient_booster": {
          "name": "dart",
          "gbtree": {
            "name": "gbtree",
            "model": { "trees": [
              { "left_children": [-1], "right_children": [-1], "split_indices": [0],
                "split_conditions": [1.0], "default_left": [false] },
              { "left_children": [-1], "right_children": [-1], "split_indices": [0],
                "split_conditions": [3.0], "default_left": [false] }
            ] }
          },
          "weight_drop": [0.5, 1.0]
        },
        "objective": { "name": "binary:logitraw" }
      }
    }"#;
    let forest = XgbForest::from_json(json).unwrap();
    assert_eq!(forest.num_trees(), 2);
    // raw margin: 0.5 + 0.5 * 1.0 + 1.0 * 3.0
    assert!((forest.margin(&[0.0]).unwrap() - 4.0).abs() < EPS);
    assert_eq!(forest.score(&[0.0]).unwrap(), Score::HardLabel(1.0));
}

#[test]
fn malformed_trees_are_rejected() {
    let backward_child = forest_json(1, "binary:logistic")
        .replace("\"left_children\": [1, -1, -1]", "\"left_children\": [0, -1, -1]");
    assert!(XgbForest::from_json(&backward_child).is_err());

    let bad_feature = forest_json(1, "binary:logistic")
        .replace("\"split_indices\": [0, 0, 0]", "\"split_indices\": [4, 0, 0]");
    assert!(XgbForest::from_json(&bad_feature).is_err());

    let ragged = forest_json(1, "binary:logistic")
        .replace("\"split_conditions\": [0.5, -1.0, 2.0]", "\"split_conditions\": [0.5, -1.0]");
    assert!(XgbForest::from_json(&ragged).is_err());

    let categorical = forest_json(1, "binary:logistic")
        .replace("\"split_type\": [0, 0, 0]", "\"split_type\": [1, 0, 0]");
    assert!(XgbForest::from_json(&categorical).is_err());
}

#[test]
fn unsupported_models_are_rejected() {
    assert!(XgbForest::from_json(&forest_json(1, "multi:softprob")).is_err());
    let multiclass = forest_json(1, "binary:logistic")
        .replace("\"num_class\": \"0\"", "\"num_class\": \"3\"");
    assert!(XgbForest::from_json(&multiclass).is_err());
    assert!(XgbForest::from_json("{}").is_err());
}

#[test]
fn load_classifier_picks_backend_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("model.json");
    std::fs::write(&json, forest_json(2, "binary:logistic")).unwrap();
    let c = load_classifier(&json, 2).unwrap();
    assert_eq!(c.name(), "xgboost");
    assert_eq!(c.num_features(), Some(2));

    let pickle = dir.path().join("model.pkl");
    std::fs::write(&pickle, b"\x80\x04").unwrap();
    assert!(matches!(
        load_classifier(&pickle, 2),
        Err(ArtifactError::Invalid { .. })
    ));

    assert!(matches!(
        load_classifier(&dir.path().join("absent.json"), 2),
        Err(ArtifactError::Io { .. })
    ));
}
