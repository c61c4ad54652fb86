use malscan::features::FeatureVector;
use malscan::transform::{
    sanitize, Pca, StandardScaler, Transform, TransformChain, NEG_INF_FLOOR, POS_INF_CEILING,
};
use ndarray::{array, Array2};
use proptest::prelude::*;

fn scaler_chain(dim: usize) -> TransformChain {
    let scaler = StandardScaler::new(vec![0.0; dim], vec![1.0; dim]).unwrap();
    TransformChain::new(vec![Box::new(scaler) as Box<dyn Transform>]).unwrap()
}

#[test]
fn sanitize_replaces_non_finite() {
    let clean = sanitize(FeatureVector::new(vec![
        f32::NAN,
        f32::INFINITY,
        f32::NEG_INFINITY,
        3.5,
    ]));
    assert_eq!(clean.as_slice(), &[0.0, POS_INF_CEILING, NEG_INF_FLOOR, 3.5]);
}

#[test]
fn scaler_standardizes() {
    let s = StandardScaler::new(vec![1.0, 10.0], vec![2.0, 0.0]).unwrap();
    // zero scale is treated as 1
    assert_eq!(s.transform(&[5.0, 12.0]), vec![2.0, 2.0]);
    assert_eq!(s.input_dim(), 2);
    assert_eq!(s.output_dim(), 2);
}

#[test]
fn scaler_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scaler.json");
    std::fs::write(&path, r#"{ "mean": [1.0, 2.0, 3.0], "scale": [1.0, 2.0, 4.0] }"#).unwrap();
    let s = StandardScaler::from_file(&path).unwrap();
    assert_eq!(s.transform(&[2.0, 4.0, 7.0]), vec![1.0, 1.0, 1.0]);
}

#[test]
fn scaler_rejects_inconsistent_lengths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scaler.json");
    std::fs::write(
        &path,
        r#"{ "mean": [0.0, 0.0], "scale": [1.0, 1.0], "n_features_in": 3 }"#,
    )
    .unwrap();
    assert!(StandardScaler::from_file(&path).is_err());
}

#[test]
fn pca_projects_centered_input() {
    let components: Array2<f64> = array![[1.0, 0.0, 0.0], [0.0, 1.0, 1.0]];
    let pca = Pca::new(components, array![1.0, 1.0, 1.0], None).unwrap();
    assert_eq!(pca.input_dim(), 3);
    assert_eq!(pca.output_dim(), 2);
    assert_eq!(pca.transform(&[3.0, 2.0, 4.0]), vec![2.0, 4.0]);
}

#[test]
fn pca_whitening_divides_by_std() {
    let pca = Pca::new(array![[1.0, 0.0]], array![0.0, 0.0], Some(array![4.0])).unwrap();
    assert_eq!(pca.transform(&[6.0, 9.0]), vec![3.0]);
}

#[test]
fn pca_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pca.json");
    std::fs::write(
        &path,
        r#"{ "components": [[0.0, 2.0]], "mean": [0.0, 1.0], "whiten": false }"#,
    )
    .unwrap();
    let pca = Pca::from_file(&path).unwrap();
    assert_eq!(pca.transform(&[7.0, 2.0]), vec![2.0]);
}

#[test]
fn chain_rejects_misaligned_steps() {
    let scaler = StandardScaler::new(vec![0.0; 4], vec![1.0; 4]).unwrap();
    let pca = Pca::new(array![[1.0, 0.0, 0.0]], array![0.0, 0.0, 0.0], None).unwrap();
    let err = TransformChain::new(vec![Box::new(scaler) as Box<dyn Transform>, Box::new(pca)])
        .unwrap_err();
    assert_eq!(err.stage, "pca");
    assert_eq!(err.expected, 3);
    assert_eq!(err.actual, 4);
}

#[test]
fn chain_runs_steps_in_order() {
    let scaler = StandardScaler::new(vec![1.0, 1.0], vec![1.0, 1.0]).unwrap();
    let pca = Pca::new(array![[1.0, 1.0]], array![0.0, 0.0], None).unwrap();
    let chain =
        TransformChain::new(vec![Box::new(scaler) as Box<dyn Transform>, Box::new(pca)]).unwrap();
    assert_eq!(chain.step_names(), vec!["scaler", "pca"]);
    assert_eq!(chain.input_dim(), Some(2));
    assert_eq!(chain.output_dim(2), 1);
    let out = chain.apply(&sanitize(FeatureVector::new(vec![2.0, 3.0]))).unwrap();
    assert_eq!(out, vec![3.0]);
}

#[test]
fn empty_chain_passes_through() {
    let chain = TransformChain::empty();
    assert!(chain.is_empty());
    assert_eq!(chain.output_dim(7), 7);
    let out = chain.apply(&sanitize(FeatureVector::new(vec![1.0, 2.0]))).unwrap();
    assert_eq!(out, vec![1.0, 2.0]);
}

#[test]
fn tiny_scale_stays_finite() {
    let scaler = StandardScaler::new(vec![0.0, 0.0], vec![1e-30, 1e-30]).unwrap();
    let pca = Pca::new(array![[1e30, 1e30]], array![0.0, 0.0], None).unwrap();
    let chain =
        TransformChain::new(vec![Box::new(scaler) as Box<dyn Transform>, Box::new(pca)]).unwrap();
    let input = sanitize(FeatureVector::new(vec![f32::INFINITY, f32::NEG_INFINITY]));
    let out = chain.apply(&input).unwrap();
    assert!(out.iter().all(|v| v.is_finite()));

    let scaler = StandardScaler::new(vec![0.0], vec![1e-30]).unwrap();
    assert_eq!(scaler.transform(&[POS_INF_CEILING]), vec![POS_INF_CEILING]);
}

proptest! {
    #[test]
    fn chain_output_is_finite(values in prop::collection::vec(prop::num::f32::ANY, 3)) {
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1e-20, 1.0, 1e-38]).unwrap();
        let components = array![[1e20, -1e20, 1.0], [0.5, 0.5, 0.5]];
        let pca = Pca::new(components, array![0.0, 0.0, 0.0], None).unwrap();
        let steps: Vec<Box<dyn Transform>> = vec![Box::new(scaler), Box::new(pca)];
        let chain = TransformChain::new(steps).unwrap();
        let out = chain.apply(&sanitize(FeatureVector::new(values))).unwrap();
        prop_assert_eq!(out.len(), 2);
        prop_assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn sanitized_vectors_are_finite(values in prop::collection::vec(prop::num::f32::ANY, 0..64)) {
        let n = values.len();
        let clean = sanitize(FeatureVector::new(values));
        prop_assert_eq!(clean.len(), n);
        prop_assert!(clean.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn apply_never_pads_or_truncates(expected in 1usize..32, actual in 0usize..64) {
        prop_assume!(expected != actual);
        let chain = scaler_chain(expected);
        let err = chain
            .apply(&sanitize(FeatureVector::new(vec![0.5; actual])))
            .unwrap_err();
        prop_assert_eq!(err.expected, expected);
        prop_assert_eq!(err.actual, actual);
    }
}
