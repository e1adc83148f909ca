//! Tests for emotion classification


use face_affect::emotion::{Emotion, EmotionClassifier, SoftmaxClassifier, TrainingParams};
use face_affect::Error;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_helpers::uniform_model;

const DIM: usize = 12;

/// Clusters around a different centre per label
fn clustered_samples(labels: &[Emotion], per_label: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<Emotion>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::new();
    let mut targets = Vec::new();
    for (i, &label) in labels.iter().enumerate() {
        for _ in 0..per_label {
            let sample = (0..DIM)
                .map(|d| if d % labels.len() == i { 5.0 } else { 0.0 } + rng.gen_range(-0.5..0.5))
                .collect();
            samples.push(sample);
            targets.push(label);
        }
    }
    (samples, targets)
}

fn trained(labels: &[Emotion]) -> SoftmaxClassifier {
    let (samples, targets) = clustered_samples(labels, 20, 11);
    SoftmaxClassifier::fit(&samples, &targets, &TrainingParams::default()).unwrap()
}

#[test]
fn test_trained_model_separates_clusters() {
    let labels = [Emotion::Happiness, Emotion::Sadness, Emotion::Surprise];
    let model = trained(&labels);
    assert_eq!(model.input_len(), DIM);
    assert_eq!(model.labels(), &labels);

    let (samples, targets) = clustered_samples(&labels, 5, 99);
    for (sample, target) in samples.iter().zip(&targets) {
        let scores = model.predict(sample).unwrap();
        assert!(scores.is_distribution());
        assert_eq!(scores.dominant(), *target);
        assert_eq!(model.predict_label(sample).unwrap(), *target);
    }
}

#[test]
fn test_labels_outside_training_score_zero() {
    let model = trained(&[Emotion::Anger, Emotion::Neutral]);
    let scores = model.predict(&[1.0; DIM]).unwrap();

    for emotion in [Emotion::Contempt, Emotion::Disgust, Emotion::Fear, Emotion::Happiness, Emotion::Sadness, Emotion::Surprise] {
        assert_eq!(scores.get(emotion), 0.0, "{emotion}");
    }
    assert!((scores.get(Emotion::Anger) + scores.get(Emotion::Neutral) - 1.0).abs() < 1e-9);
}

#[test]
fn test_all_zero_features_give_a_distribution() {
    let model = trained(&Emotion::ALL);
    assert!(model.predict(&[0.0; DIM]).unwrap().is_distribution());
}

#[test]
fn test_invalid_feature_vectors() {
    let model = uniform_model(DIM, &[Emotion::Neutral, Emotion::Fear]).unwrap();

    assert!(matches!(model.predict(&[0.0; DIM - 1]), Err(Error::InvalidFeatureVector(_))));
    let mut features = vec![0.0; DIM];
    features[3] = f64::INFINITY;
    assert!(matches!(model.predict(&features), Err(Error::InvalidFeatureVector(_))));
}

#[test]
fn test_boxed_classifier() {
    let model: Box<dyn EmotionClassifier> = Box::new(uniform_model(4, &[Emotion::Surprise]).unwrap());
    assert_eq!(model.input_len(), 4);
    assert_eq!(model.predict(&[1.0; 4]).unwrap().get(Emotion::Surprise), 1.0);
}

#[test]
fn test_model_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.yaml");
    let model = trained(&[Emotion::Contempt, Emotion::Disgust]);

    model.save(&path).unwrap();
    let loaded = SoftmaxClassifier::load(&path).unwrap();
    assert_eq!(loaded, model);

    let features = vec![0.3; DIM];
    assert_eq!(loaded.predict(&features).unwrap(), model.predict(&features).unwrap());
}

#[test]
fn test_inconsistent_model_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.yaml");
    std::fs::write(
        &path,
        "labels: [neutral, anger]\nmean: [0.0, 0.0]\nscale: [1.0, 1.0]\nweights: [[0.0, 0.0]]\nbias: [0.0, 0.0]\n",
    )
    .unwrap();

    assert!(matches!(SoftmaxClassifier::load(&path), Err(Error::ModelError(_))));
}

#[test]
fn test_training_rejects_bad_input() {
    let params = TrainingParams::default();
    assert!(SoftmaxClassifier::fit(&[], &[], &params).is_err());
    assert!(SoftmaxClassifier::fit(&[vec![1.0, 2.0]], &[], &params).is_err());
    assert!(SoftmaxClassifier::fit(
        &[vec![1.0, 2.0], vec![1.0]],
        &[Emotion::Fear, Emotion::Anger],
        &params
    )
    .is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_predictions_are_distributions(
        features in proptest::collection::vec(-1.0e3f64..1.0e3, DIM),
    ) {
        let model = trained(&[Emotion::Fear, Emotion::Happiness, Emotion::Neutral]);
        let scores = model.predict(&features).unwrap();
        prop_assert!(scores.is_distribution());
    }
}
