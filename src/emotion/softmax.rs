use super::{validate_features, Emotion, EmotionClassifier, EmotionScores};
use crate::constants::{DEFAULT_L2_PENALTY, DEFAULT_LEARNING_RATE, DEFAULT_TRAINING_EPOCHS, EPSILON};
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Gradient descent settings for [`SoftmaxClassifier::fit`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 penalty on the weights
    pub l2_penalty: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            epochs: DEFAULT_TRAINING_EPOCHS,
            l2_penalty: DEFAULT_L2_PENALTY,
        }
    }
}

/// Multinomial logistic regression over standardised features.
///
/// `predict` computes `softmax(W · (x - mean) / scale + b)` over the labels
/// the model was trained with. Labels it never saw score 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    labels: Vec<Emotion>,
    mean: Vec<f64>,
    scale: Vec<f64>,
    /// One row per label
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl SoftmaxClassifier {
    /// Build a classifier from trained parameters
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelError`] if the parameter shapes disagree, a
    /// label repeats, or a value is not finite.
    pub fn new(
        labels: Vec<Emotion>,
        mean: Vec<f64>,
        scale: Vec<f64>,
        weights: Vec<Vec<f64>>,
        bias: Vec<f64>,
    ) -> Result<Self> {
        let model = Self {
            labels,
            mean,
            scale,
            weights,
            bias,
        };
        model.validate()?;
        Ok(model)
    }

    /// Train on `samples` with one label each
    ///
    /// # Errors
    ///
    /// Returns an error if there are no samples, the label count differs
    /// from the sample count, or the samples are ragged or non-finite.
    pub fn fit(samples: &[Vec<f64>], labels: &[Emotion], params: &TrainingParams) -> Result<Self> {
        let n = samples.len();
        if n == 0 {
            return Err(Error::InvalidInput("No training samples".to_string()));
        }
        if labels.len() != n {
            return Err(Error::InvalidInput(format!("{n} samples but {} labels", labels.len())));
        }
        if !(params.learning_rate.is_finite() && params.learning_rate > 0.0) {
            return Err(Error::InvalidInput(format!("Invalid learning rate: {}", params.learning_rate)));
        }
        let dim = samples[0].len();
        for sample in samples {
            validate_features(sample, dim)?;
        }

        let mut classes: Vec<Emotion> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let k = classes.len();

        let x = Array2::from_shape_vec((n, dim), samples.concat())
            .map_err(|e| Error::ModelError(format!("Training matrix: {e}")))?;
        let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(dim));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < EPSILON { 1.0 } else { s });
        let z = (&x - &mean) / &scale;

        let mut targets = Array2::<f64>::zeros((n, k));
        for (row, label) in labels.iter().enumerate() {
            if let Ok(col) = classes.binary_search(label) {
                targets[[row, col]] = 1.0;
            }
        }

        let mut weights = Array2::<f64>::zeros((k, dim));
        let mut bias = Array1::<f64>::zeros(k);
        let inv_n = 1.0 / n as f64;

        for epoch in 0..params.epochs {
            let mut probs = z.dot(&weights.t()) + &bias;
            for mut row in probs.rows_mut() {
                softmax_in_place(row.iter_mut());
            }
            let error = probs - &targets;

            let grad_w = error.t().dot(&z) * inv_n + &weights * params.l2_penalty;
            let grad_b = error.sum_axis(Axis(0)) * inv_n;
            weights.scaled_add(-params.learning_rate, &grad_w);
            bias.scaled_add(-params.learning_rate, &grad_b);

            if epoch % 100 == 0 {
                log::debug!("Epoch {epoch}: mean gradient {:.6}", grad_w.mapv(f64::abs).mean().unwrap_or(0.0));
            }
        }

        log::info!("Trained softmax classifier: {n} samples, {dim} features, {k} labels");

        Self::new(
            classes,
            mean.to_vec(),
            scale.to_vec(),
            weights.rows().into_iter().map(|r| r.to_vec()).collect(),
            bias.to_vec(),
        )
    }

    /// Most probable label for `features`
    ///
    /// # Errors
    ///
    /// Returns an error if the feature vector is invalid.
    pub fn predict_label(&self, features: &[f64]) -> Result<Emotion> {
        Ok(self.predict(features)?.dominant())
    }

    /// Labels the model can predict
    #[must_use]
    pub fn labels(&self) -> &[Emotion] {
        &self.labels
    }

    /// Load a model from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or holds an invalid model.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let model: Self = serde_yaml::from_str(&contents)?;
        model.validate()?;
        log::info!(
            "Loaded emotion model from {} ({} features, {} labels)",
            path.as_ref().display(),
            model.input_len(),
            model.labels.len()
        );
        Ok(model)
    }

    /// Save the model as YAML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let dim = self.mean.len();
        let k = self.labels.len();

        if k == 0 || dim == 0 {
            return Err(Error::ModelError("Model has no labels or no inputs".to_string()));
        }
        if self.scale.len() != dim || self.bias.len() != k || self.weights.len() != k {
            return Err(Error::ModelError(format!(
                "Inconsistent model shape: {k} labels, {dim} means, {} scales, {} weight rows, {} biases",
                self.scale.len(),
                self.weights.len(),
                self.bias.len()
            )));
        }
        if let Some(row) = self.weights.iter().position(|w| w.len() != dim) {
            return Err(Error::ModelError(format!("Weight row {row} does not have {dim} values")));
        }

        let mut sorted = self.labels.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != k {
            return Err(Error::ModelError("Model labels repeat".to_string()));
        }

        let values = self
            .mean
            .iter()
            .chain(&self.bias)
            .chain(self.weights.iter().flatten());
        if values.chain(&self.scale).any(|v| !v.is_finite()) || self.scale.iter().any(|s| *s <= 0.0) {
            return Err(Error::ModelError("Model holds non-finite values or non-positive scales".to_string()));
        }
        Ok(())
    }
}

impl EmotionClassifier for SoftmaxClassifier {
    fn input_len(&self) -> usize {
        self.mean.len()
    }

    fn predict(&self, features: &[f64]) -> Result<EmotionScores> {
        validate_features(features, self.input_len())?;

        let standardised: Vec<f64> = features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect();

        let mut logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| w.iter().zip(&standardised).map(|(wi, zi)| wi * zi).sum::<f64>() + b)
            .collect();
        softmax_in_place(logits.iter_mut());

        Ok(EmotionScores::from_labels(&self.labels, &logits))
    }
}

/// Numerically stable softmax
fn softmax_in_place<'a>(values: impl IntoIterator<Item = &'a mut f64>) {
    let mut values: Vec<&mut f64> = values.into_iter().collect();
    let max = values.iter().fold(f64::NEG_INFINITY, |m, v| m.max(**v));
    let mut total = 0.0;
    for v in &mut values {
        **v = (**v - max).exp();
        total += **v;
    }
    for v in values {
        *v /= total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cluster_data() -> (Vec<Vec<f64>>, Vec<Emotion>) {
        let mut samples = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let jitter = f64::from(i) * 0.01;
            samples.push(vec![1.0 + jitter, 0.0 - jitter, 0.5]);
            labels.push(Emotion::Happiness);
            samples.push(vec![-1.0 - jitter, 1.0 + jitter, 0.5]);
            labels.push(Emotion::Sadness);
        }
        (samples, labels)
    }

    #[test]
    fn test_fit_separates_clusters() {
        let (samples, labels) = two_cluster_data();
        let model = SoftmaxClassifier::fit(&samples, &labels, &TrainingParams::default()).unwrap();

        assert_eq!(model.labels(), &[Emotion::Happiness, Emotion::Sadness]);
        assert_eq!(model.input_len(), 3);
        assert_eq!(model.predict_label(&[1.0, 0.0, 0.5]).unwrap(), Emotion::Happiness);
        assert_eq!(model.predict_label(&[-1.0, 1.0, 0.5]).unwrap(), Emotion::Sadness);

        let scores = model.predict(&[1.0, 0.0, 0.5]).unwrap();
        assert!(scores.is_distribution());
        assert_eq!(scores.get(Emotion::Anger), 0.0);
    }

    #[test]
    fn test_zero_input_gives_distribution() {
        let (samples, labels) = two_cluster_data();
        let model = SoftmaxClassifier::fit(&samples, &labels, &TrainingParams::default()).unwrap();
        assert!(model.predict(&[0.0; 3]).unwrap().is_distribution());
    }

    #[test]
    fn test_predict_rejects_bad_input() {
        let model = SoftmaxClassifier::new(
            vec![Emotion::Neutral],
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![vec![0.0, 0.0]],
            vec![0.0],
        )
        .unwrap();

        assert!(matches!(model.predict(&[0.0]), Err(Error::InvalidFeatureVector(_))));
        assert!(matches!(model.predict(&[0.0, f64::INFINITY]), Err(Error::InvalidFeatureVector(_))));
        assert_eq!(model.predict(&[3.0, -2.0]).unwrap().get(Emotion::Neutral), 1.0);
    }

    #[test]
    fn test_new_rejects_inconsistent_shapes() {
        let result = SoftmaxClassifier::new(
            vec![Emotion::Neutral, Emotion::Fear],
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![vec![0.0, 0.0]],
            vec![0.0, 0.0],
        );
        assert!(matches!(result, Err(Error::ModelError(_))));

        let repeated = SoftmaxClassifier::new(
            vec![Emotion::Fear, Emotion::Fear],
            vec![0.0],
            vec![1.0],
            vec![vec![0.0], vec![0.0]],
            vec![0.0, 0.0],
        );
        assert!(repeated.is_err());

        let zero_scale = SoftmaxClassifier::new(vec![Emotion::Fear], vec![0.0], vec![0.0], vec![vec![0.0]], vec![0.0]);
        assert!(zero_scale.is_err());
    }

    #[test]
    fn test_fit_rejects_bad_data() {
        let params = TrainingParams::default();
        assert!(SoftmaxClassifier::fit(&[], &[], &params).is_err());
        assert!(SoftmaxClassifier::fit(&[vec![1.0]], &[], &params).is_err());
        assert!(SoftmaxClassifier::fit(
            &[vec![1.0], vec![1.0, 2.0]],
            &[Emotion::Fear, Emotion::Anger],
            &params
        )
        .is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let (samples, labels) = two_cluster_data();
        let params = TrainingParams {
            epochs: 50,
            ..TrainingParams::default()
        };
        let model = SoftmaxClassifier::fit(&samples, &labels, &params).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.yaml");
        model.save(&path).unwrap();
        let loaded = SoftmaxClassifier::load(&path).unwrap();

        let probe = [0.3, 0.2, 0.5];
        let a = model.predict(&probe).unwrap();
        let b = loaded.predict(&probe).unwrap();
        for (x, y) in a.as_array().iter().zip(b.as_array()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let mut values = vec![1000.0, 1001.0];
        softmax_in_place(values.iter_mut());
        assert!(values.iter().all(|v| v.is_finite()));
        assert!((values.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
