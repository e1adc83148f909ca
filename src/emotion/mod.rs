//! Emotion classification from Gabor feature vectors.

/// Multinomial logistic regression classifier
pub mod softmax;

pub use softmax::{SoftmaxClassifier, TrainingParams};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emotion labels, in record column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Anger,
    Contempt,
    Disgust,
    Fear,
    Happiness,
    Sadness,
    Surprise,
}

impl Emotion {
    /// Every label in column order
    pub const ALL: [Emotion; 8] = [
        Emotion::Neutral,
        Emotion::Anger,
        Emotion::Contempt,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happiness,
        Emotion::Sadness,
        Emotion::Surprise,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Anger => "anger",
            Emotion::Contempt => "contempt",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happiness => "happiness",
            Emotion::Sadness => "sadness",
            Emotion::Surprise => "surprise",
        }
    }

    /// Position in [`Emotion::ALL`]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label for the integer class codes of older training sets
    /// (0 neutral, 1 happiness, 2 sadness, 3 anger, 4 fear, 5 surprise, 6 disgust)
    #[must_use]
    pub fn from_legacy_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Emotion::Neutral),
            1 => Some(Emotion::Happiness),
            2 => Some(Emotion::Sadness),
            3 => Some(Emotion::Anger),
            4 => Some(Emotion::Fear),
            5 => Some(Emotion::Surprise),
            6 => Some(Emotion::Disgust),
            _ => None,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .or_else(|| s.parse::<u8>().ok().and_then(Emotion::from_legacy_code))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown emotion label: {s}")))
    }
}

/// Probability per emotion label
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EmotionScores([f64; 8]);

impl EmotionScores {
    /// Scores from probabilities in [`Emotion::ALL`] order
    #[must_use]
    pub fn new(probabilities: [f64; 8]) -> Self {
        Self(probabilities)
    }

    /// Scores for a subset of labels; every other label gets 0
    pub fn from_labels(labels: &[Emotion], probabilities: &[f64]) -> Self {
        let mut scores = [0.0; 8];
        for (label, p) in labels.iter().zip(probabilities) {
            scores[label.index()] = *p;
        }
        Self(scores)
    }

    #[must_use]
    pub fn get(&self, emotion: Emotion) -> f64 {
        self.0[emotion.index()]
    }

    #[must_use]
    pub fn as_array(&self) -> &[f64; 8] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.into_iter().zip(self.0.iter().copied())
    }

    /// Label with the highest probability (first one on ties)
    #[must_use]
    pub fn dominant(&self) -> Emotion {
        self.iter()
            .fold((Emotion::Neutral, f64::NEG_INFINITY), |best, (e, p)| if p > best.1 { (e, p) } else { best })
            .0
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// All probabilities are finite, non-negative and sum to 1
    #[must_use]
    pub fn is_distribution(&self) -> bool {
        self.0.iter().all(|p| p.is_finite() && *p >= 0.0) && (self.sum() - 1.0).abs() < 1e-6
    }
}

/// Classifies a feature vector into emotion probabilities
pub trait EmotionClassifier {
    /// Feature vector length the classifier was trained on
    fn input_len(&self) -> usize;

    /// Probability of each emotion for `features`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFeatureVector`] if `features` has the wrong
    /// length or contains non-finite values.
    fn predict(&self, features: &[f64]) -> Result<EmotionScores>;
}

impl<C: EmotionClassifier + ?Sized> EmotionClassifier for Box<C> {
    fn input_len(&self) -> usize {
        (**self).input_len()
    }

    fn predict(&self, features: &[f64]) -> Result<EmotionScores> {
        (**self).predict(features)
    }
}

/// Check a feature vector against the classifier's input length
pub(crate) fn validate_features(features: &[f64], expected: usize) -> Result<()> {
    if features.len() != expected {
        return Err(Error::InvalidFeatureVector(format!(
            "expected {expected} values, got {}",
            features.len()
        )));
    }
    if let Some(i) = features.iter().position(|v| !v.is_finite()) {
        return Err(Error::InvalidFeatureVector(format!("value {i} is not finite")));
    }
    Ok(())
}
