//! Error types for the face affect library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// CSV reading or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A landmark lies outside the response maps it should be sampled from
    #[error("Landmark {index} at ({x}, {y}) is outside the {width}x{height} image")]
    LandmarkOutOfBounds {
        /// Landmark index (0-67)
        index: usize,
        /// Landmark x coordinate
        x: i32,
        /// Landmark y coordinate
        y: i32,
        /// Image width
        width: usize,
        /// Image height
        height: usize,
    },

    /// Feature vector has the wrong length or non-finite values
    #[error("Invalid feature vector: {0}")]
    InvalidFeatureVector(String),

    /// Loaded model does not match the feature extractor
    #[error("Model expects {expected} features but the extractor produces {actual}")]
    ModelDimensionMismatch {
        /// Input length the model was trained with
        expected: usize,
        /// Feature vector length produced by the Gabor bank
        actual: usize,
    },

    /// Model loading, training or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Malformed data record
    #[error("Record error: {0}")]
    RecordError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
