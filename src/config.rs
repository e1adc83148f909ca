//! Configuration management for the face affect pipeline

use crate::constants::{
    DEFAULT_BLINK_MIN_FRAMES, DEFAULT_BLINK_THRESHOLD, DEFAULT_BLINK_WINDOW_SECS, DEFAULT_CAMERA_FOV_DEGREES,
    DEFAULT_CAMERA_WIDTH, DEFAULT_FPS, DEFAULT_GABOR_ORIENTATIONS, DEFAULT_GABOR_WAVELENGTHS,
};
use crate::emotion::TrainingParams;
use crate::face::CameraModel;
use crate::filters::create_filter;
use crate::gabor::{evenly_spaced_orientations, BorderMode, GaborBank, ResponseMode};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gabor filter bank
    pub gabor: GaborConfig,

    /// Blink detection
    pub blink: BlinkConfig,

    /// Emotion model
    pub emotion: EmotionConfig,

    /// Face detection
    pub detection: DetectionConfig,

    /// Camera geometry for distance estimation
    pub camera: CameraConfig,

    /// Record input
    pub input: InputConfig,

    /// Record output
    pub output: OutputConfig,
}

/// Gabor filter bank parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaborConfig {
    /// Kernel wavelengths in pixels
    pub wavelengths: Vec<f64>,

    /// Number of orientations evenly spaced over [0, pi)
    pub orientations: usize,

    /// Response value kept per pixel
    pub response_mode: ResponseMode,

    /// Image border handling
    pub border_mode: BorderMode,
}

/// Blink detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Eye aspect ratio below which the eyes count as closed
    pub threshold: f64,

    /// Consecutive closed frames needed for a blink
    pub min_closed_frames: usize,

    /// Blink rate window in seconds
    pub window_secs: f64,

    /// Eye openness smoothing filter (`none`, `median:3`, `moving_average:3`, `exponential:0.5`)
    pub smoothing: String,
}

/// Emotion classifier parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Path to a trained model
    pub model: Option<PathBuf>,

    /// Training settings for the `train` command
    pub training: TrainingParams,
}

/// Face detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Maximum number of faces considered per frame
    pub max_faces: usize,

    /// Skip frames that are entirely black
    pub skip_blank_frames: bool,
}

/// Camera parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Frame rate used when the source does not report one
    pub fps: f64,

    /// Horizontal field of view in degrees
    pub fov_degrees: f64,

    /// Horizontal sensor resolution in pixels
    pub resolution_width: f64,
}

/// Input record parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Read all-zero rows of face and Gabor files as frames without a face
    pub legacy_zero_sentinel: bool,
}

/// Output parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory records are written to
    pub directory: PathBuf,

    /// Write zeros instead of empty cells for frames without a face
    pub legacy_zero_sentinel: bool,

    /// Write the face geometry file
    pub faces: bool,

    /// Write the Gabor feature file
    pub gabor: bool,

    /// Write the emotion file
    pub emotions: bool,

    /// Write the blink file
    pub blinks: bool,

    /// Write the face distance file
    pub distance: bool,
}

impl Default for GaborConfig {
    fn default() -> Self {
        Self {
            wavelengths: DEFAULT_GABOR_WAVELENGTHS.to_vec(),
            orientations: DEFAULT_GABOR_ORIENTATIONS,
            response_mode: ResponseMode::default(),
            border_mode: BorderMode::default(),
        }
    }
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BLINK_THRESHOLD,
            min_closed_frames: DEFAULT_BLINK_MIN_FRAMES,
            window_secs: DEFAULT_BLINK_WINDOW_SECS,
            smoothing: "none".to_string(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_faces: 10,
            skip_blank_frames: true,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            fov_degrees: DEFAULT_CAMERA_FOV_DEGREES,
            resolution_width: DEFAULT_CAMERA_WIDTH,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            legacy_zero_sentinel: false,
            faces: true,
            gabor: true,
            emotions: true,
            blinks: true,
            distance: true,
        }
    }
}

impl GaborConfig {
    /// Build the filter bank described by this configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the wavelengths or orientation count are invalid.
    pub fn build_bank(&self) -> Result<GaborBank> {
        let orientations = evenly_spaced_orientations(self.orientations);
        Ok(GaborBank::new(&self.wavelengths, &orientations)?
            .with_response_mode(self.response_mode)
            .with_border_mode(self.border_mode))
    }
}

impl CameraConfig {
    #[must_use]
    pub fn camera_model(&self) -> CameraModel {
        CameraModel {
            fov_degrees: self.fov_degrees,
            resolution_width: self.resolution_width,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Gabor bank
        if self.gabor.wavelengths.is_empty() || self.gabor.orientations == 0 {
            return Err(Error::ConfigError(
                "Gabor bank needs at least one wavelength and one orientation".to_string(),
            ));
        }
        if self.gabor.wavelengths.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(Error::ConfigError("Gabor wavelengths must be positive".to_string()));
        }

        // Blink detection
        if !(self.blink.threshold.is_finite() && self.blink.threshold > 0.0) {
            return Err(Error::ConfigError("Blink threshold must be positive".to_string()));
        }
        if self.blink.min_closed_frames == 0 {
            return Err(Error::ConfigError(
                "Blink closed frame count must be greater than 0".to_string(),
            ));
        }
        if !(self.blink.window_secs.is_finite() && self.blink.window_secs > 0.0) {
            return Err(Error::ConfigError("Blink rate window must be positive".to_string()));
        }
        create_filter(&self.blink.smoothing)?;

        // Training
        if !(self.emotion.training.learning_rate.is_finite() && self.emotion.training.learning_rate > 0.0) {
            return Err(Error::ConfigError("Learning rate must be positive".to_string()));
        }
        if !(self.emotion.training.l2_penalty.is_finite() && self.emotion.training.l2_penalty >= 0.0) {
            return Err(Error::ConfigError("L2 penalty must not be negative".to_string()));
        }

        // Detection and camera
        if self.detection.max_faces == 0 {
            return Err(Error::ConfigError("Max faces must be greater than 0".to_string()));
        }
        if !(self.camera.fps.is_finite() && self.camera.fps > 0.0) {
            return Err(Error::ConfigError("Camera FPS must be greater than 0".to_string()));
        }
        if !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            return Err(Error::ConfigError(
                "Camera field of view must be between 0 and 180 degrees".to_string(),
            ));
        }
        if !(self.camera.resolution_width.is_finite() && self.camera.resolution_width > 0.0) {
            return Err(Error::ConfigError("Camera resolution must be positive".to_string()));
        }

        // Model path exists
        if let Some(model) = &self.emotion.model {
            if !model.exists() {
                return Err(Error::ConfigError(format!("Emotion model not found: {}", model.display())));
            }
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Face Affect Configuration

# Gabor filter bank
gabor:
  wavelengths: [4.0, 7.0, 10.0, 13.0]
  orientations: 8
  response_mode: magnitude   # or "real"
  border_mode: reflect101    # or "zero"

# Blink detection
blink:
  threshold: 0.2
  min_closed_frames: 2
  window_secs: 60.0
  smoothing: "none"

# Emotion classifier
emotion:
  # model: "models/emotions.yaml"
  training:
    learning_rate: 0.1
    epochs: 500
    l2_penalty: 0.0001

# Face detection
detection:
  max_faces: 10
  skip_blank_frames: true

# Camera geometry
camera:
  fps: 30.0
  fov_degrees: 60.0
  resolution_width: 1280.0

# Input records
input:
  legacy_zero_sentinel: false  # files from older tools mark missing faces with zeros

# Output records
output:
  directory: "output"
  legacy_zero_sentinel: false
  faces: true
  gabor: true
  emotions: true
  blinks: true
  distance: true
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = serde_yaml::from_str("blink:\n  threshold: 0.25\n").unwrap();
        assert_eq!(parsed.blink.threshold, 0.25);
        assert_eq!(parsed.blink.min_closed_frames, DEFAULT_BLINK_MIN_FRAMES);
        assert_eq!(parsed.gabor, GaborConfig::default());
    }

    #[test]
    fn test_build_bank() {
        let bank = GaborConfig::default().build_bank().unwrap();
        assert_eq!(bank.len(), 32);

        let config = GaborConfig {
            wavelengths: vec![5.0],
            orientations: 2,
            response_mode: ResponseMode::Real,
            border_mode: BorderMode::Zero,
        };
        let bank = config.build_bank().unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.response_mode(), ResponseMode::Real);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.blink.smoothing = "median:2".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gabor.wavelengths = vec![4.0, -1.0];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.camera.fov_degrees = 180.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.emotion.model = Some(PathBuf::from("/nonexistent/model.yaml"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.output.legacy_zero_sentinel = true;
        config.blink.smoothing = "median:3".to_string();
        config.to_file(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }
}
