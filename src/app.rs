//! Batch application: record extraction, model training and classification.

use crate::{
    config::Config,
    detector::ReplayDetector,
    emotion::{EmotionClassifier, SoftmaxClassifier, TrainingParams},
    error::{Error, Result},
    pipeline::{FramePipeline, VideoData},
    records::{self, EmotionRecord},
    source::{FrameSource, ImageSequence, VideoFile},
};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Record file names inside an output directory
pub const FACES_FILE: &str = "faces.csv";
pub const GABOR_FILE: &str = "gabor.csv";
pub const EMOTIONS_FILE: &str = "emotions.csv";
pub const BLINKS_FILE: &str = "blinks.csv";
pub const DISTANCE_FILE: &str = "distance.csv";

/// One input to extract records from
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractJob {
    /// Directory of frame images, or a video file
    pub input: PathBuf,
    /// Face record CSV with the landmarks of every frame
    pub faces: PathBuf,
    /// Directory the records are written to
    pub output_dir: PathBuf,
}

impl ExtractJob {
    /// Job for `input` using the default face record location: `faces.csv`
    /// inside a frame directory, or `<name>.faces.csv` next to a video file.
    #[must_use]
    pub fn with_default_faces(input: PathBuf, output_dir: PathBuf) -> Self {
        let faces = default_faces_path(&input);
        Self {
            input,
            faces,
            output_dir,
        }
    }
}

/// Default face record path for `input`
#[must_use]
pub fn default_faces_path(input: &Path) -> PathBuf {
    if input.is_dir() {
        input.join(FACES_FILE)
    } else {
        input.with_extension("faces.csv")
    }
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub processed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Main application struct
pub struct AffectApp {
    config: Config,
    classifier: Option<SoftmaxClassifier>,
}

impl AffectApp {
    /// Create the application, loading the configured emotion model
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the model can't
    /// be loaded.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let classifier = config
            .emotion
            .model
            .as_ref()
            .map(SoftmaxClassifier::load)
            .transpose()?;
        Ok(Self { config, classifier })
    }

    /// Create the application with an already loaded model
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_classifier(config: Config, classifier: Option<SoftmaxClassifier>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, classifier })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Extract records for one input and write them to its output directory
    ///
    /// # Errors
    ///
    /// Returns an error if an input can't be opened, the model does not fit
    /// the Gabor bank, or an output can't be written.
    pub fn extract(&self, job: &ExtractJob) -> Result<VideoData> {
        let started = Instant::now();
        info!("Extracting {}", job.input.display());

        let detector = ReplayDetector::from_csv(&job.faces, self.config.input.legacy_zero_sentinel)?;
        let mut pipeline = FramePipeline::new(&self.config, detector, self.classifier.clone())?;
        let mut source = open_source(&job.input)?;
        let data = pipeline.run(source.as_mut())?;

        self.write_records(&data, &job.output_dir)?;
        info!(
            "Finished {} in {:.1}s ({} frames, {} blinks)",
            job.input.display(),
            started.elapsed().as_secs_f64(),
            data.frames.len(),
            data.blink_count()
        );
        Ok(data)
    }

    /// Extract every job. Failing inputs are logged and skipped, but a
    /// model that does not fit the Gabor bank stops the batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelDimensionMismatch`] on a model mismatch.
    pub fn extract_batch(&self, jobs: &[ExtractJob]) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        for job in jobs {
            match self.extract(job) {
                Ok(_) => summary.processed.push(job.input.clone()),
                Err(e @ Error::ModelDimensionMismatch { .. }) => return Err(e),
                Err(e) => {
                    warn!("Skipping {}: {e}", job.input.display());
                    summary.failed.push((job.input.clone(), e.to_string()));
                }
            }
        }
        info!(
            "Batch done: {} processed, {} failed",
            summary.processed.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Write the enabled record files for `data` into `dir`
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a file can't be written.
    pub fn write_records(&self, data: &VideoData, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let output = &self.config.output;
        let legacy = output.legacy_zero_sentinel;

        if output.faces {
            records::write_faces(dir.join(FACES_FILE), &data.face_records(), legacy)?;
        }
        if output.gabor {
            records::write_features(dir.join(GABOR_FILE), &data.feature_records(), legacy)?;
        }
        if output.emotions && self.classifier.is_some() {
            records::write_emotions(dir.join(EMOTIONS_FILE), &data.emotion_records(), legacy)?;
        }
        if output.blinks {
            records::write_blinks(dir.join(BLINKS_FILE), &data.blink_records())?;
        }
        if output.distance {
            records::write_distances(dir.join(DISTANCE_FILE), &data.distance_records(), legacy)?;
        }
        info!("Records written to {}", dir.display());
        Ok(())
    }
}

/// Open a frame directory or a video file
///
/// # Errors
///
/// Returns an error if the input can't be opened.
pub fn open_source(input: &Path) -> Result<Box<dyn FrameSource>> {
    if input.is_dir() {
        Ok(Box::new(ImageSequence::open(input)?))
    } else {
        Ok(Box::new(VideoFile::open(input)?))
    }
}

/// Train an emotion model from a training CSV and save it as YAML
///
/// # Errors
///
/// Returns an error if the training data can't be read or the model
/// can't be fitted or saved.
pub fn train(training_csv: &Path, model_path: &Path, params: &TrainingParams) -> Result<SoftmaxClassifier> {
    let set = records::read_training(training_csv)?;
    info!(
        "Training on {} samples from {}",
        set.samples.len(),
        training_csv.display()
    );
    let model = SoftmaxClassifier::fit(&set.samples, &set.labels, params)?;
    model.save(model_path)?;
    info!("Model saved to {}", model_path.display());
    Ok(model)
}

/// Classify a Gabor feature CSV into emotion records.
///
/// Frames without features, or whose features the model rejects, get empty
/// records. Set `legacy_zero_sentinel` when the file marks missing frames
/// with zeros.
///
/// # Errors
///
/// Returns an error if the file can't be read or the model expects a
/// different feature length than the file holds.
pub fn classify<C: EmotionClassifier>(
    gabor_csv: &Path,
    classifier: &C,
    legacy_zero_sentinel: bool,
) -> Result<Vec<EmotionRecord>> {
    let features = records::read_features(gabor_csv, legacy_zero_sentinel)?;

    if let Some(len) = features.iter().find_map(|r| r.features.as_ref().map(Vec::len)) {
        if len != classifier.input_len() {
            return Err(Error::ModelDimensionMismatch {
                expected: classifier.input_len(),
                actual: len,
            });
        }
    }

    let emotions = features
        .into_iter()
        .map(|record| {
            let scores = record.features.as_ref().and_then(|f| match classifier.predict(f) {
                Ok(scores) => Some(scores),
                Err(e) => {
                    warn!("Skipping frame {}: {e}", record.frame);
                    None
                }
            });
            EmotionRecord {
                frame: record.frame,
                scores,
            }
        })
        .collect();
    Ok(emotions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_faces_path() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(default_faces_path(dir.path()), dir.path().join("faces.csv"));
        assert_eq!(
            default_faces_path(Path::new("/data/subject01.mp4")),
            PathBuf::from("/data/subject01.faces.csv")
        );
    }

    #[test]
    fn test_missing_input_fails() {
        assert!(open_source(Path::new("/nonexistent/frames")).is_err());
    }

    #[test]
    fn test_batch_skips_failing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let app = AffectApp::new(Config::default()).unwrap();
        let job = ExtractJob {
            input: dir.path().join("missing"),
            faces: dir.path().join("missing.csv"),
            output_dir: dir.path().join("out"),
        };

        let summary = app.extract_batch(&[job]).unwrap();
        assert!(summary.processed.is_empty());
        assert_eq!(summary.failed.len(), 1);
    }
}
