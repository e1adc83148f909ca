//! Per-frame analysis: detect → crop → Gabor filter → features → emotions,
//! with blink tracking driven by the landmarks.

use crate::blink::{BlinkDetector, BlinkUpdate};
use crate::config::{BlinkConfig, Config};
use crate::constants::NUM_FACIAL_LANDMARKS;
use crate::detector::{limit_faces, select_primary, FaceDetector};
use crate::emotion::{EmotionClassifier, EmotionScores};
use crate::face::{CameraModel, Face};
use crate::features::{extract, FeatureVector};
use crate::gabor::GaborBank;
use crate::records::{BlinkRecord, DistanceRecord, EmotionRecord, FaceRecord, FeatureRecord};
use crate::source::FrameSource;
use crate::utils::gradient;
use crate::utils::image_conversion::{is_blank, GrayImage};
use crate::{Error, Result};

/// Consecutive unreadable frames after which a stream is abandoned
const MAX_CONSECUTIVE_FRAME_ERRORS: usize = 10;

/// Everything computed for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub frame: usize,
    /// Primary face, if one was found
    pub face: Option<Face>,
    pub features: Option<FeatureVector>,
    pub emotions: Option<EmotionScores>,
    pub blink: BlinkUpdate,
    /// Estimated face distance in centimetres
    pub distance: Option<f64>,
}

/// Results of a whole stream
#[derive(Debug, Clone, Default)]
pub struct VideoData {
    pub fps: f64,
    pub frames: Vec<FrameResult>,
    /// Rate of change of the face distance in cm/s, per frame
    pub distance_gradient: Vec<Option<f64>>,
}

impl VideoData {
    #[must_use]
    pub fn face_records(&self) -> Vec<FaceRecord> {
        self.frames
            .iter()
            .map(|f| FaceRecord {
                frame: f.frame,
                face: f.face.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn feature_records(&self) -> Vec<FeatureRecord> {
        self.frames
            .iter()
            .map(|f| FeatureRecord {
                frame: f.frame,
                features: f.features.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn emotion_records(&self) -> Vec<EmotionRecord> {
        self.frames
            .iter()
            .map(|f| EmotionRecord {
                frame: f.frame,
                scores: f.emotions,
            })
            .collect()
    }

    #[must_use]
    pub fn blink_records(&self) -> Vec<BlinkRecord> {
        self.frames
            .iter()
            .map(|f| BlinkRecord {
                frame: f.frame,
                count: f.blink.count,
                rate: f.blink.rate,
            })
            .collect()
    }

    #[must_use]
    pub fn distance_records(&self) -> Vec<DistanceRecord> {
        self.frames
            .iter()
            .zip(self.distance_gradient.iter().chain(std::iter::repeat(&None)))
            .map(|(f, g)| DistanceRecord {
                frame: f.frame,
                distance: f.distance,
                gradient: *g,
            })
            .collect()
    }

    /// Total blinks in the stream
    #[must_use]
    pub fn blink_count(&self) -> usize {
        self.frames.last().map_or(0, |f| f.blink.count)
    }
}

/// Gradient of a series with gaps, computed separately over each run of
/// consecutive values and scaled from per-frame to per-second.
#[must_use]
pub fn distance_gradients(distances: &[Option<f64>], fps: f64) -> Vec<Option<f64>> {
    let mut gradients = vec![None; distances.len()];
    let mut start = 0;
    while start < distances.len() {
        if distances[start].is_none() {
            start += 1;
            continue;
        }
        let end = distances[start..]
            .iter()
            .position(Option::is_none)
            .map_or(distances.len(), |n| start + n);
        let run: Vec<f64> = distances[start..end].iter().flatten().copied().collect();
        for (slot, g) in gradients[start..end].iter_mut().zip(gradient(&run)) {
            *slot = Some(g * fps);
        }
        start = end;
    }
    gradients
}

/// Analysis pipeline for one stream
pub struct FramePipeline<D, C> {
    bank: GaborBank,
    detector: D,
    classifier: Option<C>,
    blink_config: BlinkConfig,
    blink: BlinkDetector,
    camera: CameraModel,
    fps: f64,
    max_faces: usize,
    skip_blank_frames: bool,
}

impl<D: FaceDetector, C: EmotionClassifier> FramePipeline<D, C> {
    /// Create a pipeline
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelDimensionMismatch`] if the classifier was
    /// trained on a different feature length than the configured Gabor
    /// bank produces, or a configuration error.
    pub fn new(config: &Config, detector: D, classifier: Option<C>) -> Result<Self> {
        let bank = config.gabor.build_bank()?;
        let feature_len = NUM_FACIAL_LANDMARKS * bank.len();

        if let Some(classifier) = &classifier {
            if classifier.input_len() != feature_len {
                return Err(Error::ModelDimensionMismatch {
                    expected: classifier.input_len(),
                    actual: feature_len,
                });
            }
        } else {
            log::warn!("No emotion model given, emotions will not be classified");
        }

        let fps = config.camera.fps;
        log::info!(
            "Pipeline ready: {} Gabor kernels, {feature_len} features per face",
            bank.len()
        );

        Ok(Self {
            bank,
            detector,
            classifier,
            blink: BlinkDetector::from_config(&config.blink, fps)?,
            blink_config: config.blink.clone(),
            camera: config.camera.camera_model(),
            fps,
            max_faces: config.detection.max_faces,
            skip_blank_frames: config.detection.skip_blank_frames,
        })
    }

    /// Length of the feature vectors this pipeline produces
    #[must_use]
    pub fn feature_len(&self) -> usize {
        NUM_FACIAL_LANDMARKS * self.bank.len()
    }

    #[must_use]
    pub fn bank(&self) -> &GaborBank {
        &self.bank
    }

    /// Restart blink tracking for a new stream at `fps`
    ///
    /// # Errors
    ///
    /// Returns an error if `fps` is not positive.
    pub fn reset(&mut self, fps: f64) -> Result<()> {
        self.blink = BlinkDetector::from_config(&self.blink_config, fps)?;
        self.fps = fps;
        Ok(())
    }

    /// Gabor features of `face` in `image`
    ///
    /// # Errors
    ///
    /// Returns an error if the face does not fit the image.
    pub fn face_features(&self, face: &Face, image: &GrayImage) -> Result<FeatureVector> {
        let (crop, local_face) = face.crop(image)?;
        let responses = self.bank.filter(&crop)?;
        extract(&local_face, &responses)
    }

    /// Analyse one frame.
    ///
    /// Detector failures and faces that can't be sampled are logged and
    /// leave the affected fields empty; the blink detector still sees the
    /// frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is empty.
    pub fn process_frame(&mut self, frame: usize, image: &GrayImage) -> Result<FrameResult> {
        if image.is_empty() {
            return Err(Error::InvalidInput(format!("Frame {frame} is empty")));
        }

        let face = if self.skip_blank_frames && is_blank(image) {
            log::debug!("Frame {frame} is blank");
            None
        } else {
            match self.detector.detect(frame, image) {
                Ok(faces) => select_primary(limit_faces(faces, self.max_faces)),
                Err(e) => {
                    log::warn!("Face detection failed on frame {frame}: {e}");
                    None
                }
            }
        };

        let features = face.as_ref().and_then(|f| match self.face_features(f, image) {
            Ok(features) => Some(features),
            Err(e) => {
                log::warn!("Skipping features of frame {frame}: {e}");
                None
            }
        });

        let emotions = match (&self.classifier, &features) {
            (Some(classifier), Some(features)) => match classifier.predict(features) {
                Ok(scores) => Some(scores),
                Err(e) => {
                    log::warn!("Skipping emotions of frame {frame}: {e}");
                    None
                }
            },
            _ => None,
        };

        let blink = self.blink.update(frame, face.as_ref().and_then(Face::eye_openness));
        if blink.blinked {
            log::info!("Blink at frame {frame} (total {}, {:.1}/min)", blink.count, blink.rate);
        }
        let distance = face.as_ref().and_then(|f| f.estimated_distance(&self.camera));

        Ok(FrameResult {
            frame,
            face,
            features,
            emotions,
            blink,
            distance,
        })
    }

    /// Analyse a whole stream from its first frame.
    ///
    /// Unreadable frames are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream keeps failing to deliver frames.
    pub fn run<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<VideoData> {
        let fps = source.fps().unwrap_or(self.fps);
        self.reset(fps)?;

        let mut frames = Vec::new();
        let mut consecutive_errors = 0;
        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    consecutive_errors += 1;
                    log::warn!("Skipping unreadable frame: {e}");
                    if consecutive_errors >= MAX_CONSECUTIVE_FRAME_ERRORS {
                        return Err(Error::InvalidInput(format!(
                            "{consecutive_errors} consecutive frames failed to read"
                        )));
                    }
                    continue;
                }
            };
            consecutive_errors = 0;

            match self.process_frame(frame.number, &frame.image) {
                Ok(result) => frames.push(result),
                Err(e) => log::warn!("Skipping frame {}: {e}", frame.number),
            }
            if frame.number > 0 && frame.number % 300 == 0 {
                log::info!("Processed {} frames", frame.number);
            }
        }

        let distances: Vec<Option<f64>> = frames.iter().map(|f| f.distance).collect();
        let distance_gradient = distance_gradients(&distances, fps);
        log::info!(
            "Processed {} frames: {} with a face, {} blinks",
            frames.len(),
            frames.iter().filter(|f| f.face.is_some()).count(),
            self.blink.count()
        );

        Ok(VideoData {
            fps,
            frames,
            distance_gradient,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::SoftmaxClassifier;

    #[test]
    fn test_distance_gradients_per_run() {
        let distances = [Some(10.0), Some(12.0), Some(16.0), None, Some(5.0), None, Some(1.0), Some(2.0)];
        let gradients = distance_gradients(&distances, 2.0);

        assert_eq!(gradients[0], Some(4.0));
        assert_eq!(gradients[1], Some(6.0));
        assert_eq!(gradients[2], Some(8.0));
        assert_eq!(gradients[3], None);
        assert_eq!(gradients[4], Some(0.0));
        assert_eq!(gradients[5], None);
        assert_eq!(gradients[6], Some(2.0));
        assert_eq!(gradients[7], Some(2.0));
    }

    #[test]
    fn test_mismatched_model_is_rejected() {
        struct NoFaces;
        impl FaceDetector for NoFaces {
            fn detect(&mut self, _frame: usize, _image: &GrayImage) -> Result<Vec<Face>> {
                Ok(Vec::new())
            }
        }

        let model = SoftmaxClassifier::new(
            vec![crate::emotion::Emotion::Neutral],
            vec![0.0; 10],
            vec![1.0; 10],
            vec![vec![0.0; 10]],
            vec![0.0],
        )
        .unwrap();

        let result = FramePipeline::new(&Config::default(), NoFaces, Some(model));
        assert!(matches!(
            result,
            Err(Error::ModelDimensionMismatch {
                expected: 10,
                actual: 2176
            })
        ));
    }
}
