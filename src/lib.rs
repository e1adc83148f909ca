//! Face affect analysis library: emotions and eye blinks from face landmarks.
//!
//! For every frame of a stream the library takes a detected face (region
//! plus 68 landmarks) and:
//! 1. Crops the face and filters it with a bank of 2D Gabor kernels
//! 2. Samples every response map at the landmarks into a feature vector
//! 3. Classifies the feature vector into emotion probabilities
//! 4. Tracks eye openness to count blinks and the blink rate per minute
//!
//! Face detection is external: implement [`detector::FaceDetector`] or
//! replay recorded faces with [`detector::ReplayDetector`]. Results are
//! stored as CSV records (see [`records`]).
//!
//! # Examples
//!
//! ## Gabor Features
//!
//! ```no_run
//! use face_affect::{face::Face, features, gabor::GaborBank, utils::image_conversion::load_gray};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let image = load_gray("frame_0001.png")?;
//! # let face: Face = unimplemented!();
//! // `face` comes from a face detector
//! let (crop, local_face) = face.crop(&image)?;
//!
//! // 4 wavelengths x 8 orientations
//! let bank = GaborBank::standard()?;
//! let responses = bank.filter(&crop)?;
//!
//! // 68 x 32 values, kernel-major
//! let vector = features::extract(&local_face, &responses)?;
//! println!("{} features", vector.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Blink Detection
//!
//! ```
//! use face_affect::blink::BlinkDetector;
//!
//! # fn main() -> face_affect::Result<()> {
//! // Threshold 0.2, two closed frames, 30 fps, one minute window
//! let mut detector = BlinkDetector::new(0.2, 2, 30.0, 60.0)?;
//!
//! let openness = [0.31, 0.12, 0.08, 0.29, 0.30];
//! for (frame, value) in openness.iter().enumerate() {
//!     let update = detector.update(frame, Some(*value));
//!     if update.blinked {
//!         println!("Blink at frame {frame}, {:.1} per minute", update.rate);
//!     }
//! }
//! assert_eq!(detector.count(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Complete Pipeline Example
//!
//! ```no_run
//! use face_affect::{
//!     config::Config,
//!     detector::ReplayDetector,
//!     emotion::SoftmaxClassifier,
//!     pipeline::FramePipeline,
//!     source::ImageSequence,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let detector = ReplayDetector::from_csv("subject01/faces.csv", false)?;
//! let model = SoftmaxClassifier::load("models/emotions.yaml")?;
//!
//! let mut pipeline = FramePipeline::new(&config, detector, Some(model))?;
//! let mut frames = ImageSequence::open("subject01")?.with_fps(30.0);
//! let data = pipeline.run(&mut frames)?;
//!
//! for frame in &data.frames {
//!     if let Some(scores) = &frame.emotions {
//!         println!("{}: {}", frame.frame, scores.dominant());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Gabor kernels, filter bank and convolution
pub mod gabor;

/// Sampling of Gabor responses at facial landmarks
pub mod features;

/// Face region, landmarks and derived measures
pub mod face;

/// Eye blink detection and blink rate
pub mod blink;

/// Emotion labels and classifiers
pub mod emotion;

/// Face detection interface and recorded-face replay
pub mod detector;

/// Frame sources
pub mod source;

/// Per-frame analysis pipeline
pub mod pipeline;

/// CSV record files
pub mod records;

/// Signal filtering algorithms for smoothing eye openness
pub mod filters;

/// Utility functions for image conversion and numeric series
pub mod utils;

/// Error types and result handling
pub mod error;

/// Batch application
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
