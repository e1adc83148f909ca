//! Constants used throughout the library

use std::ops::Range;

/// Number of facial landmarks for full face
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Landmark indices of the 68-point face model
pub mod landmarks {
    use super::Range;

    /// Right eye contour, starting at the outer corner
    pub const RIGHT_EYE: Range<usize> = 36..42;
    /// Left eye contour, starting at the inner corner
    pub const LEFT_EYE: Range<usize> = 42..48;

    /// Sellion (top of the nose bridge)
    pub const SELLION: usize = 27;

    /// Menton (tip of the chin)
    pub const MENTON: usize = 8;
}

/// Pixels added around the landmarks' bounding box to form the face region
pub const FACE_REGION_MARGIN: i32 = 10;

/// Default frames per second assumption
pub const DEFAULT_FPS: f64 = 30.0;

/// Gabor bank wavelengths (pixels), as calibrated for face crops
pub const DEFAULT_GABOR_WAVELENGTHS: [f64; 4] = [4.0, 7.0, 10.0, 13.0];

/// Number of evenly spaced Gabor orientations in [0, π)
pub const DEFAULT_GABOR_ORIENTATIONS: usize = 8;

/// Gabor envelope bandwidth (octaves)
pub const GABOR_BANDWIDTH: f64 = 1.0;

/// Standard deviations covered by the kernel support
pub const GABOR_N_STDS: f64 = 3.0;

/// Eye aspect ratio below which the eyes count as closed
pub const DEFAULT_BLINK_THRESHOLD: f64 = 0.2;

/// Consecutive closed frames needed for a blink
pub const DEFAULT_BLINK_MIN_FRAMES: usize = 2;

/// Sliding window for the blink rate (seconds)
pub const DEFAULT_BLINK_WINDOW_SECS: f64 = 60.0;

/// Camera horizontal field of view (degrees) used for distance estimation
pub const DEFAULT_CAMERA_FOV_DEGREES: f64 = 60.0;

/// Camera horizontal resolution (pixels) used for distance estimation
pub const DEFAULT_CAMERA_WIDTH: f64 = 1280.0;

/// Average sellion-menton face length in centimetres
pub const AVERAGE_FACE_LENGTH_CM: f64 = 12.0;

/// Default softmax training parameters
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
pub const DEFAULT_TRAINING_EPOCHS: usize = 500;
pub const DEFAULT_L2_PENALTY: f64 = 1e-4;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
