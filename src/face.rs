//! Face geometry: region, 68 landmarks and the measures derived from them.

use crate::constants::{
    landmarks, AVERAGE_FACE_LENGTH_CM, DEFAULT_CAMERA_FOV_DEGREES, DEFAULT_CAMERA_WIDTH, EPSILON,
    FACE_REGION_MARGIN, NUM_FACIAL_LANDMARKS,
};
use crate::utils::image_conversion::GrayImage;
use crate::utils::safe_cast::{i32_to_usize, usize_to_i32};
use crate::{Error, Result};
use ndarray::s;
use serde::{Deserialize, Serialize};

/// Integer pixel coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[must_use]
    pub fn distance(&self, other: &Point) -> f64 {
        f64::from(self.x - other.x).hypot(f64::from(self.y - other.y))
    }
}

/// Axis-aligned rectangle with inclusive corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Region {
    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.right - self.left + 1
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.bottom - self.top + 1
    }

    /// Area in pixels (zero for degenerate regions)
    #[must_use]
    pub fn area(&self) -> i64 {
        i64::from(self.width().max(0)) * i64::from(self.height().max(0))
    }

    /// Region grown by `margin` pixels on every side
    #[must_use]
    pub fn expanded(&self, margin: i32) -> Self {
        Self::new(self.left - margin, self.top - margin, self.right + margin, self.bottom + margin)
    }

    #[must_use]
    pub fn contains(&self, point: &Point) -> bool {
        (self.left..=self.right).contains(&point.x) && (self.top..=self.bottom).contains(&point.y)
    }

    /// Bounding rectangle of a set of points
    #[must_use]
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        Some(points.iter().fold(Self::new(first.x, first.y, first.x, first.y), |r, p| Self {
            left: r.left.min(p.x),
            top: r.top.min(p.y),
            right: r.right.max(p.x),
            bottom: r.bottom.max(p.y),
        }))
    }
}

/// Pinhole camera parameters used to estimate the face distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    /// Horizontal field of view in degrees
    pub fov_degrees: f64,
    /// Horizontal resolution in pixels
    pub resolution_width: f64,
}

impl Default for CameraModel {
    fn default() -> Self {
        Self {
            fov_degrees: DEFAULT_CAMERA_FOV_DEGREES,
            resolution_width: DEFAULT_CAMERA_WIDTH,
        }
    }
}

impl CameraModel {
    /// Focal length in pixels
    #[must_use]
    pub fn focal_length(&self) -> f64 {
        (self.resolution_width * 0.5) / (self.fov_degrees.to_radians() * 0.5).tan()
    }
}

/// A detected face: its region and the 68 ordered landmarks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    region: Region,
    landmarks: Vec<Point>,
}

impl Face {
    /// Create a face from a region and its landmarks
    ///
    /// # Errors
    ///
    /// Returns an error if there are not exactly 68 landmarks, or if a
    /// landmark lies outside the region expanded by the face margin.
    pub fn new(region: Region, landmarks: Vec<Point>) -> Result<Self> {
        if landmarks.len() != NUM_FACIAL_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Expected {NUM_FACIAL_LANDMARKS} landmarks, got {}",
                landmarks.len()
            )));
        }

        let bounds = region.expanded(FACE_REGION_MARGIN);
        if let Some((index, point)) = landmarks.iter().enumerate().find(|(_, p)| !bounds.contains(p)) {
            return Err(Error::InvalidInput(format!(
                "Landmark {index} at ({}, {}) lies outside face region {region:?}",
                point.x, point.y
            )));
        }

        Ok(Self { region, landmarks })
    }

    /// Create a face whose region is the landmarks' bounding box plus the
    /// face margin, clamped to a `width` x `height` image.
    ///
    /// # Errors
    ///
    /// Returns an error if the landmark count is wrong or the image is empty.
    pub fn from_landmarks(landmarks: Vec<Point>, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(format!("Invalid image dimensions: {width}x{height}")));
        }
        let bbox = Region::bounding(&landmarks)
            .ok_or_else(|| Error::InvalidInput("Face has no landmarks".to_string()))?;

        let max_x = usize_to_i32(width)? - 1;
        let max_y = usize_to_i32(height)? - 1;
        let region = Region::new(
            (bbox.left - FACE_REGION_MARGIN).max(0),
            (bbox.top - FACE_REGION_MARGIN).max(0),
            (bbox.right + FACE_REGION_MARGIN).min(max_x),
            (bbox.bottom + FACE_REGION_MARGIN).min(max_y),
        );

        Self::new(region, landmarks)
    }

    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    #[must_use]
    pub fn landmarks(&self) -> &[Point] {
        &self.landmarks
    }

    /// Crop the face region out of `image`.
    ///
    /// The region is first clamped to the image. The returned face has its
    /// region and landmarks translated into the crop's coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the region does not overlap the image.
    pub fn crop(&self, image: &GrayImage) -> Result<(GrayImage, Face)> {
        let (rows, cols) = image.dim();
        let max_x = usize_to_i32(cols)? - 1;
        let max_y = usize_to_i32(rows)? - 1;

        let left = self.region.left.max(0);
        let top = self.region.top.max(0);
        let right = self.region.right.min(max_x);
        let bottom = self.region.bottom.min(max_y);

        if left > right || top > bottom {
            return Err(Error::InvalidInput(format!(
                "Face region {:?} does not overlap the {cols}x{rows} image",
                self.region
            )));
        }

        let cropped = image
            .slice(s![
                i32_to_usize(top)?..=i32_to_usize(bottom)?,
                i32_to_usize(left)?..=i32_to_usize(right)?
            ])
            .to_owned();

        let adjusted = Face {
            region: Region::new(
                self.region.left - left,
                self.region.top - top,
                self.region.right - left,
                self.region.bottom - top,
            ),
            landmarks: self
                .landmarks
                .iter()
                .map(|p| Point::new(p.x - left, p.y - top))
                .collect(),
        };

        Ok((cropped, adjusted))
    }

    /// Mean eye aspect ratio of both eyes.
    ///
    /// For each eye the two vertical eyelid distances are divided by twice
    /// the horizontal eye width. Open eyes measure around 0.3, closed eyes
    /// approach 0. Returns `None` when an eye has zero width.
    #[must_use]
    pub fn eye_openness(&self) -> Option<f64> {
        let right = self.eye_aspect_ratio(landmarks::RIGHT_EYE.start)?;
        let left = self.eye_aspect_ratio(landmarks::LEFT_EYE.start)?;
        Some((right + left) / 2.0)
    }

    fn eye_aspect_ratio(&self, first: usize) -> Option<f64> {
        let p = &self.landmarks[first..first + 6];
        let width = p[0].distance(&p[3]);
        if width < EPSILON {
            return None;
        }
        Some((p[1].distance(&p[5]) + p[2].distance(&p[4])) / (2.0 * width))
    }

    /// Estimated face-to-camera distance in centimetres, from the
    /// sellion-menton length and an average adult face length.
    #[must_use]
    pub fn estimated_distance(&self, camera: &CameraModel) -> Option<f64> {
        let face_length = self.landmarks[landmarks::SELLION].distance(&self.landmarks[landmarks::MENTON]);
        if face_length < EPSILON {
            return None;
        }
        Some(AVERAGE_FACE_LENGTH_CM * camera.focal_length() / face_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn grid_landmarks(x0: i32, y0: i32) -> Vec<Point> {
        (0..68).map(|i| Point::new(x0 + (i % 10) * 3, y0 + (i / 10) * 3)).collect()
    }

    #[test]
    fn test_region_geometry() {
        let r = Region::new(10, 20, 19, 24);
        assert_eq!(r.width(), 10);
        assert_eq!(r.height(), 5);
        assert_eq!(r.area(), 50);
        assert!(r.contains(&Point::new(19, 24)));
        assert!(!r.contains(&Point::new(20, 24)));
        assert_eq!(r.expanded(2), Region::new(8, 18, 21, 26));
    }

    #[test]
    fn test_face_requires_68_landmarks() {
        let region = Region::new(0, 0, 100, 100);
        assert!(Face::new(region, vec![Point::new(5, 5); 67]).is_err());
        assert!(Face::new(region, vec![Point::new(5, 5); 68]).is_ok());
    }

    #[test]
    fn test_face_rejects_landmark_far_outside_region() {
        let region = Region::new(0, 0, 50, 50);
        let mut marks = vec![Point::new(5, 5); 68];
        marks[12] = Point::new(60, 5);
        assert!(Face::new(region, marks.clone()).is_ok());
        marks[12] = Point::new(61, 5);
        assert!(Face::new(region, marks).is_err());
    }

    #[test]
    fn test_from_landmarks_adds_clamped_margin() {
        let face = Face::from_landmarks(grid_landmarks(5, 40), 100, 100).unwrap();
        // bbox: x 5..=32, y 40..=58
        assert_eq!(*face.region(), Region::new(0, 30, 42, 68));
    }

    #[test]
    fn test_crop_translates_landmarks() {
        let mut image = Array2::<f32>::zeros((100, 100));
        image[[45, 20]] = 7.0;
        let face = Face::from_landmarks(grid_landmarks(20, 45), 100, 100).unwrap();

        let (crop, adjusted) = face.crop(&image).unwrap();
        let region = face.region();

        assert_eq!(crop.dim(), (region.height() as usize, region.width() as usize));
        assert_eq!(adjusted.region().left, 0);
        assert_eq!(adjusted.region().top, 0);
        let first = adjusted.landmarks()[0];
        assert_eq!(first, Point::new(20 - region.left, 45 - region.top));
        assert_eq!(crop[[first.y as usize, first.x as usize]], 7.0);
    }

    #[test]
    fn test_eye_openness() {
        let mut marks = vec![Point::new(50, 50); 68];
        for first in [36usize, 42] {
            let dx = if first == 36 { 0 } else { 40 };
            marks[first] = Point::new(10 + dx, 50);
            marks[first + 1] = Point::new(13 + dx, 47);
            marks[first + 2] = Point::new(17 + dx, 47);
            marks[first + 3] = Point::new(20 + dx, 50);
            marks[first + 4] = Point::new(17 + dx, 53);
            marks[first + 5] = Point::new(13 + dx, 53);
        }
        let face = Face::new(Region::new(0, 0, 100, 100), marks).unwrap();
        assert!((face.eye_openness().unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_estimated_distance() {
        let mut marks = vec![Point::new(50, 50); 68];
        marks[landmarks::SELLION] = Point::new(50, 20);
        marks[landmarks::MENTON] = Point::new(50, 80);
        let face = Face::new(Region::new(0, 0, 100, 100), marks).unwrap();

        let camera = CameraModel::default();
        let expected = 12.0 * camera.focal_length() / 60.0;
        assert!((face.estimated_distance(&camera).unwrap() - expected).abs() < 1e-9);
    }
}
