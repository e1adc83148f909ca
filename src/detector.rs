//! Face and landmark detection interface.
//!
//! Detection itself is an external capability. Implementations wrap a real
//! detector; [`ReplayDetector`] serves faces recorded in a face CSV so that
//! stored annotations can be reprocessed with new Gabor or blink settings.

use crate::face::Face;
use crate::records::{read_faces, FaceRecord};
use crate::utils::image_conversion::GrayImage;
use crate::Result;
use std::collections::HashMap;
use std::path::Path;

/// Locates faces and their 68 landmarks in a frame
pub trait FaceDetector {
    /// Detect faces in `image`, the frame numbered `frame`
    ///
    /// # Errors
    ///
    /// Returns an error if detection fails. No face is `Ok(vec![])`.
    fn detect(&mut self, frame: usize, image: &GrayImage) -> Result<Vec<Face>>;
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn detect(&mut self, frame: usize, image: &GrayImage) -> Result<Vec<Face>> {
        (**self).detect(frame, image)
    }
}

/// Keep the largest face, the subject closest to the camera
#[must_use]
pub fn select_primary(faces: Vec<Face>) -> Option<Face> {
    faces.into_iter().max_by_key(|f| f.region().area())
}

/// Keep at most `max_faces` faces, largest first
#[must_use]
pub fn limit_faces(mut faces: Vec<Face>, max_faces: usize) -> Vec<Face> {
    faces.sort_by_key(|f| std::cmp::Reverse(f.region().area()));
    faces.truncate(max_faces);
    faces
}

/// Replays faces keyed by frame number
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    faces: HashMap<usize, Face>,
}

impl ReplayDetector {
    #[must_use]
    pub fn new(records: Vec<FaceRecord>) -> Self {
        let faces: HashMap<usize, Face> = records
            .into_iter()
            .filter_map(|r| r.face.map(|face| (r.frame, face)))
            .collect();
        Self { faces }
    }

    /// Load a face record CSV. Set `legacy_zero_sentinel` for files that mark
    /// frames without a face with zeros.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or is malformed.
    pub fn from_csv<P: AsRef<Path>>(path: P, legacy_zero_sentinel: bool) -> Result<Self> {
        let records = read_faces(path.as_ref(), legacy_zero_sentinel)?;
        let detector = Self::new(records);
        log::info!(
            "Loaded {} recorded faces from {}",
            detector.len(),
            path.as_ref().display()
        );
        Ok(detector)
    }

    /// Number of frames with a face
    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl FaceDetector for ReplayDetector {
    fn detect(&mut self, frame: usize, _image: &GrayImage) -> Result<Vec<Face>> {
        Ok(self.faces.get(&frame).cloned().into_iter().collect())
    }
}
