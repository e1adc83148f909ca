//! Sampling of Gabor responses at facial landmarks.
//!
//! A feature vector holds one value per (kernel, landmark) pair, ordered
//! **kernel-major, landmark-minor**: element `k * landmarks + i` is response
//! map `k` read at landmark `i`. Coordinates are integer pixels, read without
//! interpolation. Classifiers trained on these vectors depend on this order.

use crate::face::Face;
use crate::gabor::ResponseMap;
use crate::utils::safe_cast::pixel_index;
use crate::{Error, Result};

/// Ordered per-frame feature values
pub type FeatureVector = Vec<f64>;

/// Column name of feature `index`, e.g. `resp.0042`
#[must_use]
pub fn feature_column(index: usize) -> String {
    format!("resp.{index:04}")
}

/// Column names for a vector of `len` features
#[must_use]
pub fn feature_columns(len: usize) -> Vec<String> {
    (0..len).map(feature_column).collect()
}

/// Sample every response map at all 68 landmarks of `face`
///
/// # Errors
///
/// Returns `Error::LandmarkOutOfBounds` if any landmark falls outside the
/// response maps, and `Error::InvalidInput` if there are no maps or their
/// sizes differ.
pub fn extract(face: &Face, responses: &[ResponseMap]) -> Result<FeatureVector> {
    let indices: Vec<usize> = (0..face.landmarks().len()).collect();
    extract_subset(face, responses, &indices)
}

/// Sample every response map at the selected landmarks only
///
/// Output order is kernel-major over `landmark_indices` in the given order.
///
/// # Errors
///
/// Same as [`extract`], plus `Error::InvalidInput` for a landmark index
/// beyond the face model.
pub fn extract_subset(face: &Face, responses: &[ResponseMap], landmark_indices: &[usize]) -> Result<FeatureVector> {
    let first = responses
        .first()
        .ok_or_else(|| Error::InvalidInput("No response maps to sample".to_string()))?;
    let (height, width) = first.dim();

    if let Some(map) = responses.iter().find(|m| m.dim() != (height, width)) {
        let (h, w) = map.dim();
        return Err(Error::InvalidInput(format!(
            "Response maps differ in size: {width}x{height} vs {w}x{h}"
        )));
    }

    let landmarks = face.landmarks();
    let positions = landmark_indices
        .iter()
        .map(|&index| {
            let point = landmarks.get(index).ok_or_else(|| {
                Error::InvalidInput(format!("Landmark index {index} beyond the {} point model", landmarks.len()))
            })?;
            pixel_index(point.x, point.y, width, height).ok_or(Error::LandmarkOutOfBounds {
                index,
                x: point.x,
                y: point.y,
                width,
                height,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut features = Vec::with_capacity(responses.len() * positions.len());
    for map in responses {
        features.extend(positions.iter().map(|&idx| f64::from(map[idx])));
    }
    Ok(features)
}
