//! Bank of 2D Gabor filters.
//!
//! The bank holds one complex kernel per (wavelength, orientation) pair and
//! filters grayscale images into one response map per kernel. Kernels and
//! responses are ordered **wavelength-major, orientation-minor**: response
//! `w * orientations + o` belongs to wavelength `w` and orientation `o`.

/// Gabor kernel construction
pub mod kernel;

mod convolution;

pub use kernel::GaborKernel;

use crate::constants::{DEFAULT_GABOR_ORIENTATIONS, DEFAULT_GABOR_WAVELENGTHS};
use crate::utils::image_conversion::GrayImage;
use crate::{Error, Result};
use ndarray::{Array2, Zip};
use opencv::core::Mat;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Response of one kernel over a whole image, indexed `[[row, col]]`
pub type ResponseMap = Array2<f32>;

/// Which part of the complex filter response is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Magnitude of the real and imaginary responses
    #[default]
    Magnitude,
    /// Real (even-symmetric) response only
    Real,
}

/// How pixels beyond the image border are synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderMode {
    /// Mirror without repeating the edge pixel
    #[default]
    Reflect101,
    /// Treat outside pixels as black
    Zero,
}

/// `n` evenly spaced orientations `k * π / n` for `k` in `0..n`
#[must_use]
pub fn evenly_spaced_orientations(n: usize) -> Vec<f64> {
    (0..n).map(|k| k as f64 * PI / n as f64).collect()
}

/// A fixed bank of Gabor kernels
#[derive(Debug, Clone)]
pub struct GaborBank {
    wavelengths: Vec<f64>,
    orientations: Vec<f64>,
    kernels: Vec<GaborKernel>,
    response_mode: ResponseMode,
    border_mode: BorderMode,
}

impl GaborBank {
    /// Build the cross product of `wavelengths` and `orientations`
    ///
    /// # Errors
    ///
    /// Returns an error if either list is empty or holds duplicates, or if a
    /// kernel parameter is invalid.
    pub fn new(wavelengths: &[f64], orientations: &[f64]) -> Result<Self> {
        if wavelengths.is_empty() || orientations.is_empty() {
            return Err(Error::InvalidInput(
                "Gabor bank needs at least one wavelength and one orientation".to_string(),
            ));
        }
        check_distinct("wavelength", wavelengths)?;
        check_distinct("orientation", orientations)?;

        let kernels = wavelengths
            .iter()
            .flat_map(|&w| orientations.iter().map(move |&o| GaborKernel::new(w, o)))
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Built Gabor bank with {} kernels ({} wavelengths x {} orientations)",
            kernels.len(),
            wavelengths.len(),
            orientations.len()
        );

        Ok(Self {
            wavelengths: wavelengths.to_vec(),
            orientations: orientations.to_vec(),
            kernels,
            response_mode: ResponseMode::default(),
            border_mode: BorderMode::default(),
        })
    }

    /// The calibrated bank: wavelengths 4, 7, 10, 13 px and 8 orientations
    ///
    /// # Errors
    ///
    /// Never fails for the built-in parameters; returns Result for API consistency
    pub fn standard() -> Result<Self> {
        Self::new(
            &DEFAULT_GABOR_WAVELENGTHS,
            &evenly_spaced_orientations(DEFAULT_GABOR_ORIENTATIONS),
        )
    }

    #[must_use]
    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    #[must_use]
    pub fn with_border_mode(mut self, mode: BorderMode) -> Self {
        self.border_mode = mode;
        self
    }

    /// Number of kernels
    #[must_use]
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    #[must_use]
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    #[must_use]
    pub fn orientations(&self) -> &[f64] {
        &self.orientations
    }

    /// Kernels in response order
    #[must_use]
    pub fn kernels(&self) -> &[GaborKernel] {
        &self.kernels
    }

    /// Position of the (wavelength, orientation) pair in the response order
    #[must_use]
    pub fn kernel_index(&self, wavelength_idx: usize, orientation_idx: usize) -> Option<usize> {
        (wavelength_idx < self.wavelengths.len() && orientation_idx < self.orientations.len())
            .then(|| wavelength_idx * self.orientations.len() + orientation_idx)
    }

    #[must_use]
    pub fn response_mode(&self) -> ResponseMode {
        self.response_mode
    }

    #[must_use]
    pub fn border_mode(&self) -> BorderMode {
        self.border_mode
    }

    /// Filter a grayscale image with every kernel of the bank
    ///
    /// # Errors
    ///
    /// Returns an error if the image is empty or `OpenCV` filtering fails.
    pub fn filter(&self, image: &GrayImage) -> Result<Vec<ResponseMap>> {
        let (rows, cols) = image.dim();
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidInput(format!("Cannot filter an empty {cols}x{rows} image")));
        }

        let src = convolution::source_mat(image)?;
        self.kernels.iter().map(|kernel| self.respond(&src, kernel)).collect()
    }

    fn respond(&self, src: &Mat, kernel: &GaborKernel) -> Result<ResponseMap> {
        let (mut real, imag) = convolution::correlate_complex(src, kernel.real(), kernel.imag(), self.border_mode)?;

        if self.response_mode == ResponseMode::Magnitude {
            Zip::from(&mut real).and(&imag).for_each(|re, &im| *re = re.hypot(im));
        }
        Ok(real)
    }
}

impl Default for GaborBank {
    fn default() -> Self {
        let wavelengths = DEFAULT_GABOR_WAVELENGTHS.to_vec();
        let orientations = evenly_spaced_orientations(DEFAULT_GABOR_ORIENTATIONS);
        let kernels = wavelengths
            .iter()
            .flat_map(|&w| orientations.iter().map(move |&o| (w, o)))
            .filter_map(|(w, o)| GaborKernel::new(w, o).ok())
            .collect();

        Self {
            wavelengths,
            orientations,
            kernels,
            response_mode: ResponseMode::default(),
            border_mode: BorderMode::default(),
        }
    }
}

fn check_distinct(what: &str, values: &[f64]) -> Result<()> {
    for (i, a) in values.iter().enumerate() {
        if values[i + 1..].iter().any(|b| b == a) {
            return Err(Error::InvalidInput(format!("Duplicate Gabor {what}: {a}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_bank_layout() {
        let bank = GaborBank::standard().unwrap();
        assert_eq!(bank.len(), 32);
        assert_eq!(bank.kernel_index(1, 3), Some(11));
        assert_eq!(bank.kernel_index(4, 0), None);

        let k = &bank.kernels()[11];
        assert_eq!(k.wavelength(), 7.0);
        assert!((k.orientation() - 3.0 * PI / 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_default_matches_standard() {
        let default = GaborBank::default();
        let standard = GaborBank::standard().unwrap();
        assert_eq!(default.len(), standard.len());
        assert_eq!(default.wavelengths(), standard.wavelengths());
        assert_eq!(default.orientations(), standard.orientations());
    }

    #[test]
    fn test_rejects_bad_parameter_sets() {
        assert!(GaborBank::new(&[], &[0.0]).is_err());
        assert!(GaborBank::new(&[4.0], &[]).is_err());
        assert!(GaborBank::new(&[4.0, 4.0], &[0.0]).is_err());
        assert!(GaborBank::new(&[4.0], &[0.0, PI]).is_err());
    }

    #[test]
    fn test_filter_rejects_empty_image() {
        let bank = GaborBank::new(&[4.0], &[0.0]).unwrap();
        assert!(bank.filter(&Array2::zeros((0, 5))).is_err());
    }

    #[test]
    fn test_flat_image_has_no_real_texture_response() {
        // Reflected borders keep the image constant, so every pixel sees the kernel sum
        let bank = GaborBank::new(&[4.0], &[0.0])
            .unwrap()
            .with_response_mode(ResponseMode::Real);
        let image = Array2::from_elem((20, 20), 100.0f32);
        let responses = bank.filter(&image).unwrap();

        let kernel_sum: f64 = bank.kernels()[0].real().sum();
        let expected = (100.0 * kernel_sum) as f32;
        assert!(responses[0].iter().all(|&v| (v - expected).abs() < 1e-3));
    }

    #[test]
    fn test_orientation_selectivity() {
        // Vertical stripes with period 4 excite the 0 rad kernel (varying along x)
        let image = Array2::from_shape_fn((40, 40), |(_, c)| if (c / 2) % 2 == 0 { 255.0f32 } else { 0.0 });
        let bank = GaborBank::new(&[4.0], &[0.0, PI / 2.0]).unwrap();
        let responses = bank.filter(&image).unwrap();

        let across = responses[0][[20, 20]];
        let along = responses[1][[20, 20]];
        assert!(across > 5.0 * along, "across={across} along={along}");
    }
}
