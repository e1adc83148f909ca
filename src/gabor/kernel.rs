use crate::constants::{GABOR_BANDWIDTH, GABOR_N_STDS};
use crate::{Error, Result};
use ndarray::Array2;
use std::f64::consts::PI;

/// A complex 2D Gabor kernel at one wavelength and orientation
///
/// Coefficients follow the scikit-image `gabor_kernel` definition with a
/// bandwidth of one octave, a support of three standard deviations and a
/// Gaussian envelope normalized to unit area.
#[derive(Debug, Clone)]
pub struct GaborKernel {
    wavelength: f64,
    orientation: f64,
    real: Array2<f64>,
    imag: Array2<f64>,
}

/// Envelope sigma relative to the wavelength for a bandwidth in octaves
fn sigma_prefactor(bandwidth: f64) -> f64 {
    let b = 2f64.powf(bandwidth);
    (1.0 / PI) * (2f64.ln() / 2.0).sqrt() * (b + 1.0) / (b - 1.0)
}

impl GaborKernel {
    /// Build the kernel for a wavelength (pixels) and orientation (radians)
    ///
    /// # Errors
    ///
    /// Returns an error if the wavelength is not a positive finite number or
    /// the orientation is outside [0, π).
    #[allow(clippy::cast_possible_truncation)] // Half sizes are small positive integers
    pub fn new(wavelength: f64, orientation: f64) -> Result<Self> {
        if !wavelength.is_finite() || wavelength <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "Gabor wavelength must be positive, got {wavelength}"
            )));
        }
        if !orientation.is_finite() || !(0.0..PI).contains(&orientation) {
            return Err(Error::InvalidInput(format!(
                "Gabor orientation must be in [0, π), got {orientation}"
            )));
        }

        let frequency = 1.0 / wavelength;
        let sigma = sigma_prefactor(GABOR_BANDWIDTH) / frequency;
        let (st, ct) = orientation.sin_cos();

        // Equal sigmas make the support square
        let half = (GABOR_N_STDS * sigma * ct)
            .abs()
            .max((GABOR_N_STDS * sigma * st).abs())
            .max(1.0)
            .ceil() as i64;

        let size = (2 * half + 1) as usize;
        let norm = 1.0 / (2.0 * PI * sigma * sigma);

        let mut real = Array2::zeros((size, size));
        let mut imag = Array2::zeros((size, size));

        for ((row, col), re) in real.indexed_iter_mut() {
            let y = row as f64 - half as f64;
            let x = col as f64 - half as f64;
            let rot_x = x * ct + y * st;
            let rot_y = -x * st + y * ct;

            let envelope = norm * (-0.5 * (rot_x * rot_x + rot_y * rot_y) / (sigma * sigma)).exp();
            let (sin, cos) = (2.0 * PI * frequency * rot_x).sin_cos();

            *re = envelope * cos;
            imag[[row, col]] = envelope * sin;
        }

        Ok(Self {
            wavelength,
            orientation,
            real,
            imag,
        })
    }

    #[must_use]
    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    #[must_use]
    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    /// Real (even) part of the kernel
    #[must_use]
    pub fn real(&self) -> &Array2<f64> {
        &self.real
    }

    /// Imaginary (odd) part of the kernel
    #[must_use]
    pub fn imag(&self) -> &Array2<f64> {
        &self.imag
    }

    /// Kernel (rows, cols); both are odd
    #[must_use]
    pub fn dim(&self) -> (usize, usize) {
        self.real.dim()
    }
}
