use super::BorderMode;
use crate::utils::image_conversion::{array_to_mat_f64, mat_f64_to_array, GrayImage};
use crate::Result;
use ndarray::Array2;
use opencv::core::{self, Mat, Point};
use opencv::imgproc;

impl BorderMode {
    /// `OpenCV` border type: `gfedcb|abcdefgh|gfedcba` or zero padding
    fn cv_border(self) -> i32 {
        match self {
            BorderMode::Reflect101 => core::BORDER_REFLECT_101,
            BorderMode::Zero => core::BORDER_CONSTANT,
        }
    }
}

/// Convert a grayscale image once for filtering with every kernel
pub(crate) fn source_mat(image: &GrayImage) -> Result<Mat> {
    array_to_mat_f64(image)
}

/// Correlate `src` with a complex kernel, returning the real and imaginary
/// response maps at the image size.
///
/// The kernel anchor is its center. `filter2D` correlates, so the kernel is
/// not flipped.
pub(crate) fn correlate_complex(
    src: &Mat,
    kernel_re: &Array2<f64>,
    kernel_im: &Array2<f64>,
    border: BorderMode,
) -> Result<(Array2<f32>, Array2<f32>)> {
    let real = filter(src, kernel_re, border)?;
    let imag = filter(src, kernel_im, border)?;
    Ok((real, imag))
}

fn filter(src: &Mat, kernel: &Array2<f64>, border: BorderMode) -> Result<Array2<f32>> {
    let kernel = array_to_mat_f64(kernel)?;
    let mut dst = Mat::default();
    imgproc::filter_2d(
        src,
        &mut dst,
        core::CV_64F,
        &kernel,
        Point::new(-1, -1),
        0.0,
        border.cv_border(),
    )?;
    mat_f64_to_array(&dst)
}
