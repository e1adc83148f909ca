//! Grayscale image conversion between raster images, `OpenCV` Mats and ndarray.
//!
//! Frames are handled as `Array2<f32>` with shape (height, width) and
//! intensities in [0, 255].

use crate::utils::safe_cast::{i32_to_usize, usize_to_i32};
use crate::{Error, Result};
use image::DynamicImage;
use ndarray::Array2;
use opencv::core::{Mat, MatTrait, MatTraitConst, Scalar, Vec3b, CV_64F};
use std::path::Path;

/// Grayscale frame, indexed `[[row, col]]`
pub type GrayImage = Array2<f32>;

/// ITU-R BT.601 luma weights
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Convert a decoded raster image to grayscale
///
/// Color images are reduced with BT.601 luma weights.
///
/// # Errors
/// * Returns error if the image has a zero dimension
pub fn dynamic_to_gray(image: &DynamicImage) -> Result<GrayImage> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    if width == 0 || height == 0 {
        return Err(Error::InvalidInput(format!(
            "Invalid image dimensions: {width}x{height}"
        )));
    }

    let data: Vec<f32> = rgb
        .pixels()
        .map(|p| LUMA_R * f32::from(p[0]) + LUMA_G * f32::from(p[1]) + LUMA_B * f32::from(p[2]))
        .collect();

    Array2::from_shape_vec((height as usize, width as usize), data)
        .map_err(|e| Error::InvalidInput(format!("Failed to create array from image: {e}")))
}

/// Load an image file and convert it to grayscale
///
/// # Errors
/// * Returns error if the file cannot be read or decoded
pub fn load_gray<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    let image = image::open(path.as_ref())?;
    dynamic_to_gray(&image)
}

/// Build a grayscale image from raw 8-bit row-major pixels
///
/// # Errors
/// * Returns error if `pixels.len() != width * height`
pub fn gray_from_u8(pixels: &[u8], width: usize, height: usize) -> Result<GrayImage> {
    if pixels.len() != width * height {
        return Err(Error::InvalidInput(format!(
            "Expected {} pixels for a {width}x{height} image, got {}",
            width * height,
            pixels.len()
        )));
    }
    Array2::from_shape_vec((height, width), pixels.iter().map(|&p| f32::from(p)).collect())
        .map_err(|e| Error::InvalidInput(format!("Failed to create array from pixels: {e}")))
}

/// Whether every pixel of the frame is black
#[must_use]
pub fn is_blank(image: &GrayImage) -> bool {
    image.iter().all(|&v| v == 0.0)
}

/// Convert a BGR `OpenCV` frame to grayscale
///
/// # Errors
/// * Returns error if the Mat is empty or not 8-bit with 1 or 3 channels
pub fn mat_to_gray(mat: &Mat) -> Result<GrayImage> {
    let rows = mat.rows();
    let cols = mat.cols();
    let channels = mat.channels();

    if rows <= 0 || cols <= 0 {
        return Err(Error::InvalidInput(format!("Invalid Mat dimensions: {rows}x{cols}")));
    }

    let mut gray = Array2::<f32>::zeros((i32_to_usize(rows)?, i32_to_usize(cols)?));
    for row in 0..rows {
        for col in 0..cols {
            let value = match channels {
                3 => {
                    let px = mat.at_2d::<Vec3b>(row, col)?;
                    LUMA_B * f32::from(px[0]) + LUMA_G * f32::from(px[1]) + LUMA_R * f32::from(px[2])
                }
                1 => f32::from(*mat.at_2d::<u8>(row, col)?),
                n => {
                    return Err(Error::InvalidInput(format!("Unsupported channel count: {n}")));
                }
            };
            gray[[i32_to_usize(row)?, i32_to_usize(col)?]] = value;
        }
    }

    Ok(gray)
}

/// Copy a 2D array into a single-channel `CV_64F` Mat
///
/// # Errors
/// * Returns error if the array is empty or too large for a Mat
pub fn array_to_mat_f64<A>(array: &Array2<A>) -> Result<Mat>
where
    A: Copy,
    f64: From<A>,
{
    let (rows, cols) = array.dim();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidInput(format!("Invalid array dimensions: {cols}x{rows}")));
    }

    let mut mat = Mat::new_rows_cols_with_default(usize_to_i32(rows)?, usize_to_i32(cols)?, CV_64F, Scalar::all(0.0))?;
    for ((row, col), &value) in array.indexed_iter() {
        *mat.at_2d_mut::<f64>(usize_to_i32(row)?, usize_to_i32(col)?)? = f64::from(value);
    }
    Ok(mat)
}

/// Copy a single-channel `CV_64F` Mat into an `f32` array
///
/// # Errors
/// * Returns error if the Mat is empty or not `CV_64F`
pub fn mat_f64_to_array(mat: &Mat) -> Result<Array2<f32>> {
    let rows = mat.rows();
    let cols = mat.cols();
    if rows <= 0 || cols <= 0 || mat.typ() != CV_64F {
        return Err(Error::InvalidInput(format!(
            "Expected a non-empty CV_64F Mat, got {rows}x{cols} of type {}",
            mat.typ()
        )));
    }

    let mut array = Array2::<f32>::zeros((i32_to_usize(rows)?, i32_to_usize(cols)?));
    for row in 0..rows {
        for col in 0..cols {
            #[allow(clippy::cast_possible_truncation)]
            let value = *mat.at_2d::<f64>(row, col)? as f32;
            array[[i32_to_usize(row)?, i32_to_usize(col)?]] = value;
        }
    }
    Ok(array)
}
