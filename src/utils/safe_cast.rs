//! Checked conversions between pixel coordinates and array indices

use crate::{Error, Result};

/// Safely convert usize to i32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds i32::MAX
pub fn usize_to_i32(value: usize) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Convert a non-negative i32 coordinate to an array index
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_usize(value: i32) -> Result<usize> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Negative value {value} cannot be used as an index")))
}

/// Map an (x, y) pixel coordinate to (row, col) indices of a `height` x `width` array.
///
/// Returns `None` when the coordinate falls outside the array.
#[must_use]
pub fn pixel_index(x: i32, y: i32, width: usize, height: usize) -> Option<(usize, usize)> {
    let col = usize::try_from(x).ok()?;
    let row = usize::try_from(y).ok()?;
    (col < width && row < height).then_some((row, col))
}
