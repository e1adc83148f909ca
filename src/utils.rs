//! Utility functions for image conversion and numeric series.

pub mod image_conversion;
pub mod safe_cast;

/// Numerical gradient of a uniformly sampled series.
///
/// Interior points use central differences, the two ends one-sided
/// differences. Series shorter than two samples have a zero gradient.
#[must_use]
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let mut out = Vec::with_capacity(n);
    out.push(values[1] - values[0]);
    for i in 1..n - 1 {
        out.push((values[i + 1] - values[i - 1]) / 2.0);
    }
    out.push(values[n - 1] - values[n - 2]);
    out
}
