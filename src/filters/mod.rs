//! Smoothing filters for per-frame scalar signals.
//!
//! Used to denoise the eye openness signal before blink detection.

/// Moving average filter for simple smoothing
pub mod moving_average;

/// Median filter for outlier rejection
pub mod median;

/// Exponential filter for responsive smoothing
pub mod exponential;

use crate::Result;

/// Trait for all signal filters
pub trait SignalFilter: Send + Sync {
    /// Feed one sample and get the filtered value
    fn apply(&mut self, value: f64) -> f64;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes through values unchanged
pub struct NoFilter;

impl SignalFilter for NoFilter {
    fn apply(&mut self, value: f64) -> f64 {
        value
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Create a signal filter from a spec such as `median:3` or `exponential:0.6`
///
/// Parameters after the colon override the defaults.
pub fn create_filter(spec: &str) -> Result<Box<dyn SignalFilter>> {
    let spec = spec.to_lowercase();
    let mut parts = spec.split(':');
    let kind = parts.next().unwrap_or_default();
    let param = parts.next();

    let window = |default: usize| -> Result<usize> {
        param.map_or(Ok(default), |p| {
            p.parse::<usize>()
                .map_err(|_| crate::Error::ConfigError(format!("Invalid window size in filter spec: {spec}")))
        })
    };

    match kind {
        "none" | "nofilter" => Ok(Box::new(NoFilter)),
        "moving_average" | "movingaverage" => {
            let size = window(3)?;
            check_window(size, false)?;
            Ok(Box::new(moving_average::MovingAverageFilter::new(size)))
        }
        "median" => {
            let size = window(3)?;
            check_window(size, true)?;
            Ok(Box::new(median::MedianFilter::new(size)))
        }
        "exponential" => {
            let alpha = param.map_or(Ok(0.5), |p| {
                p.parse::<f64>()
                    .map_err(|_| crate::Error::ConfigError(format!("Invalid alpha in filter spec: {spec}")))
            })?;
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(crate::Error::ConfigError(format!("Alpha must be in (0, 1]: {spec}")));
            }
            Ok(Box::new(exponential::ExponentialFilter::new(alpha)))
        }
        _ => Err(crate::Error::ConfigError(format!("Unknown filter type: {spec}"))),
    }
}

fn check_window(size: usize, odd: bool) -> Result<()> {
    if size == 0 || (odd && size % 2 == 0) {
        return Err(crate::Error::ConfigError(format!(
            "Filter window must be {}greater than 0, got {size}",
            if odd { "odd and " } else { "" }
        )));
    }
    Ok(())
}
