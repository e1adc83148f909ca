//! Eye blink detection from a per-frame eye openness signal.
//!
//! The detector is a small state machine:
//!
//! ```text
//! Open --(openness < threshold)--> Closing(n) --(n reaches N)--> Closed
//!   ^                                  |                            |
//!   +------(openness >= threshold)-----+                            |
//!   +------(openness >= threshold, emits one blink)-----------------+
//! ```
//!
//! A dip shorter than N frames returns to `Open` without an event. Frames
//! without a face are gaps: they keep the current state and only move the
//! blink rate window forward.

use crate::config::BlinkConfig;
use crate::filters::{create_filter, NoFilter, SignalFilter};
use crate::{Error, Result};
use std::collections::VecDeque;

/// Eye state tracked between frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeState {
    /// Eyes open
    Open,
    /// Below threshold for this many consecutive frames, not yet a blink
    Closing(usize),
    /// Closed long enough to count as a blink once they reopen
    Closed,
}

/// Result of feeding one frame to the detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkUpdate {
    /// A blink ended on this frame
    pub blinked: bool,
    /// Blinks counted since the stream started
    pub count: usize,
    /// Blinks per minute within the sliding window
    pub rate: f64,
    /// State after this frame
    pub state: EyeState,
}

/// Stateful blink detector for one subject's frame stream
pub struct BlinkDetector {
    threshold: f64,
    min_closed_frames: usize,
    fps: f64,
    window_secs: f64,
    smoothing: Box<dyn SignalFilter>,
    state: EyeState,
    count: usize,
    /// One entry per blink for the life of the stream, cleared by `reset`
    blink_frames: Vec<usize>,
    window: VecDeque<f64>,
}

impl BlinkDetector {
    /// Create a detector without signal smoothing
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter is out of range (non-finite threshold,
    /// zero closed frames, non-positive fps or window).
    pub fn new(threshold: f64, min_closed_frames: usize, fps: f64, window_secs: f64) -> Result<Self> {
        if !threshold.is_finite() {
            return Err(Error::InvalidInput(format!("Blink threshold must be finite, got {threshold}")));
        }
        if min_closed_frames == 0 {
            return Err(Error::InvalidInput("Blink needs at least one closed frame".to_string()));
        }
        if !(fps.is_finite() && fps > 0.0) {
            return Err(Error::InvalidInput(format!("Frame rate must be positive, got {fps}")));
        }
        if !(window_secs.is_finite() && window_secs > 0.0) {
            return Err(Error::InvalidInput(format!("Blink rate window must be positive, got {window_secs}")));
        }

        Ok(Self {
            threshold,
            min_closed_frames,
            fps,
            window_secs,
            smoothing: Box::new(NoFilter),
            state: EyeState::Open,
            count: 0,
            blink_frames: Vec::new(),
            window: VecDeque::new(),
        })
    }

    /// Create a detector from configuration for a stream at `fps`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &BlinkConfig, fps: f64) -> Result<Self> {
        let mut detector = Self::new(config.threshold, config.min_closed_frames, fps, config.window_secs)?;
        detector.smoothing = create_filter(&config.smoothing)?;
        Ok(detector)
    }

    /// Smooth the openness signal before thresholding
    #[must_use]
    pub fn with_smoothing(mut self, filter: Box<dyn SignalFilter>) -> Self {
        self.smoothing = filter;
        self
    }

    /// Feed the eye openness of `frame`, or `None` when no face was found
    pub fn update(&mut self, frame: usize, openness: Option<f64>) -> BlinkUpdate {
        let mut blinked = false;

        if let Some(value) = openness.filter(|v| v.is_finite()) {
            let value = self.smoothing.apply(value);
            let closed = value < self.threshold;

            self.state = match (self.state, closed) {
                (EyeState::Open, true) | (EyeState::Closing(_), true) => {
                    let frames = match self.state {
                        EyeState::Closing(n) => n + 1,
                        _ => 1,
                    };
                    if frames >= self.min_closed_frames {
                        EyeState::Closed
                    } else {
                        EyeState::Closing(frames)
                    }
                }
                (EyeState::Closed, true) => EyeState::Closed,
                (EyeState::Closed, false) => {
                    blinked = true;
                    EyeState::Open
                }
                (EyeState::Open | EyeState::Closing(_), false) => EyeState::Open,
            };
        }

        let now = self.frame_time(frame);
        if blinked {
            self.count += 1;
            self.blink_frames.push(frame);
            self.window.push_back(now);
            log::debug!("Blink #{} at frame {frame} ({now:.2}s)", self.count);
        }

        let oldest = now - self.window_secs;
        while self.window.front().is_some_and(|&t| t < oldest) {
            self.window.pop_front();
        }

        BlinkUpdate {
            blinked,
            count: self.count,
            rate: self.rate(),
            state: self.state,
        }
    }

    /// Blinks per minute within the current window
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.window.len() as f64 * 60.0 / self.window_secs
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn state(&self) -> EyeState {
        self.state
    }

    /// Frames on which a blink ended, since creation or the last [`reset`].
    ///
    /// Holds every blink of the stream, about 1200 per hour at typical
    /// rates. Call [`reset`] between streams.
    ///
    /// [`reset`]: BlinkDetector::reset
    #[must_use]
    pub fn blink_frames(&self) -> &[usize] {
        &self.blink_frames
    }

    /// Forget all state, as at the start of a new stream
    pub fn reset(&mut self) {
        self.state = EyeState::Open;
        self.count = 0;
        self.blink_frames.clear();
        self.window.clear();
        self.smoothing.reset();
    }

    fn frame_time(&self, frame: usize) -> f64 {
        frame as f64 / self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: f64 = 0.3;
    const SHUT: f64 = 0.1;

    fn feed(detector: &mut BlinkDetector, start: usize, values: &[Option<f64>]) -> Vec<BlinkUpdate> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| detector.update(start + i, *v))
            .collect()
    }

    #[test]
    fn test_state_transitions() {
        let mut detector = BlinkDetector::new(0.2, 3, 30.0, 60.0).unwrap();

        assert_eq!(detector.update(0, Some(OPEN)).state, EyeState::Open);
        assert_eq!(detector.update(1, Some(SHUT)).state, EyeState::Closing(1));
        assert_eq!(detector.update(2, Some(SHUT)).state, EyeState::Closing(2));
        assert_eq!(detector.update(3, Some(SHUT)).state, EyeState::Closed);
        assert_eq!(detector.update(4, Some(SHUT)).state, EyeState::Closed);

        let update = detector.update(5, Some(OPEN));
        assert!(update.blinked);
        assert_eq!(update.state, EyeState::Open);
        assert_eq!(update.count, 1);
        assert_eq!(detector.blink_frames(), &[5]);
    }

    #[test]
    fn test_single_frame_blink_threshold() {
        let mut detector = BlinkDetector::new(0.2, 1, 30.0, 60.0).unwrap();
        assert_eq!(detector.update(0, Some(SHUT)).state, EyeState::Closed);
        assert!(detector.update(1, Some(OPEN)).blinked);
    }

    #[test]
    fn test_value_at_threshold_counts_as_open() {
        let mut detector = BlinkDetector::new(0.2, 1, 30.0, 60.0).unwrap();
        assert_eq!(detector.update(0, Some(0.2)).state, EyeState::Open);
    }

    #[test]
    fn test_gap_preserves_state() {
        let mut detector = BlinkDetector::new(0.2, 2, 30.0, 60.0).unwrap();
        let updates = feed(
            &mut detector,
            0,
            &[Some(OPEN), Some(SHUT), None, None, Some(SHUT), None, Some(OPEN)],
        );

        assert_eq!(updates[2].state, EyeState::Closing(1));
        assert_eq!(updates[4].state, EyeState::Closed);
        assert_eq!(updates[5].state, EyeState::Closed);
        assert!(updates[6].blinked);
        assert_eq!(detector.count(), 1);
    }

    #[test]
    fn test_non_finite_openness_is_a_gap() {
        let mut detector = BlinkDetector::new(0.2, 1, 30.0, 60.0).unwrap();
        detector.update(0, Some(SHUT));
        let update = detector.update(1, Some(f64::NAN));
        assert_eq!(update.state, EyeState::Closed);
        assert!(!update.blinked);
    }

    #[test]
    fn test_rate_window_expires_old_blinks() {
        // 1 fps, 10 s window
        let mut detector = BlinkDetector::new(0.2, 1, 1.0, 10.0).unwrap();
        feed(&mut detector, 0, &[Some(SHUT), Some(OPEN)]);
        assert_eq!(detector.rate(), 6.0);

        // Still inside the window at t = 11 (blink at t = 1)
        let update = detector.update(11, None);
        assert_eq!(update.rate, 6.0);

        // Expired at t = 12
        let update = detector.update(12, None);
        assert_eq!(update.rate, 0.0);
        assert_eq!(update.count, 1);
    }

    #[test]
    fn test_smoothing_suppresses_single_frame_dip() {
        let mut detector = BlinkDetector::new(0.2, 1, 30.0, 60.0)
            .unwrap()
            .with_smoothing(create_filter("median:3").unwrap());

        let updates = feed(&mut detector, 0, &[Some(OPEN), Some(OPEN), Some(SHUT), Some(OPEN), Some(OPEN)]);
        assert!(updates.iter().all(|u| !u.blinked));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(BlinkDetector::new(f64::NAN, 2, 30.0, 60.0).is_err());
        assert!(BlinkDetector::new(0.2, 0, 30.0, 60.0).is_err());
        assert!(BlinkDetector::new(0.2, 2, 0.0, 60.0).is_err());
        assert!(BlinkDetector::new(0.2, 2, 30.0, -1.0).is_err());
    }

    #[test]
    fn test_blink_frames_outlive_rate_window() {
        let mut detector = BlinkDetector::new(0.2, 1, 1.0, 10.0).unwrap();
        feed(&mut detector, 0, &[Some(SHUT), Some(OPEN)]);
        feed(&mut detector, 2, &[Some(OPEN); 30]);

        assert_eq!(detector.rate(), 0.0);
        assert_eq!(detector.count(), 1);
        assert_eq!(detector.blink_frames(), &[1]);

        detector.reset();
        assert!(detector.blink_frames().is_empty());
    }

    #[test]
    fn test_reset() {
        let mut detector = BlinkDetector::new(0.2, 1, 30.0, 60.0).unwrap();
        feed(&mut detector, 0, &[Some(SHUT), Some(OPEN), Some(SHUT)]);
        detector.reset();

        assert_eq!(detector.count(), 0);
        assert_eq!(detector.state(), EyeState::Open);
        assert_eq!(detector.rate(), 0.0);
        assert!(detector.blink_frames().is_empty());
    }
}
