//! Frame sources: image sequences, in-memory frames and video files.

use crate::utils::image_conversion::{load_gray, mat_to_gray, GrayImage};
use crate::{Error, Result};
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// File extensions read by [`ImageSequence`]
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// One grayscale frame and its position in the stream
#[derive(Debug, Clone)]
pub struct Frame {
    pub number: usize,
    pub image: GrayImage,
}

/// A stream of frames
pub trait FrameSource {
    /// Frame rate, if the source knows it
    fn fps(&self) -> Option<f64>;

    /// Next frame, or `None` at the end of the stream
    ///
    /// # Errors
    ///
    /// Returns an error if a frame can't be read. The source moves past
    /// the failed frame, so reading can continue.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Numbered image files in a directory, read in file name order
#[derive(Debug)]
pub struct ImageSequence {
    files: Vec<PathBuf>,
    position: usize,
    fps: Option<f64>,
}

impl ImageSequence {
    /// Collect the images of `dir`
    ///
    /// # Errors
    ///
    /// Returns an error if the directory can't be listed or holds no images.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()));
            if path.is_file() && is_image {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(Error::InvalidInput(format!("No images found in {}", dir.display())));
        }
        files.sort();
        log::info!("Found {} frames in {}", files.len(), dir.display());

        Ok(Self {
            files,
            position: 0,
            fps: None,
        })
    }

    /// Declare the capture frame rate
    #[must_use]
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    /// Number of frames in the sequence
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequence {
    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        let number = self.position;
        self.position += 1;

        let image = load_gray(path)?;
        Ok(Some(Frame { number, image }))
    }
}

/// Frames already held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFrames {
    frames: VecDeque<GrayImage>,
    next_number: usize,
    fps: Option<f64>,
}

impl MemoryFrames {
    #[must_use]
    pub fn new(frames: Vec<GrayImage>, fps: Option<f64>) -> Self {
        Self {
            frames: frames.into(),
            next_number: 0,
            fps,
        }
    }
}

impl FrameSource for MemoryFrames {
    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front().map(|image| {
            let number = self.next_number;
            self.next_number += 1;
            Frame { number, image }
        }))
    }
}

/// Video file read through `OpenCV`
pub struct VideoFile {
    capture: VideoCapture,
    next_number: usize,
    fps: Option<f64>,
}

impl VideoFile {
    /// Open a video file
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Opening video file: {}", path.display());
        let capture = VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::InvalidInput(format!("Cannot open video file {}", path.display())));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let fps = (fps.is_finite() && fps > 0.0).then_some(fps);
        if fps.is_none() {
            log::warn!("{} does not report a frame rate", path.display());
        }

        Ok(Self {
            capture,
            next_number: 0,
            fps,
        })
    }
}

impl FrameSource for VideoFile {
    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();
        if !self.capture.read(&mut mat)? || mat.empty() {
            return Ok(None);
        }
        let number = self.next_number;
        self.next_number += 1;

        Ok(Some(Frame {
            number,
            image: mat_to_gray(&mat)?,
        }))
    }
}
