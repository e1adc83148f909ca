//! Tests for reading frames from video files

use face_affect::app::open_source;
use face_affect::source::{FrameSource, VideoFile};
use std::path::Path;
use std::process::Command;

/// Generate a test video using ffmpeg
fn generate_test_video(output_path: &Path, duration_seconds: u32, fps: u32, resolution: &str) -> Result<(), String> {
    let output = Command::new("ffmpeg")
        .args([
            "-y",
            "-f",
            "lavfi",
            "-i",
            &format!("testsrc=duration={duration_seconds}:size={resolution}:rate={fps}"),
            "-vf",
            "format=yuv420p",
            "-c:v",
            "libx264",
            "-preset",
            "ultrafast",
        ])
        .arg(output_path)
        .output()
        .map_err(|e| format!("Failed to execute ffmpeg: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("ffmpeg failed: {stderr}"));
    }

    Ok(())
}

#[test]
fn test_video_frames_and_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    if let Err(e) = generate_test_video(&path, 2, 25, "160x120") {
        eprintln!("Skipping video test: {e}");
        return;
    }

    let mut video = VideoFile::open(&path).unwrap();
    assert_eq!(video.fps().map(f64::round), Some(25.0));

    let mut count = 0;
    while let Some(frame) = video.next_frame().unwrap() {
        assert_eq!(frame.number, count);
        assert_eq!(frame.image.dim(), (120, 160));
        count += 1;
    }
    assert_eq!(count, 50);
}

#[test]
fn test_video_through_open_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    if let Err(e) = generate_test_video(&path, 1, 10, "64x48") {
        eprintln!("Skipping video test: {e}");
        return;
    }

    let mut source = open_source(&path).unwrap();
    assert!(source.next_frame().unwrap().is_some());
}

#[test]
fn test_missing_video_fails() {
    assert!(VideoFile::open("/nonexistent/video.mp4").is_err());
}
