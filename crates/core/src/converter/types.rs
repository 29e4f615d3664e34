//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A request to transcode one media file into another container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeJob {
    /// Source media file.
    pub input_path: PathBuf,
    /// Destination file. The container is inferred from its extension.
    pub output_path: PathBuf,
}

impl TranscodeJob {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }
}

/// A request to combine the video of one file with the audio of another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuxJob {
    /// File providing the video stream (usually has no audio track).
    pub video_path: PathBuf,
    /// File providing the audio stream.
    pub audio_path: PathBuf,
    /// Combined output file.
    pub output_path: PathBuf,
}

impl MuxJob {
    pub fn new(
        video_path: impl Into<PathBuf>,
        audio_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            video_path: video_path.into(),
            audio_path: audio_path.into(),
            output_path: output_path.into(),
        }
    }
}

/// Progress update emitted while a transcode or mux is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// The file being written.
    pub output_path: PathBuf,
    /// Progress percentage (0-100).
    pub percent: f32,
    /// Current position in seconds.
    pub time_secs: f64,
    /// Total duration in seconds (if known).
    pub duration_secs: Option<f64>,
    /// Processing speed (e.g., "2.5x").
    pub speed: Option<String>,
}

/// Result of a successful transcode or mux.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Path to the written file.
    pub output_path: PathBuf,
    /// Size of the written file in bytes.
    pub output_size_bytes: u64,
    /// Wall-clock time spent in milliseconds.
    pub duration_ms: u64,
}

/// Stream information about a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// File path.
    pub path: PathBuf,
    /// Container format name as reported by ffprobe (e.g., "matroska").
    pub format: String,
    /// Duration in seconds (0.0 when unknown).
    pub duration_secs: f64,
    /// Number of audio streams.
    pub audio_streams: usize,
    /// Number of video streams.
    pub video_streams: usize,
}

impl MediaInfo {
    /// Whether the file carries at least one audio stream.
    pub fn has_audio(&self) -> bool {
        self.audio_streams > 0
    }

    /// Whether the file carries at least one video stream.
    pub fn has_video(&self) -> bool {
        self.video_streams > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(audio: usize, video: usize) -> MediaInfo {
        MediaInfo {
            path: PathBuf::from("/media/clip.mp4"),
            format: "mov".to_string(),
            duration_secs: 12.0,
            audio_streams: audio,
            video_streams: video,
        }
    }

    #[test]
    fn test_has_audio() {
        assert!(info(1, 1).has_audio());
        assert!(info(2, 0).has_audio());
        assert!(!info(0, 1).has_audio());
    }

    #[test]
    fn test_has_video() {
        assert!(info(0, 1).has_video());
        assert!(!info(1, 0).has_video());
    }

    #[test]
    fn test_mux_job_new() {
        let job = MuxJob::new("/out/a/v.mp4", "/out/a/s.mp4", "/out/a/a.mp4");
        assert_eq!(job.video_path, PathBuf::from("/out/a/v.mp4"));
        assert_eq!(job.audio_path, PathBuf::from("/out/a/s.mp4"));
        assert_eq!(job.output_path, PathBuf::from("/out/a/a.mp4"));
    }
}
