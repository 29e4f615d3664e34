//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while transcoding, probing or muxing.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Transcode process failed.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Mux process failed.
    #[error("Mux failed: {reason}")]
    MuxFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Job timed out.
    #[error("Job timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Failed to parse FFprobe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a new conversion failed error with stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new mux failed error with stderr output.
    pub fn mux_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::MuxFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Whether the error means the tool itself is unavailable, as opposed to a
    /// failure specific to one file.
    pub fn is_tool_missing(&self) -> bool {
        matches!(
            self,
            Self::FfmpegNotFound { .. } | Self::FfprobeNotFound { .. }
        )
    }

    /// Captured stderr from the failed process, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::ConversionFailed { stderr, .. } | Self::MuxFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ConverterError::conversion_failed("FFmpeg exited with code: Some(1)", None);
        assert_eq!(
            err.to_string(),
            "Conversion failed: FFmpeg exited with code: Some(1)"
        );

        let err = ConverterError::Timeout { timeout_secs: 30 };
        assert_eq!(err.to_string(), "Job timed out after 30 seconds");
    }

    #[test]
    fn test_tool_missing() {
        let err = ConverterError::FfmpegNotFound {
            path: PathBuf::from("ffmpeg"),
        };
        assert!(err.is_tool_missing());
        assert!(!ConverterError::probe_failed("bad header").is_tool_missing());
    }

    #[test]
    fn test_stderr() {
        let err = ConverterError::mux_failed("exit 1", Some("Invalid data\n".to_string()));
        assert_eq!(err.stderr(), Some("Invalid data\n"));
        assert_eq!(ConverterError::probe_failed("x").stderr(), None);
    }
}
