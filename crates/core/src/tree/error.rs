//! Error types for the tree engine.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which candidate class a directory lacked when pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingTrack {
    /// No file with an audio track was found.
    AudioBearing,
    /// No file without an audio track was found.
    AudioLess,
    /// Neither class was found.
    Both,
}

impl fmt::Display for MissingTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AudioBearing => write!(f, "audio-bearing"),
            Self::AudioLess => write!(f, "audio-less"),
            Self::Both => write!(f, "audio-bearing or audio-less"),
        }
    }
}

/// Errors reported by the tree converter and pair combiner.
///
/// Every variant describes one unit of work (a file or a directory). Causes
/// are kept as strings so reports can be cloned and compared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A directory's children could not be enumerated.
    #[error("Failed to list {path}: {reason}")]
    Listing { path: PathBuf, reason: String },

    /// A mirrored output directory could not be created.
    #[error("Failed to create directory {path}: {reason}")]
    CreateDirectory { path: PathBuf, reason: String },

    /// The transcoding service failed for one file.
    #[error("Failed to convert {path}: {reason}")]
    Transcode { path: PathBuf, reason: String },

    /// The stream-inspection service failed for one file.
    #[error("Failed to probe {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    /// The muxing service failed for one directory.
    #[error("Failed to combine files in {directory}: {reason}")]
    Mux { directory: PathBuf, reason: String },

    /// A stale combined output could not be deleted.
    #[error("Failed to delete {path}: {reason}")]
    Delete { path: PathBuf, reason: String },

    /// A directory lacked one of the two required candidate classes.
    #[error("No {missing} file found in {directory}")]
    PairingIncomplete {
        directory: PathBuf,
        missing: MissingTrack,
    },
}

impl TreeError {
    pub fn listing(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Listing {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error concerns a whole directory rather than a single file.
    pub fn is_directory_level(&self) -> bool {
        matches!(
            self,
            Self::Listing { .. }
                | Self::CreateDirectory { .. }
                | Self::Mux { .. }
                | Self::PairingIncomplete { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing_incomplete_display() {
        let err = TreeError::PairingIncomplete {
            directory: PathBuf::from("/out/show"),
            missing: MissingTrack::AudioLess,
        };
        assert_eq!(err.to_string(), "No audio-less file found in /out/show");
        assert!(err.is_directory_level());
    }

    #[test]
    fn test_listing_constructor() {
        let err = TreeError::listing("/in/broken", "Permission denied: /in/broken");
        assert_eq!(
            err.to_string(),
            "Failed to list /in/broken: Permission denied: /in/broken"
        );
        assert!(!TreeError::Transcode {
            path: PathBuf::from("/in/a.mkv"),
            reason: "exit 1".to_string(),
        }
        .is_directory_level());
    }
}
