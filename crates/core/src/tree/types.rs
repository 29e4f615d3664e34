//! Outcome types for the tree engine.

use std::path::{Path, PathBuf};

use super::error::{MissingTrack, TreeError};

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Transcoded during this run.
    Converted { duration_ms: u64 },
    /// An output already existed, so no transcode was requested.
    AlreadyConverted,
    /// The transcode failed, or its directory could not be created.
    Failed { error: TreeError },
}

/// One source file and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConversion {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub outcome: FileOutcome,
}

/// Overall result for one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryStatus {
    /// At least one file converted and nothing failed.
    Succeeded,
    /// Some files failed while others converted or were already present.
    PartiallyFailed,
    /// The directory itself failed, or every attempted file failed.
    Failed,
    /// Nothing needed doing.
    Skipped,
}

/// Conversion results for one mirrored directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConversion {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Source files found directly in this directory, in visiting order.
    pub files: Vec<FileConversion>,
    /// Listing or directory-creation failure.
    pub error: Option<TreeError>,
}

impl DirectoryConversion {
    pub fn status(&self) -> DirectoryStatus {
        if self.error.is_some() {
            return DirectoryStatus::Failed;
        }

        let failed = self.count(|o| matches!(o, FileOutcome::Failed { .. }));
        let converted = self.count(|o| matches!(o, FileOutcome::Converted { .. }));

        match (failed, converted) {
            (0, 0) => DirectoryStatus::Skipped,
            (0, _) => DirectoryStatus::Succeeded,
            (f, _) if f == self.files.len() => DirectoryStatus::Failed,
            _ => DirectoryStatus::PartiallyFailed,
        }
    }

    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| predicate(&f.outcome)).count()
    }
}

/// Result of a whole `convert_tree` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertReport {
    /// Every visited directory in depth-first visiting order, root first.
    pub directories: Vec<DirectoryConversion>,
}

impl ConvertReport {
    fn outcomes(&self) -> impl Iterator<Item = &FileConversion> {
        self.directories.iter().flat_map(|d| d.files.iter())
    }

    pub fn converted_count(&self) -> usize {
        self.outcomes()
            .filter(|f| matches!(f.outcome, FileOutcome::Converted { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes()
            .filter(|f| f.outcome == FileOutcome::AlreadyConverted)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed { .. }))
            .count()
    }

    /// Every directory-level and file-level error, in visiting order.
    pub fn failures(&self) -> Vec<&TreeError> {
        let mut failures = Vec::new();
        for dir in &self.directories {
            failures.extend(dir.error.iter());
            failures.extend(dir.files.iter().filter_map(|f| match &f.outcome {
                FileOutcome::Failed { error } => Some(error),
                _ => None,
            }));
        }
        failures
    }

    /// Looks up the report for an input directory.
    pub fn directory(&self, input_dir: &Path) -> Option<&DirectoryConversion> {
        self.directories.iter().find(|d| d.input_dir == input_dir)
    }

    /// Looks up the outcome for a source file.
    pub fn file(&self, input_path: &Path) -> Option<&FileConversion> {
        self.outcomes().find(|f| f.input_path == input_path)
    }
}

/// The two files selected for muxing in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioVideoPair {
    /// The first file without an audio track; provides the video stream.
    pub video: PathBuf,
    /// The first file with an audio track; provides the audio stream.
    pub audio: PathBuf,
}

/// Terminal state of one directory in the pair combiner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombineState {
    Combined {
        pair: AudioVideoPair,
        output: PathBuf,
        /// A combined file from an earlier run was deleted first.
        replaced_existing: bool,
    },
    Unpaired {
        missing: MissingTrack,
    },
    CombineFailed {
        pair: AudioVideoPair,
        error: TreeError,
    },
    ListingFailed {
        error: TreeError,
    },
}

/// Pair combiner result for one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCombine {
    pub directory: PathBuf,
    pub state: CombineState,
    /// Files that could not be classified; they took part in neither slot.
    pub probe_failures: Vec<TreeError>,
}

impl DirectoryCombine {
    /// The error describing why this directory was not combined, if any.
    pub fn error(&self) -> Option<TreeError> {
        match &self.state {
            CombineState::Combined { .. } => None,
            CombineState::Unpaired { missing } => Some(TreeError::PairingIncomplete {
                directory: self.directory.clone(),
                missing: *missing,
            }),
            CombineState::CombineFailed { error, .. } | CombineState::ListingFailed { error } => {
                Some(error.clone())
            }
        }
    }

    pub fn is_combined(&self) -> bool {
        matches!(self.state, CombineState::Combined { .. })
    }
}

/// Result of a whole `combine_tree` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombineReport {
    /// One entry per immediate subdirectory, in visiting order.
    pub directories: Vec<DirectoryCombine>,
}

impl CombineReport {
    pub fn combined_count(&self) -> usize {
        self.directories.iter().filter(|d| d.is_combined()).count()
    }

    pub fn unpaired_count(&self) -> usize {
        self.directories
            .iter()
            .filter(|d| matches!(d.state, CombineState::Unpaired { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.directories
            .iter()
            .filter(|d| {
                matches!(
                    d.state,
                    CombineState::CombineFailed { .. } | CombineState::ListingFailed { .. }
                )
            })
            .count()
    }

    pub fn directory(&self, directory: &Path) -> Option<&DirectoryCombine> {
        self.directories.iter().find(|d| d.directory == directory)
    }
}

/// Results of both stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub conversion: ConvertReport,
    pub combination: CombineReport,
    /// Set when the output root could not be listed for combination;
    /// `combination` is then empty.
    pub combine_error: Option<TreeError>,
}
