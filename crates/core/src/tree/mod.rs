//! Tree engine: mirrors a source tree into an output tree, transcoding
//! source files on the way, then combines audio and video per directory.
//!
//! The engine runs in two stages:
//!
//! 1. [`TreeConverter`] walks the input tree depth-first, creates the matching
//!    output directories and transcodes every file with the source extension.
//!    Outputs that already exist are left alone.
//! 2. [`PairCombiner`] walks the immediate subdirectories of the output tree,
//!    picks the first audio-less and the first audio-bearing file in each and
//!    muxes them into `<dir>/<dir name>.<target ext>`, replacing any earlier
//!    combined file.
//!
//! [`MediaPipeline`] runs both stages in order. Each stage works on a
//! [`TreeSnapshot`] and reports per-file and per-directory outcomes instead of
//! aborting on the first failure.
//!
//! # Example
//!
//! ```ignore
//! use mirrormux_core::converter::FfmpegConverter;
//! use mirrormux_core::filesystem::LocalFilesystem;
//! use mirrormux_core::tree::{MediaPipeline, TreeConfig};
//!
//! let pipeline = MediaPipeline::new(
//!     TreeConfig::new("/media/in", "/media/out"),
//!     FfmpegConverter::with_defaults(),
//!     LocalFilesystem::new(),
//! );
//! let report = pipeline.run().await?;
//! println!("{} converted", report.conversion.converted_count());
//! ```

mod combine;
mod config;
mod convert;
mod error;
mod paths;
mod pipeline;
mod queue;
mod snapshot;
mod types;

pub use combine::{PairCombiner, PairSelection};
pub use config::{EntryOrder, TreeConfig};
pub use convert::TreeConverter;
pub use error::{MissingTrack, TreeError};
pub use paths::{combined_path, converted_path, has_extension};
pub use pipeline::MediaPipeline;
pub use queue::WorkQueue;
pub use snapshot::{AudioClass, CandidateFile, DirectoryNode, Entry, TreeSnapshot};
pub use types::{
    AudioVideoPair, CombineReport, CombineState, ConvertReport, DirectoryCombine,
    DirectoryConversion, DirectoryStatus, FileConversion, FileOutcome, PipelineReport,
};
