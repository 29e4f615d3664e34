//! Converter module for transcoding, inspecting and muxing media files.
//!
//! This module provides the `Converter` trait, which groups the three media
//! services the tree engine consumes, and an implementation backed by the
//! ffmpeg and ffprobe binaries.
//!
//! # Features
//!
//! - Container transcoding (the target container is taken from the output extension)
//! - Audio-track detection through ffprobe stream listing
//! - Muxing the video of one file with the audio of another
//! - Progress reporting during transcodes and muxes
//! - Removal of partial output when ffmpeg fails
//!
//! # Example
//!
//! ```ignore
//! use mirrormux_core::converter::{Converter, FfmpegConverter, MuxJob, TranscodeJob};
//!
//! let converter = FfmpegConverter::with_defaults();
//! converter.validate().await?;
//!
//! converter
//!     .transcode(TranscodeJob::new("/in/show/ep1.mkv", "/out/show/ep1.mp4"))
//!     .await?;
//!
//! if !converter.has_audio_track(Path::new("/out/show/ep1.mp4")).await? {
//!     converter
//!         .mux(MuxJob::new("/out/show/ep1.mp4", "/out/show/ep1-audio.mp4", "/out/show/show.mp4"))
//!         .await?;
//! }
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use traits::Converter;
pub use types::{ConversionProgress, ConversionResult, MediaInfo, MuxJob, TranscodeJob};
