//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the service traits the tree
//! engine consumes, so both stages can be exercised without ffmpeg or a real
//! directory tree.
//!
//! # Example
//!
//! ```rust,ignore
//! use mirrormux_core::testing::{MockConverter, MockFilesystem};
//! use mirrormux_core::tree::{MediaPipeline, TreeConfig};
//!
//! let fs = MockFilesystem::new();
//! fs.add_file("/in/show/video.mkv").await;
//! fs.add_file("/in/show/audio.mkv").await;
//!
//! let converter = MockConverter::new().with_filesystem(fs.clone());
//! converter.set_audio("/out/show/audio.mp4", true).await;
//!
//! let pipeline = MediaPipeline::new(TreeConfig::new("/in", "/out"), converter, fs);
//! let report = pipeline.run().await?;
//! ```

mod mock_converter;
mod mock_filesystem;

pub use mock_converter::{MockConverter, RecordedMux, RecordedTranscode};
pub use mock_filesystem::MockFilesystem;
