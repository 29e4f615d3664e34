//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use super::error::ConverterError;
use super::types::{ConversionProgress, ConversionResult, MediaInfo, MuxJob, TranscodeJob};

/// A media toolkit that can transcode, inspect and mux files.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Probes a media file to get its stream information.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError>;

    /// Whether the file contains at least one audio stream.
    async fn has_audio_track(&self, path: &Path) -> Result<bool, ConverterError> {
        Ok(self.probe(path).await?.has_audio())
    }

    /// Transcodes a media file into the container implied by the output path.
    async fn transcode(&self, job: TranscodeJob) -> Result<ConversionResult, ConverterError>;

    /// Transcodes a media file with progress reporting.
    ///
    /// If the sender is dropped, the transcode continues without progress reporting.
    async fn transcode_with_progress(
        &self,
        job: TranscodeJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError>;

    /// Combines the video stream of one file with the audio stream of another.
    async fn mux(&self, job: MuxJob) -> Result<ConversionResult, ConverterError>;

    /// Muxes with progress reporting.
    async fn mux_with_progress(
        &self,
        job: MuxJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;
}
