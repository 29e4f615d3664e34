//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use super::MockFilesystem;
use crate::converter::{
    ConversionProgress, ConversionResult, Converter, ConverterError, MediaInfo, MuxJob,
    TranscodeJob,
};

/// A recorded transcode for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTranscode {
    /// The job that was submitted.
    pub job: TranscodeJob,
    /// Whether the transcode succeeded.
    pub success: bool,
}

/// A recorded mux for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedMux {
    /// The job that was submitted.
    pub job: MuxJob,
    /// Whether the mux succeeded.
    pub success: bool,
}

/// Where successful jobs write their output.
#[derive(Debug, Clone, Default)]
enum OutputSink {
    #[default]
    Discard,
    Memory(MockFilesystem),
    Disk,
}

#[derive(Debug, Default)]
struct InFlight {
    current: usize,
    peak: usize,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track transcodes, probes and muxes for assertions
/// - Classify files as audio-bearing or audio-less by path
/// - Fail individual probes, transcodes or muxes
/// - Write outputs into a [`MockFilesystem`] or onto disk
/// - Track how many calls overlap
///
/// Files without a configured classification probe as audio-less. Clones
/// share state.
///
/// # Example
///
/// ```rust,ignore
/// use mirrormux_core::testing::{MockConverter, MockFilesystem};
///
/// let fs = MockFilesystem::new();
/// let converter = MockConverter::new().with_filesystem(fs.clone());
///
/// converter.set_audio("/out/show/audio.mp4", true).await;
/// converter.fail_transcode("/in/show/broken.mkv").await;
///
/// // Run the engine...
///
/// let muxes = converter.recorded_muxes().await;
/// assert_eq!(muxes.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockConverter {
    /// Recorded transcodes.
    transcodes: Arc<RwLock<Vec<RecordedTranscode>>>,
    /// Recorded muxes.
    muxes: Arc<RwLock<Vec<RecordedMux>>>,
    /// Probed paths, in call order.
    probes: Arc<RwLock<Vec<PathBuf>>>,
    /// Audio classification by path.
    audio: Arc<RwLock<HashMap<PathBuf, bool>>>,
    /// Paths whose probe fails.
    failing_probes: Arc<RwLock<HashSet<PathBuf>>>,
    /// Input paths whose transcode fails.
    failing_transcodes: Arc<RwLock<HashSet<PathBuf>>>,
    /// Output paths whose mux fails.
    failing_muxes: Arc<RwLock<HashSet<PathBuf>>>,
    /// Error returned by `validate`, if any.
    validate_error: Arc<RwLock<Option<ConverterError>>>,
    /// Simulated duration of every call.
    delay: Arc<RwLock<Duration>>,
    in_flight: Arc<RwLock<InFlight>>,
    sink: OutputSink,
}

impl MockConverter {
    /// Create a new mock converter that discards outputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write successful outputs into the given in-memory filesystem.
    pub fn with_filesystem(mut self, fs: MockFilesystem) -> Self {
        self.sink = OutputSink::Memory(fs);
        self
    }

    /// Write successful outputs to disk as small placeholder files.
    pub fn with_disk_outputs(mut self) -> Self {
        self.sink = OutputSink::Disk;
        self
    }

    /// Set whether the file at `path` carries an audio track.
    pub async fn set_audio(&self, path: impl AsRef<Path>, has_audio: bool) {
        self.audio
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), has_audio);
    }

    /// Make probing `path` fail.
    pub async fn fail_probe(&self, path: impl AsRef<Path>) {
        self.failing_probes
            .write()
            .await
            .insert(path.as_ref().to_path_buf());
    }

    /// Make transcoding the input at `path` fail.
    pub async fn fail_transcode(&self, path: impl AsRef<Path>) {
        self.failing_transcodes
            .write()
            .await
            .insert(path.as_ref().to_path_buf());
    }

    /// Make muxing into the output at `path` fail.
    pub async fn fail_mux(&self, path: impl AsRef<Path>) {
        self.failing_muxes
            .write()
            .await
            .insert(path.as_ref().to_path_buf());
    }

    /// Make `validate` fail with the given error.
    pub async fn set_validate_error(&self, error: ConverterError) {
        *self.validate_error.write().await = Some(error);
    }

    /// Set the simulated duration of every call.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Get all recorded transcodes.
    pub async fn recorded_transcodes(&self) -> Vec<RecordedTranscode> {
        self.transcodes.read().await.clone()
    }

    /// Get the number of transcodes requested.
    pub async fn transcode_count(&self) -> usize {
        self.transcodes.read().await.len()
    }

    /// Get all recorded muxes.
    pub async fn recorded_muxes(&self) -> Vec<RecordedMux> {
        self.muxes.read().await.clone()
    }

    /// Get every probed path, in call order.
    pub async fn recorded_probes(&self) -> Vec<PathBuf> {
        self.probes.read().await.clone()
    }

    /// Get the number of probes requested.
    pub async fn probe_count(&self) -> usize {
        self.probes.read().await.len()
    }

    /// The largest number of calls that were running at the same time.
    pub async fn peak_in_flight(&self) -> usize {
        self.in_flight.read().await.peak
    }

    async fn enter(&self) {
        let mut in_flight = self.in_flight.write().await;
        in_flight.current += 1;
        in_flight.peak = in_flight.peak.max(in_flight.current);
    }

    async fn leave(&self) {
        self.in_flight.write().await.current -= 1;
    }

    /// Simulates work so overlapping calls can be observed.
    async fn simulate_work(&self) {
        let delay = *self.delay.read().await;
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
    }

    async fn write_output(&self, path: &Path) -> Result<u64, ConverterError> {
        match &self.sink {
            OutputSink::Discard => {}
            OutputSink::Memory(fs) => fs.add_file(path).await,
            OutputSink::Disk => tokio::fs::write(path, b"mock media").await?,
        }
        Ok(10)
    }

    async fn run_transcode(&self, job: &TranscodeJob) -> Result<ConversionResult, ConverterError> {
        self.simulate_work().await;

        if self.failing_transcodes.read().await.contains(&job.input_path) {
            return Err(ConverterError::conversion_failed(
                "FFmpeg exited with code: Some(1)",
                Some("Invalid data found when processing input\n".to_string()),
            ));
        }

        let output_size_bytes = self.write_output(&job.output_path).await?;
        Ok(ConversionResult {
            output_path: job.output_path.clone(),
            output_size_bytes,
            duration_ms: 1,
        })
    }

    async fn run_mux(&self, job: &MuxJob) -> Result<ConversionResult, ConverterError> {
        self.simulate_work().await;

        if self.failing_muxes.read().await.contains(&job.output_path) {
            return Err(ConverterError::mux_failed(
                "FFmpeg exited with code: Some(1)",
                None,
            ));
        }

        let output_size_bytes = self.write_output(&job.output_path).await?;
        Ok(ConversionResult {
            output_path: job.output_path.clone(),
            output_size_bytes,
            duration_ms: 1,
        })
    }

    async fn send_progress(output_path: &Path, progress_tx: &mpsc::Sender<ConversionProgress>) {
        for percent in [50.0_f32, 100.0] {
            let _ = progress_tx
                .send(ConversionProgress {
                    output_path: output_path.to_path_buf(),
                    percent,
                    time_secs: f64::from(percent) / 10.0,
                    duration_secs: Some(10.0),
                    speed: Some("10x".to_string()),
                })
                .await;
        }
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        self.enter().await;
        self.probes.write().await.push(path.to_path_buf());
        self.simulate_work().await;

        let result = if self.failing_probes.read().await.contains(path) {
            Err(ConverterError::probe_failed(format!(
                "{}: Invalid data found when processing input",
                path.display()
            )))
        } else {
            let has_audio = self
                .audio
                .read()
                .await
                .get(path)
                .copied()
                .unwrap_or(false);
            Ok(MediaInfo {
                path: path.to_path_buf(),
                format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
                duration_secs: 10.0,
                audio_streams: usize::from(has_audio),
                video_streams: 1,
            })
        };

        self.leave().await;
        result
    }

    async fn transcode(&self, job: TranscodeJob) -> Result<ConversionResult, ConverterError> {
        self.enter().await;
        let result = self.run_transcode(&job).await;
        self.leave().await;

        self.transcodes.write().await.push(RecordedTranscode {
            job,
            success: result.is_ok(),
        });
        result
    }

    async fn transcode_with_progress(
        &self,
        job: TranscodeJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError> {
        Self::send_progress(&job.output_path, &progress_tx).await;
        self.transcode(job).await
    }

    async fn mux(&self, job: MuxJob) -> Result<ConversionResult, ConverterError> {
        self.enter().await;
        let result = self.run_mux(&job).await;
        self.leave().await;

        self.muxes.write().await.push(RecordedMux {
            job,
            success: result.is_ok(),
        });
        result
    }

    async fn mux_with_progress(
        &self,
        job: MuxJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError> {
        Self::send_progress(&job.output_path, &progress_tx).await;
        self.mux(job).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        match self.validate_error.write().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
