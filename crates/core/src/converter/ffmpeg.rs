//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::{ConversionProgress, ConversionResult, MediaInfo, MuxJob, TranscodeJob};

/// Which kind of ffmpeg run is in progress, used to pick the failure variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobKind {
    Transcode,
    Mux,
}

impl JobKind {
    fn failed(self, reason: String, stderr: Option<String>) -> ConverterError {
        match self {
            Self::Transcode => ConverterError::conversion_failed(reason, stderr),
            Self::Mux => ConverterError::mux_failed(reason, stderr),
        }
    }
}

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Arguments shared by every run: log level, progress pipe, extra args.
    fn common_tail_args(&self) -> Vec<String> {
        let mut args = vec![
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ];
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());
        args
    }

    /// Builds ffmpeg arguments for a container transcode.
    fn build_transcode_args(&self, job: &TranscodeJob) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
        ];

        args.extend(self.common_tail_args());
        args.push(job.output_path.to_string_lossy().to_string());

        args
    }

    /// Builds ffmpeg arguments for combining a video source with an audio source.
    fn build_mux_args(&self, job: &MuxJob) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            job.video_path.to_string_lossy().to_string(),
            "-i".to_string(),
            job.audio_path.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            self.config.mux_audio_codec.clone(),
            "-strict".to_string(),
            "experimental".to_string(),
        ];

        args.extend(self.common_tail_args());
        args.push(job.output_path.to_string_lossy().to_string());

        args
    }

    /// Parses ffprobe JSON output into MediaInfo.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaInfo, ConverterError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: Option<ProbeFormat>,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: Option<String>,
            duration: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            #[serde(default)]
            codec_type: String,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| ConverterError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let duration_secs = probe
            .format
            .as_ref()
            .and_then(|f| f.duration.as_ref())
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let format = probe
            .format
            .as_ref()
            .and_then(|f| f.format_name.as_deref())
            .and_then(|name| name.split(',').next())
            .unwrap_or("unknown")
            .to_string();

        let count = |kind: &str| probe.streams.iter().filter(|s| s.codec_type == kind).count();

        Ok(MediaInfo {
            path: path.to_path_buf(),
            format,
            duration_secs,
            audio_streams: count("audio"),
            video_streams: count("video"),
        })
    }

    /// Removes whatever a failed run left behind at the output path.
    async fn discard_partial_output(path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed partial output {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove partial output {:?}: {}", path, e),
        }
    }

    /// Runs ffmpeg with the given arguments, parsing progress from stderr.
    async fn run_ffmpeg(
        &self,
        kind: JobKind,
        args: Vec<String>,
        output_path: &Path,
        duration_secs: Option<f64>,
        progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    ) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| kind.failed("stderr was not captured".to_string(), None))?;
        let mut reader = BufReader::new(stderr).lines();

        let time_regex = Regex::new(r"out_time_ms=(\d+)").ok();
        let speed_regex = Regex::new(r"speed=\s*(\d+\.?\d*)x").ok();

        let work = async {
            let mut current_time = 0.0;
            let mut current_speed = None;
            let mut last_progress_send = Instant::now();
            let progress_interval = Duration::from_millis(500);
            let mut error_output = String::new();

            while let Ok(Some(line)) = reader.next_line().await {
                if line.contains("Error") || line.contains("error") {
                    error_output.push_str(&line);
                    error_output.push('\n');
                }

                if let Some(ms) = time_regex
                    .as_ref()
                    .and_then(|re| re.captures(&line))
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                {
                    // out_time_ms is reported in microseconds
                    current_time = ms / 1_000_000.0;
                }

                if let Some(speed) = speed_regex
                    .as_ref()
                    .and_then(|re| re.captures(&line))
                    .and_then(|caps| caps.get(1))
                {
                    current_speed = Some(format!("{}x", speed.as_str()));
                }

                if let Some(ref tx) = progress_tx {
                    if last_progress_send.elapsed() >= progress_interval {
                        let percent = match duration_secs {
                            Some(dur) if dur > 0.0 => (current_time / dur * 100.0).min(100.0) as f32,
                            _ => 0.0,
                        };

                        let _ = tx.try_send(ConversionProgress {
                            output_path: output_path.to_path_buf(),
                            percent,
                            time_secs: current_time,
                            duration_secs,
                            speed: current_speed.clone(),
                        });
                        last_progress_send = Instant::now();
                    }
                }
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        };

        let outcome = match self.config.timeout_secs {
            Some(secs) => timeout(Duration::from_secs(secs), work)
                .await
                .map_err(|_| secs),
            None => Ok(work.await),
        };

        let (status, error_output) = match outcome {
            Ok(Ok(finished)) => finished,
            Ok(Err(e)) => {
                Self::discard_partial_output(output_path).await;
                return Err(ConverterError::Io(e));
            }
            Err(timeout_secs) => {
                let _ = child.kill().await;
                Self::discard_partial_output(output_path).await;
                return Err(ConverterError::Timeout { timeout_secs });
            }
        };

        if !status.success() {
            Self::discard_partial_output(output_path).await;
            return Err(kind.failed(
                format!("FFmpeg exited with code: {:?}", status.code()),
                if error_output.is_empty() {
                    None
                } else {
                    Some(error_output)
                },
            ));
        }

        let output_meta = tokio::fs::metadata(output_path)
            .await
            .map_err(|_| kind.failed("Output file not created".to_string(), None))?;

        Ok(ConversionResult {
            output_path: output_path.to_path_buf(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn run_transcode(
        &self,
        job: &TranscodeJob,
        progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    ) -> Result<ConversionResult, ConverterError> {
        // Only needed for percentages; a probe failure here is not fatal
        let duration_secs = if progress_tx.is_some() {
            self.probe(&job.input_path).await.ok().map(|i| i.duration_secs)
        } else {
            None
        };

        let args = self.build_transcode_args(job);
        self.run_ffmpeg(
            JobKind::Transcode,
            args,
            &job.output_path,
            duration_secs,
            progress_tx,
        )
        .await
    }

    async fn run_mux(
        &self,
        job: &MuxJob,
        progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    ) -> Result<ConversionResult, ConverterError> {
        let duration_secs = if progress_tx.is_some() {
            self.probe(&job.video_path).await.ok().map(|i| i.duration_secs)
        } else {
            None
        };

        let args = self.build_mux_args(job);
        self.run_ffmpeg(JobKind::Mux, args, &job.output_path, duration_secs, progress_tx)
            .await
    }

    async fn check_binary(
        path: &Path,
        not_found: impl FnOnce() -> ConverterError,
    ) -> Result<(), ConverterError> {
        match Command::new(path).arg("-version").output().await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(ConverterError::Io(e)),
        }
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ConverterError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout)
    }

    async fn transcode(&self, job: TranscodeJob) -> Result<ConversionResult, ConverterError> {
        self.run_transcode(&job, None).await
    }

    async fn transcode_with_progress(
        &self,
        job: TranscodeJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError> {
        self.run_transcode(&job, Some(progress_tx)).await
    }

    async fn mux(&self, job: MuxJob) -> Result<ConversionResult, ConverterError> {
        self.run_mux(&job, None).await
    }

    async fn mux_with_progress(
        &self,
        job: MuxJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError> {
        self.run_mux(&job, Some(progress_tx)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        let ffmpeg_path = self.config.ffmpeg_path.clone();
        Self::check_binary(&self.config.ffmpeg_path, || ConverterError::FfmpegNotFound {
            path: ffmpeg_path,
        })
        .await?;

        let ffprobe_path = self.config.ffprobe_path.clone();
        Self::check_binary(&self.config.ffprobe_path, || {
            ConverterError::FfprobeNotFound { path: ffprobe_path }
        })
        .await
    }
}
