use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mirrormux_core::{
    converter::ConversionProgress, load_config, validate_config, Converter, FfmpegConverter,
    LocalFilesystem, LoggingConfig, MediaPipeline, PipelineReport,
};

/// Buffer size for the progress channel
const PROGRESS_BUFFER_SIZE: usize = 64;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // The subscriber may not be installed yet if the config failed to load
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("MIRRORMUX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    init_tracing(&config.logging);
    info!("Configuration loaded from {:?}", config_path);
    info!("Input directory: {:?}", config.tree.input_dir);
    info!("Output directory: {:?}", config.tree.output_dir);

    let converter = FfmpegConverter::new(config.converter.clone());
    converter
        .validate()
        .await
        .context("FFmpeg is not available")?;
    info!("Using converter: {}", converter.name());

    // Drain progress updates from both stages
    let (progress_tx, mut progress_rx) = mpsc::channel::<ConversionProgress>(PROGRESS_BUFFER_SIZE);
    let progress_handle = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            debug!(
                output = ?progress.output_path,
                speed = ?progress.speed,
                "Processing: {:.2}% done",
                progress.percent
            );
        }
    });

    let pipeline = MediaPipeline::new(config.tree.clone(), converter, LocalFilesystem::new())
        .with_progress(progress_tx);
    let result = pipeline.run().await;

    // Dropping the pipeline closes the progress channel
    drop(pipeline);
    let _ = progress_handle.await;

    let report = result.context("Failed to process media tree")?;
    log_summary(&report);

    if let Some(e) = report.combine_error {
        return Err(e).context("Failed to list the output tree for combination");
    }

    Ok(())
}

fn log_summary(report: &PipelineReport) {
    let conversion = &report.conversion;
    let combination = &report.combination;

    info!(
        "Converted {} file(s), {} already present, {} failed",
        conversion.converted_count(),
        conversion.skipped_count(),
        conversion.failed_count()
    );
    info!(
        "Combined {} directory(ies), {} unpaired, {} failed",
        combination.combined_count(),
        combination.unpaired_count(),
        combination.failed_count()
    );

    for failure in conversion.failures() {
        warn!("{}", failure);
    }
    for directory in &combination.directories {
        if let Some(error) = directory.error() {
            warn!("{}", error);
        }
    }
}
