//! Runs the tree converter and then the pair combiner.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::converter::{ConversionProgress, Converter};
use crate::filesystem::Filesystem;

use super::combine::PairCombiner;
use super::config::TreeConfig;
use super::convert::TreeConverter;
use super::error::TreeError;
use super::queue::WorkQueue;
use super::types::{CombineReport, ConvertReport, PipelineReport};

/// Both stages wired to the same services and work queue.
pub struct MediaPipeline<C: Converter, F: Filesystem> {
    config: TreeConfig,
    converter: TreeConverter<C, F>,
    combiner: PairCombiner<C, F>,
}

impl<C: Converter, F: Filesystem> MediaPipeline<C, F> {
    pub fn new(config: TreeConfig, converter: C, fs: F) -> Self {
        let converter = Arc::new(converter);
        let fs = Arc::new(fs);
        let queue = WorkQueue::new(config.max_in_flight);

        Self {
            converter: TreeConverter::new(config.clone(), Arc::clone(&converter), Arc::clone(&fs))
                .with_queue(queue.clone()),
            combiner: PairCombiner::new(config.clone(), converter, fs).with_queue(queue),
            config,
        }
    }

    /// Forwards progress from both stages to the given channel.
    pub fn with_progress(mut self, progress_tx: mpsc::Sender<ConversionProgress>) -> Self {
        self.converter = self.converter.with_progress(progress_tx.clone());
        self.combiner = self.combiner.with_progress(progress_tx);
        self
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn converter(&self) -> &TreeConverter<C, F> {
        &self.converter
    }

    pub fn combiner(&self) -> &PairCombiner<C, F> {
        &self.combiner
    }

    /// Mirrors and transcodes the configured input tree.
    pub async fn convert_tree(&self) -> Result<ConvertReport, TreeError> {
        self.converter
            .convert_tree(&self.config.input_dir, &self.config.output_dir)
            .await
    }

    /// Pairs and muxes inside the configured output tree.
    pub async fn combine_tree(&self) -> Result<CombineReport, TreeError> {
        self.combiner.combine_tree(&self.config.output_dir).await
    }

    /// Runs conversion to completion, then combination over the resulting tree.
    ///
    /// Fails only when the input root cannot be listed. A failure to list the
    /// output root is recorded in the report next to the finished conversion.
    pub async fn run(&self) -> Result<PipelineReport, TreeError> {
        info!(
            "Converting {:?} into {:?}",
            self.config.input_dir, self.config.output_dir
        );
        let conversion = self.convert_tree().await?;

        info!("Combining audio and video in {:?}", self.config.output_dir);
        let (combination, combine_error) = match self.combine_tree().await {
            Ok(combination) => (combination, None),
            Err(e) => {
                warn!("Failed to combine {:?}: {}", self.config.output_dir, e);
                (CombineReport::default(), Some(e))
            }
        };

        Ok(PipelineReport {
            conversion,
            combination,
            combine_error,
        })
    }
}
