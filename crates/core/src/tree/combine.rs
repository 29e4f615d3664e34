//! Pair combiner: muxes one audio-less and one audio-bearing file per directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::converter::{ConversionProgress, Converter, MuxJob};
use crate::filesystem::Filesystem;

use super::config::TreeConfig;
use super::error::{MissingTrack, TreeError};
use super::paths::combined_path;
use super::queue::WorkQueue;
use super::snapshot::{AudioClass, DirectoryNode, TreeSnapshot};
use super::types::{AudioVideoPair, CombineReport, CombineState, DirectoryCombine};

/// First-match selection of one audio-bearing and one audio-less file.
///
/// Each slot keeps the first file offered for it; later files of the same
/// class are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairSelection {
    audio_bearing: Option<PathBuf>,
    audio_less: Option<PathBuf>,
}

impl PairSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a classified file. Returns true once both slots are filled.
    pub fn offer(&mut self, path: &Path, class: AudioClass) -> bool {
        let slot = match class {
            AudioClass::HasAudio => &mut self.audio_bearing,
            AudioClass::NoAudio => &mut self.audio_less,
            AudioClass::Unknown => return self.is_complete(),
        };
        if slot.is_none() {
            *slot = Some(path.to_path_buf());
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.audio_bearing.is_some() && self.audio_less.is_some()
    }

    /// The selected pair, or which class is missing.
    pub fn into_pair(self) -> Result<AudioVideoPair, MissingTrack> {
        match (self.audio_less, self.audio_bearing) {
            (Some(video), Some(audio)) => Ok(AudioVideoPair { video, audio }),
            (Some(_), None) => Err(MissingTrack::AudioBearing),
            (None, Some(_)) => Err(MissingTrack::AudioLess),
            (None, None) => Err(MissingTrack::Both),
        }
    }
}

/// Combines converted files in each immediate subdirectory of the output tree.
pub struct PairCombiner<C: Converter, F: Filesystem> {
    config: TreeConfig,
    converter: Arc<C>,
    fs: Arc<F>,
    queue: WorkQueue,
    progress_tx: Option<mpsc::Sender<ConversionProgress>>,
}

impl<C: Converter, F: Filesystem> PairCombiner<C, F> {
    pub fn new(config: TreeConfig, converter: Arc<C>, fs: Arc<F>) -> Self {
        let queue = WorkQueue::new(config.max_in_flight);
        Self {
            config,
            converter,
            fs,
            queue,
            progress_tx: None,
        }
    }

    /// Shares an existing work queue (e.g. with the tree converter).
    pub fn with_queue(mut self, queue: WorkQueue) -> Self {
        self.queue = queue;
        self
    }

    /// Forwards mux progress to the given channel.
    pub fn with_progress(mut self, progress_tx: mpsc::Sender<ConversionProgress>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    /// Pairs and muxes files in every immediate subdirectory of `output_dir`.
    ///
    /// Fails only when `output_dir` itself cannot be listed.
    pub async fn combine_tree(&self, output_dir: &Path) -> Result<CombineReport, TreeError> {
        // Root plus one level of subdirectories
        let snapshot =
            TreeSnapshot::capture(self.fs.as_ref(), output_dir, self.config.entry_order, Some(2))
                .await?;
        Ok(self.combine_snapshot(&snapshot).await)
    }

    /// Pairs and muxes files in every immediate subdirectory of the snapshot root.
    pub async fn combine_snapshot(&self, output: &TreeSnapshot) -> CombineReport {
        let mut directories = Vec::new();
        for node in output.root.subdirectories() {
            directories.push(self.combine_directory(node).await);
        }

        let report = CombineReport { directories };
        info!(
            "Combination finished: {} combined, {} unpaired, {} failed",
            report.combined_count(),
            report.unpaired_count(),
            report.failed_count()
        );
        report
    }

    async fn combine_directory(&self, node: &DirectoryNode) -> DirectoryCombine {
        let directory = node.path.clone();
        let mut probe_failures = Vec::new();

        if let Some(error) = &node.listing_error {
            return DirectoryCombine {
                directory,
                state: CombineState::ListingFailed {
                    error: error.clone(),
                },
                probe_failures,
            };
        }

        let target_ext = &self.config.target_extension;
        let output = combined_path(&directory, target_ext);
        let mut selection = PairSelection::new();

        for file in node.files() {
            if !file.has_extension(target_ext) {
                debug!("Ignoring {:?}", file.path);
                continue;
            }
            if file.path == output {
                debug!("Ignoring previous combined output {:?}", file.path);
                continue;
            }

            let class = match self
                .queue
                .run(self.converter.has_audio_track(&file.path))
                .await
            {
                Ok(true) => AudioClass::HasAudio,
                Ok(false) => AudioClass::NoAudio,
                Err(e) => {
                    warn!("Failed to probe {:?}: {}", file.path, e);
                    probe_failures.push(TreeError::Probe {
                        path: file.path.clone(),
                        reason: e.to_string(),
                    });
                    AudioClass::Unknown
                }
            };
            debug!("Classified {:?} as {:?}", file.path, class);

            if selection.offer(&file.path, class) {
                break;
            }
        }

        let pair = match selection.into_pair() {
            Ok(pair) => pair,
            Err(missing) => {
                warn!("No {} file found in {:?}, skipping", missing, directory);
                return DirectoryCombine {
                    directory,
                    state: CombineState::Unpaired { missing },
                    probe_failures,
                };
            }
        };

        let state = self.combine_pair(&directory, pair, output).await;
        DirectoryCombine {
            directory,
            state,
            probe_failures,
        }
    }

    async fn combine_pair(
        &self,
        directory: &Path,
        pair: AudioVideoPair,
        output: PathBuf,
    ) -> CombineState {
        let replaced_existing = self.fs.exists(&output).await;
        if replaced_existing {
            info!("Removing existing combined output {:?}", output);
            if let Err(e) = self.fs.remove_file(&output).await {
                warn!("Failed to delete {:?}: {}", output, e);
                return CombineState::CombineFailed {
                    pair,
                    error: TreeError::Delete {
                        path: output,
                        reason: e.to_string(),
                    },
                };
            }
        }

        info!(
            "Combining video {:?} with audio {:?}",
            pair.video, pair.audio
        );
        let job = MuxJob::new(&pair.video, &pair.audio, &output);
        let result = self
            .queue
            .run(async {
                match &self.progress_tx {
                    Some(tx) => self.converter.mux_with_progress(job, tx.clone()).await,
                    None => self.converter.mux(job).await,
                }
            })
            .await;

        match result {
            Ok(_) => {
                info!(
                    "Audio and video combined successfully! Output saved to {:?}",
                    output
                );
                CombineState::Combined {
                    pair,
                    output,
                    replaced_existing,
                }
            }
            Err(e) => {
                warn!("Failed to combine files in {:?}: {}", directory, e);
                CombineState::CombineFailed {
                    pair,
                    error: TreeError::Mux {
                        directory: directory.to_path_buf(),
                        reason: e.to_string(),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConverter, MockFilesystem};

    fn combiner_for(
        fs: &MockFilesystem,
        mock: &MockConverter,
    ) -> PairCombiner<MockConverter, MockFilesystem> {
        PairCombiner::new(
            TreeConfig::new("/in", "/out"),
            Arc::new(mock.clone()),
            Arc::new(fs.clone()),
        )
    }

    #[test]
    fn test_selection_keeps_first_of_each_class() {
        let mut selection = PairSelection::new();
        assert!(!selection.offer(Path::new("A"), AudioClass::HasAudio));
        assert!(!selection.offer(Path::new("B"), AudioClass::HasAudio));
        assert!(selection.offer(Path::new("C"), AudioClass::NoAudio));
        assert!(selection.offer(Path::new("D"), AudioClass::NoAudio));

        let pair = selection.into_pair().unwrap();
        assert_eq!(pair.audio, PathBuf::from("A"));
        assert_eq!(pair.video, PathBuf::from("C"));
    }

    #[test]
    fn test_selection_missing_classes() {
        let mut selection = PairSelection::new();
        selection.offer(Path::new("A"), AudioClass::HasAudio);
        selection.offer(Path::new("X"), AudioClass::Unknown);
        assert_eq!(selection.into_pair(), Err(MissingTrack::AudioLess));

        let mut selection = PairSelection::new();
        selection.offer(Path::new("C"), AudioClass::NoAudio);
        assert_eq!(selection.into_pair(), Err(MissingTrack::AudioBearing));

        assert_eq!(PairSelection::new().into_pair(), Err(MissingTrack::Both));
    }

    #[tokio::test]
    async fn test_combines_first_match_and_stops_probing() {
        let fs = MockFilesystem::new();
        for name in ["a", "b", "c", "d"] {
            fs.add_file(&format!("/out/show/{}.mp4", name)).await;
        }
        let mock = MockConverter::new().with_filesystem(fs.clone());
        mock.set_audio("/out/show/a.mp4", true).await;
        mock.set_audio("/out/show/b.mp4", true).await;
        mock.set_audio("/out/show/c.mp4", false).await;
        mock.set_audio("/out/show/d.mp4", false).await;

        let report = combiner_for(&fs, &mock)
            .combine_tree(Path::new("/out"))
            .await
            .unwrap();

        let muxes = mock.recorded_muxes().await;
        assert_eq!(muxes.len(), 1);
        assert_eq!(muxes[0].job.video_path, PathBuf::from("/out/show/c.mp4"));
        assert_eq!(muxes[0].job.audio_path, PathBuf::from("/out/show/a.mp4"));
        assert_eq!(muxes[0].job.output_path, PathBuf::from("/out/show/show.mp4"));

        // d.mp4 is never probed once both slots are filled
        assert_eq!(mock.probe_count().await, 3);
        assert_eq!(report.combined_count(), 1);
    }

    #[tokio::test]
    async fn test_unpaired_directory_is_isolated() {
        let fs = MockFilesystem::new();
        fs.add_file("/out/music/a.mp4").await;
        fs.add_file("/out/music/b.mp4").await;
        fs.add_file("/out/film/video.mp4").await;
        fs.add_file("/out/film/audio.mp4").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());
        mock.set_audio("/out/music/a.mp4", true).await;
        mock.set_audio("/out/music/b.mp4", true).await;
        mock.set_audio("/out/film/audio.mp4", true).await;

        let report = combiner_for(&fs, &mock)
            .combine_tree(Path::new("/out"))
            .await
            .unwrap();

        let music = report.directory(Path::new("/out/music")).unwrap();
        assert_eq!(
            music.state,
            CombineState::Unpaired {
                missing: MissingTrack::AudioLess
            }
        );
        assert!(report.directory(Path::new("/out/film")).unwrap().is_combined());
        assert!(fs.is_file("/out/film/film.mp4").await);
    }

    #[tokio::test]
    async fn test_existing_combined_output_is_replaced() {
        let fs = MockFilesystem::new();
        fs.add_file("/out/show/show.mp4").await;
        fs.add_file("/out/show/video.mp4").await;
        fs.add_file("/out/show/audio.mp4").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());
        mock.set_audio("/out/show/show.mp4", true).await;
        mock.set_audio("/out/show/audio.mp4", true).await;

        let report = combiner_for(&fs, &mock)
            .combine_tree(Path::new("/out"))
            .await
            .unwrap();

        assert_eq!(
            fs.removed_files().await,
            vec![PathBuf::from("/out/show/show.mp4")]
        );
        let show = report.directory(Path::new("/out/show")).unwrap();
        match &show.state {
            CombineState::Combined {
                pair,
                replaced_existing,
                ..
            } => {
                assert!(replaced_existing);
                assert_eq!(pair.audio, PathBuf::from("/out/show/audio.mp4"));
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_failure_skips_mux() {
        let fs = MockFilesystem::new();
        fs.add_file("/out/show/show.mp4").await;
        fs.add_file("/out/show/video.mp4").await;
        fs.add_file("/out/show/audio.mp4").await;
        fs.fail_remove("/out/show/show.mp4").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());
        mock.set_audio("/out/show/audio.mp4", true).await;

        let report = combiner_for(&fs, &mock)
            .combine_tree(Path::new("/out"))
            .await
            .unwrap();

        assert!(mock.recorded_muxes().await.is_empty());
        let show = report.directory(Path::new("/out/show")).unwrap();
        assert!(matches!(show.error(), Some(TreeError::Delete { .. })));
        assert_eq!(report.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_probe_failure_is_unknown() {
        let fs = MockFilesystem::new();
        fs.add_file("/out/show/broken.mp4").await;
        fs.add_file("/out/show/video.mp4").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());
        mock.fail_probe("/out/show/broken.mp4").await;

        let report = combiner_for(&fs, &mock)
            .combine_tree(Path::new("/out"))
            .await
            .unwrap();

        let show = report.directory(Path::new("/out/show")).unwrap();
        assert_eq!(show.probe_failures.len(), 1);
        assert_eq!(
            show.state,
            CombineState::Unpaired {
                missing: MissingTrack::AudioBearing
            }
        );
    }

    #[tokio::test]
    async fn test_mux_failure_is_reported() {
        let fs = MockFilesystem::new();
        fs.add_file("/out/one/video.mp4").await;
        fs.add_file("/out/one/audio.mp4").await;
        fs.add_file("/out/two/video.mp4").await;
        fs.add_file("/out/two/audio.mp4").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());
        mock.set_audio("/out/one/audio.mp4", true).await;
        mock.set_audio("/out/two/audio.mp4", true).await;
        mock.fail_mux("/out/one/one.mp4").await;

        let report = combiner_for(&fs, &mock)
            .combine_tree(Path::new("/out"))
            .await
            .unwrap();

        let one = report.directory(Path::new("/out/one")).unwrap();
        assert!(matches!(one.error(), Some(TreeError::Mux { .. })));
        assert!(report.directory(Path::new("/out/two")).unwrap().is_combined());
    }

    #[tokio::test]
    async fn test_root_files_and_other_extensions_are_ignored() {
        let fs = MockFilesystem::new();
        fs.add_file("/out/loose.mp4").await;
        fs.add_file("/out/show/video.mkv").await;
        fs.add_file("/out/show/audio.MP4").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());
        mock.set_audio("/out/show/audio.MP4", true).await;

        let report = combiner_for(&fs, &mock)
            .combine_tree(Path::new("/out"))
            .await
            .unwrap();

        assert_eq!(report.directories.len(), 1);
        assert_eq!(mock.probe_count().await, 1);
        assert_eq!(report.unpaired_count(), 1);
    }
}
