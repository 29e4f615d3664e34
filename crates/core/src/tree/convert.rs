//! Tree converter: mirrors the input tree and transcodes every source file.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::converter::{ConversionProgress, Converter, TranscodeJob};
use crate::filesystem::Filesystem;

use super::config::TreeConfig;
use super::error::TreeError;
use super::paths::converted_path;
use super::queue::WorkQueue;
use super::snapshot::{DirectoryNode, Entry, TreeSnapshot};
use super::types::{ConvertReport, DirectoryConversion, FileConversion, FileOutcome};

/// One directory to mirror, in depth-first visiting order.
struct DirectoryPlan {
    input_dir: PathBuf,
    output_dir: PathBuf,
    parent: Option<usize>,
    listing_error: Option<TreeError>,
}

/// One file to transcode.
struct TranscodeTask {
    directory: usize,
    input_path: PathBuf,
    output_path: PathBuf,
    /// Shared by every task writing the same output, so they run one after
    /// another even when the queue allows parallel transcodes.
    output_lock: Option<Arc<Mutex<()>>>,
}

/// Gives tasks that map to the same output path a common lock.
fn share_output_locks(tasks: &mut [TranscodeTask]) {
    let mut writers: HashMap<&Path, usize> = HashMap::new();
    for task in tasks.iter() {
        *writers.entry(task.output_path.as_path()).or_default() += 1;
    }

    let locks: HashMap<PathBuf, Arc<Mutex<()>>> = writers
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(path, _)| (path.to_path_buf(), Arc::new(Mutex::new(()))))
        .collect();

    for task in tasks.iter_mut() {
        if let Some(lock) = locks.get(&task.output_path) {
            task.output_lock = Some(Arc::clone(lock));
        }
    }
}

/// Mirrors an input tree into an output tree, transcoding source files.
pub struct TreeConverter<C: Converter, F: Filesystem> {
    config: TreeConfig,
    converter: Arc<C>,
    fs: Arc<F>,
    queue: WorkQueue,
    progress_tx: Option<mpsc::Sender<ConversionProgress>>,
}

impl<C: Converter, F: Filesystem> TreeConverter<C, F> {
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

    /// Shares an existing work queue (e.g. with the pair combiner).
    pub fn with_queue(mut self, queue: WorkQueue) -> Self {
        self.queue = queue;
        self
    }

    /// Forwards transcode progress to the given channel.
    pub fn with_progress(mut self, progress_tx: mpsc::Sender<ConversionProgress>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    /// Mirrors `input_dir` into `output_dir`.
    ///
    /// Fails only when `input_dir` itself cannot be listed; every other
    /// problem is recorded in the returned report.
    pub async fn convert_tree(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<ConvertReport, TreeError> {
        let snapshot =
            TreeSnapshot::capture(self.fs.as_ref(), input_dir, self.config.entry_order, None)
                .await?;
        Ok(self.convert_snapshot(&snapshot, output_dir).await)
    }

    /// Mirrors a captured input tree into `output_dir`.
    pub async fn convert_snapshot(&self, input: &TreeSnapshot, output_dir: &Path) -> ConvertReport {
        let mut plans = Vec::new();
        let mut tasks = Vec::new();
        self.plan_directory(&input.root, output_dir, output_dir, None, &mut plans, &mut tasks);
        share_output_locks(&mut tasks);

        let blocked = self.create_directories(&plans).await;

        let blocked_by = &blocked;
        let outcomes: Vec<FileOutcome> = stream::iter(tasks.iter())
            .map(move |task| self.run_task(task, blocked_by[task.directory].as_ref()))
            .buffered(self.queue.capacity())
            .collect()
            .await;

        let mut directories: Vec<DirectoryConversion> = plans
            .into_iter()
            .zip(blocked)
            .map(|(plan, create_error)| DirectoryConversion {
                input_dir: plan.input_dir,
                output_dir: plan.output_dir,
                files: Vec::new(),
                error: create_error.or(plan.listing_error),
            })
            .collect();

        for (task, outcome) in tasks.into_iter().zip(outcomes) {
            directories[task.directory].files.push(FileConversion {
                input_path: task.input_path,
                output_path: task.output_path,
                outcome,
            });
        }

        let report = ConvertReport { directories };
        info!(
            "Conversion finished: {} converted, {} already present, {} failed",
            report.converted_count(),
            report.skipped_count(),
            report.failed_count()
        );
        report
    }

    /// Walks a snapshot node depth-first, recording directories and tasks.
    fn plan_directory(
        &self,
        node: &DirectoryNode,
        output_dir: &Path,
        output_root: &Path,
        parent: Option<usize>,
        plans: &mut Vec<DirectoryPlan>,
        tasks: &mut Vec<TranscodeTask>,
    ) {
        let index = plans.len();
        plans.push(DirectoryPlan {
            input_dir: node.path.clone(),
            output_dir: output_dir.to_path_buf(),
            parent,
            listing_error: node.listing_error.clone(),
        });

        if node.listing_error.is_some() {
            return;
        }

        let source_ext = &self.config.source_extension;
        let mut found = 0;

        for entry in &node.entries {
            match entry {
                Entry::Directory(child) if child.path == output_root => {
                    debug!("Skipping output directory {:?} inside the input tree", child.path);
                }
                Entry::Directory(child) => {
                    let child_output = output_dir.join(&child.name);
                    self.plan_directory(
                        child,
                        &child_output,
                        output_root,
                        Some(index),
                        plans,
                        tasks,
                    );
                }
                Entry::File(file) if file.has_extension(source_ext) => {
                    let Some(output_path) =
                        converted_path(&file.path, output_dir, &self.config.target_extension)
                    else {
                        continue;
                    };
                    found += 1;
                    tasks.push(TranscodeTask {
                        directory: index,
                        input_path: file.path.clone(),
                        output_path,
                        output_lock: None,
                    });
                }
                Entry::File(file) => debug!("Ignoring {:?}", file.path),
            }
        }

        if found == 0 {
            info!("No .{} files found in {:?}", source_ext, node.path);
        } else {
            info!("Found {} .{} file(s) in {:?}", found, source_ext, node.path);
        }
    }

    /// Creates every planned output directory, parents first.
    ///
    /// Returns, per directory, the creation error that blocks it: its own or
    /// the one inherited from an ancestor.
    async fn create_directories(&self, plans: &[DirectoryPlan]) -> Vec<Option<TreeError>> {
        let mut blocked: Vec<Option<TreeError>> = Vec::with_capacity(plans.len());

        for plan in plans {
            if let Some(inherited) = plan.parent.and_then(|p| blocked[p].clone()) {
                blocked.push(Some(inherited));
                continue;
            }

            match self.fs.create_dir(&plan.output_dir).await {
                Ok(()) => {
                    debug!("Mirrored {:?} -> {:?}", plan.input_dir, plan.output_dir);
                    blocked.push(None);
                }
                Err(e) => {
                    warn!("Failed to create output directory {:?}: {}", plan.output_dir, e);
                    blocked.push(Some(TreeError::CreateDirectory {
                        path: plan.output_dir.clone(),
                        reason: e.to_string(),
                    }));
                }
            }
        }

        blocked
    }

    async fn run_task(&self, task: &TranscodeTask, blocked: Option<&TreeError>) -> FileOutcome {
        if let Some(error) = blocked {
            return FileOutcome::Failed {
                error: error.clone(),
            };
        }

        // Held across the existence check and the transcode
        let _same_output = match &task.output_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        self.queue
            .run(async {
                // Checked here rather than while planning, so two inputs that
                // map to the same output produce one transcode and one skip
                if self.fs.exists(&task.output_path).await {
                    info!(
                        "Skipping {:?}: {:?} already exists",
                        task.input_path, task.output_path
                    );
                    return FileOutcome::AlreadyConverted;
                }

                info!("Converting {:?} -> {:?}", task.input_path, task.output_path);
                let job = TranscodeJob::new(&task.input_path, &task.output_path);
                let result = match &self.progress_tx {
                    Some(tx) => self.converter.transcode_with_progress(job, tx.clone()).await,
                    None => self.converter.transcode(job).await,
                };

                match result {
                    Ok(result) => {
                        info!(
                            "Successfully converted {:?} to {:?} in {} ms",
                            task.input_path, task.output_path, result.duration_ms
                        );
                        FileOutcome::Converted {
                            duration_ms: result.duration_ms,
                        }
                    }
                    Err(e) => {
                        warn!("Failed to convert {:?}: {}", task.input_path, e);
                        FileOutcome::Failed {
                            error: TreeError::Transcode {
                                path: task.input_path.clone(),
                                reason: e.to_string(),
                            },
                        }
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConverter, MockFilesystem};
    use crate::tree::DirectoryStatus;
    use std::time::Duration;

    fn converter_for(
        fs: &MockFilesystem,
        mock: &MockConverter,
    ) -> TreeConverter<MockConverter, MockFilesystem> {
        TreeConverter::new(
            TreeConfig::new("/in", "/out"),
            Arc::new(mock.clone()),
            Arc::new(fs.clone()),
        )
    }

    #[tokio::test]
    async fn test_mirrors_directories_and_converts() {
        let fs = MockFilesystem::new();
        fs.add_file("/in/show/ep1.mkv").await;
        fs.add_file("/in/show/notes.txt").await;
        fs.add_dir("/in/empty").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());

        let report = converter_for(&fs, &mock)
            .convert_tree(Path::new("/in"), Path::new("/out"))
            .await
            .unwrap();

        assert!(fs.is_dir("/out").await);
        assert!(fs.is_dir("/out/show").await);
        assert!(fs.is_dir("/out/empty").await);
        assert!(fs.is_file("/out/show/ep1.mp4").await);
        assert!(!fs.exists_at("/out/show/notes.txt").await);
        assert!(!fs.exists_at("/out/show/notes.mp4").await);

        assert_eq!(report.converted_count(), 1);
        assert_eq!(report.directories.len(), 3);
        assert_eq!(
            report
                .directory(Path::new("/in/empty"))
                .map(DirectoryConversion::status),
            Some(DirectoryStatus::Skipped)
        );
    }

    #[tokio::test]
    async fn test_existing_output_is_skipped() {
        let fs = MockFilesystem::new();
        fs.add_file("/in/a.mkv").await;
        fs.add_file("/out/a.mp4").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());

        let report = converter_for(&fs, &mock)
            .convert_tree(Path::new("/in"), Path::new("/out"))
            .await
            .unwrap();

        assert_eq!(mock.transcode_count().await, 0);
        assert_eq!(report.skipped_count(), 1);
    }

    #[tokio::test]
    async fn test_case_variants_map_to_one_output() {
        let fs = MockFilesystem::new();
        fs.add_file("/in/a.MKV").await;
        fs.add_file("/in/a.mkv").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());

        let report = converter_for(&fs, &mock)
            .convert_tree(Path::new("/in"), Path::new("/out"))
            .await
            .unwrap();

        assert_eq!(mock.transcode_count().await, 1);
        assert_eq!(report.converted_count(), 1);
        assert_eq!(report.skipped_count(), 1);
    }

    #[tokio::test]
    async fn test_case_variants_run_one_after_another_in_parallel_queue() {
        let fs = MockFilesystem::new();
        fs.add_file("/in/a.MKV").await;
        fs.add_file("/in/a.mkv").await;
        fs.add_file("/in/b.mkv").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());
        mock.set_delay(Duration::from_millis(20)).await;

        let converter = TreeConverter::new(
            TreeConfig::new("/in", "/out").with_max_in_flight(2),
            Arc::new(mock.clone()),
            Arc::new(fs.clone()),
        );
        let report = converter
            .convert_tree(Path::new("/in"), Path::new("/out"))
            .await
            .unwrap();

        assert_eq!(mock.transcode_count().await, 2);
        assert_eq!(report.converted_count(), 2);
        assert_eq!(
            report.file(Path::new("/in/a.mkv")).map(|f| &f.outcome),
            Some(&FileOutcome::AlreadyConverted)
        );
    }

    #[tokio::test]
    async fn test_same_output_is_retried_after_failure() {
        let fs = MockFilesystem::new();
        fs.add_file("/in/a.MKV").await;
        fs.add_file("/in/a.mkv").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());
        mock.fail_transcode("/in/a.MKV").await;

        let converter = TreeConverter::new(
            TreeConfig::new("/in", "/out").with_max_in_flight(2),
            Arc::new(mock.clone()),
            Arc::new(fs.clone()),
        );
        let report = converter
            .convert_tree(Path::new("/in"), Path::new("/out"))
            .await
            .unwrap();

        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.converted_count(), 1);
        assert!(fs.is_file("/out/a.mp4").await);
    }

    #[tokio::test]
    async fn test_output_root_inside_input_is_not_mirrored() {
        let fs = MockFilesystem::new();
        fs.add_file("/media/show/ep1.mkv").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());
        let converter = TreeConverter::new(
            TreeConfig::new("/media", "/media/out"),
            Arc::new(mock.clone()),
            Arc::new(fs.clone()),
        );

        for _ in 0..3 {
            converter
                .convert_tree(Path::new("/media"), Path::new("/media/out"))
                .await
                .unwrap();
        }

        assert!(fs.is_file("/media/out/show/ep1.mp4").await);
        assert!(!fs.exists_at("/media/out/out").await);
        assert_eq!(mock.transcode_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_failure_blocks_subtree() {
        let fs = MockFilesystem::new();
        fs.add_file("/in/bad/a.mkv").await;
        fs.add_file("/in/bad/deeper/b.mkv").await;
        fs.add_file("/in/good/c.mkv").await;
        fs.fail_create("/out/bad").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());

        let report = converter_for(&fs, &mock)
            .convert_tree(Path::new("/in"), Path::new("/out"))
            .await
            .unwrap();

        let transcoded: Vec<PathBuf> = mock
            .recorded_transcodes()
            .await
            .into_iter()
            .map(|t| t.job.input_path)
            .collect();
        assert_eq!(transcoded, vec![PathBuf::from("/in/good/c.mkv")]);

        assert_eq!(report.failed_count(), 2);
        let bad = report.directory(Path::new("/in/bad")).unwrap();
        assert_eq!(bad.status(), DirectoryStatus::Failed);
        let deeper = report.directory(Path::new("/in/bad/deeper")).unwrap();
        assert!(matches!(
            deeper.error,
            Some(TreeError::CreateDirectory { ref path, .. }) if path == Path::new("/out/bad")
        ));
    }

    #[tokio::test]
    async fn test_root_listing_failure_is_an_error() {
        let fs = MockFilesystem::new();
        let mock = MockConverter::new();

        let result = converter_for(&fs, &mock)
            .convert_tree(Path::new("/in"), Path::new("/out"))
            .await;

        assert!(matches!(result, Err(TreeError::Listing { .. })));
        assert!(!fs.exists_at("/out").await);
    }

    #[tokio::test]
    async fn test_progress_is_forwarded() {
        let fs = MockFilesystem::new();
        fs.add_file("/in/a.mkv").await;
        let mock = MockConverter::new().with_filesystem(fs.clone());
        let (tx, mut rx) = mpsc::channel(16);

        converter_for(&fs, &mock)
            .with_progress(tx)
            .convert_tree(Path::new("/in"), Path::new("/out"))
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.output_path, PathBuf::from("/out/a.mp4"));
    }
}
