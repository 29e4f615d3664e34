//! Immutable directory-tree snapshots.
//!
//! Both stages work on a [`TreeSnapshot`] captured up front instead of
//! listing directories while they mutate the tree. The converter reads a
//! snapshot of the input tree; the combiner reads a snapshot of the output
//! tree taken after conversion has finished.

use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::filesystem::Filesystem;

use super::config::EntryOrder;
use super::error::TreeError;
use super::paths::has_extension;

/// Stream classification of a candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioClass {
    HasAudio,
    NoAudio,
    /// Not classified, or the probe failed.
    Unknown,
}

/// A single file inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub name: String,
    pub path: PathBuf,
    /// Extension without the dot, as it appears on disk.
    pub extension: Option<String>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned());
        Self {
            name: name.into(),
            path,
            extension,
        }
    }

    /// Whether the file's extension matches, ignoring ASCII case.
    pub fn has_extension(&self, extension: &str) -> bool {
        has_extension(&self.path, extension)
    }
}

/// A child of a directory node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Directory(DirectoryNode),
    File(CandidateFile),
}

/// A directory and its children, in visiting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub name: String,
    pub path: PathBuf,
    pub entries: Vec<Entry>,
    /// False when the capture depth stopped above this directory.
    pub expanded: bool,
    /// Set when the directory could not be listed; `entries` is then empty.
    pub listing_error: Option<TreeError>,
}

impl DirectoryNode {
    fn unexpanded(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            entries: Vec::new(),
            expanded: false,
            listing_error: None,
        }
    }

    /// Immediate file children, in visiting order.
    pub fn files(&self) -> impl Iterator<Item = &CandidateFile> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::File(file) => Some(file),
            Entry::Directory(_) => None,
        })
    }

    /// Immediate subdirectories, in visiting order.
    pub fn subdirectories(&self) -> impl Iterator<Item = &DirectoryNode> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Directory(dir) => Some(dir),
            Entry::File(_) => None,
        })
    }

    /// Number of directories in this subtree, including this one.
    pub fn directory_count(&self) -> usize {
        1 + self
            .subdirectories()
            .map(DirectoryNode::directory_count)
            .sum::<usize>()
    }

    /// Number of files in this subtree.
    pub fn file_count(&self) -> usize {
        self.files().count()
            + self
                .subdirectories()
                .map(DirectoryNode::file_count)
                .sum::<usize>()
    }
}

/// A captured directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSnapshot {
    pub root: DirectoryNode,
    pub order: EntryOrder,
}

impl TreeSnapshot {
    /// Captures the tree under `root`.
    ///
    /// `max_depth` limits how many directory levels are listed (the root is
    /// level 1); `None` captures everything. Only a failure to list the root
    /// itself is returned as an error. Failures further down are recorded on
    /// the affected node and its subtree is left empty.
    pub async fn capture<F>(
        fs: &F,
        root: &Path,
        order: EntryOrder,
        max_depth: Option<usize>,
    ) -> Result<Self, TreeError>
    where
        F: Filesystem + ?Sized,
    {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let root = capture_node(fs, name, root.to_path_buf(), order, max_depth).await;
        if let Some(error) = root.listing_error {
            return Err(error);
        }

        Ok(Self { root, order })
    }

    pub fn directory_count(&self) -> usize {
        self.root.directory_count()
    }

    pub fn file_count(&self) -> usize {
        self.root.file_count()
    }
}

fn capture_node<'a, F>(
    fs: &'a F,
    name: String,
    path: PathBuf,
    order: EntryOrder,
    remaining: Option<usize>,
) -> BoxFuture<'a, DirectoryNode>
where
    F: Filesystem + ?Sized,
{
    Box::pin(async move {
        if remaining == Some(0) {
            return DirectoryNode::unexpanded(name, path);
        }

        let mut listed = match fs.list_dir(&path).await {
            Ok(listed) => listed,
            Err(e) => {
                warn!("Error scanning folder {:?}: {}", path, e);
                let error = TreeError::listing(&path, e);
                return DirectoryNode {
                    name,
                    path,
                    entries: Vec::new(),
                    expanded: true,
                    listing_error: Some(error),
                };
            }
        };

        if order == EntryOrder::Sorted {
            listed.sort_by(|a, b| a.name.cmp(&b.name));
        }

        let child_remaining = remaining.map(|r| r - 1);
        let mut entries = Vec::with_capacity(listed.len());
        for entry in listed {
            if entry.is_dir {
                let child = capture_node(fs, entry.name, entry.path, order, child_remaining).await;
                entries.push(Entry::Directory(child));
            } else {
                entries.push(Entry::File(CandidateFile::new(entry.name, entry.path)));
            }
        }

        DirectoryNode {
            name,
            path,
            entries,
            expanded: true,
            listing_error: None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFilesystem;

    async fn sample_fs() -> MockFilesystem {
        let fs = MockFilesystem::new();
        fs.add_file("/in/b.mkv").await;
        fs.add_file("/in/a.mkv").await;
        fs.add_dir("/in/show").await;
        fs.add_file("/in/show/ep1.mkv").await;
        fs.add_file("/in/show/extras/clip.mkv").await;
        fs
    }

    #[tokio::test]
    async fn test_capture_listing_order() {
        let fs = sample_fs().await;
        let snapshot = TreeSnapshot::capture(&fs, Path::new("/in"), EntryOrder::Listing, None)
            .await
            .unwrap();

        let names: Vec<&str> = snapshot.root.files().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.mkv", "a.mkv"]);
        assert_eq!(snapshot.directory_count(), 3);
        assert_eq!(snapshot.file_count(), 4);
    }

    #[tokio::test]
    async fn test_capture_sorted() {
        let fs = sample_fs().await;
        let snapshot = TreeSnapshot::capture(&fs, Path::new("/in"), EntryOrder::Sorted, None)
            .await
            .unwrap();

        let names: Vec<&str> = snapshot.root.files().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.mkv", "b.mkv"]);
    }

    #[tokio::test]
    async fn test_capture_max_depth() {
        let fs = sample_fs().await;
        let snapshot = TreeSnapshot::capture(&fs, Path::new("/in"), EntryOrder::Listing, Some(2))
            .await
            .unwrap();

        let show = snapshot.root.subdirectories().next().unwrap();
        assert!(show.expanded);
        assert_eq!(show.files().count(), 1);

        let extras = show.subdirectories().next().unwrap();
        assert_eq!(extras.name, "extras");
        assert!(!extras.expanded);
        assert!(extras.entries.is_empty());
    }

    #[tokio::test]
    async fn test_capture_root_failure() {
        let fs = MockFilesystem::new();
        let result =
            TreeSnapshot::capture(&fs, Path::new("/missing"), EntryOrder::Listing, None).await;
        assert!(matches!(result, Err(TreeError::Listing { .. })));
    }

    #[tokio::test]
    async fn test_capture_nested_failure_is_recorded() {
        let fs = sample_fs().await;
        fs.fail_listing("/in/show").await;

        let snapshot = TreeSnapshot::capture(&fs, Path::new("/in"), EntryOrder::Listing, None)
            .await
            .unwrap();

        let show = snapshot.root.subdirectories().next().unwrap();
        assert!(show.listing_error.is_some());
        assert!(show.entries.is_empty());
        // Siblings are still captured
        assert_eq!(snapshot.root.files().count(), 2);
    }

    #[test]
    fn test_candidate_extension() {
        let file = CandidateFile::new("EP1.MKV", "/in/EP1.MKV");
        assert_eq!(file.extension.as_deref(), Some("MKV"));
        assert!(file.has_extension("mkv"));
        assert!(!file.has_extension("mp4"));
    }
}
