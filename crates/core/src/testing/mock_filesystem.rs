//! In-memory filesystem for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::filesystem::{DirEntry, Filesystem, FilesystemError};

#[derive(Debug, Clone)]
enum Node {
    /// Children in insertion order, which is the listing order.
    Dir(Vec<PathBuf>),
    File,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<PathBuf, Node>,
    failing_listings: HashSet<PathBuf>,
    failing_creates: HashSet<PathBuf>,
    failing_removes: HashSet<PathBuf>,
    created_dirs: Vec<PathBuf>,
    removed_files: Vec<PathBuf>,
}

impl State {
    /// Inserts a node, creating missing ancestors. Existing nodes are kept.
    fn insert(&mut self, path: &Path, node: Node) {
        if self.nodes.contains_key(path) {
            return;
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.insert(parent, Node::Dir(Vec::new()));
            if let Some(Node::Dir(children)) = self.nodes.get_mut(parent) {
                children.push(path.to_path_buf());
            }
        }
        self.nodes.insert(path.to_path_buf(), node);
    }

    fn remove(&mut self, path: &Path) {
        self.nodes.remove(path);
        if let Some(Node::Dir(children)) = path.parent().and_then(|p| self.nodes.get_mut(p)) {
            children.retain(|child| child != path);
        }
    }
}

/// In-memory implementation of the Filesystem trait.
///
/// Directories list their children in insertion order. Adding a file or
/// directory creates its missing ancestors. Clones share state, so a test can
/// keep a handle while the engine owns another.
///
/// # Example
///
/// ```rust,ignore
/// use mirrormux_core::testing::MockFilesystem;
///
/// let fs = MockFilesystem::new();
/// fs.add_file("/in/show/ep1.mkv").await;
/// fs.fail_listing("/in/broken").await;
///
/// // Run the engine...
///
/// assert!(fs.is_dir("/out/show").await);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockFilesystem {
    state: Arc<RwLock<State>>,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, creating its parent directories.
    pub async fn add_file(&self, path: impl AsRef<Path>) {
        self.state.write().await.insert(path.as_ref(), Node::File);
    }

    /// Adds an empty directory, creating its parents.
    pub async fn add_dir(&self, path: impl AsRef<Path>) {
        self.state
            .write()
            .await
            .insert(path.as_ref(), Node::Dir(Vec::new()));
    }

    /// Makes listing the given directory fail with a permission error.
    pub async fn fail_listing(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.state.write().await;
        state.insert(&path, Node::Dir(Vec::new()));
        state.failing_listings.insert(path);
    }

    /// Makes creating the given directory fail with a permission error.
    pub async fn fail_create(&self, path: impl AsRef<Path>) {
        self.state
            .write()
            .await
            .failing_creates
            .insert(path.as_ref().to_path_buf());
    }

    /// Makes deleting the given file fail with a permission error.
    pub async fn fail_remove(&self, path: impl AsRef<Path>) {
        self.state
            .write()
            .await
            .failing_removes
            .insert(path.as_ref().to_path_buf());
    }

    pub async fn exists_at(&self, path: impl AsRef<Path>) -> bool {
        self.state.read().await.nodes.contains_key(path.as_ref())
    }

    pub async fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        matches!(
            self.state.read().await.nodes.get(path.as_ref()),
            Some(Node::Dir(_))
        )
    }

    pub async fn is_file(&self, path: impl AsRef<Path>) -> bool {
        matches!(
            self.state.read().await.nodes.get(path.as_ref()),
            Some(Node::File)
        )
    }

    /// Directories created through `create_dir`, in call order.
    pub async fn created_dirs(&self) -> Vec<PathBuf> {
        self.state.read().await.created_dirs.clone()
    }

    /// Files deleted through `remove_file`, in call order.
    pub async fn removed_files(&self) -> Vec<PathBuf> {
        self.state.read().await.removed_files.clone()
    }
}

#[async_trait]
impl Filesystem for MockFilesystem {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FilesystemError> {
        let state = self.state.read().await;
        if state.failing_listings.contains(path) {
            return Err(FilesystemError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }

        match state.nodes.get(path) {
            Some(Node::Dir(children)) => Ok(children
                .iter()
                .map(|child| match state.nodes.get(child) {
                    Some(Node::Dir(_)) => DirEntry::directory(child),
                    _ => DirEntry::file(child),
                })
                .collect()),
            Some(Node::File) => Err(FilesystemError::NotADirectory {
                path: path.to_path_buf(),
            }),
            None => Err(FilesystemError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }

    async fn create_dir(&self, path: &Path) -> Result<(), FilesystemError> {
        let mut state = self.state.write().await;

        for ancestor in path.ancestors().collect::<Vec<_>>().into_iter().rev() {
            match state.nodes.get(ancestor) {
                Some(Node::Dir(_)) => continue,
                Some(Node::File) => {
                    return Err(FilesystemError::NotADirectory {
                        path: ancestor.to_path_buf(),
                    })
                }
                None if state.failing_creates.contains(ancestor) => {
                    return Err(FilesystemError::PermissionDenied {
                        path: ancestor.to_path_buf(),
                    })
                }
                None => {}
            }
        }

        state.insert(path, Node::Dir(Vec::new()));
        state.created_dirs.push(path.to_path_buf());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.exists_at(path).await
    }

    async fn remove_file(&self, path: &Path) -> Result<(), FilesystemError> {
        let mut state = self.state.write().await;
        if state.failing_removes.contains(path) {
            return Err(FilesystemError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }

        match state.nodes.get(path) {
            Some(Node::File) => {
                state.remove(path);
                state.removed_files.push(path.to_path_buf());
                Ok(())
            }
            Some(Node::Dir(_)) => Err(FilesystemError::from_io(
                path,
                std::io::Error::from(std::io::ErrorKind::IsADirectory),
            )),
            None => Err(FilesystemError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }
}
