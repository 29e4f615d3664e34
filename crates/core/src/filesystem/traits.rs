//! Trait definitions for the filesystem module.

use async_trait::async_trait;
use std::path::Path;

use super::error::FilesystemError;
use super::types::DirEntry;

/// The filesystem primitives the tree engine needs.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Returns the name of this filesystem implementation.
    fn name(&self) -> &str;

    /// Lists the immediate children of a directory, in the order the
    /// underlying filesystem returns them. Symlinks to directories are left
    /// out, so a walk never loops; symlinks to files are listed as files.
    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FilesystemError>;

    /// Creates a directory and any missing parents. Succeeds if it already exists.
    async fn create_dir(&self, path: &Path) -> Result<(), FilesystemError>;

    /// Whether anything exists at the path.
    async fn exists(&self, path: &Path) -> bool;

    /// Deletes a single file.
    async fn remove_file(&self, path: &Path) -> Result<(), FilesystemError>;
}
