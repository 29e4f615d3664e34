//! Local disk filesystem implementation.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::error::FilesystemError;
use super::traits::Filesystem;
use super::types::DirEntry;

/// Filesystem backed by the local disk through `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    fn name(&self) -> &str {
        "local"
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FilesystemError> {
        let mut read_dir = fs::read_dir(path)
            .await
            .map_err(|e| FilesystemError::from_io(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| FilesystemError::from_io(path, e))?
        {
            let entry_path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| FilesystemError::from_io(&entry_path, e))?;

            if file_type.is_symlink() {
                // Dangling links are treated as plain files
                let points_to_dir = fs::metadata(&entry_path)
                    .await
                    .map(|m| m.is_dir())
                    .unwrap_or(false);
                if points_to_dir {
                    debug!("Not following directory symlink {:?}", entry_path);
                    continue;
                }
            }
            let is_dir = file_type.is_dir();

            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry_path,
                is_dir,
            });
        }

        Ok(entries)
    }

    async fn create_dir(&self, path: &Path) -> Result<(), FilesystemError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| FilesystemError::from_io(path, e))
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn remove_file(&self, path: &Path) -> Result<(), FilesystemError> {
        fs::remove_file(path)
            .await
            .map_err(|e| FilesystemError::from_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("season1")).await.unwrap();
        fs::write(temp.path().join("ep1.mkv"), b"x").await.unwrap();

        let fs_impl = LocalFilesystem::new();
        let mut entries = fs_impl.list_dir(temp.path()).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "ep1.mkv");
        assert!(!entries[0].is_dir);
        assert_eq!(entries[1].name, "season1");
        assert!(entries[1].is_dir);
        assert_eq!(entries[1].path, temp.path().join("season1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_directory_symlinks_are_not_listed() {
        let temp = TempDir::new().unwrap();
        let show = temp.path().join("show");
        fs::create_dir(&show).await.unwrap();
        fs::write(show.join("ep1.mkv"), b"x").await.unwrap();
        // A link back to its own parent would otherwise recurse until ELOOP
        std::os::unix::fs::symlink(&show, show.join("loop")).unwrap();
        std::os::unix::fs::symlink(show.join("ep1.mkv"), show.join("alias.mkv")).unwrap();
        std::os::unix::fs::symlink(show.join("gone.mkv"), show.join("dangling.mkv")).unwrap();

        let mut entries = LocalFilesystem::new().list_dir(&show).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alias.mkv", "dangling.mkv", "ep1.mkv"]);
        assert!(entries.iter().all(|e| !e.is_dir));
    }

    #[tokio::test]
    async fn test_list_missing_dir() {
        let temp = TempDir::new().unwrap();
        let result = LocalFilesystem::new()
            .list_dir(&temp.path().join("missing"))
            .await;
        assert!(matches!(result, Err(FilesystemError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        let fs_impl = LocalFilesystem::new();

        tokio_test::assert_ok!(fs_impl.create_dir(&nested).await);
        tokio_test::assert_ok!(fs_impl.create_dir(&nested).await);
        assert!(fs_impl.exists(&nested).await);
    }

    #[tokio::test]
    async fn test_remove_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.mp4");
        fs::write(&file, b"x").await.unwrap();
        let fs_impl = LocalFilesystem::new();

        assert!(fs_impl.exists(&file).await);
        fs_impl.remove_file(&file).await.unwrap();
        assert!(!fs_impl.exists(&file).await);

        let err = fs_impl.remove_file(&file).await.unwrap_err();
        assert!(matches!(err, FilesystemError::NotFound { .. }));
    }
}
