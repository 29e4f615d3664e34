//! Types for the filesystem module.

use std::path::PathBuf;

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name of the entry (lossy UTF-8).
    pub name: String,
    /// Full path of the entry.
    pub path: PathBuf,
    /// Whether the entry is a directory. Symlinks to directories are not listed.
    pub is_dir: bool,
}

impl DirEntry {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path.into(), false)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::new(path.into(), true)
    }

    fn new(path: PathBuf, is_dir: bool) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path, is_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_path() {
        let entry = DirEntry::file("/out/show/ep1.mp4");
        assert_eq!(entry.name, "ep1.mp4");
        assert!(!entry.is_dir);

        let entry = DirEntry::directory("/out/show");
        assert_eq!(entry.name, "show");
        assert!(entry.is_dir);
    }
}
