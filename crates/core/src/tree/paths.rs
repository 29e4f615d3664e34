//! Path helpers shared by the converter and combiner.

use std::path::{Path, PathBuf};

/// Whether the path's extension equals `extension`, ignoring ASCII case.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Output path for a converted file: same base name, target extension,
/// placed in `output_dir`.
pub fn converted_path(input_file: &Path, output_dir: &Path, target_extension: &str) -> Option<PathBuf> {
    let file_name = input_file.file_name()?;
    Some(output_dir.join(Path::new(file_name).with_extension(target_extension)))
}

/// Path of the combined output for a directory: `<dir>/<dir name>.<ext>`.
pub fn combined_path(directory: &Path, target_extension: &str) -> PathBuf {
    let name = directory
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    directory.join(format!("{}.{}", name, target_extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_extension_ignores_case() {
        assert!(has_extension(Path::new("/in/a.mkv"), "mkv"));
        assert!(has_extension(Path::new("/in/a.MKV"), "mkv"));
        assert!(has_extension(Path::new("/in/a.Mkv"), "MKV"));
        assert!(!has_extension(Path::new("/in/a.mkv.part"), "mkv"));
        assert!(!has_extension(Path::new("/in/mkv"), "mkv"));
        assert!(!has_extension(Path::new("/in/.mkv"), "mkv"));
    }

    #[test]
    fn test_converted_path_keeps_base_name() {
        let out = converted_path(Path::new("/in/show/ep1.MKV"), Path::new("/out/show"), "mp4");
        assert_eq!(out, Some(PathBuf::from("/out/show/ep1.mp4")));

        let out = converted_path(Path::new("/in/a.b.mkv"), Path::new("/out"), "mp4");
        assert_eq!(out, Some(PathBuf::from("/out/a.b.mp4")));
    }

    #[test]
    fn test_combined_path() {
        assert_eq!(
            combined_path(Path::new("/out/Concert 2019"), "mp4"),
            PathBuf::from("/out/Concert 2019/Concert 2019.mp4")
        );
    }
}
