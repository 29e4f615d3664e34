//! Tree engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Order in which directory children are visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrder {
    /// Whatever order the filesystem returns. Not stable across platforms or
    /// filesystems, so first-match pairing may pick different files on
    /// different machines.
    #[default]
    Listing,
    /// Byte-wise sort by entry name. Makes pairing deterministic, but changes
    /// which file wins when a directory holds several of the same class.
    Sorted,
}

/// Configuration for the tree converter and pair combiner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Root of the source tree.
    pub input_dir: PathBuf,

    /// Root of the mirrored output tree.
    pub output_dir: PathBuf,

    /// Extension of files to transcode, without the dot. Matched case-insensitively.
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Extension of the target container, without the dot.
    #[serde(default = "default_target_extension")]
    pub target_extension: String,

    /// Visiting order for directory children.
    #[serde(default)]
    pub entry_order: EntryOrder,

    /// Maximum external-service calls in flight at once.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_source_extension() -> String {
    "mkv".to_string()
}

fn default_target_extension() -> String {
    "mp4".to_string()
}

fn default_max_in_flight() -> usize {
    1
}

impl TreeConfig {
    /// Creates a config for the given roots with default extensions.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            source_extension: default_source_extension(),
            target_extension: default_target_extension(),
            entry_order: EntryOrder::default(),
            max_in_flight: default_max_in_flight(),
        }
    }

    /// Sets the source and target extensions.
    pub fn with_extensions(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_extension = source.into();
        self.target_extension = target.into();
        self
    }

    /// Sets the entry order.
    pub fn with_entry_order(mut self, order: EntryOrder) -> Self {
        self.entry_order = order;
        self
    }

    /// Sets the maximum number of in-flight service calls.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TreeConfig::new("/in", "/out");
        assert_eq!(config.source_extension, "mkv");
        assert_eq!(config.target_extension, "mp4");
        assert_eq!(config.entry_order, EntryOrder::Listing);
        assert_eq!(config.max_in_flight, 1);
    }

    #[test]
    fn test_deserialize_minimal() {
        let toml = r#"
            input_dir = "/media/in"
            output_dir = "/media/out"
        "#;
        let config: TreeConfig = toml::from_str(toml).unwrap();
        assert_eq!(config, TreeConfig::new("/media/in", "/media/out"));
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            input_dir = "/media/in"
            output_dir = "/media/out"
            source_extension = "avi"
            target_extension = "mkv"
            entry_order = "sorted"
            max_in_flight = 2
        "#;
        let config: TreeConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.source_extension, "avi");
        assert_eq!(config.target_extension, "mkv");
        assert_eq!(config.entry_order, EntryOrder::Sorted);
        assert_eq!(config.max_in_flight, 2);
    }
}
