pub mod config;
pub mod converter;
pub mod filesystem;
pub mod testing;
pub mod tree;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LoggingConfig,
};
pub use converter::{Converter, ConverterConfig, ConverterError, FfmpegConverter};
pub use filesystem::{Filesystem, FilesystemError, LocalFilesystem};
pub use tree::{
    CombineReport, ConvertReport, MediaPipeline, PairCombiner, PipelineReport, TreeConfig,
    TreeConverter, TreeError, TreeSnapshot, WorkQueue,
};
