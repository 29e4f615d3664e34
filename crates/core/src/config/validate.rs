use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Extensions are non-empty and given without a leading dot
/// - Source and target extensions differ
/// - max_in_flight is not 0
/// - Input and output roots differ and neither contains the other
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let tree = &config.tree;

    for (key, ext) in [
        ("tree.source_extension", &tree.source_extension),
        ("tree.target_extension", &tree.target_extension),
    ] {
        if ext.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                key
            )));
        }
        if ext.starts_with('.') {
            return Err(ConfigError::ValidationError(format!(
                "{} must not start with a dot (got {:?})",
                key, ext
            )));
        }
    }

    if tree
        .source_extension
        .eq_ignore_ascii_case(&tree.target_extension)
    {
        return Err(ConfigError::ValidationError(
            "tree.source_extension and tree.target_extension must differ".to_string(),
        ));
    }

    if tree.max_in_flight == 0 {
        return Err(ConfigError::ValidationError(
            "tree.max_in_flight cannot be 0".to_string(),
        ));
    }

    if tree.input_dir == tree.output_dir {
        return Err(ConfigError::ValidationError(
            "tree.input_dir and tree.output_dir must differ".to_string(),
        ));
    }

    if tree.output_dir.starts_with(&tree.input_dir) || tree.input_dir.starts_with(&tree.output_dir)
    {
        return Err(ConfigError::ValidationError(format!(
            "tree.input_dir ({:?}) and tree.output_dir ({:?}) must not be nested",
            tree.input_dir, tree.output_dir
        )));
    }

    Ok(())
}
