use super::{BatcherConfig, save_config};
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Reads and validates the config, writing the defaults out first if the
/// file does not exist yet.
pub fn load_config(path: impl AsRef<Path>) -> Result<BatcherConfig> {
    let path = path.as_ref();
    let config = match fs::read_to_string(path) {
        Ok(content) => ron::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let config = BatcherConfig::default();
            save_config(path, &config)?;
            config
        }
        Err(err) => return Err(err).with_context(|| format!("failed to read {}", path.display())),
    };
    config.validate()?;
    Ok(config)
}
