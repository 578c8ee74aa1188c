use super::BatcherConfig;
use anyhow::{Context, Result};
use ron::ser::PrettyConfig;
use std::fs;
use std::path::Path;

pub fn save_config(path: impl AsRef<Path>, config: &BatcherConfig) -> Result<()> {
    let path = path.as_ref();
    let pretty = PrettyConfig::new();
    let serialized = ron::ser::to_string_pretty(config, pretty)?;
    fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
