use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::file_format::SerdeFormat;

pub type Result<T> = anyhow::Result<T>;

pub fn serialize<T: Serialize>(value: &T, format: SerdeFormat) -> Result<String> {
    let mut s = match format {
        SerdeFormat::Yaml => serde_yml::to_string(value)?,
        SerdeFormat::Json => serde_json::to_string_pretty(value)?,
    };
    if !s.ends_with('\n') {
        s.push('\n');
    }
    Ok(s)
}

pub fn deserialize<T: DeserializeOwned>(serialized: &str, format: SerdeFormat) -> Result<T> {
    match format {
        SerdeFormat::Yaml => Ok(serde_yml::from_str(serialized)?),
        SerdeFormat::Json => Ok(serde_json::from_str(serialized)?),
    }
}

/// Reads and deserializes a file, picking the format from its extension.
pub fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = SerdeFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    deserialize(&text, format).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Serializes a value and writes it to a file, picking the format from its extension.
pub fn write_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let format = SerdeFormat::from_path(path)?;
    let text = serialize(value, format)?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}
