//! Text formats for raw configuration.
//!
//! Parsing turns JSON or TOML text into a raw [`Value`] mapping ready for
//! [`Configurable::from_config`](crate::Configurable::from_config);
//! serializing writes an exported config back out. Only strings are
//! handled here, reading and writing files is left to the caller.

use std::path::Path;

use crate::{
    error::{ConfigError, Result},
    value::Value,
};

/// Supported text formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// Format for a file extension.
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext {
            "json" => Ok(Format::Json),
            "toml" | "tml" => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Format for a path, by extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }
}

/// Parse configuration text. Blank content yields an empty mapping.
pub fn parse_str(content: &str, format: Format) -> Result<Value> {
    if content.trim().is_empty() {
        return Ok(Value::empty_map());
    }

    let json: serde_json::Value = match format {
        Format::Json => serde_json::from_str(content)?,
        Format::Toml => {
            let v: toml::Value = toml::from_str(content)?;
            serde_json::to_value(v)?
        }
    };
    Ok(json.into())
}

/// Serialize a value, typically the result of
/// [`Configurable::get_config`](crate::Configurable::get_config).
///
/// TOML has no null, so configs holding null values should be exported
/// as JSON.
pub fn to_string_pretty(value: &Value, format: Format) -> Result<String> {
    let json = value.to_json();
    let s = match format {
        Format::Json => serde_json::to_string_pretty(&json)?,
        Format::Toml => toml::to_string_pretty(&json)?,
    };
    Ok(s)
}
