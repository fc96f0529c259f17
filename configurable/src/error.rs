//! Error types for schema definition, instance construction and lookups.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors produced while defining classes, building instances or
/// resolving lookup tables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicit value was given for a name the schema does not declare.
    #[error("{class} got an unexpected attribute `{name}`")]
    UnknownAttribute { class: String, name: String },

    /// The configuration mapping contains a key the schema does not declare.
    #[error("unknown configuration key `{key}` for {class}")]
    UnknownConfigKey { class: String, key: String },

    /// A value failed an item's contract.
    #[error("config error for item `{item}` of {owner}: {reason}, got {value}")]
    Validation {
        item: String,
        owner: String,
        value: String,
        reason: String,
    },

    /// A discriminator name did not resolve to a concrete subclass.
    #[error("`{name}` is not a non-abstract subclass of {base}, expected one of: {candidates:?}")]
    UnknownSubclass {
        base: String,
        name: String,
        candidates: Vec<String>,
    },

    /// A lookup table definition is structurally invalid.
    #[error("malformed lookup table: {0}")]
    MalformedTable(String),

    /// A lookup was called with the wrong number of keys.
    #[error("lookup must be a tuple of form {expected}, got {got} keys")]
    LookupShape { expected: String, got: usize },

    /// The raw configuration handed to a class was not a mapping.
    #[error("config for {class} must be a mapping, got {found}")]
    InvalidConfigType { class: String, found: String },

    /// Abstract classes only exist to be subclassed.
    #[error("cannot instantiate abstract class {0}")]
    AbstractClass(String),

    /// The same item name was declared twice in one class body.
    #[error("item `{name}` declared twice in {class}")]
    DuplicateItem { class: String, name: String },

    /// A mapping was merged into a non-mapping leaf.
    #[error("cannot merge a mapping into non-mapping value at `{0}`")]
    MergeConflict(String),

    /// JSON parse or conversion failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML parse failure.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failure.
    #[error(transparent)]
    TomlSerialize(#[from] toml::ser::Error),

    /// Extension that maps to no known format.
    #[error("unsupported config format: {0:?}")]
    UnsupportedFormat(String),
}

impl ConfigError {
    /// Whether this error is one of the value-contract failures callers
    /// may correct and retry.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ConfigError::Validation { .. } | ConfigError::UnknownSubclass { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message() {
        let err = ConfigError::Validation {
            item: "val".into(),
            owner: "Foo".into(),
            value: "null".into(),
            reason: "must not be null".into(),
        };
        assert_eq!(
            err.to_string(),
            "config error for item `val` of Foo: must not be null, got null"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_unknown_subclass_lists_candidates() {
        let err = ConfigError::UnknownSubclass {
            base: "Node".into(),
            name: "blabla".into(),
            candidates: vec!["Node".into(), "SubNode".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("blabla"));
        assert!(msg.contains("SubNode"));
    }
}
