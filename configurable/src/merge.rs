//! Recursive merging of nested mappings.

use crate::{
    error::{ConfigError, Result},
    value::{Map, Value},
};

/// Overlay `overlay` onto `base`, recursing into mappings.
///
/// Leaves in `overlay` replace leaves in `base`; mapping-valued keys are
/// merged key by key. Merging a mapping into an existing non-mapping
/// value fails, a missing or null key merges as if it were an empty
/// mapping.
pub fn recursive_update(base: &mut Map, overlay: &Map) -> Result<()> {
    merge_at(base, overlay, "")
}

/// Like [`recursive_update`] but for two arbitrary values, both of which
/// must be mappings.
pub fn merged(base: &Value, overlay: &Value) -> Result<Value> {
    match (base, overlay) {
        (Value::Map(b), Value::Map(o)) => {
            let mut out = b.clone();
            recursive_update(&mut out, o)?;
            Ok(Value::Map(out))
        }
        _ => Err(ConfigError::MergeConflict(format!(
            "<root> ({} into {})",
            overlay.type_name(),
            base.type_name()
        ))),
    }
}

fn merge_at(base: &mut Map, overlay: &Map, path: &str) -> Result<()> {
    for (key, value) in overlay {
        let key_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };

        match value {
            Value::Map(sub) => {
                let slot = base
                    .entry(key.clone())
                    .or_insert_with(Value::empty_map);
                // null merges like a missing key
                if slot.is_null() {
                    *slot = Value::empty_map();
                }
                match slot {
                    Value::Map(existing) => merge_at(existing, sub, &key_path)?,
                    _ => return Err(ConfigError::MergeConflict(key_path)),
                }
            }
            leaf => {
                base.insert(key.clone(), leaf.clone());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: serde_json::Value) -> Map {
        match Value::from(v) {
            Value::Map(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_flat_update() {
        let mut d = map(json!({}));
        recursive_update(&mut d, &map(json!({}))).unwrap();
        assert!(d.is_empty());

        let mut d = map(json!({"a": 10}));
        recursive_update(&mut d, &map(json!({"a": 5}))).unwrap();
        assert_eq!(d, map(json!({"a": 5})));

        let mut d = map(json!({"a": 10}));
        recursive_update(&mut d, &map(json!({"b": 5}))).unwrap();
        assert_eq!(d, map(json!({"a": 10, "b": 5})));
    }

    #[test]
    fn test_recursive_update() {
        let mut d = map(json!({"a": {"b": 1}}));
        recursive_update(&mut d, &map(json!({"a": {"b": 5}}))).unwrap();
        assert_eq!(d, map(json!({"a": {"b": 5}})));

        let mut d = map(json!({"a": {"b": 1}, "c": 3}));
        recursive_update(&mut d, &map(json!({"a": {"c": 5}}))).unwrap();
        assert_eq!(d, map(json!({"a": {"b": 1, "c": 5}, "c": 3})));
    }

    #[test]
    fn test_mapping_into_leaf_fails() {
        let mut d = map(json!({"a": 5}));
        let err = recursive_update(&mut d, &map(json!({"a": {"b": "c"}}))).unwrap_err();
        assert!(matches!(err, ConfigError::MergeConflict(ref p) if p == "a"));
    }

    #[test]
    fn test_mapping_into_null() {
        let mut d = map(json!({"a": null, "b": 1}));
        recursive_update(&mut d, &map(json!({"a": {"c": 2}}))).unwrap();
        assert_eq!(d, map(json!({"a": {"c": 2}, "b": 1})));
    }

    #[test]
    fn test_merged_requires_mappings() {
        assert!(merged(&Value::empty_map(), &Value::from(vec![1])).is_err());
        let out = merged(&Value::from(json!({"a": 1})), &Value::from(json!({"b": 2}))).unwrap();
        assert_eq!(out, Value::from(json!({"a": 1, "b": 2})));
    }
}
