//! Configurable instances.
//!
//! Every schema key of an instance is resolved with a strict precedence:
//!
//! 1. an explicit value, validated with [`Item::validate`];
//! 2. the key of the configuration mapping, converted with
//!    [`Item::from_config`];
//! 3. the item default, [`Item::get_default`].
//!
//! Unknown explicit names and unknown configuration keys are errors.
//! Construction either resolves every key or fails without producing an
//! instance.

use std::{collections::BTreeMap, sync::Arc};

use log::{debug, trace};

use crate::{
    class::ClassRef,
    error::{ConfigError, Result},
    item::Item,
    value::{Map, Value},
};

/// An instance of a configurable class.
#[derive(Debug, Clone, PartialEq)]
pub struct Configurable {
    class: ClassRef,
    values: BTreeMap<String, Value>,
}

/// Builder collecting the configuration mapping and explicit values of a
/// new instance.
#[derive(Debug)]
pub struct ConfigurableBuilder {
    class: ClassRef,
    config: Value,
    values: Vec<(String, Value)>,
}

impl ConfigurableBuilder {
    /// Raw configuration mapping. Null means no configuration.
    pub fn config(mut self, config: impl Into<Value>) -> Self {
        self.config = config.into();
        self
    }

    /// Explicit value for `name`, taking precedence over the configuration.
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<Configurable> {
        Configurable::construct(&self.class, self.config, self.values)
    }
}

impl Configurable {
    pub fn builder(class: &ClassRef) -> ConfigurableBuilder {
        ConfigurableBuilder {
            class: class.clone(),
            config: Value::Null,
            values: Vec::new(),
        }
    }

    /// Instance with every key at its default.
    pub fn new(class: &ClassRef) -> Result<Self> {
        Self::builder(class).build()
    }

    /// Instance built from a raw configuration mapping.
    pub fn from_config(class: &ClassRef, config: impl Into<Value>) -> Result<Self> {
        Self::builder(class).config(config).build()
    }

    fn construct(class: &ClassRef, config: Value, explicit: Vec<(String, Value)>) -> Result<Self> {
        if class.is_abstract() {
            return Err(ConfigError::AbstractClass(class.name().to_string()));
        }

        let mut config = match config {
            Value::Null => Map::new(),
            Value::Map(config) => config,
            other => {
                return Err(ConfigError::InvalidConfigType {
                    class: class.name().to_string(),
                    found: other.type_name().to_string(),
                });
            }
        };

        let schema = class.schema();
        let mut explicit_values = BTreeMap::new();
        for (name, value) in explicit {
            if !schema.contains_key(&name) {
                return Err(ConfigError::UnknownAttribute {
                    class: class.name().to_string(),
                    name,
                });
            }
            explicit_values.insert(name, value);
        }

        if let Some(key) = config.keys().find(|key| !schema.contains_key(*key)) {
            return Err(ConfigError::UnknownConfigKey {
                class: class.name().to_string(),
                key: key.clone(),
            });
        }

        debug!("building {} instance", class.name());
        let mut values = BTreeMap::new();
        for (name, item) in schema {
            let value = if let Some(value) = explicit_values.remove(name) {
                trace!("{}.{name}: explicit value", class.name());
                item.validate(value)?
            } else if let Some(raw) = config.remove(name) {
                trace!("{}.{name}: from config", class.name());
                item.from_config(raw)?
            } else {
                trace!("{}.{name}: default", class.name());
                item.get_default()?
            };
            values.insert(name.clone(), value);
        }

        Ok(Self {
            class: class.clone(),
            values,
        })
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Whether this instance's class is `class` or derives from it.
    pub fn is_instance_of(&self, class: &ClassRef) -> bool {
        self.class.is_subclass_of(class)
    }

    fn schema_item(&self, name: &str) -> Result<&Arc<Item>> {
        self.class
            .item(name)
            .ok_or_else(|| ConfigError::UnknownAttribute {
                class: self.class.name().to_string(),
                name: name.to_string(),
            })
    }

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.schema_item(name)?;
        self.values
            .get(name)
            .ok_or_else(|| ConfigError::UnknownAttribute {
                class: self.class.name().to_string(),
                name: name.to_string(),
            })
    }

    /// Validate `value` with the item declared for `name` and store it.
    ///
    /// On error the previous value is kept.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = self.schema_item(name)?.validate(value.into())?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Nested instance stored under `name`, if the slot holds one.
    pub fn child(&self, name: &str) -> Option<&Configurable> {
        self.values.get(name).and_then(Value::as_instance)
    }

    /// Resolved values in schema order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Export the current values as a raw configuration mapping that
    /// rebuilds an equal instance.
    pub fn get_config(&self) -> Value {
        let config = self
            .values
            .iter()
            .map(|(name, value)| {
                let raw = match self.class.item(name) {
                    Some(item) => item.to_config(value),
                    None => Value::from(value.to_json()),
                };
                (name.clone(), raw)
            })
            .collect();
        Value::Map(config)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{class::Class, item::Item};

    fn simple() -> ClassRef {
        Class::builder("Test")
            .item("val", Item::int().default(1))
            .build()
            .unwrap()
    }

    #[test]
    fn test_precedence() {
        let cls = simple();

        let t = Configurable::builder(&cls)
            .config(json!({"val": 2}))
            .value("val", 3)
            .build()
            .unwrap();
        assert_eq!(t.get("val").unwrap(), &Value::Int(3));

        let t = Configurable::from_config(&cls, json!({"val": 2})).unwrap();
        assert_eq!(t.get("val").unwrap(), &Value::Int(2));

        let t = Configurable::new(&cls).unwrap();
        assert_eq!(t.get("val").unwrap(), &Value::Int(1));
    }

    #[test]
    fn test_assignment() {
        let cls = Class::builder("Test").item("val", Item::object()).build().unwrap();
        let mut t = Configurable::new(&cls).unwrap();
        assert_eq!(t.get("val").unwrap(), &Value::Null);
        t.set("val", 5).unwrap();
        assert_eq!(t.get("val").unwrap(), &Value::Int(5));
        assert_eq!(t.get_config().to_json(), json!({"val": 5}));
    }

    #[test]
    fn test_failed_assignment_keeps_value() {
        let cls = Class::builder("Test")
            .item("val", Item::int().default(1).allow_none(false))
            .build()
            .unwrap();
        let mut t = Configurable::new(&cls).unwrap();
        assert!(t.set("val", Value::Null).is_err());
        assert!(t.set("val", "x").is_err());
        assert_eq!(t.get("val").unwrap(), &Value::Int(1));
    }

    #[test]
    fn test_unknown_names() {
        let cls = simple();

        let err = Configurable::builder(&cls).value("nope", 1).build().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAttribute { .. }));

        let err = Configurable::from_config(&cls, json!({"nope": 1})).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownConfigKey { ref key, .. } if key == "nope"));

        let mut t = Configurable::new(&cls).unwrap();
        assert!(t.get("nope").is_err());
        assert!(t.set("nope", 1).is_err());
    }

    #[test]
    fn test_config_must_be_mapping() {
        let err = Configurable::from_config(&simple(), json!([1, 2])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfigType { .. }));
    }

    #[test]
    fn test_abstract_class() {
        let cls = Class::builder("Abstract").make_abstract().build().unwrap();
        let err = Configurable::new(&cls).unwrap_err();
        assert!(matches!(err, ConfigError::AbstractClass(_)));
    }

    #[test]
    fn test_non_null_item_without_default() {
        let cls = Class::builder("Strict")
            .item("val", Item::int().allow_none(false))
            .build()
            .unwrap();
        assert!(Configurable::new(&cls).is_err());
        let t = Configurable::builder(&cls).value("val", 4).build().unwrap();
        assert_eq!(t.get("val").unwrap().as_int(), Some(4));
    }

    #[test]
    fn test_is_instance_of() {
        let base = simple();
        let sub = Class::builder("Sub").base(&base).build().unwrap();
        let t = Configurable::new(&sub).unwrap();
        assert!(t.is_instance_of(&base));
        assert!(t.is_instance_of(&sub));
        assert!(!Configurable::new(&base).unwrap().is_instance_of(&sub));
    }
}
