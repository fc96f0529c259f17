use std::sync::Arc;

use log::trace;

use crate::{
    class::ClassRef,
    configurable::Configurable,
    error::Result,
    item::Item,
    merge,
    value::Value,
};

/// Configuration key selecting the concrete class of a nested instance.
pub const DISCRIMINATOR: &str = "cls";

/// Nested configurable slot.
#[derive(Debug)]
pub struct InstanceItem {
    base: ClassRef,
    allow_subclasses: bool,
}

impl InstanceItem {
    pub(crate) fn new(base: &ClassRef, allow_subclasses: bool) -> Self {
        Self {
            base: base.clone(),
            allow_subclasses,
        }
    }

    /// Declared base class of the slot.
    pub fn base(&self) -> &ClassRef {
        &self.base
    }

    pub fn allows_subclasses(&self) -> bool {
        self.allow_subclasses
    }

    /// Whether every instance a slot of `other` can hold also fits this slot.
    pub fn admits(&self, other: &InstanceItem) -> bool {
        if self.allow_subclasses {
            other.base.is_subclass_of(&self.base)
        } else {
            !other.allow_subclasses && Arc::ptr_eq(&other.base, &self.base)
        }
    }

    pub(crate) fn validate(&self, item: &Item, value: Value) -> Result<Value> {
        let Value::Instance(instance) = &value else {
            return Err(item.error(&value, format!("must be an instance of {}", self.base)));
        };

        if !instance.class().is_subclass_of(&self.base) {
            return Err(item.error(&value, format!("must be an instance of {}", self.base)));
        }
        if !self.allow_subclasses && !Arc::ptr_eq(instance.class(), &self.base) {
            return Err(item.error(&value, "must not be a subclass instance"));
        }
        Ok(value)
    }

    /// Resolve a discriminator into a class deriving from the base.
    fn resolve_class(&self, item: &Item, discriminator: Value) -> Result<ClassRef> {
        match discriminator {
            Value::Str(name) => self.base.nonabstract_subclass(&name),
            Value::Class(class) if class.is_subclass_of(&self.base) => Ok(class),
            Value::Class(class) => Err(item.error(
                &Value::Class(class),
                format!("must be a subclass of {}", self.base),
            )),
            other => Err(item.error(
                &other,
                format!("`{DISCRIMINATOR}` must be a class or the name of a subclass of {}", self.base),
            )),
        }
    }

    pub(crate) fn from_config(&self, item: &Item, raw: Value) -> Result<Value> {
        let mut config = match raw {
            Value::Map(config) => config,
            // already-built instances and null go straight to validation
            other @ (Value::Null | Value::Instance(_)) => return item.validate(other),
            other => return Err(item.error(&other, "config must be a mapping")),
        };

        let class = match config.remove(DISCRIMINATOR) {
            None | Some(Value::Null) => self.base.clone(),
            Some(discriminator) => self.resolve_class(item, discriminator)?,
        };
        trace!("{}: building {} from config", item.name(), class.name());

        let instance = Configurable::builder(&class)
            .config(Value::Map(config))
            .build()?;
        item.validate(instance.into())
    }

    /// Base class default config with the locally declared default config
    /// merged on top.
    pub(crate) fn get_default_config(&self, item: &Item) -> Result<Value> {
        let base = self.base.default_config()?;
        match item.declared_default() {
            Value::Null => Ok(base),
            local => merge::merged(&base, local),
        }
    }

    pub(crate) fn get_default(&self, item: &Item) -> Result<Value> {
        self.from_config(item, self.get_default_config(item)?)
    }

    /// Export an instance, naming its class when it differs from the base.
    pub(crate) fn export(&self, instance: &Configurable) -> Value {
        let mut config = instance.get_config();
        if !Arc::ptr_eq(instance.class(), &self.base)
            && let Value::Map(map) = &mut config
        {
            map.insert(
                DISCRIMINATOR.to_string(),
                Value::Str(instance.class().name().to_string()),
            );
        }
        config
    }
}
