//! Schema items: one named, typed, validated attribute slot.
//!
//! An [`Item`] is declared while building a class and bound to its
//! declaring class and attribute name exactly once, when the class is
//! finalized. Every value stored on an instance passes through
//! [`Item::validate`].
//!
//! ## Item kinds
//!
//! - [`basic`] - object, integer, float, string and boolean items
//! - [`path`] - filesystem path items
//! - [`instance`] - nested, possibly polymorphic configurable instances
//! - [`lookup`] - hierarchical override tables

/// Simple scalar validators.
pub mod basic;

/// Nested configurable instance slots.
pub mod instance;

/// Hierarchical lookup tables.
pub mod lookup;

/// Filesystem path items.
pub mod path;

use std::{
    fmt,
    mem,
    sync::{Arc, Weak},
};

use crate::{
    class::{Class, ClassRef},
    error::{ConfigError, Result},
    value::Value,
};

pub use self::{
    instance::{DISCRIMINATOR, InstanceItem},
    lookup::{IntoLookupKeys, LookupDatabase, LookupEntry, LookupItem},
    path::PathRules,
};

const UNBOUND: &str = "<unbound>";

/// A declared attribute slot of a configurable class.
pub struct Item {
    help: String,
    allow_none: bool,
    /// Declared default in raw form.
    default: Value,
    name: String,
    owner: Weak<Class>,
    kind: ItemKind,
}

/// Value kind governed by an item.
#[derive(Debug)]
pub enum ItemKind {
    /// Any value, stored as given.
    Object,
    /// Integer with optional inclusive bounds.
    Integer { min: Option<i64>, max: Option<i64> },
    /// Float with optional inclusive bounds.
    Float { min: Option<f64>, max: Option<f64> },
    /// String value.
    String,
    /// Boolean value.
    Boolean,
    /// Filesystem path.
    Path(PathRules),
    /// Nested configurable instance.
    Instance(InstanceItem),
    /// Hierarchical lookup table.
    Lookup(LookupItem),
}

impl ItemKind {
    /// Name of the kind, as used in messages and exported schemas.
    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::Object => "Object",
            ItemKind::Integer { .. } => "Int",
            ItemKind::Float { .. } => "Float",
            ItemKind::String => "String",
            ItemKind::Boolean => "Bool",
            ItemKind::Path(_) => "Path",
            ItemKind::Instance(_) => "ConfigurableInstance",
            ItemKind::Lookup(_) => "Lookup",
        }
    }
}

impl Item {
    fn with_kind(kind: ItemKind, allow_none: bool) -> Self {
        Self {
            help: String::new(),
            allow_none,
            default: Value::Null,
            name: String::new(),
            owner: Weak::new(),
            kind,
        }
    }

    /// Item accepting any value.
    pub fn object() -> Self {
        Self::with_kind(ItemKind::Object, true)
    }

    /// Integer item. Integral floats are accepted and converted.
    pub fn int() -> Self {
        Self::int_bounded(None, None)
    }

    /// Integer item restricted to `min..=max`.
    pub fn int_bounded(min: Option<i64>, max: Option<i64>) -> Self {
        Self::with_kind(ItemKind::Integer { min, max }, true)
    }

    /// Float item. Integers are accepted and converted.
    pub fn float() -> Self {
        Self::float_bounded(None, None)
    }

    /// Float item restricted to `min..=max`.
    pub fn float_bounded(min: Option<f64>, max: Option<f64>) -> Self {
        Self::with_kind(ItemKind::Float { min, max }, true)
    }

    pub fn string() -> Self {
        Self::with_kind(ItemKind::String, true)
    }

    pub fn bool() -> Self {
        Self::with_kind(ItemKind::Boolean, true)
    }

    /// Path item without existence rules.
    pub fn path() -> Self {
        Self::path_with(PathRules::default())
    }

    /// Path item checked against `rules`.
    pub fn path_with(rules: PathRules) -> Self {
        Self::with_kind(ItemKind::Path(rules), true)
    }

    /// Nested instance of `base` or any of its subclasses.
    ///
    /// The item's [`default`](Self::default) is the locally declared
    /// default config, overlaid on the base class default config.
    pub fn instance(base: &ClassRef) -> Self {
        Self::with_kind(ItemKind::Instance(InstanceItem::new(base, true)), false)
    }

    /// Nested instance whose class must be exactly `base`.
    pub fn instance_exact(base: &ClassRef) -> Self {
        Self::with_kind(ItemKind::Instance(InstanceItem::new(base, false)), false)
    }

    /// Lookup table of `item` values keyed by `hierarchy`, least
    /// specific axis first.
    ///
    /// The item's [`default`](Self::default) is either a single value or a
    /// `{"default": .., "lookups": [..]}` mapping seeding the table.
    pub fn lookup<I, S>(item: Item, hierarchy: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hierarchy = hierarchy.into_iter().map(Into::into).collect();
        // null handling is delegated to the governing item
        Self::with_kind(ItemKind::Lookup(LookupItem::new(item, hierarchy)), true)
    }

    /// Set the help text.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Set whether null is a valid value.
    pub fn allow_none(mut self, allow_none: bool) -> Self {
        self.allow_none = allow_none;
        self
    }

    /// Set the declared default, in raw configuration form.
    pub fn default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }

    /// Bind the item to its declaring class. Only called while the class
    /// is being finalized, when the item is still uniquely owned.
    pub(crate) fn bind(&mut self, owner: &Weak<Class>, name: &str) {
        self.owner = owner.clone();
        self.name = name.to_string();
        if let ItemKind::Lookup(lookup) = &mut self.kind
            && let Some(inner) = Arc::get_mut(&mut lookup.item)
        {
            inner.bind(owner, name);
        }
    }

    /// Attribute name, or `<unbound>` for an item not attached to a class.
    pub fn name(&self) -> &str {
        if self.name.is_empty() {
            UNBOUND
        } else {
            &self.name
        }
    }

    /// Declaring class, while it is alive.
    pub fn owner(&self) -> Option<ClassRef> {
        self.owner.upgrade()
    }

    fn owner_name(&self) -> String {
        self.owner()
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| UNBOUND.to_string())
    }

    pub fn help_text(&self) -> &str {
        &self.help
    }

    pub fn allows_none(&self) -> bool {
        self.allow_none
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    /// Declared default in raw form, as passed to [`default`](Self::default).
    pub fn declared_default(&self) -> &Value {
        &self.default
    }

    /// Whether both items govern the same kind of value.
    pub fn same_kind(&self, other: &Item) -> bool {
        mem::discriminant(&self.kind) == mem::discriminant(&other.kind)
    }

    /// Validation error naming this item, its owner and `value`.
    pub fn error(&self, value: &Value, reason: impl Into<String>) -> ConfigError {
        ConfigError::Validation {
            item: self.name().to_string(),
            owner: self.owner_name(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Normalize and check a candidate value.
    pub fn validate(&self, value: Value) -> Result<Value> {
        if value.is_null() {
            if !self.allow_none {
                return Err(self.error(&value, "must not be null"));
            }
            if !matches!(self.kind, ItemKind::Lookup(_)) {
                return Ok(Value::Null);
            }
        }

        match &self.kind {
            ItemKind::Object => Ok(value),
            ItemKind::Integer { min, max } => basic::validate_int(self, value, *min, *max),
            ItemKind::Float { min, max } => basic::validate_float(self, value, *min, *max),
            ItemKind::String => basic::validate_string(self, value),
            ItemKind::Boolean => basic::validate_bool(self, value),
            ItemKind::Path(rules) => rules.validate(self, value),
            ItemKind::Instance(instance) => instance.validate(self, value),
            ItemKind::Lookup(lookup) => lookup.validate(self, value),
        }
    }

    /// Convert a raw configuration value into a validated value.
    pub fn from_config(&self, raw: Value) -> Result<Value> {
        match &self.kind {
            ItemKind::Instance(instance) => instance.from_config(self, raw),
            ItemKind::Lookup(lookup) => lookup.from_config(self, raw),
            _ => self.validate(raw),
        }
    }

    /// Produce the validated default.
    pub fn get_default(&self) -> Result<Value> {
        match &self.kind {
            ItemKind::Instance(instance) => instance.get_default(self),
            ItemKind::Lookup(lookup) => lookup.get_default(self),
            _ => self.validate(self.default.clone()),
        }
    }

    /// Produce the default in the raw form [`from_config`](Self::from_config)
    /// accepts.
    pub fn get_default_config(&self) -> Result<Value> {
        match &self.kind {
            ItemKind::Instance(instance) => instance.get_default_config(self),
            ItemKind::Lookup(lookup) => lookup.get_default_config(self),
            _ => Ok(self.to_config(&self.get_default()?)),
        }
    }

    /// Export a value held by this item back into raw form.
    pub fn to_config(&self, value: &Value) -> Value {
        match (&self.kind, value) {
            (ItemKind::Instance(instance), Value::Instance(inst)) => instance.export(inst),
            (_, Value::Lookup(db)) => db.to_config(),
            (_, other) => Value::from(other.to_json()),
        }
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("name", &self.name())
            .field("owner", &self.owner_name())
            .field("allow_none", &self.allow_none)
            .field("default", &self.default)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(name={}, default={})",
            self.kind.name(),
            self.name(),
            self.default
        )
    }
}
