//! Configurable class definitions.
//!
//! A [`Class`] is a named schema: a flat mapping from attribute name to
//! [`Item`], composed from the schemas of its bases plus the items
//! declared in its own body. Classes are built once with
//! [`ClassBuilder`] and shared as [`ClassRef`].
//!
//! Every class keeps weak references to the classes derived from it, so
//! the set of concrete subclasses reflects whatever has been defined at
//! the time of the query.
//!
//! ```rust
//! use configurable::{Class, Configurable, Item};
//!
//! let node = Class::builder("Node")
//!     .item("val", Item::int().default(1))
//!     .build()
//!     .unwrap();
//! let sub = Class::builder("SubNode")
//!     .base(&node)
//!     .item("extra", Item::string().default("x"))
//!     .build()
//!     .unwrap();
//!
//! assert!(sub.schema().contains_key("val"));
//! assert!(node.nonabstract_subclasses().contains_key("SubNode"));
//!
//! let instance = Configurable::new(&sub).unwrap();
//! assert_eq!(instance.get("val").unwrap().as_int(), Some(1));
//! ```

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, PoisonError, Weak},
};

use log::debug;

use crate::{
    error::{ConfigError, Result},
    item::Item,
    value::{Map, Value},
};

/// Shared handle to a class definition.
pub type ClassRef = Arc<Class>;

/// Composed schema of a class.
pub type Schema = BTreeMap<String, Arc<Item>>;

/// A configurable class: a name, its bases and its composed schema.
pub struct Class {
    name: String,
    is_abstract: bool,
    bases: Vec<ClassRef>,
    schema: Schema,
    local: Vec<String>,
    subclasses: Mutex<Vec<Weak<Class>>>,
}

/// Builder for [`Class`].
pub struct ClassBuilder {
    name: String,
    is_abstract: bool,
    bases: Vec<ClassRef>,
    items: Vec<(String, Item)>,
}

impl ClassBuilder {
    /// Derive from `base`. Bases listed earlier take precedence for names
    /// declared in several bases.
    pub fn base(mut self, base: &ClassRef) -> Self {
        self.bases.push(base.clone());
        self
    }

    /// Declare an item in the class body.
    pub fn item(mut self, name: impl Into<String>, item: Item) -> Self {
        self.items.push((name.into(), item));
        self
    }

    /// Mark the class abstract: it can be derived from but not
    /// instantiated, and never resolves from a discriminator.
    pub fn make_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Compose the schema, bind the declared items and register the class
    /// with its bases.
    pub fn build(self) -> Result<ClassRef> {
        let ClassBuilder {
            name,
            is_abstract,
            bases,
            items,
        } = self;

        for (i, (item_name, _)) in items.iter().enumerate() {
            if items[..i].iter().any(|(n, _)| n == item_name) {
                return Err(ConfigError::DuplicateItem {
                    class: name,
                    name: item_name.clone(),
                });
            }
        }

        let class = Arc::new_cyclic(|weak: &Weak<Class>| {
            let mut schema = Schema::new();
            for base in bases.iter().rev() {
                for (key, item) in &base.schema {
                    schema.insert(key.clone(), item.clone());
                }
            }

            let mut local = Vec::with_capacity(items.len());
            for (item_name, mut item) in items {
                item.bind(weak, &item_name);
                schema.insert(item_name.clone(), Arc::new(item));
                local.push(item_name);
            }

            Class {
                name,
                is_abstract,
                bases,
                schema,
                local,
                subclasses: Mutex::new(Vec::new()),
            }
        });

        for base in &class.bases {
            let mut subclasses = base
                .subclasses
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subclasses.retain(|w| w.strong_count() > 0);
            subclasses.push(Arc::downgrade(&class));
        }

        debug!(
            "defined class {} ({} items, {} local)",
            class.name,
            class.schema.len(),
            class.local.len()
        );
        Ok(class)
    }
}

impl Class {
    /// Start defining a class named `name`.
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            is_abstract: false,
            bases: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn bases(&self) -> &[ClassRef] {
        &self.bases
    }

    /// Composed schema, inherited items included.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn item(&self, name: &str) -> Option<&Arc<Item>> {
        self.schema.get(name)
    }

    /// Names of the items declared in this class body.
    pub fn local_items(&self) -> impl Iterator<Item = &str> {
        self.local.iter().map(String::as_str)
    }

    /// Whether `self` is `other` or derives from it.
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        std::ptr::eq(self, other) || self.bases.iter().any(|b| b.is_subclass_of(other))
    }

    /// Direct subclasses that are still alive.
    pub fn subclasses(&self) -> Vec<ClassRef> {
        self.subclasses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// All concrete classes deriving from this one, itself included when
    /// it is not abstract, keyed by class name.
    pub fn nonabstract_subclasses(self: &Arc<Self>) -> BTreeMap<String, ClassRef> {
        let mut found = BTreeMap::new();
        let mut stack = vec![self.clone()];
        while let Some(class) = stack.pop() {
            if !class.is_abstract {
                found.entry(class.name.clone()).or_insert_with(|| class.clone());
            }
            stack.extend(class.subclasses());
        }
        found
    }

    /// Resolve a concrete subclass by name.
    pub fn nonabstract_subclass(self: &Arc<Self>, name: &str) -> Result<ClassRef> {
        let mut candidates = self.nonabstract_subclasses();
        candidates
            .remove(name)
            .ok_or_else(|| ConfigError::UnknownSubclass {
                base: self.name.clone(),
                name: name.to_string(),
                candidates: candidates.into_keys().collect(),
            })
    }

    /// Default configuration of the whole schema in raw form, computed
    /// without instantiating anything.
    pub fn default_config(&self) -> Result<Value> {
        let mut config = Map::new();
        for (name, item) in &self.schema {
            config.insert(name.clone(), item.get_default_config()?);
        }
        Ok(Value::Map(config))
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("abstract", &self.is_abstract)
            .field("items", &self.schema.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
