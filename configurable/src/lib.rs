//! # configurable
//!
//! Typed, validated, nested configuration schemas.
//!
//! Classes declare named [`Item`]s; instances are built from a loosely
//! typed configuration mapping (parsed JSON or TOML) with strict
//! precedence between explicit values, the mapping and item defaults.
//!
//! ## Features
//!
//! - Schema composition across base classes, local items override
//!   inherited ones
//! - Validation on every assignment, with errors naming item, owning class
//!   and offending value
//! - Polymorphic nested instances selected by a `cls` discriminator,
//!   resolved against the concrete subclasses defined so far
//! - Hierarchical lookup tables: one logical value with overrides keyed by
//!   classification axes, most specific axis wins, results cached
//! - Round-trippable export with [`Configurable::get_config`] and
//!   [`Class::default_config`], JSON Schema export with
//!   [`Class::json_schema`]
//!
//! ## Quick Start
//!
//! ```rust
//! use configurable::{Class, Configurable, Item};
//! use serde_json::json;
//!
//! let cleaning = Class::builder("Cleaning")
//!     .item("level", Item::lookup(Item::float().default(10.0), ["type", "id"]))
//!     .build()
//!     .unwrap();
//! let processor = Class::builder("Processor")
//!     .item("threshold", Item::int().default(1))
//!     .item("cleaning", Item::instance(&cleaning))
//!     .build()
//!     .unwrap();
//!
//! let p = Configurable::builder(&processor)
//!     .config(json!({
//!         "threshold": 2,
//!         "cleaning": {"level": {"default": 5.0, "lookups": [["id", 3, 7.5]]}},
//!     }))
//!     .value("threshold", 3)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(p.get("threshold").unwrap().as_int(), Some(3));
//! let level = p.child("cleaning").unwrap().get("level").unwrap().as_lookup().unwrap();
//! assert_eq!(level.lookup(("LST", 1)).unwrap().as_float(), Some(5.0));
//! assert_eq!(level.lookup(("LST", 3)).unwrap().as_float(), Some(7.5));
//! ```
//!
//! ## Modules
//!
//! - [`class`] - class definitions, schema composition, subclass registry
//! - [`configurable`] - instance construction, assignment and export
//! - [`item`] - the item validation contract and item kinds
//! - [`value`] - the dynamic value tree
//! - [`merge`] - recursive mapping merge
//! - [`format`] - JSON/TOML text parsing and serialization
//! - [`schema_doc`] - JSON Schema export
//! - [`error`] - error types

/// Class definitions and the subclass registry.
pub mod class;

/// Configurable instances.
pub mod configurable;

/// Error types and result definitions.
pub mod error;

/// JSON and TOML text handling.
pub mod format;

/// Schema items and their validation contract.
pub mod item;

/// Recursive mapping merge.
pub mod merge;

/// JSON Schema export.
pub mod schema_doc;

/// Dynamic value tree.
pub mod value;

pub use class::{Class, ClassBuilder, ClassRef, Schema};
pub use configurable::{Configurable, ConfigurableBuilder};
pub use error::{ConfigError, Result};
pub use format::Format;
pub use item::{DISCRIMINATOR, Item, ItemKind, LookupDatabase, PathRules};
pub use value::{LookupKey, Map, Value};
