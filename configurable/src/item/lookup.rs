use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use log::trace;

use crate::{
    error::{ConfigError, Result},
    item::{Item, ItemKind},
    value::{LookupKey, Map, Value},
};

/// Lookup-typed slot: its value is always a [`LookupDatabase`].
#[derive(Debug)]
pub struct LookupItem {
    pub(crate) item: Arc<Item>,
    hierarchy: Vec<String>,
}

/// One conditional override of a lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupEntry {
    /// Hierarchy axis the entry applies to.
    pub key: String,
    /// Value the axis must have for the entry to match.
    pub key_value: LookupKey,
    /// Value returned on a match.
    pub value: Value,
}

/// Immutable table of conditional overrides plus a default.
///
/// Entries on a more specific axis (later in the hierarchy) always win over
/// entries on a less specific one; within one axis the first declared
/// entry wins. Lookup results are cached per key tuple.
///
/// ```rust
/// use configurable::{Item, LookupDatabase};
///
/// let table = LookupDatabase::new(
///     Item::int().default(1),
///     ["type", "id"],
///     None,
///     vec![("type", "LST", 2).into(), ("id", 5, 4).into()],
/// )
/// .unwrap();
///
/// assert_eq!(table.lookup(("LST", 1)).unwrap().as_int(), Some(2));
/// assert_eq!(table.lookup(("LST", 5)).unwrap().as_int(), Some(4));
/// assert_eq!(table.lookup(("SST", 9)).unwrap().as_int(), Some(1));
/// ```
pub struct LookupDatabase {
    hierarchy: Vec<String>,
    item: Arc<Item>,
    default: Value,
    entries: Vec<LookupEntry>,
    cache: RwLock<HashMap<Vec<LookupKey>, Option<usize>>>,
}

/// Conversion into a lookup key tuple.
pub trait IntoLookupKeys {
    fn into_lookup_keys(self) -> Vec<LookupKey>;
}

impl IntoLookupKeys for Vec<LookupKey> {
    fn into_lookup_keys(self) -> Vec<LookupKey> {
        self
    }
}

impl IntoLookupKeys for &[LookupKey] {
    fn into_lookup_keys(self) -> Vec<LookupKey> {
        self.to_vec()
    }
}

impl IntoLookupKeys for LookupKey {
    fn into_lookup_keys(self) -> Vec<LookupKey> {
        vec![self]
    }
}

impl IntoLookupKeys for &str {
    fn into_lookup_keys(self) -> Vec<LookupKey> {
        vec![self.into()]
    }
}

impl IntoLookupKeys for String {
    fn into_lookup_keys(self) -> Vec<LookupKey> {
        vec![self.into()]
    }
}

impl IntoLookupKeys for i64 {
    fn into_lookup_keys(self) -> Vec<LookupKey> {
        vec![self.into()]
    }
}

impl IntoLookupKeys for i32 {
    fn into_lookup_keys(self) -> Vec<LookupKey> {
        vec![self.into()]
    }
}

impl IntoLookupKeys for bool {
    fn into_lookup_keys(self) -> Vec<LookupKey> {
        vec![self.into()]
    }
}

impl<A: Into<LookupKey>> IntoLookupKeys for (A,) {
    fn into_lookup_keys(self) -> Vec<LookupKey> {
        vec![self.0.into()]
    }
}

impl<A: Into<LookupKey>, B: Into<LookupKey>> IntoLookupKeys for (A, B) {
    fn into_lookup_keys(self) -> Vec<LookupKey> {
        vec![self.0.into(), self.1.into()]
    }
}

impl<A, B, C> IntoLookupKeys for (A, B, C)
where
    A: Into<LookupKey>,
    B: Into<LookupKey>,
    C: Into<LookupKey>,
{
    fn into_lookup_keys(self) -> Vec<LookupKey> {
        vec![self.0.into(), self.1.into(), self.2.into()]
    }
}

type Resolve = fn(&Item, Value) -> Result<Value>;

impl LookupDatabase {
    /// Build a table from live values.
    ///
    /// Every lookup is a `[key, key value, value]` list (see
    /// `From<(A, B, C)> for Value`). Values and the default are validated
    /// against `item`; a missing or null default falls back to the item's
    /// own default.
    pub fn new<H, S, L>(
        item: impl Into<Arc<Item>>,
        hierarchy: H,
        default: Option<Value>,
        lookups: L,
    ) -> Result<Self>
    where
        H: IntoIterator<Item = S>,
        S: Into<String>,
        L: IntoIterator<Item = Value>,
    {
        Self::assemble(
            item.into(),
            hierarchy.into_iter().map(Into::into).collect(),
            default,
            lookups,
            Item::validate,
        )
    }

    /// Build a table from its raw `{"default": .., "lookups": [..]}` form,
    /// converting every value with the item's `from_config`.
    pub(crate) fn from_raw(item: Arc<Item>, hierarchy: Vec<String>, raw: Map) -> Result<Self> {
        let mut default = None;
        let mut lookups = Vec::new();
        for (key, value) in raw {
            match (key.as_str(), value) {
                ("default", value) => default = Some(value),
                ("lookups", Value::List(list)) => lookups = list,
                ("lookups", Value::Null) => {}
                ("lookups", other) => {
                    return Err(ConfigError::MalformedTable(format!(
                        "`lookups` must be a list, got {other}"
                    )));
                }
                (other, _) => {
                    return Err(ConfigError::MalformedTable(format!(
                        "unexpected key `{other}`, expected `default` or `lookups`"
                    )));
                }
            }
        }
        Self::assemble(item, hierarchy, default, lookups, Item::from_config)
    }

    fn assemble<L>(
        item: Arc<Item>,
        hierarchy: Vec<String>,
        default: Option<Value>,
        lookups: L,
        resolve: Resolve,
    ) -> Result<Self>
    where
        L: IntoIterator<Item = Value>,
    {
        if hierarchy.is_empty() {
            return Err(ConfigError::MalformedTable(
                "hierarchy must not be empty".to_string(),
            ));
        }

        let mut entries = Vec::new();
        for lookup in lookups {
            let parts = match lookup {
                Value::List(parts) if parts.len() == 3 => parts,
                other => {
                    return Err(ConfigError::MalformedTable(format!(
                        "lookup definition must be (key, value of key, value), got {other}"
                    )));
                }
            };
            let [key, key_value, value]: [Value; 3] = parts
                .try_into()
                .map_err(|_| ConfigError::MalformedTable("expected 3 elements".to_string()))?;

            let key = match key {
                Value::Str(key) if hierarchy.contains(&key) => key,
                other => {
                    return Err(ConfigError::MalformedTable(format!(
                        "key {other} not in hierarchy: {hierarchy:?}"
                    )));
                }
            };
            let key_value = LookupKey::try_from(&key_value)?;
            let value = resolve(&*item, value)?;
            entries.push(LookupEntry {
                key,
                key_value,
                value,
            });
        }

        let default = match default {
            Some(value) if !value.is_null() => resolve(&*item, value)?,
            _ => item.get_default()?,
        };

        Ok(Self {
            hierarchy,
            item,
            default,
            entries,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Classification axes, least specific first.
    pub fn hierarchy(&self) -> &[String] {
        &self.hierarchy
    }

    /// Item governing every value of the table.
    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }

    fn expected_shape(&self) -> String {
        let parts: Vec<_> = self
            .hierarchy
            .iter()
            .map(|key| format!("<{key} value>"))
            .collect();
        format!("({})", parts.join(", "))
    }

    /// Most specific value for `keys`, one key per hierarchy axis.
    pub fn lookup(&self, keys: impl IntoLookupKeys) -> Result<&Value> {
        let keys = keys.into_lookup_keys();
        if keys.len() != self.hierarchy.len() {
            return Err(ConfigError::LookupShape {
                expected: self.expected_shape(),
                got: keys.len(),
            });
        }

        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&keys)
            .copied();
        let hit = match cached {
            Some(hit) => hit,
            None => {
                let hit = self.resolve(&keys);
                trace!("lookup {keys:?} -> entry {hit:?}");
                self.cache
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(keys, hit);
                hit
            }
        };

        Ok(match hit {
            Some(index) => &self.entries[index].value,
            None => &self.default,
        })
    }

    fn resolve(&self, keys: &[LookupKey]) -> Option<usize> {
        self.hierarchy
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, axis)| {
                self.entries
                    .iter()
                    .position(|e| &e.key == axis && e.key_value == keys[index])
            })
    }

    /// Export in the raw `{"default": .., "lookups": [..]}` form.
    pub fn to_config(&self) -> Value {
        let lookups = self
            .entries
            .iter()
            .map(|e| {
                Value::List(vec![
                    Value::Str(e.key.clone()),
                    e.key_value.clone().into(),
                    self.item.to_config(&e.value),
                ])
            })
            .collect();
        Value::map([
            ("default", self.item.to_config(&self.default)),
            ("lookups", Value::List(lookups)),
        ])
    }
}

impl PartialEq for LookupDatabase {
    fn eq(&self, other: &Self) -> bool {
        self.hierarchy == other.hierarchy
            && self.item.same_kind(&other.item)
            && self.default == other.default
            && self.entries == other.entries
    }
}

impl fmt::Debug for LookupDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupDatabase")
            .field("hierarchy", &self.hierarchy)
            .field("item", &self.item.kind().name())
            .field("default", &self.default)
            .field("entries", &self.entries)
            .finish()
    }
}

impl fmt::Display for LookupDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LookupDatabase(hierarchy={:?}, item={})",
            self.hierarchy, self.item
        )
    }
}

impl LookupItem {
    pub(crate) fn new(item: Item, hierarchy: Vec<String>) -> Self {
        Self {
            item: Arc::new(item),
            hierarchy,
        }
    }

    /// Item governing the table values.
    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn hierarchy(&self) -> &[String] {
        &self.hierarchy
    }

    fn single(&self, value: Value) -> Result<Value> {
        let db = LookupDatabase::assemble(
            self.item.clone(),
            self.hierarchy.clone(),
            Some(value),
            Vec::new(),
            Item::validate,
        )?;
        Ok(db.into())
    }

    pub(crate) fn validate(&self, item: &Item, value: Value) -> Result<Value> {
        let db = match value {
            Value::Lookup(db) => db,
            single => {
                let valid = self.item.validate(single.clone()).map_err(|e| {
                    item.error(&single, format!("single value must be valid for {} ({e})", self.item))
                })?;
                return self.single(valid);
            }
        };

        if db.hierarchy != self.hierarchy {
            return Err(item.error(
                &Value::Lookup(db.clone()),
                format!(
                    "lookup must have same hierarchy. Expected {:?}, got {:?}",
                    self.hierarchy, db.hierarchy
                ),
            ));
        }
        if !db.item.same_kind(&self.item) {
            return Err(item.error(
                &Value::Lookup(db.clone()),
                format!(
                    "lookup must have same item type. Expected {}, got {}",
                    self.item.kind().name(),
                    db.item.kind().name()
                ),
            ));
        }
        if let (ItemKind::Instance(slot), ItemKind::Instance(table)) =
            (self.item.kind(), db.item.kind())
            && !slot.admits(table)
        {
            return Err(item.error(
                &Value::Lookup(db.clone()),
                format!(
                    "lookup must hold instances of {}, got a table of {}",
                    slot.base(),
                    table.base()
                ),
            ));
        }
        Ok(Value::Lookup(db))
    }

    pub(crate) fn from_config(&self, item: &Item, raw: Value) -> Result<Value> {
        match raw {
            Value::Map(table) => {
                let shown = Value::Map(table.clone());
                LookupDatabase::from_raw(self.item.clone(), self.hierarchy.clone(), table)
                    .map(Value::from)
                    .map_err(|e| item.error(&shown, format!("is an invalid config ({e})")))
            }
            Value::Lookup(_) => self.validate(item, raw),
            single => {
                let converted = self.item.from_config(single.clone()).map_err(|e| {
                    item.error(&single, format!("single value must be valid for {} ({e})", self.item))
                })?;
                self.single(converted)
            }
        }
    }

    pub(crate) fn get_default(&self, item: &Item) -> Result<Value> {
        match item.declared_default() {
            Value::Null => self.single(Value::Null),
            declared => self.from_config(item, declared.clone()),
        }
    }

    pub(crate) fn get_default_config(&self, item: &Item) -> Result<Value> {
        let mut config = Map::new();
        config.insert("default".to_string(), self.item.get_default_config()?);
        config.insert("lookups".to_string(), Value::List(Vec::new()));
        match item.declared_default() {
            Value::Null => {}
            Value::Map(declared) => {
                for (key, value) in declared {
                    config.insert(key.clone(), value.clone());
                }
            }
            single => {
                config.insert("default".to_string(), single.clone());
            }
        }
        Ok(Value::Map(config))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn two_keys() -> LookupDatabase {
        LookupDatabase::new(
            Item::int().default(1),
            ["type", "id"],
            None,
            vec![
                ("type", "LST", 2).into(),
                ("type", "MST", 3).into(),
                ("id", 5, 4).into(),
                ("id", 30, 5).into(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_single_key() {
        let lookup = LookupDatabase::new(
            Item::int().default(1),
            ["type"],
            None,
            vec![("type", "LST", 2).into(), ("type", "MST", 3).into()],
        )
        .unwrap();

        assert_eq!(lookup.lookup("LST").unwrap(), &Value::Int(2));
        assert_eq!(lookup.lookup("MST").unwrap(), &Value::Int(3));
        assert_eq!(lookup.lookup(("SST",)).unwrap(), &Value::Int(1));
    }

    #[test]
    fn test_two_keys() {
        let lookup = two_keys();
        assert_eq!(lookup.lookup(("LST", 1)).unwrap(), &Value::Int(2));
        assert_eq!(lookup.lookup(("MST", 2)).unwrap(), &Value::Int(3));
        // id is more specific than type
        assert_eq!(lookup.lookup(("LST", 5)).unwrap(), &Value::Int(4));
        assert_eq!(lookup.lookup(("SST", 30)).unwrap(), &Value::Int(5));
        assert_eq!(lookup.lookup(("SST", 3)).unwrap(), &Value::Int(1));
    }

    #[test]
    fn test_first_declared_wins_within_axis() {
        let lookup = LookupDatabase::new(
            Item::int(),
            ["type"],
            None,
            vec![("type", "LST", 2).into(), ("type", "LST", 3).into()],
        )
        .unwrap();
        assert_eq!(lookup.lookup("LST").unwrap(), &Value::Int(2));
    }

    #[test]
    fn test_repeated_lookup_is_identical() {
        let lookup = two_keys();
        let first: *const Value = lookup.lookup(("LST", 5)).unwrap();
        let second: *const Value = lookup.lookup(("LST", 5)).unwrap();
        assert_eq!(first, second);
        assert_eq!(lookup.entries().len(), 4);
        assert_eq!(lookup.cache.read().unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_invalid() {
        let err = LookupDatabase::new(
            Item::int().default(1),
            ["type", "id"],
            None,
            vec![("type", "LST", 2).into(), ("invalid", 5, 4).into()],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedTable(_)));

        let err = LookupDatabase::new(
            Item::int().default(1),
            ["type", "id"],
            None,
            vec![("type", "MST", 3).into(), Value::from(vec!["type", "2"])],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedTable(_)));

        let err = LookupDatabase::new(
            Item::int().default(1),
            ["type", "id"],
            None,
            vec![("type", "LST", "foo").into()],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));

        let err = LookupDatabase::new(Item::int(), Vec::<String>::new(), None, Vec::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedTable(_)));
    }

    #[test]
    fn test_wrong_shape() {
        let lookup = two_keys();
        let err = lookup.lookup(1).unwrap_err();
        assert!(matches!(err, ConfigError::LookupShape { got: 1, .. }));
        assert!(err.to_string().contains("(<type value>, <id value>)"));
        assert!(lookup.lookup((1, 2, 3)).is_err());
        // the table stays usable
        assert_eq!(lookup.lookup(("LST", 1)).unwrap(), &Value::Int(2));
    }

    #[test]
    fn test_defaults() {
        let lookup = LookupDatabase::new(Item::int(), ["foo", "bar"], None, Vec::new()).unwrap();
        assert_eq!(lookup.lookup((1, 2)).unwrap(), &Value::Null);

        let lookup =
            LookupDatabase::new(Item::int().default(5), ["foo", "bar"], None, Vec::new()).unwrap();
        assert_eq!(lookup.lookup((1, 2)).unwrap(), &Value::Int(5));

        let lookup =
            LookupDatabase::new(Item::int().default(5), ["foo"], Some(7.into()), Vec::new())
                .unwrap();
        assert_eq!(lookup.lookup(1).unwrap(), &Value::Int(7));

        let err = LookupDatabase::new(Item::int(), ["foo"], Some("x".into()), Vec::new());
        assert!(err.is_err());
    }

    #[test]
    fn test_item_validate_single_value() {
        let item = Item::lookup(Item::float().default(5.0), ["type", "id"]);
        let value = item.validate(10.0.into()).unwrap();
        let db = value.as_lookup().unwrap();
        assert_eq!(db.lookup(("LST", 1)).unwrap(), &Value::Float(10.0));
        assert!(db.entries().is_empty());

        assert!(item.validate("nope".into()).is_err());
    }

    #[test]
    fn test_item_validate_database() {
        let item = Item::lookup(Item::float().default(5.0).allow_none(false), ["type", "id"]);
        assert!(item.validate(Value::Null).is_err());

        let wrong_item = LookupDatabase::new(Item::int().default(5), ["type", "id"], None, Vec::new());
        assert!(item.validate(wrong_item.unwrap().into()).is_err());

        let wrong_hierarchy =
            LookupDatabase::new(Item::float().default(5.0), ["foo", "id"], None, Vec::new());
        assert!(item.validate(wrong_hierarchy.unwrap().into()).is_err());

        let good = LookupDatabase::new(Item::float().default(1.0), ["type", "id"], None, Vec::new());
        assert!(item.validate(good.unwrap().into()).is_ok());
    }

    #[test]
    fn test_item_validate_instance_table_base() {
        use crate::class::Class;

        let a = Class::builder("A").build().unwrap();
        let sub_a = Class::builder("SubA").base(&a).build().unwrap();
        let b = Class::builder("B").build().unwrap();

        let item = Item::lookup(Item::instance(&a), ["type"]);
        let unrelated = LookupDatabase::new(Item::instance(&b), ["type"], None, Vec::new());
        assert!(item.validate(unrelated.unwrap().into()).is_err());
        let derived = LookupDatabase::new(Item::instance(&sub_a), ["type"], None, Vec::new());
        assert!(item.validate(derived.unwrap().into()).is_ok());

        let exact = Item::lookup(Item::instance_exact(&a), ["type"]);
        let open = LookupDatabase::new(Item::instance(&a), ["type"], None, Vec::new());
        assert!(exact.validate(open.unwrap().into()).is_err());
        let derived = LookupDatabase::new(Item::instance_exact(&sub_a), ["type"], None, Vec::new());
        assert!(exact.validate(derived.unwrap().into()).is_err());
        let same = LookupDatabase::new(Item::instance_exact(&a), ["type"], None, Vec::new());
        assert!(exact.validate(same.unwrap().into()).is_ok());
    }

    #[test]
    fn test_item_from_config() {
        let item = Item::lookup(Item::float().default(10.0), ["type", "id"]);
        let value = item
            .from_config(json!({"default": 3.0, "lookups": [["id", 2, 4.0]]}).into())
            .unwrap();
        let db = value.as_lookup().unwrap();
        assert_eq!(db.lookup(("LST", 1)).unwrap(), &Value::Float(3.0));
        assert_eq!(db.lookup(("LST", 2)).unwrap(), &Value::Float(4.0));

        let scalar = item.from_config(2.into()).unwrap();
        assert_eq!(
            scalar.as_lookup().unwrap().lookup(("a", 1)).unwrap(),
            &Value::Float(2.0)
        );
    }

    #[test]
    fn test_item_from_config_wraps_errors() {
        let item = Item::lookup(Item::float(), ["type", "id"]);
        for raw in [
            json!({"lookups": [["bad", 1, 2.0]]}),
            json!({"lookups": [["id", 1]]}),
            json!({"lookups": 3}),
            json!({"defaults": 1.0}),
            json!({"lookups": [["id", 1, "x"]]}),
        ] {
            let err = item.from_config(raw.into()).unwrap_err();
            assert!(
                matches!(err, ConfigError::Validation { .. }),
                "unexpected {err:?}"
            );
        }
    }

    #[test]
    fn test_default_config_shape() {
        let item = Item::lookup(Item::float().default(10.0), ["type"]);
        assert_eq!(
            item.get_default_config().unwrap().to_json(),
            json!({"default": 10.0, "lookups": []})
        );

        let item = Item::lookup(Item::float().default(10.0), ["type"]).default(2.5);
        assert_eq!(
            item.get_default_config().unwrap().to_json(),
            json!({"default": 2.5, "lookups": []})
        );

        let item = Item::lookup(Item::float(), ["type"])
            .default(json!({"lookups": [["type", "LST", 1.0]]}));
        assert_eq!(
            item.get_default_config().unwrap().to_json(),
            json!({"default": null, "lookups": [["type", "LST", 1.0]]})
        );
        let db = item.get_default().unwrap();
        assert_eq!(
            db.as_lookup().unwrap().lookup("LST").unwrap(),
            &Value::Float(1.0)
        );
    }

    #[test]
    fn test_to_config() {
        let lookup = two_keys();
        assert_eq!(
            lookup.to_config().to_json(),
            json!({
                "default": 1,
                "lookups": [["type", "LST", 2], ["type", "MST", 3], ["id", 5, 4], ["id", 30, 5]],
            })
        );
    }
}
