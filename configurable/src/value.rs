//! Dynamic value tree shared by raw configuration and resolved values.
//!
//! Raw configuration (parsed JSON/TOML, default-config literals) and the
//! values stored on instances use the same [`Value`] type. Raw trees only
//! ever hold the plain variants plus [`Value::Class`] discriminators;
//! resolved values may additionally hold nested instances, lookup tables
//! and paths.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    class::ClassRef,
    configurable::Configurable,
    error::{ConfigError, Result},
    item::lookup::LookupDatabase,
};

/// Mapping node of a value tree.
pub type Map = BTreeMap<String, Value>;

/// A configuration or resolved value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    Str(String),
    /// Resolved filesystem path.
    Path(PathBuf),
    /// Sequence of values.
    List(Vec<Value>),
    /// String-keyed mapping.
    Map(Map),
    /// Reference to a class, used as a discriminator in raw configs.
    Class(ClassRef),
    /// Nested configurable instance.
    Instance(Box<Configurable>),
    /// Hierarchical override table.
    Lookup(Arc<LookupDatabase>),
}

impl Value {
    /// Build a mapping from key/value pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Empty mapping.
    pub fn empty_map() -> Self {
        Value::Map(Map::new())
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Path(_) => "path",
            Value::List(_) => "list",
            Value::Map(_) => "mapping",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Lookup(_) => "lookup table",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Value::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Configurable> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_lookup(&self) -> Option<&LookupDatabase> {
        match self {
            Value::Lookup(l) => Some(l),
            _ => None,
        }
    }

    /// Convert into plain JSON.
    ///
    /// Classes become their names, paths become strings, instances and
    /// lookup tables become their exported configuration. Non-finite
    /// floats have no JSON form and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.clone()),
            Value::Path(p) => Json::String(p.display().to_string()),
            Value::List(l) => Json::Array(l.iter().map(Value::to_json).collect()),
            Value::Map(m) => Json::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Class(c) => Json::String(c.name().to_string()),
            Value::Instance(i) => i.get_config().to_json(),
            Value::Lookup(l) => l.to_config().to_json(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Class(c) => write!(f, "<class {}>", c.name()),
            Value::Instance(i) => write!(f, "<{} instance>", i.class().name()),
            Value::Lookup(l) => write!(f, "{l}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s),
            Json::Array(a) => Value::List(a.into_iter().map(Value::from).collect()),
            Json::Object(o) => Value::Map(o.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl From<&Path> for Value {
    fn from(p: &Path) -> Self {
        Value::Path(p.to_path_buf())
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

impl From<ClassRef> for Value {
    fn from(c: ClassRef) -> Self {
        Value::Class(c)
    }
}

impl From<&ClassRef> for Value {
    fn from(c: &ClassRef) -> Self {
        Value::Class(c.clone())
    }
}

impl From<Configurable> for Value {
    fn from(i: Configurable) -> Self {
        Value::Instance(Box::new(i))
    }
}

impl From<LookupDatabase> for Value {
    fn from(l: LookupDatabase) -> Self {
        Value::Lookup(Arc::new(l))
    }
}

impl From<Arc<LookupDatabase>> for Value {
    fn from(l: Arc<LookupDatabase>) -> Self {
        Value::Lookup(l)
    }
}

impl From<LookupKey> for Value {
    fn from(k: LookupKey) -> Self {
        match k {
            LookupKey::Bool(b) => Value::Bool(b),
            LookupKey::Int(i) => Value::Int(i),
            LookupKey::Str(s) => Value::Str(s),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<A, B, C> From<(A, B, C)> for Value
where
    A: Into<Value>,
    B: Into<Value>,
    C: Into<Value>,
{
    fn from((a, b, c): (A, B, C)) -> Self {
        Value::List(vec![a.into(), b.into(), c.into()])
    }
}

/// One component of a lookup key tuple.
///
/// Only hashable scalars can select a lookup entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LookupKey {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::Bool(b) => write!(f, "{b}"),
            LookupKey::Int(i) => write!(f, "{i}"),
            LookupKey::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl TryFrom<&Value> for LookupKey {
    type Error = ConfigError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(LookupKey::Bool(*b)),
            Value::Int(i) => Ok(LookupKey::Int(*i)),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(LookupKey::Int(*f as i64))
            }
            Value::Str(s) => Ok(LookupKey::Str(s.clone())),
            other => Err(ConfigError::MalformedTable(format!(
                "key value must be a bool, integer or string, got {other}"
            ))),
        }
    }
}

impl From<&str> for LookupKey {
    fn from(s: &str) -> Self {
        LookupKey::Str(s.to_string())
    }
}

impl From<String> for LookupKey {
    fn from(s: String) -> Self {
        LookupKey::Str(s)
    }
}

impl From<i64> for LookupKey {
    fn from(i: i64) -> Self {
        LookupKey::Int(i)
    }
}

impl From<i32> for LookupKey {
    fn from(i: i32) -> Self {
        LookupKey::Int(i.into())
    }
}

impl From<u32> for LookupKey {
    fn from(i: u32) -> Self {
        LookupKey::Int(i.into())
    }
}

impl From<bool> for LookupKey {
    fn from(b: bool) -> Self {
        LookupKey::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let v = Value::from(json!({"a": 1, "b": [1.5, "x", null], "c": {"d": true}}));
        let m = v.as_map().unwrap();
        assert_eq!(m["a"], Value::Int(1));
        assert_eq!(
            m["b"],
            Value::List(vec![Value::Float(1.5), "x".into(), Value::Null])
        );
        assert_eq!(m["c"].as_map().unwrap()["d"], Value::Bool(true));
    }

    #[test]
    fn test_to_json() {
        let v = Value::map([
            ("path", Value::from(PathBuf::from("/tmp/x"))),
            ("nan", Value::Float(f64::NAN)),
            ("list", Value::from(vec![1, 2])),
        ]);
        assert_eq!(
            v.to_json(),
            json!({"path": "/tmp/x", "nan": null, "list": [1, 2]})
        );
    }

    #[test]
    fn test_serde() {
        let v: Value = serde_json::from_str(r#"{"val": 2}"#).unwrap();
        assert_eq!(v, Value::map([("val", 2)]));
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"val":2}"#);
    }

    #[test]
    fn test_lookup_key_conversion() {
        assert_eq!(LookupKey::try_from(&Value::Int(5)).unwrap(), LookupKey::Int(5));
        assert_eq!(LookupKey::try_from(&Value::Float(5.0)).unwrap(), LookupKey::Int(5));
        assert_eq!(
            LookupKey::try_from(&Value::from("LST")).unwrap(),
            LookupKey::from("LST")
        );
        assert!(LookupKey::try_from(&Value::Float(0.5)).is_err());
        assert!(LookupKey::try_from(&Value::Float(1e300)).is_err());
        assert!(LookupKey::try_from(&Value::Float(-1e19)).is_err());
        assert!(LookupKey::try_from(&Value::empty_map()).is_err());
    }
}
