//! JSON Schema export of class schemas.
//!
//! The exported document describes the raw configuration a class accepts,
//! so editors and validators driven by JSON Schema can work with it.
//! Nested instance slots list the accepted discriminator names, lookup
//! slots accept either a single value or the lookup table shape.

use schemars::Schema;
use serde_json::{Map, Value as Json, json};

use crate::{
    class::{Class, ClassRef},
    error::Result,
    item::{DISCRIMINATOR, Item, ItemKind, instance::InstanceItem},
};

/// JSON Schema (draft 2020-12) for the raw configuration of `class`.
pub fn class_schema(class: &ClassRef) -> Result<Schema> {
    let mut root = object_schema(class, false)?;
    root.insert(
        "$schema".to_string(),
        json!("https://json-schema.org/draft/2020-12/schema"),
    );
    Ok(Schema::from(root))
}

fn object_schema(class: &Class, open: bool) -> Result<Map<String, Json>> {
    let mut properties = Map::new();
    for (name, item) in class.schema() {
        properties.insert(name.clone(), item_schema(item)?);
    }

    let mut schema = Map::new();
    schema.insert("title".to_string(), json!(class.name()));
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Json::Object(properties));
    schema.insert("additionalProperties".to_string(), json!(open));
    Ok(schema)
}

fn typed(ty: &str, nullable: bool) -> Json {
    if nullable {
        json!({ "type": [ty, "null"] })
    } else {
        json!({ "type": ty })
    }
}

fn item_schema(item: &Item) -> Result<Json> {
    let nullable = item.allows_none();
    let mut schema = match item.kind() {
        ItemKind::Object => json!({}),
        ItemKind::Integer { min, max } => {
            let mut s = typed("integer", nullable);
            if let Some(min) = min {
                s["minimum"] = json!(min);
            }
            if let Some(max) = max {
                s["maximum"] = json!(max);
            }
            s
        }
        ItemKind::Float { min, max } => {
            let mut s = typed("number", nullable);
            if let Some(min) = min {
                s["minimum"] = json!(min);
            }
            if let Some(max) = max {
                s["maximum"] = json!(max);
            }
            s
        }
        ItemKind::String => typed("string", nullable),
        ItemKind::Boolean => typed("boolean", nullable),
        ItemKind::Path(_) => {
            let mut s = typed("string", nullable);
            s["format"] = json!("path");
            s
        }
        ItemKind::Instance(instance) => instance_schema(instance)?,
        ItemKind::Lookup(lookup) => {
            let value = item_schema(lookup.item())?;
            let entry = json!({
                "type": "array",
                "prefixItems": [
                    { "enum": lookup.hierarchy() },
                    { "type": ["boolean", "integer", "string"] },
                    value.clone(),
                ],
                "minItems": 3,
                "maxItems": 3,
            });
            let table = json!({
                "type": "object",
                "properties": {
                    "default": value.clone(),
                    "lookups": { "type": "array", "items": entry },
                },
                "additionalProperties": false,
            });
            json!({ "anyOf": [value, table] })
        }
    };

    if let Json::Object(map) = &mut schema {
        if !item.help_text().is_empty() {
            map.insert("description".to_string(), json!(item.help_text()));
        }
        map.insert("default".to_string(), item.get_default_config()?.to_json());
    }
    Ok(schema)
}

fn instance_schema(instance: &InstanceItem) -> Result<Json> {
    let candidates: Vec<String> = if instance.allows_subclasses() {
        instance.base().nonabstract_subclasses().into_keys().collect()
    } else {
        vec![instance.base().name().to_string()]
    };

    // subclasses may add keys of their own
    let mut schema = object_schema(instance.base(), instance.allows_subclasses())?;
    if let Some(Json::Object(properties)) = schema.get_mut("properties") {
        properties.insert(
            DISCRIMINATOR.to_string(),
            json!({ "type": "string", "enum": candidates }),
        );
    }
    Ok(Json::Object(schema))
}

impl Class {
    /// JSON Schema of this class's raw configuration.
    pub fn json_schema(self: &std::sync::Arc<Self>) -> Result<Schema> {
        class_schema(self)
    }
}
