use crate::{error::Result, item::Item, value::Value};

pub(crate) fn validate_int(
    item: &Item,
    value: Value,
    min: Option<i64>,
    max: Option<i64>,
) -> Result<Value> {
    let i = match value {
        Value::Int(i) => i,
        // integral floats such as 5.0 are accepted
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            f as i64
        }
        other => return Err(item.error(&other, "must be an integer")),
    };

    if let Some(min) = min
        && i < min
    {
        return Err(item.error(&Value::Int(i), format!("must be >= {min}")));
    }
    if let Some(max) = max
        && i > max
    {
        return Err(item.error(&Value::Int(i), format!("must be <= {max}")));
    }
    Ok(Value::Int(i))
}

pub(crate) fn validate_float(
    item: &Item,
    value: Value,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Value> {
    let f = match value {
        Value::Float(f) => f,
        Value::Int(i) => i as f64,
        other => return Err(item.error(&other, "must be a float")),
    };

    if let Some(min) = min
        && f < min
    {
        return Err(item.error(&Value::Float(f), format!("must be >= {min}")));
    }
    if let Some(max) = max
        && f > max
    {
        return Err(item.error(&Value::Float(f), format!("must be <= {max}")));
    }
    Ok(Value::Float(f))
}

pub(crate) fn validate_string(item: &Item, value: Value) -> Result<Value> {
    match value {
        Value::Str(_) => Ok(value),
        other => Err(item.error(&other, "must be a string")),
    }
}

pub(crate) fn validate_bool(item: &Item, value: Value) -> Result<Value> {
    match value {
        Value::Bool(_) => Ok(value),
        other => Err(item.error(&other, "must be a boolean")),
    }
}
