//! Value coercion to declared parameter types

use crate::types::{Value, ValueType};

/// Coerce a wire value to a declared type
///
/// Numeric widening and lexical parsing of strings are allowed; anything
/// else that does not already match is rejected with a short reason.
pub fn coerce(value: Value, ty: &ValueType) -> Result<Value, String> {
    match (value, ty) {
        (v, ValueType::Any) => Ok(v),
        (Value::Absent, _) => Err("absent value".to_string()),
        (Value::Null, t) if t.is_primitive() => Err(format!("null for primitive {}", t)),
        (Value::Null, _) => Ok(Value::Null),

        (v @ Value::Bool(_), ValueType::Bool) => Ok(v),
        (Value::String(s), ValueType::Bool) => match s.trim() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            other => Err(format!("'{}' is not a boolean", other)),
        },

        (v @ Value::Int(_), ValueType::Int) => Ok(v),
        (Value::Long(n), ValueType::Int) => i32::try_from(n)
            .map(Value::Int)
            .map_err(|_| format!("{} overflows int", n)),
        (Value::String(s), ValueType::Int) => s
            .trim()
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|e| format!("'{}': {}", s, e)),

        (Value::Int(n), ValueType::Long) => Ok(Value::Long(i64::from(n))),
        (v @ Value::Long(_), ValueType::Long) => Ok(v),
        (Value::String(s), ValueType::Long) => s
            .trim()
            .parse::<i64>()
            .map(Value::Long)
            .map_err(|e| format!("'{}': {}", s, e)),

        (Value::Int(n), ValueType::Double) => Ok(Value::Double(f64::from(n))),
        (Value::Long(n), ValueType::Double) => Ok(Value::Double(n as f64)),
        (v @ Value::Double(_), ValueType::Double) => Ok(v),
        (Value::String(s), ValueType::Double) => s
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|e| format!("'{}': {}", s, e)),

        (v @ Value::String(_), ValueType::String) => Ok(v),
        (v @ Value::Bytes(_), ValueType::Bytes) => Ok(v),

        (Value::List(items), ValueType::List(inner)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| coerce(item, inner).map_err(|e| format!("element {}: {}", i, e)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),

        (v, t) => Err(format!("{} is not convertible to {}", v.type_name(), t)),
    }
}
