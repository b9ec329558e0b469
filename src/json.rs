//! JSON interchange: conversion between [`serde_json::Value`] and
//! notation values.
//!
//! The notation's JSON subset (objects, arrays, strings, numbers,
//! booleans, null) maps directly in both directions. Conversion is
//! strict: symbols, cons cells and procedure values have no JSON
//! counterpart and are rejected rather than coerced, and non-finite
//! floats fail the same way they do in the writer.

use crate::ast::Value;
use crate::{Error, SyntaxError};
use std::rc::Rc;

/// Parse JSON text into a notation value.
pub fn decode_json(input: &str) -> Result<Value, Error> {
    let json: serde_json::Value = serde_json::from_str(input).map_err(|e| {
        Error::Syntax(SyntaxError {
            line: e.line(),
            column: e.column(),
            message: format!("invalid JSON: {e}"),
        })
    })?;
    Ok(from_json(&json))
}

/// Convert a parsed JSON value into a notation value.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            // Out-of-range integers degrade to floats, like any other
            // JSON reader without a big-integer representation
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => {
            Value::Array(Rc::new(items.iter().map(from_json).collect()))
        }
        serde_json::Value::Object(entries) => Value::Object(Rc::new(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), from_json(value)))
                .collect(),
        )),
    }
}

/// Convert a notation value into a JSON value. Values outside the JSON
/// subset are rejected.
pub fn to_json(value: &Value) -> Result<serde_json::Value, Error> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Int(n) => Ok(serde_json::Value::from(*n)),
        Value::Float(x) => serde_json::Number::from_f64(*x)
            .map(serde_json::Value::Number)
            .ok_or_else(|| {
                Error::TypeError(format!("float {x} is not representable as JSON"))
            }),
        Value::Str(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Array(items) => Ok(serde_json::Value::Array(
            items.iter().map(to_json).collect::<Result<_, _>>()?,
        )),
        Value::Object(entries) => {
            let mut map = serde_json::Map::new();
            for (key, entry) in entries.iter() {
                map.insert(key.clone(), to_json(entry)?);
            }
            Ok(serde_json::Value::Object(map))
        }
        other => Err(Error::TypeError(format!(
            "{other} is not representable as JSON"
        ))),
    }
}

/// Render a notation value as JSON text.
pub fn encode_json(value: &Value) -> Result<String, Error> {
    let json = to_json(value)?;
    serde_json::to_string(&json).map_err(|e| Error::EncodeError(e.to_string()))
}
