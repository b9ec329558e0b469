//! The notation writer: renders a value back into notation text, the
//! inverse of the reader for the subset the notation can denote. Pairs
//! render as `(a b c)` or `(a b . c)`, objects and arrays in their JSON
//! shapes, strings with the same JSON-style escaping the reader accepts,
//! and numbers so the reader re-infers the same integer/float distinction.
//! Procedure values, `#<void>` and non-finite floats are outside the
//! notation and fail with an [`Error::EncodeError`].

use crate::Error;
use crate::ast::{Value, fmt_float};

/// Render `value` as notation text.
pub fn encode(value: &Value) -> Result<String, Error> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String) -> Result<(), Error> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Float(x) => {
            if !x.is_finite() {
                return Err(Error::EncodeError(format!("float {x} is not encodable")));
            }
            out.push_str(&fmt_float(*x));
        }
        Value::Str(s) => write_string(s, out),
        Value::Symbol(symbol) => out.push_str(symbol.name()),
        Value::Cell(cell) => {
            out.push('(');
            write_value(&cell.first, out)?;
            let mut tail = &cell.rest;
            while let Value::Cell(next) = tail {
                out.push(' ');
                write_value(&next.first, out)?;
                tail = &next.rest;
            }
            if !matches!(tail, Value::Null) {
                out.push_str(" . ");
                write_value(tail, out)?;
            }
            out.push(')');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(entries) => {
            out.push('{');
            for (i, (key, entry)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(entry, out)?;
            }
            out.push('}');
        }
        other => {
            return Err(Error::EncodeError(format!("{other} is not encodable")));
        }
    }
    Ok(())
}

/// JSON-style string escaping; control characters not covered by a named
/// escape render as `\uXXXX`.
fn write_string(text: &str, out: &mut String) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
