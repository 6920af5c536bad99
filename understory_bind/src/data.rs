// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pure helpers over JSON data objects.

use std::borrow::Cow;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Map, Value};

use crate::BindError;

/// Flatten nested objects into dot-joined keys.
///
/// Arrays and scalars are leaves. Empty nested objects are kept as leaves so that
/// [`unflatten`] restores them.
///
/// ```
/// use serde_json::json;
/// use understory_bind::data::flatten;
///
/// let flat = flatten(json!({"a": {"b": 1, "c": 2}}).as_object().unwrap());
/// assert_eq!(serde_json::Value::Object(flat), json!({"a.b": 1, "a.c": 2}));
/// ```
pub fn flatten(object: &Map<String, Value>) -> Map<String, Value> {
    fn walk(prefix: &str, object: &Map<String, Value>, out: &mut Map<String, Value>) {
        for (key, value) in object {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                Value::Object(inner) if !inner.is_empty() => walk(&path, inner, out),
                _ => {
                    out.insert(path, value.clone());
                }
            }
        }
    }
    let mut out = Map::new();
    walk("", object, &mut out);
    out
}

/// Rebuild nested objects from dot-joined keys.
///
/// Fails with [`BindError::PathConflict`] when a path is both a leaf and a parent,
/// for example `{"a": 1, "a.b": 2}`. Object values at the same path are merged.
pub fn unflatten(flat: &Map<String, Value>) -> Result<Map<String, Value>, BindError> {
    let mut root = Value::Object(Map::new());
    for (key, value) in flat {
        let mut node = &mut root;
        let mut segments = key.split('.').peekable();
        while let Some(seg) = segments.next() {
            let Value::Object(map) = node else {
                return Err(BindError::PathConflict(key.clone()));
            };
            if segments.peek().is_none() {
                match map.get_mut(seg) {
                    Some(existing) => {
                        if !(existing.is_object() && value.is_object()) {
                            return Err(BindError::PathConflict(key.clone()));
                        }
                        deep_extend(existing, value);
                    }
                    None => {
                        map.insert(seg.to_owned(), value.clone());
                    }
                }
                break;
            }
            node = map
                .entry(seg.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }
    match root {
        Value::Object(map) => Ok(map),
        _ => unreachable!("root is always an object"),
    }
}

/// Recursively merge `source` into `target`.
///
/// Objects merge key by key; any other value in `source` replaces the one in
/// `target`.
pub fn deep_extend(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(t), Value::Object(s)) => {
            for (key, value) in s {
                let merge = value.is_object() && t.get(key).is_some_and(Value::is_object);
                if !merge {
                    t.insert(key.clone(), value.clone());
                } else if let Some(existing) = t.get_mut(key) {
                    deep_extend(existing, value);
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

/// A random alphanumeric string of `len` characters.
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Truthiness as used for checkbox binding: `null`, `false`, `0`, and `""` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form of a value when assigned to a property or inner markup.
///
/// Strings are used verbatim, `null` is empty, everything else is its JSON text.
pub fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}
