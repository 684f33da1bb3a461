//! Shape converters used when migrating and normalizing state
//!
//! Every function here is pure. Null and unknown inputs are preserved as
//! null and unknown unless a function says otherwise, and an empty
//! collection is never collapsed into null.

use crate::error::{Result, TfplugError};
use crate::schema::AttributeType;
use crate::types::Dynamic;
use std::collections::HashMap;

/// Converts an ordered sequence into a set of unique members.
///
/// Null stays null, unknown stays unknown, an empty sequence becomes a
/// concrete empty set. Duplicates are detected by value equality and the
/// first occurrence wins. Elements that do not match `element` are a
/// decoding error; nothing is coerced.
pub fn sequence_to_set(ordered: &Dynamic, element: &AttributeType) -> Result<Dynamic> {
    match ordered {
        Dynamic::Null => Ok(Dynamic::Null),
        Dynamic::Unknown => Ok(Dynamic::Unknown),
        Dynamic::List(items) | Dynamic::Set(items) => {
            for item in items {
                check_element(item, element)?;
            }
            Ok(Dynamic::set(items.iter().cloned()))
        }
        other => Err(TfplugError::TypeMismatch {
            expected: format!("list of {}", element.name()),
            actual: other.type_name().to_string(),
        }),
    }
}

fn check_element(value: &Dynamic, element: &AttributeType) -> Result<()> {
    let matches = match (value, element) {
        // Unknown members are allowed while planning
        (Dynamic::Null, _) | (Dynamic::Unknown, _) => true,
        (Dynamic::String(_), AttributeType::String) => true,
        (Dynamic::Number(_), AttributeType::Number) => true,
        (Dynamic::Bool(_), AttributeType::Bool) => true,
        (Dynamic::List(_), AttributeType::List(_)) => true,
        (Dynamic::List(_), AttributeType::Set(_)) | (Dynamic::Set(_), AttributeType::Set(_)) => {
            true
        }
        (Dynamic::Map(_), AttributeType::Map(_)) | (Dynamic::Map(_), AttributeType::Object(_)) => {
            true
        }
        _ => false,
    };

    if matches {
        Ok(())
    } else {
        Err(TfplugError::TypeMismatch {
            expected: element.name().to_string(),
            actual: value.type_name().to_string(),
        })
    }
}

/// Parses a legacy string-encoded boolean.
///
/// Accepts `1/0`, `t/f`, `true/false` and `yes/no` in any case with
/// surrounding whitespace. Anything else yields None so the caller can
/// leave the key out instead of inventing `false`.
pub fn parse_lenient_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" => Some(true),
        "0" | "f" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// [`parse_lenient_bool`] over a Dynamic. Native booleans pass through;
/// null, unknown and non-string values yield None.
pub fn lenient_string_to_bool(value: &Dynamic) -> Option<bool> {
    match value {
        Dynamic::String(s) => parse_lenient_bool(s),
        Dynamic::Bool(b) => Some(*b),
        _ => None,
    }
}

/// Completes a partial object against its full attribute set.
///
/// Missing keys become null, keys outside the attribute set are dropped,
/// so the result always has exactly the declared shape.
pub fn normalize_sparse_object(
    present: &HashMap<String, Dynamic>,
    attributes: &HashMap<String, AttributeType>,
) -> HashMap<String, Dynamic> {
    attributes
        .keys()
        .map(|key| {
            let value = present.get(key).cloned().unwrap_or(Dynamic::Null);
            (key.clone(), value)
        })
        .collect()
}

/// Lifts a bare identifier list into a set of objects.
///
/// Each id is trimmed, empty ids are dropped, duplicates are removed, and
/// every surviving id becomes `defaults` plus `id_key = id`.
pub fn string_list_to_deduped_object_set(
    ids: &Dynamic,
    id_key: &str,
    defaults: &HashMap<String, Dynamic>,
) -> Result<Dynamic> {
    let items = match ids {
        Dynamic::Null => return Ok(Dynamic::Null),
        Dynamic::Unknown => return Ok(Dynamic::Unknown),
        Dynamic::List(items) | Dynamic::Set(items) => items,
        other => {
            return Err(TfplugError::TypeMismatch {
                expected: "list of string".to_string(),
                actual: other.type_name().to_string(),
            })
        }
    };

    let mut seen: Vec<String> = Vec::new();
    for item in items {
        let id = match item {
            Dynamic::String(s) => s.trim().to_string(),
            Dynamic::Number(n) => format_number(*n),
            Dynamic::Null => continue,
            other => {
                return Err(TfplugError::TypeMismatch {
                    expected: "string".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        };
        if !id.is_empty() && !seen.contains(&id) {
            seen.push(id);
        }
    }

    Ok(Dynamic::Set(
        seen.into_iter()
            .map(|id| {
                let mut object = defaults.clone();
                object.insert(id_key.to_string(), Dynamic::String(id));
                Dynamic::Map(object)
            })
            .collect(),
    ))
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Replaces every unknown value, at any depth, with null.
pub fn finalize_unknowns(value: &mut Dynamic) {
    match value {
        Dynamic::Unknown => *value = Dynamic::Null,
        Dynamic::List(items) | Dynamic::Set(items) => items.iter_mut().for_each(finalize_unknowns),
        Dynamic::Map(map) => map.values_mut().for_each(finalize_unknowns),
        _ => {}
    }
}
