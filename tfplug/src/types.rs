//! Core type system for tfplug
//!
//! This module provides the value model used by configuration, plan and
//! state: Dynamic values, attribute paths, diagnostics, private state and
//! raw (pre-upgrade) state.

use crate::error::{Result, TfplugError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dynamic represents Terraform values that can be of any type
/// This is the core type for all configuration and state data
/// IMPORTANT: Prefer the type-safe accessors over matching directly
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value (attribute omitted from configuration)
    Null,
    /// Boolean value
    Bool(bool),
    /// Number value (all numbers are f64 to match Terraform)
    Number(f64),
    /// String value
    String(String),
    /// List of values (ordered, allows duplicates)
    List(Vec<Dynamic>),
    /// Set of values (unordered, unique). Build with [`Dynamic::set`]
    Set(Vec<Dynamic>),
    /// Map of string keys to values (objects are represented as Maps)
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    /// Builds a set, dropping duplicates while keeping first-seen members.
    pub fn set(values: impl IntoIterator<Item = Dynamic>) -> Self {
        let mut members: Vec<Dynamic> = Vec::new();
        for value in values {
            if !members.contains(&value) {
                members.push(value);
            }
        }
        Dynamic::Set(members)
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Dynamic)>) -> Self {
        Dynamic::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Dynamic::String(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    /// Neither null nor unknown
    pub fn is_known(&self) -> bool {
        !self.is_null() && !self.is_unknown()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Elements of a list or set. JSON state cannot tell the two apart,
    /// so both are accepted.
    pub fn as_elements(&self) -> Option<&[Dynamic]> {
        match self {
            Dynamic::List(l) | Dynamic::Set(l) => Some(l),
            _ => None,
        }
    }

    /// Looks up an object attribute; a missing key reads as null.
    pub fn attr(&self, name: &str) -> &Dynamic {
        static NULL: Dynamic = Dynamic::Null;
        match self {
            Dynamic::Map(m) => m.get(name).unwrap_or(&NULL),
            _ => &NULL,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Set(_) => "set",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }

    /// Set equality ignores member order.
    pub fn same_members(&self, other: &Dynamic) -> bool {
        match (self.as_elements(), other.as_elements()) {
            (Some(a), Some(b)) => {
                a.len() == b.len() && a.iter().all(|v| b.contains(v))
            }
            _ => self == other,
        }
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) | Dynamic::Set(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_str("__unknown__"),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid Dynamic value")
            }

            fn visit_unit<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                if value == "__unknown__" {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value.to_string()))
                }
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                if value == "__unknown__" {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value))
                }
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Dynamic::List(vec))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut hashmap = HashMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    hashmap.insert(key, value);
                }
                Ok(Dynamic::Map(hashmap))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// DynamicValue wraps Dynamic and provides path-based access
/// This is what gets passed between Terraform and the provider
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    /// Empty object, the starting point for building state
    pub fn object() -> Self {
        Self {
            value: Dynamic::Map(HashMap::new()),
        }
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }
        let value = serde_json::from_slice(data)
            .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        let value = self.navigate_path(path)?;
        match value {
            Dynamic::String(s) => Ok(s.clone()),
            _ => Err(type_mismatch("string", value)),
        }
    }

    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set_value(path, Dynamic::String(value))
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn set_value(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        if path.steps.is_empty() {
            self.value = new_value;
            return Ok(());
        }

        // For non-empty paths, ensure we have a map at the root
        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        let last_idx = path.steps.len() - 1;

        for (idx, step) in path.steps.iter().enumerate() {
            if idx == last_idx {
                return match (current, step) {
                    (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                    | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                        m.insert(name.clone(), new_value);
                        Ok(())
                    }
                    (Dynamic::List(l), AttributePathStep::ElementKeyInt(i)) => {
                        let i = *i as usize;
                        match l.get_mut(i) {
                            Some(slot) => {
                                *slot = new_value;
                                Ok(())
                            }
                            None => Err(TfplugError::Custom(format!(
                                "list index {} out of bounds",
                                i
                            ))),
                        }
                    }
                    _ => Err(TfplugError::Custom("invalid path navigation".to_string())),
                };
            }

            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                    let slot = m.entry(name.clone()).or_insert(Dynamic::Null);
                    // Intermediate nulls become containers shaped by the next step
                    if slot.is_null() {
                        *slot = match path.steps.get(idx + 1) {
                            Some(AttributePathStep::ElementKeyInt(_)) => Dynamic::List(Vec::new()),
                            _ => Dynamic::Map(HashMap::new()),
                        };
                    }
                    slot
                }
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(i)) => {
                    let i = *i as usize;
                    let len = l.len();
                    l.get_mut(i).ok_or_else(|| {
                        TfplugError::Custom(format!("list index {} out of bounds ({})", i, len))
                    })?
                }
                _ => return Err(TfplugError::Custom("invalid path navigation".to_string())),
            };
        }

        Err(TfplugError::Custom("failed to set value".to_string()))
    }

    fn navigate_path<'a>(&'a self, path: &AttributePath) -> Result<&'a Dynamic> {
        let mut current = &self.value;

        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m
                    .get(name)
                    .ok_or_else(|| TfplugError::AttributeNotFound(name.clone()))?,
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx))
                | (Dynamic::Set(l), AttributePathStep::ElementKeyInt(idx)) => {
                    let idx = *idx as usize;
                    l.get(idx).ok_or_else(|| {
                        TfplugError::Custom(format!("list index {} out of bounds", idx))
                    })?
                }
                _ => return Err(TfplugError::Custom("invalid path navigation".to_string())),
            };
        }

        Ok(current)
    }
}

fn type_mismatch(expected: &str, actual: &Dynamic) -> TfplugError {
    TfplugError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

/// AttributePath represents a path to an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => write!(f, "{}", name)?,
                AttributePathStep::AttributeName(name) => write!(f, ".{}", name)?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[{:?}]", key)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Individual step in an AttributePath
#[derive(Debug, Clone, PartialEq)]
pub enum AttributePathStep {
    /// Access attribute by name in object/map
    AttributeName(String),
    /// Access element by string key (for maps)
    ElementKeyString(String),
    /// Access element by integer index (for lists)
    ElementKeyInt(i64),
}

/// Private state management - Provider-specific data not visible to users
/// The framework handles msgpack encoding/decoding transparently
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateStateData {
    data: HashMap<String, Vec<u8>>,
}

impl PrivateStateData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn get_key(&self, key: &str) -> Option<&[u8]> {
        self.data.get(key).map(|v| v.as_slice())
    }

    pub fn set_key(&mut self, key: &str, value: Vec<u8>) {
        self.data.insert(key.to_string(), value);
    }

    pub fn remove_key(&mut self, key: &str) -> Option<Vec<u8>> {
        self.data.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Encoding uses msgpack; an empty store encodes to no bytes at all
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.data.is_empty() {
            return Ok(Vec::new());
        }
        rmp_serde::encode::to_vec(&self.data).map_err(|e| {
            TfplugError::EncodingError(format!("private state encoding failed: {}", e))
        })
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::new());
        }
        let data = rmp_serde::decode::from_slice(data).map_err(|e| {
            TfplugError::DecodingError(format!("private state decoding failed: {}", e))
        })?;
        Ok(Self { data })
    }
}

impl Default for PrivateStateData {
    fn default() -> Self {
        Self::new()
    }
}

/// RawState holds the stored state for a resource to be upgraded
#[derive(Debug, Clone, Default)]
pub struct RawState {
    pub json: Option<Vec<u8>>,
}

impl RawState {
    pub fn from_json(json: impl Into<Vec<u8>>) -> Self {
        Self {
            json: Some(json.into()),
        }
    }
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// True when any diagnostic is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// ClientCapabilities indicates Terraform client capabilities
#[derive(Debug, Clone, Default)]
pub struct ClientCapabilities {
    pub deferral_allowed: bool,
    pub write_only_attributes_allowed: bool,
}
