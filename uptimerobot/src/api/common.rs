//! Common types and utilities for the UptimeRobot API

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Error body returned by the API on 4xx responses
#[derive(Debug, Deserialize, Default)]
pub struct ApiErrorResponse {
    pub code: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ApiErrorResponse {
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

/// A field that distinguishes "not sent" from "sent as null" from a value.
///
/// Use with `#[serde(default, skip_serializing_if = "Field::is_absent")]`:
/// absent fields are left out of the body, `Null` serializes as JSON null
/// and clears the value server side. On the way in, a missing key reads as
/// `Absent` and an explicit null as `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Absent
    }
}

impl<T> Field<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Absent => Field::Absent,
            Field::Null => Field::Null,
            Field::Value(v) => Field::Value(f(v)),
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            // Only reachable without skip_serializing_if; null is the closest encoding
            Field::Absent | Field::Null => serializer.serialize_none(),
            Field::Value(v) => serializer.serialize_some(v),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Field::Value(v),
            None => Field::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Probe {
        #[serde(default, skip_serializing_if = "Field::is_absent")]
        flag: Field<bool>,
    }

    #[test]
    fn three_states_serialize_differently() {
        let absent = Probe { flag: Field::Absent };
        let null = Probe { flag: Field::Null };
        let value = Probe {
            flag: Field::Value(false),
        };

        assert_eq!(serde_json::to_value(&absent).unwrap(), json!({}));
        assert_eq!(serde_json::to_value(&null).unwrap(), json!({"flag": null}));
        assert_eq!(serde_json::to_value(&value).unwrap(), json!({"flag": false}));
    }

    #[test]
    fn three_states_deserialize_differently() {
        let absent: Probe = serde_json::from_value(json!({})).unwrap();
        let null: Probe = serde_json::from_value(json!({"flag": null})).unwrap();
        let value: Probe = serde_json::from_value(json!({"flag": true})).unwrap();

        assert_eq!(absent.flag, Field::Absent);
        assert_eq!(null.flag, Field::Null);
        assert_eq!(value.flag, Field::Value(true));
    }

    #[test]
    fn error_body_prefers_message() {
        let body: ApiErrorResponse =
            serde_json::from_str(r#"{"code":"X","message":"m","error":"e"}"#).unwrap();
        assert_eq!(body.message(), Some("m"));

        let body: ApiErrorResponse = serde_json::from_str(r#"{"error":"e"}"#).unwrap();
        assert_eq!(body.message(), Some("e"));
    }
}
