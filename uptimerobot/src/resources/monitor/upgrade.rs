//! Version 0 -> 1 migration of monitor state
//!
//! Version 0 kept `success_http_response_codes` as a list of raw strings and
//! `alert_contacts` as a list of bare contact ids. Version 1 stores a
//! normalized set of codes and a set of contact objects.

use std::collections::HashMap;
use tfplug::convert::string_list_to_deduped_object_set;
use tfplug::types::Dynamic;
use tfplug::{Result, StateUpgrader, TfplugError};

pub const MONITOR_SCHEMA_VERSION: i64 = 1;

/// Accepted status code classes when none are configured
pub const DEFAULT_STATUS_CODES: [&str; 2] = ["2xx", "3xx"];

const ALERT_CONTACT_ID: &str = "alert_contact_id";
const ALERT_CONTACT_DEFAULTS: [&str; 2] = ["threshold", "recurrence"];

pub fn monitor_upgrader() -> StateUpgrader {
    StateUpgrader::new(MONITOR_SCHEMA_VERSION).transition(0, upgrade_monitor_v0)
}

/// Trims, lowercases and deduplicates status codes. Null means the
/// default classes; unknown stays unknown.
pub fn normalize_status_codes(codes: &Dynamic) -> Result<Dynamic> {
    let items = match codes {
        Dynamic::Null => {
            return Ok(Dynamic::set(
                DEFAULT_STATUS_CODES.iter().map(|code| Dynamic::string(*code)),
            ))
        }
        Dynamic::Unknown => return Ok(Dynamic::Unknown),
        Dynamic::List(items) | Dynamic::Set(items) => items,
        other => {
            return Err(TfplugError::TypeMismatch {
                expected: "list of string".to_string(),
                actual: other.type_name().to_string(),
            })
        }
    };

    let mut normalized = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Dynamic::String(code) => {
                let code = code.trim().to_lowercase();
                if !code.is_empty() {
                    normalized.push(Dynamic::String(code));
                }
            }
            Dynamic::Null => {}
            other => {
                return Err(TfplugError::TypeMismatch {
                    expected: "string".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        }
    }
    Ok(Dynamic::set(normalized))
}

fn alert_contact_defaults() -> HashMap<String, Dynamic> {
    ALERT_CONTACT_DEFAULTS
        .iter()
        .map(|key| (key.to_string(), Dynamic::Number(0.0)))
        .collect()
}

/// Turns a list of bare alert contact ids into contact objects
pub fn lift_alert_contacts(ids: &Dynamic) -> Result<Dynamic> {
    string_list_to_deduped_object_set(ids, ALERT_CONTACT_ID, &alert_contact_defaults())
}

/// Fills null or unknown `threshold` and `recurrence` with 0
pub fn ensure_alert_contact_defaults(contacts: &Dynamic) -> Dynamic {
    let fill = |contact: &Dynamic| match contact {
        Dynamic::Map(fields) => {
            let mut fields = fields.clone();
            for key in ALERT_CONTACT_DEFAULTS {
                let value = fields.entry(key.to_string()).or_insert(Dynamic::Null);
                if !value.is_known() {
                    *value = Dynamic::Number(0.0);
                }
            }
            Dynamic::Map(fields)
        }
        other => other.clone(),
    };

    match contacts {
        Dynamic::Set(items) => Dynamic::set(items.iter().map(fill)),
        Dynamic::List(items) => Dynamic::List(items.iter().map(fill).collect()),
        other => other.clone(),
    }
}

/// Rewrites a version 0 monitor object into the version 1 shape
pub fn upgrade_monitor_v0(state: &Dynamic) -> Result<Dynamic> {
    let mut upgraded = state
        .as_map()
        .cloned()
        .ok_or_else(|| TfplugError::TypeMismatch {
            expected: "object".to_string(),
            actual: state.type_name().to_string(),
        })?;

    let codes = normalize_status_codes(state.attr("success_http_response_codes"))?;
    upgraded.insert("success_http_response_codes".to_string(), codes);

    let contacts = ensure_alert_contact_defaults(&lift_alert_contacts(state.attr("alert_contacts"))?);
    upgraded.insert("alert_contacts".to_string(), contacts);

    Ok(Dynamic::Map(upgraded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::types::RawState;

    fn strings(values: &[&str]) -> Dynamic {
        Dynamic::List(values.iter().map(|v| Dynamic::string(*v)).collect())
    }

    #[test]
    fn status_codes_are_normalized() {
        let normalized =
            normalize_status_codes(&strings(&[" 2xx ", "2XX", "3xx", "3xx", "", "   "])).unwrap();

        assert_eq!(
            normalized,
            Dynamic::Set(vec![Dynamic::string("2xx"), Dynamic::string("3xx")])
        );
    }

    #[test]
    fn null_status_codes_mean_the_default() {
        let normalized = normalize_status_codes(&Dynamic::Null).unwrap();

        assert!(normalized.same_members(&Dynamic::Set(vec![
            Dynamic::string("3xx"),
            Dynamic::string("2xx")
        ])));
        assert_eq!(normalize_status_codes(&Dynamic::Unknown).unwrap(), Dynamic::Unknown);
    }

    #[test]
    fn non_string_status_code_is_an_error() {
        let codes = Dynamic::List(vec![Dynamic::Number(200.0)]);

        assert!(normalize_status_codes(&codes).is_err());
    }

    #[test]
    fn alert_contact_defaults_are_idempotent() {
        let contacts = Dynamic::Set(vec![
            Dynamic::object([
                ("alert_contact_id", Dynamic::string("1")),
                ("threshold", Dynamic::Unknown),
            ]),
            Dynamic::object([
                ("alert_contact_id", Dynamic::string("2")),
                ("threshold", Dynamic::Number(5.0)),
                ("recurrence", Dynamic::Null),
            ]),
        ]);

        let once = ensure_alert_contact_defaults(&contacts);
        let twice = ensure_alert_contact_defaults(&once);

        assert_eq!(once, twice);
        for contact in once.as_elements().unwrap() {
            assert!(contact.attr("threshold").is_known());
            assert!(contact.attr("recurrence").is_known());
        }
        assert_eq!(once.as_elements().unwrap()[1].attr("threshold"), &Dynamic::Number(5.0));
    }

    #[test]
    fn bare_contact_ids_become_objects() {
        let lifted = lift_alert_contacts(&strings(&[" 7 ", "7", "", "8"])).unwrap();

        let contacts = lifted.as_elements().unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].attr("alert_contact_id"), &Dynamic::string("7"));
        assert_eq!(contacts[0].attr("threshold"), &Dynamic::Number(0.0));
        assert_eq!(contacts[1].attr("recurrence"), &Dynamic::Number(0.0));
    }

    #[test]
    fn legacy_monitor_state_upgrades() {
        let raw = RawState::from_json(
            r#"{"id":"3","friendly_name":"api","success_http_response_codes":["2XX"," 404 "],"alert_contacts":["11","11"]}"#,
        );

        let upgraded = monitor_upgrader().upgrade(0, &raw).unwrap();

        assert_eq!(upgraded.attr("friendly_name"), &Dynamic::string("api"));
        assert_eq!(
            upgraded.attr("success_http_response_codes"),
            &Dynamic::Set(vec![Dynamic::string("2xx"), Dynamic::string("404")])
        );
        assert_eq!(upgraded.attr("alert_contacts").as_elements().unwrap().len(), 1);
    }
}
