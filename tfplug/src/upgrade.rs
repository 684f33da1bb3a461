//! Versioned state upgrades
//!
//! A resource bumps `Schema::version` whenever its persisted shape changes
//! and registers one transition per source version. Stored state is walked
//! forward one version at a time until it reaches the current version.
//! Nothing is returned unless every transition succeeds, so a failed
//! upgrade never produces half-migrated state.

use crate::error::{Result, TfplugError};
use crate::resource::{UpgradeResourceStateRequest, UpgradeResourceStateResponse};
use crate::types::{Diagnostic, Dynamic, DynamicValue, RawState};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

type Transition = Box<dyn Fn(&Dynamic) -> Result<Dynamic> + Send + Sync>;

/// Registry of state transitions keyed by the version they upgrade from
pub struct StateUpgrader {
    current: i64,
    transitions: BTreeMap<i64, Transition>,
}

impl StateUpgrader {
    pub fn new(current_version: i64) -> Self {
        Self {
            current: current_version,
            transitions: BTreeMap::new(),
        }
    }

    /// Registers the transition from `from` to `from + 1`
    pub fn transition<F>(mut self, from: i64, upgrade: F) -> Self
    where
        F: Fn(&Dynamic) -> Result<Dynamic> + Send + Sync + 'static,
    {
        self.transitions.insert(from, Box::new(upgrade));
        self
    }

    pub fn current_version(&self) -> i64 {
        self.current
    }

    /// Upgrades state stored at `version` to the current version
    pub fn upgrade(&self, version: i64, raw: &RawState) -> Result<Dynamic> {
        if version > self.current || version < 0 {
            return Err(self.unsupported(version));
        }

        let json = raw.json.as_deref().ok_or_else(|| {
            TfplugError::UpgradeFailed("stored state has no JSON representation".to_string())
        })?;
        let mut state = DynamicValue::decode_json(json)?.value;

        for from in version..self.current {
            let transition = self
                .transitions
                .get(&from)
                .ok_or_else(|| self.unsupported(from))?;
            state = transition(&state).map_err(|e| {
                TfplugError::UpgradeFailed(format!("version {} -> {}: {}", from, from + 1, e))
            })?;
            tracing::debug!(from, to = from + 1, "state transition applied");
        }

        Ok(state)
    }

    /// Runs [`StateUpgrader::upgrade`] for a framework request, turning
    /// failures into an error diagnostic and a null state
    pub fn respond(&self, request: &UpgradeResourceStateRequest) -> UpgradeResourceStateResponse {
        match self.upgrade(request.version, &request.raw_state) {
            Ok(state) => UpgradeResourceStateResponse {
                upgraded_state: DynamicValue::new(state),
                diagnostics: vec![],
            },
            Err(e) => {
                tracing::error!(
                    type_name = %request.type_name,
                    version = request.version,
                    error = %e,
                    "state upgrade failed"
                );
                UpgradeResourceStateResponse {
                    upgraded_state: DynamicValue::null(),
                    diagnostics: vec![Diagnostic::error(
                        "Unable to upgrade resource state",
                        format!(
                            "Stored state of {} at schema version {} could not be upgraded to version {}: {}",
                            request.type_name, request.version, self.current, e
                        ),
                    )],
                }
            }
        }
    }

    fn unsupported(&self, version: i64) -> TfplugError {
        TfplugError::UnsupportedVersion {
            version,
            current: self.current,
        }
    }
}

/// Decodes a stored value into a typed shape, for transitions that want
/// serde to enforce the old schema
pub fn decode_as<T: DeserializeOwned>(value: &Dynamic) -> Result<T> {
    let json = serde_json::to_value(value)
        .map_err(|e| TfplugError::DecodingError(format!("stored state: {}", e)))?;
    serde_json::from_value(json)
        .map_err(|e| TfplugError::DecodingError(format!("stored state: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn upgrader() -> StateUpgrader {
        StateUpgrader::new(2)
            .transition(0, |state| {
                let mut next = state.as_map().cloned().unwrap_or_default();
                next.insert("v1".to_string(), Dynamic::Bool(true));
                Ok(Dynamic::Map(next))
            })
            .transition(1, |state| {
                let mut next = state.as_map().cloned().unwrap_or_default();
                next.insert("v2".to_string(), Dynamic::Bool(true));
                Ok(Dynamic::Map(next))
            })
    }

    #[test]
    fn chains_transitions_to_current_version() {
        let upgraded = upgrader()
            .upgrade(0, &RawState::from_json(r#"{"name":"x"}"#))
            .unwrap();

        assert_eq!(upgraded.attr("name"), &Dynamic::string("x"));
        assert_eq!(upgraded.attr("v1"), &Dynamic::Bool(true));
        assert_eq!(upgraded.attr("v2"), &Dynamic::Bool(true));
    }

    #[test]
    fn current_version_passes_through() {
        let upgraded = upgrader()
            .upgrade(2, &RawState::from_json(r#"{"name":"x"}"#))
            .unwrap();

        assert_eq!(upgraded, Dynamic::object([("name", Dynamic::string("x"))]));
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let raw = RawState::from_json("{}");
        assert!(matches!(
            upgrader().upgrade(3, &raw),
            Err(TfplugError::UnsupportedVersion { version: 3, current: 2 })
        ));

        let gap = StateUpgrader::new(2).transition(1, |s| Ok(s.clone()));
        assert!(matches!(
            gap.upgrade(0, &raw),
            Err(TfplugError::UnsupportedVersion { version: 0, .. })
        ));
    }

    #[test]
    fn failing_transition_writes_nothing() {
        let upgrader = StateUpgrader::new(2)
            .transition(0, |s| Ok(s.clone()))
            .transition(1, |_| Err(TfplugError::DecodingError("bad".to_string())));
        let request = UpgradeResourceStateRequest {
            type_name: "example".to_string(),
            version: 0,
            raw_state: RawState::from_json("{}"),
        };

        let response = upgrader.respond(&request);

        assert!(response.upgraded_state.is_null());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].is_error());
    }

    #[test]
    fn missing_json_is_an_error() {
        assert!(upgrader().upgrade(0, &RawState::default()).is_err());
    }

    #[test]
    fn decode_as_enforces_the_shape() {
        #[derive(Deserialize)]
        struct Old {
            ids: Vec<i64>,
        }

        let ok = Dynamic::object([(
            "ids",
            Dynamic::List(vec![Dynamic::Number(1.0), Dynamic::Number(2.0)]),
        )]);
        assert_eq!(decode_as::<Old>(&ok).unwrap().ids, vec![1, 2]);

        let bad = Dynamic::object([("ids", Dynamic::string("1,2"))]);
        assert!(decode_as::<Old>(&bad).is_err());
    }
}
