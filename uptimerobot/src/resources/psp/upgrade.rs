//! Version 0 -> 1 migration of status page state

use super::schema::{attribute_types, psp_schema, FEATURE_KEYS, SCHEMA_VERSION};
use serde::Deserialize;
use std::collections::HashMap;
use tfplug::convert::{lenient_string_to_bool, normalize_sparse_object, sequence_to_set};
use tfplug::schema::{AttributeType, Block};
use tfplug::types::Dynamic;
use tfplug::upgrade::decode_as;
use tfplug::{Result, StateUpgrader, TfplugError};

type LegacyObject = HashMap<String, Dynamic>;

/// Version 0 state. Only the fields whose shape changed are typed; the
/// scalars are carried over from the raw object.
///
/// In version 0 `monitor_ids` was a list and `custom_settings` a one-element
/// list block whose `font`, `page` and `colors` sub-blocks were one-element
/// lists too. Feature flags were a map of strings such as `"true"` or
/// `"0"`. There was no `homepage_link`.
#[derive(Debug, Deserialize)]
struct PspV0 {
    id: String,
    name: String,
    #[serde(default)]
    monitor_ids: Option<Dynamic>,
    #[serde(default)]
    custom_settings: Option<Vec<CustomSettingsV0>>,
}

#[derive(Debug, Deserialize)]
struct CustomSettingsV0 {
    #[serde(default)]
    font: Option<Vec<LegacyObject>>,
    #[serde(default)]
    page: Option<Vec<LegacyObject>>,
    #[serde(default)]
    colors: Option<Vec<LegacyObject>>,
    #[serde(default)]
    features: Option<HashMap<String, Dynamic>>,
}

pub fn psp_upgrader() -> StateUpgrader {
    StateUpgrader::new(SCHEMA_VERSION).transition(0, upgrade_v0)
}

/// Converts string-encoded feature flags to booleans.
///
/// Only current feature keys survive; retired keys and values that do not
/// parse as a boolean are left out rather than defaulted.
pub fn upgrade_features_map(legacy: &HashMap<String, Dynamic>) -> HashMap<String, bool> {
    legacy
        .iter()
        .filter_map(|(key, raw)| {
            if !FEATURE_KEYS.contains(&key.as_str()) {
                tracing::debug!(key = %key, "dropping retired feature flag");
                return None;
            }
            match lenient_string_to_bool(raw) {
                Some(flag) => Some((key.clone(), flag)),
                None => {
                    tracing::debug!(key = %key, value = ?raw, "dropping unparseable feature flag");
                    None
                }
            }
        })
        .collect()
}

/// Rewrites a version 0 object into the version 1 shape
pub fn upgrade_v0(state: &Dynamic) -> Result<Dynamic> {
    let legacy = state.as_map().ok_or_else(|| TfplugError::TypeMismatch {
        expected: "object".to_string(),
        actual: state.type_name().to_string(),
    })?;
    let decoded: PspV0 = decode_as(state)?;
    let schema = psp_schema();

    let mut upgraded = normalize_sparse_object(legacy, &attribute_types(&schema.block));
    upgraded.insert("id".to_string(), Dynamic::String(decoded.id));
    upgraded.insert("name".to_string(), Dynamic::String(decoded.name));
    upgraded.insert(
        "monitor_ids".to_string(),
        sequence_to_set(
            decoded.monitor_ids.as_ref().unwrap_or(&Dynamic::Null),
            &AttributeType::Number,
        )?,
    );

    let settings_block = &schema
        .block
        .nested_block("custom_settings")
        .ok_or_else(|| TfplugError::Custom("schema has no custom_settings block".to_string()))?
        .block;
    let custom_settings = match decoded.custom_settings.and_then(|s| s.into_iter().next()) {
        Some(settings) => upgrade_custom_settings(settings, settings_block)?,
        None => Dynamic::Null,
    };
    upgraded.insert("custom_settings".to_string(), custom_settings);

    Ok(Dynamic::Map(upgraded))
}

fn sub_block<'a>(block: &'a Block, name: &str) -> Result<&'a Block> {
    block
        .nested_block(name)
        .map(|nested| &nested.block)
        .ok_or_else(|| TfplugError::Custom(format!("custom_settings has no {} block", name)))
}

/// The first element of a legacy one-element list block
fn first_element(elements: Option<Vec<LegacyObject>>, block: &Block) -> Dynamic {
    match elements.and_then(|e| e.into_iter().next()) {
        Some(object) => Dynamic::Map(normalize_sparse_object(&object, &attribute_types(block))),
        None => Dynamic::Null,
    }
}

fn upgrade_custom_settings(settings: CustomSettingsV0, block: &Block) -> Result<Dynamic> {
    let features = match settings.features {
        Some(legacy) if !legacy.is_empty() => {
            let flags: LegacyObject = upgrade_features_map(&legacy)
                .into_iter()
                .map(|(key, flag)| (key, Dynamic::Bool(flag)))
                .collect();
            Dynamic::Map(normalize_sparse_object(
                &flags,
                &attribute_types(sub_block(block, "features")?),
            ))
        }
        _ => Dynamic::Null,
    };

    Ok(Dynamic::object([
        ("font", first_element(settings.font, sub_block(block, "font")?)),
        ("page", first_element(settings.page, sub_block(block, "page")?)),
        ("colors", first_element(settings.colors, sub_block(block, "colors")?)),
        ("features", features),
    ]))
}
