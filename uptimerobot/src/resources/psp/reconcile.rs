//! Mapping between Terraform values and the status page API
//!
//! Plan -> payload keeps the three states of every field apart: a null
//! plan value is not sent, an empty string is sent as null (clearing the
//! field), anything else is sent as is. Server -> state projects the API
//! response onto the current schema shape; the ownership mask decides
//! afterwards which of those values are kept.

use super::mismatch::diff_monitor_ids;
use crate::api::{Colors, CustomSettings, Features, Field, Font, Page, Psp, PspPayload};
use std::fmt;
use tfplug::types::Dynamic;

/// Which operation a state computation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Read,
    /// First read after `terraform import`: there is no prior state
    ReadAfterImport,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Read => "read",
            Operation::ReadAfterImport => "read after import",
        };
        f.write_str(name)
    }
}

/// Parses the stored `id` attribute
pub fn parse_psp_id(id: &Dynamic) -> Result<i64, String> {
    match id {
        Dynamic::String(raw) => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| format!("status page id {:?} is not a positive integer", raw)),
        Dynamic::Number(n) => integral_id(*n).ok_or_else(|| format!("status page id {} is not a positive integer", n)),
        other => Err(format!("status page id is {}", other.type_name())),
    }
}

fn integral_id(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n >= 1.0 && n <= i64::MAX as f64).then_some(n as i64)
}

/// Monitor ids configured in a plan or state. None when the set is null or
/// unknown; malformed ids are an error, never skipped.
pub fn monitor_ids(value: &Dynamic) -> Result<Option<Vec<i64>>, String> {
    if !value.is_known() {
        return Ok(None);
    }
    let elements = value
        .as_elements()
        .ok_or_else(|| format!("monitor_ids is {}, expected a set", value.type_name()))?;

    let mut ids = Vec::with_capacity(elements.len());
    for element in elements {
        let id = element
            .as_number()
            .and_then(integral_id)
            .ok_or_else(|| format!("monitor id {:?} is not a positive integer", element))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(Some(ids))
}

fn text(value: &Dynamic) -> Field<String> {
    match value {
        Dynamic::String(s) if s.is_empty() => Field::Null,
        Dynamic::String(s) => Field::Value(s.clone()),
        _ => Field::Absent,
    }
}

fn flag(value: &Dynamic) -> Field<bool> {
    match value {
        Dynamic::Bool(b) => Field::Value(*b),
        _ => Field::Absent,
    }
}

fn block<T>(value: &Dynamic, build: impl FnOnce(&Dynamic) -> T) -> Field<T> {
    match value {
        Dynamic::Map(_) => Field::Value(build(value)),
        _ => Field::Absent,
    }
}

/// Builds the request body from the plan. Only configured fields are sent.
pub fn payload_from_plan(plan: &Dynamic) -> Result<PspPayload, String> {
    let monitor_ids = match monitor_ids(plan.attr("monitor_ids"))? {
        Some(ids) => Field::Value(ids),
        None => Field::Absent,
    };

    Ok(PspPayload {
        friendly_name: text(plan.attr("name")),
        status: text(plan.attr("status")),
        monitor_ids,
        custom_domain: text(plan.attr("custom_domain")),
        password: text(plan.attr("password")),
        sort: text(plan.attr("sort")),
        hide_url_links: flag(plan.attr("hide_url_links")),
        no_index: flag(plan.attr("no_index")),
        ga_code: text(plan.attr("ga_code")),
        share_analytics_consent: flag(plan.attr("share_analytics_consent")),
        use_small_cookie_consent_modal: flag(plan.attr("use_small_cookie_consent_modal")),
        icon: text(plan.attr("icon")),
        logo: text(plan.attr("logo")),
        homepage_link: text(plan.attr("homepage_link")),
        custom_settings: block(plan.attr("custom_settings"), custom_settings_payload),
    })
}

fn custom_settings_payload(settings: &Dynamic) -> CustomSettings {
    CustomSettings {
        font: block(settings.attr("font"), |font| Font {
            family: text(font.attr("family")),
        }),
        page: block(settings.attr("page"), |page| Page {
            layout: text(page.attr("layout")),
            theme: text(page.attr("theme")),
            density: text(page.attr("density")),
        }),
        colors: block(settings.attr("colors"), |colors| Colors {
            main: text(colors.attr("main")),
            text: text(colors.attr("text")),
            link: text(colors.attr("link")),
        }),
        features: block(settings.attr("features"), |features| Features {
            show_bars: flag(features.attr("show_bars")),
            show_outage_updates: flag(features.attr("show_outage_updates")),
            show_outage_details: flag(features.attr("show_outage_details")),
            enable_floating_status: flag(features.attr("enable_floating_status")),
            show_monitor_url: flag(features.attr("show_monitor_url")),
            hide_paused_monitors: flag(features.attr("hide_paused_monitors")),
            show_cookie_bar: flag(features.attr("show_cookie_bar")),
        }),
    }
}

fn opt_string(value: &Option<String>) -> Dynamic {
    value.clone().map(Dynamic::String).unwrap_or(Dynamic::Null)
}

fn opt_bool(value: Option<bool>) -> Dynamic {
    value.map(Dynamic::Bool).unwrap_or(Dynamic::Null)
}

fn field_string(value: &Field<String>) -> Dynamic {
    value.value().cloned().map(Dynamic::String).unwrap_or(Dynamic::Null)
}

fn field_bool(value: &Field<bool>) -> Dynamic {
    value.value().copied().map(Dynamic::Bool).unwrap_or(Dynamic::Null)
}

fn field_block<T>(value: &Field<T>, project: impl FnOnce(&T) -> Dynamic) -> Dynamic {
    value.value().map(project).unwrap_or(Dynamic::Null)
}

/// Projects an API response onto the current schema shape
pub fn project_psp(psp: &Psp) -> Dynamic {
    let monitor_ids = match &psp.monitor_ids {
        Some(ids) => Dynamic::set(ids.iter().map(|id| Dynamic::Number(*id as f64))),
        None => Dynamic::Null,
    };
    let custom_settings = match &psp.custom_settings {
        Some(settings) => project_custom_settings(settings),
        None => Dynamic::Null,
    };

    Dynamic::object([
        ("id", Dynamic::String(psp.id.to_string())),
        ("name", Dynamic::String(psp.friendly_name.clone())),
        ("url_key", opt_string(&psp.url_key)),
        ("status", opt_string(&psp.status)),
        ("monitor_ids", monitor_ids),
        ("custom_domain", opt_string(&psp.custom_domain)),
        // Write-only
        ("password", Dynamic::Null),
        ("sort", opt_string(&psp.sort)),
        ("hide_url_links", opt_bool(psp.hide_url_links)),
        ("no_index", opt_bool(psp.no_index)),
        ("ga_code", opt_string(&psp.ga_code)),
        ("share_analytics_consent", opt_bool(psp.share_analytics_consent)),
        (
            "use_small_cookie_consent_modal",
            opt_bool(psp.use_small_cookie_consent_modal),
        ),
        ("icon", opt_string(&psp.icon)),
        ("logo", opt_string(&psp.logo)),
        ("homepage_link", opt_string(&psp.homepage_link)),
        ("custom_settings", custom_settings),
    ])
}

fn project_custom_settings(settings: &CustomSettings) -> Dynamic {
    Dynamic::object([
        (
            "font",
            field_block(&settings.font, |font| {
                Dynamic::object([("family", field_string(&font.family))])
            }),
        ),
        (
            "page",
            field_block(&settings.page, |page| {
                Dynamic::object([
                    ("layout", field_string(&page.layout)),
                    ("theme", field_string(&page.theme)),
                    ("density", field_string(&page.density)),
                ])
            }),
        ),
        (
            "colors",
            field_block(&settings.colors, |colors| {
                Dynamic::object([
                    ("main", field_string(&colors.main)),
                    ("text", field_string(&colors.text)),
                    ("link", field_string(&colors.link)),
                ])
            }),
        ),
        (
            "features",
            field_block(&settings.features, |features| {
                Dynamic::object([
                    ("show_bars", field_bool(&features.show_bars)),
                    ("show_outage_updates", field_bool(&features.show_outage_updates)),
                    ("show_outage_details", field_bool(&features.show_outage_details)),
                    ("enable_floating_status", field_bool(&features.enable_floating_status)),
                    ("show_monitor_url", field_bool(&features.show_monitor_url)),
                    ("hide_paused_monitors", field_bool(&features.hide_paused_monitors)),
                    ("show_cookie_bar", field_bool(&features.show_cookie_bar)),
                ])
            }),
        ),
    ])
}

fn has_members(value: &Dynamic) -> bool {
    value.as_elements().is_some_and(|members| !members.is_empty())
}

fn as_set(value: &Dynamic) -> Dynamic {
    match value.as_elements() {
        Some(members) => Dynamic::set(members.iter().cloned()),
        None => value.clone(),
    }
}

/// Decides the persisted `monitor_ids`.
///
/// `planned` is the plan on create/update and the prior state on read.
/// A configured set is authoritative on apply and follows the server on
/// refresh. An unconfigured set shows whatever the server reports, and
/// otherwise keeps the prior value. Imports have no prior value, so they
/// end with a concrete empty set instead of null.
pub fn merge_monitor_ids(
    operation: Operation,
    planned: &Dynamic,
    prior: &Dynamic,
    server: &Dynamic,
) -> Dynamic {
    match operation {
        Operation::Create | Operation::Update if planned.is_known() => as_set(planned),
        Operation::Read if planned.is_known() => {
            if server.is_known() {
                as_set(server)
            } else {
                Dynamic::Set(vec![])
            }
        }
        Operation::ReadAfterImport if !has_members(server) => Dynamic::Set(vec![]),
        _ if has_members(server) => as_set(server),
        _ => prior.clone(),
    }
}

/// The settled-state check: the name matches (an empty expectation skips
/// it) and the applied monitors equal the expected set (None skips it).
pub fn converged(psp: &Psp, expected_name: &str, expected_ids: Option<&[i64]>) -> bool {
    if !expected_name.is_empty() && psp.friendly_name != expected_name {
        return false;
    }
    match expected_ids {
        None => true,
        Some(expected) => {
            let applied = psp.monitor_ids.as_deref().unwrap_or_default();
            let (missing, extra) = diff_monitor_ids(expected, applied);
            missing.is_empty() && extra.is_empty()
        }
    }
}
