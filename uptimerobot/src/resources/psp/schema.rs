//! Status page schema
//!
//! Version 1 stores `monitor_ids` as a set, `custom_settings` as single
//! nested blocks and feature flags as native booleans. The version 0 shape
//! is described by the decoder in `upgrade`.

use std::collections::HashMap;
use tfplug::schema::{
    Attribute, AttributeBuilder, AttributeType, Block, BlockBuilder, NestedBlock, Schema,
    SchemaBuilder,
};

pub const SCHEMA_VERSION: i64 = 1;

pub const FEATURE_KEYS: [&str; 7] = [
    "show_bars",
    "show_outage_updates",
    "show_outage_details",
    "enable_floating_status",
    "show_monitor_url",
    "hide_paused_monitors",
    "show_cookie_bar",
];

pub const SORT_VALUES: [&str; 4] = ["a-z", "z-a", "status-up-down", "status-down-up"];
pub const LAYOUT_VALUES: [&str; 2] = ["logo_on_left", "logo_on_center"];
pub const STATUS_VALUES: [&str; 2] = ["ENABLED", "PAUSED"];

fn optional(name: &str, kind: AttributeType, description: &str) -> Attribute {
    AttributeBuilder::new(name, kind)
        .description(description)
        .optional()
        .build()
}

/// Top-level scalar attributes
fn scalar_attributes() -> Vec<Attribute> {
    vec![
        AttributeBuilder::new("id", AttributeType::String)
            .description("Status page identifier")
            .computed()
            .build(),
        AttributeBuilder::new("name", AttributeType::String)
            .description("Friendly name of the status page")
            .required()
            .build(),
        AttributeBuilder::new("url_key", AttributeType::String)
            .description("Key of the public status page URL")
            .computed()
            .build(),
        AttributeBuilder::new("status", AttributeType::String)
            .description("ENABLED or PAUSED")
            .optional()
            .computed()
            .build(),
        optional("custom_domain", AttributeType::String, "Custom domain; empty string clears it"),
        AttributeBuilder::new("password", AttributeType::String)
            .description("Password protecting the page. Never returned by the API")
            .optional()
            .sensitive()
            .write_only()
            .build(),
        optional("sort", AttributeType::String, "Monitor sort order"),
        optional("hide_url_links", AttributeType::Bool, "Hide links to monitored URLs"),
        optional("no_index", AttributeType::Bool, "Ask search engines not to index the page"),
        optional("ga_code", AttributeType::String, "Google Analytics code"),
        optional("share_analytics_consent", AttributeType::Bool, "Share analytics consent"),
        optional(
            "use_small_cookie_consent_modal",
            AttributeType::Bool,
            "Use the small cookie consent modal",
        ),
        optional("icon", AttributeType::String, "Icon file name"),
        optional("logo", AttributeType::String, "Logo file name"),
    ]
}

fn font_block() -> Block {
    BlockBuilder::new()
        .attribute(optional("family", AttributeType::String, "Font family"))
        .build()
}

fn page_block() -> Block {
    BlockBuilder::new()
        .attribute(optional("layout", AttributeType::String, "Page layout"))
        .attribute(optional("theme", AttributeType::String, "Page theme"))
        .attribute(optional("density", AttributeType::String, "Page density"))
        .build()
}

fn colors_block() -> Block {
    BlockBuilder::new()
        .attribute(optional("main", AttributeType::String, "Main colour, #rrggbb"))
        .attribute(optional("text", AttributeType::String, "Text colour, #rrggbb"))
        .attribute(optional("link", AttributeType::String, "Link colour, #rrggbb"))
        .build()
}

fn features_block() -> Block {
    FEATURE_KEYS
        .iter()
        .fold(BlockBuilder::new(), |builder, key| {
            builder.attribute(optional(key, AttributeType::Bool, "Feature toggle"))
        })
        .build()
}

/// Current schema
pub fn psp_schema() -> Schema {
    let custom_settings = BlockBuilder::new()
        .description("Appearance settings; each sub-block is managed only when configured")
        .block(NestedBlock::single("font", font_block()))
        .block(NestedBlock::single("page", page_block()))
        .block(NestedBlock::single("colors", colors_block()))
        .block(NestedBlock::single("features", features_block()))
        .build();

    scalar_attributes()
        .into_iter()
        .fold(SchemaBuilder::new(), |builder, attribute| {
            builder.attribute(attribute)
        })
        .version(SCHEMA_VERSION)
        .description("Manages an UptimeRobot public status page")
        .attribute(optional(
            "monitor_ids",
            AttributeType::set(AttributeType::Number),
            "Monitors shown on the page",
        ))
        .attribute(optional(
            "homepage_link",
            AttributeType::String,
            "Link back to the owner's homepage",
        ))
        .block(NestedBlock::single("custom_settings", custom_settings))
        .build()
}

/// Attribute types of a block's attributes, for sparse-object normalization
pub fn attribute_types(block: &Block) -> HashMap<String, AttributeType> {
    block
        .attributes
        .iter()
        .map(|a| (a.name.clone(), a.r#type.clone()))
        .collect()
}
