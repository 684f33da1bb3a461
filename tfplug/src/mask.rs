//! Ownership masking of server state against the plan
//!
//! The state written back after an operation combines three inputs: the
//! prior state, the planned (desired) state and a projection of what the
//! server returned. One recursive walk over the schema block decides, field
//! by field, which input owns the value:
//!
//! - a field the plan leaves null is null in the result, whatever the
//!   server reports
//! - a nested block absent from the plan is dropped entirely
//! - a field the plan sets is taken from the plan (`PlanWins`) or from the
//!   server (`ServerWins`, used on refresh so drift shows up). On refresh a
//!   server null is drift too, except for write-only attributes, which keep
//!   the prior value, and the empty-string null sentinel, which stays as
//!   configured
//! - a field the plan leaves unknown, or that is computed-only, is taken
//!   from the server
//!
//! Anything still unknown at the end becomes null.

use crate::convert::finalize_unknowns;
use crate::schema::{Attribute, AttributeType, Block, NestedBlock, NestingMode};
use crate::types::Dynamic;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// Create/update: configured values are written back verbatim
    PlanWins,
    /// Refresh: configured values follow the server, null included.
    /// Write-only attributes keep the prior value
    ServerWins,
}

/// The three sources of a masking pass
#[derive(Debug, Clone, Copy)]
pub struct MaskSources<'a> {
    pub prior: &'a Dynamic,
    pub planned: &'a Dynamic,
    pub server: &'a Dynamic,
}

impl<'a> MaskSources<'a> {
    fn field(&self, name: &str) -> MaskSources<'a> {
        MaskSources {
            prior: self.prior.attr(name),
            planned: self.planned.attr(name),
            server: self.server.attr(name),
        }
    }

    fn element(&self, index: usize) -> MaskSources<'a> {
        MaskSources {
            prior: element_at(self.prior, index),
            planned: element_at(self.planned, index),
            server: element_at(self.server, index),
        }
    }
}

fn element_at(value: &Dynamic, index: usize) -> &Dynamic {
    static NULL: Dynamic = Dynamic::Null;
    value
        .as_elements()
        .and_then(|elements| elements.get(index))
        .unwrap_or(&NULL)
}

/// Masks a whole resource object. The result has exactly the fields of
/// `block` and contains no unknown values.
pub fn mask_state(block: &Block, mode: MaskMode, sources: MaskSources<'_>) -> Dynamic {
    let mut masked = mask_block(block, mode, sources);
    finalize_unknowns(&mut masked);
    masked
}

fn mask_block(block: &Block, mode: MaskMode, sources: MaskSources<'_>) -> Dynamic {
    let mut object = HashMap::with_capacity(block.attributes.len() + block.block_types.len());

    for attribute in &block.attributes {
        let value = mask_attribute(attribute, mode, sources.field(&attribute.name));
        object.insert(attribute.name.clone(), value);
    }
    for nested in &block.block_types {
        let value = mask_nested(nested, mode, sources.field(&nested.type_name));
        object.insert(nested.type_name.clone(), value);
    }

    Dynamic::Map(object)
}

fn mask_attribute(attribute: &Attribute, mode: MaskMode, sources: MaskSources<'_>) -> Dynamic {
    if attribute.is_computed_only() {
        return server_or_prior(sources);
    }
    if attribute.write_only
        && mode == MaskMode::ServerWins
        && !matches!(sources.planned, Dynamic::Null | Dynamic::Unknown)
    {
        return sources.prior.clone();
    }
    mask_value(&attribute.r#type, mode, sources)
}

fn mask_value(kind: &AttributeType, mode: MaskMode, sources: MaskSources<'_>) -> Dynamic {
    match sources.planned {
        Dynamic::Null => Dynamic::Null,
        Dynamic::Unknown => sources.server.clone(),
        _ if cleared_on_server(mode, sources) => Dynamic::Null,
        Dynamic::Map(_) => match kind {
            AttributeType::Object(fields) => mask_object(fields, mode, sources),
            _ => owned_value(mode, sources),
        },
        _ => owned_value(mode, sources),
    }
}

fn mask_object(
    fields: &HashMap<String, AttributeType>,
    mode: MaskMode,
    sources: MaskSources<'_>,
) -> Dynamic {
    Dynamic::Map(
        fields
            .iter()
            .map(|(name, kind)| (name.clone(), mask_value(kind, mode, sources.field(name))))
            .collect(),
    )
}

/// Value of a field the plan configured
fn owned_value(mode: MaskMode, sources: MaskSources<'_>) -> Dynamic {
    match mode {
        MaskMode::PlanWins => sources.planned.clone(),
        MaskMode::ServerWins => match sources.server {
            Dynamic::Unknown => sources.planned.clone(),
            // "" is how configuration spells an explicit null
            Dynamic::Null if sources.planned.as_str() == Some("") => sources.planned.clone(),
            server => server.clone(),
        },
    }
}

/// Refresh found nothing on the server for a configured value
fn cleared_on_server(mode: MaskMode, sources: MaskSources<'_>) -> bool {
    mode == MaskMode::ServerWins
        && sources.server.is_null()
        && sources.planned.as_str() != Some("")
}

fn server_or_prior(sources: MaskSources<'_>) -> Dynamic {
    match sources.server {
        Dynamic::Null | Dynamic::Unknown => sources.prior.clone(),
        server => server.clone(),
    }
}

fn len(value: &Dynamic) -> usize {
    value.as_elements().map_or(0, <[Dynamic]>::len)
}

fn mask_nested(nested: &NestedBlock, mode: MaskMode, sources: MaskSources<'_>) -> Dynamic {
    match sources.planned {
        Dynamic::Null => return Dynamic::Null,
        Dynamic::Unknown => return sources.server.clone(),
        _ if cleared_on_server(mode, sources) => return Dynamic::Null,
        _ => {}
    }

    match nested.nesting {
        NestingMode::List | NestingMode::Set => {
            // On refresh elements the server dropped are gone
            let count = match mode {
                MaskMode::PlanWins => len(sources.planned),
                MaskMode::ServerWins => len(sources.planned).min(len(sources.server)),
            };
            let elements: Vec<Dynamic> = (0..count)
                .map(|index| mask_block(&nested.block, mode, sources.element(index)))
                .collect();
            if nested.nesting == NestingMode::Set {
                Dynamic::set(elements)
            } else {
                Dynamic::List(elements)
            }
        }
        _ => mask_block(&nested.block, mode, sources),
    }
}
