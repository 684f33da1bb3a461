//! tfplug - Terraform Plugin Framework for Rust
//!
//! The value model, resource and provider traits, and the reconciliation
//! building blocks providers share: shape converters, the settled-state
//! poller, ownership masking and versioned state upgrades.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod provider;
pub mod resource;

// Reconciliation helpers
pub mod convert;
pub mod import;
pub mod mask;
pub mod settle;
pub mod upgrade;
pub mod validator;

pub mod logging;

// Re-exports for convenience
pub use context::Context;
pub use error::{Result, TfplugError};
pub use import::{import_state_passthrough_id, take_import_marker};
pub use logging::{init_logging, try_init_logging, LogLevel};
pub use mask::{mask_state, MaskMode, MaskSources};
pub use provider::{Provider, ResourceFactory};
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState, ResourceWithUpgradeState};
pub use schema::{AttributeBuilder, AttributeType, BlockBuilder, NestedBlock, Schema, SchemaBuilder};
pub use settle::{wait_until_settled, SettleConfig, Settled, Unsettled};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue, PrivateStateData, RawState};
pub use upgrade::StateUpgrader;
