//! Provider trait and related types
//!
//! A provider is configured once per Terraform run. Whatever it builds at
//! configure time (API clients, policies) is handed to each resource as
//! `provider_data` through [`ResourceWithConfigure`].

use crate::context::Context;
use crate::resource::{ConfigureResourceRequest, ResourceWithConfigure};
use crate::schema::Schema;
use crate::types::{has_errors, Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory for a resource type. Resources are created unconfigured and
/// receive provider data immediately afterwards.
pub type ResourceFactory = fn() -> Box<dyn ResourceWithConfigure>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Type name prefix, e.g. "uptimerobot"
    fn type_name(&self) -> &str;

    async fn schema(&self, ctx: Context) -> Schema;

    /// Build the clients resources will use. Return them in
    /// `provider_data`; it is shared by every resource instance.
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Resource factories keyed by full type name
    fn resources(&self) -> HashMap<String, ResourceFactory>;
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

/// Creates a resource by type name and hands it the provider data.
/// Errors come back as diagnostics, as the framework reports them.
pub async fn instantiate_resource(
    ctx: Context,
    provider: &dyn Provider,
    type_name: &str,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
    let factory = provider.resources().get(type_name).copied().ok_or_else(|| {
        vec![Diagnostic::error(
            "Unknown resource type",
            format!("The provider does not implement {}", type_name),
        )]
    })?;

    let mut resource = factory();
    let response = resource
        .configure(ctx, ConfigureResourceRequest { provider_data })
        .await;
    if has_errors(&response.diagnostics) {
        return Err(response.diagnostics);
    }
    Ok(resource)
}
