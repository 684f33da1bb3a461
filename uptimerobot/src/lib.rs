//! Terraform provider for UptimeRobot public status pages

pub mod api;
pub mod provider_data;
pub mod resources;

pub use provider_data::UptimeRobotProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::provider::{ConfigureProviderRequest, ConfigureProviderResponse, Provider, ResourceFactory};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{has_errors, AttributePath, Diagnostic, Dynamic};
use tfplug::SettleConfig;

pub const API_KEY_ENV: &str = "UPTIMEROBOT_API_KEY";
pub const ENDPOINT_ENV: &str = "UPTIMEROBOT_ENDPOINT";

#[derive(Default)]
pub struct UptimeRobotProvider {
    provider_data: Option<UptimeRobotProviderData>,
}

impl UptimeRobotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.provider_data.is_some()
    }
}

/// Non-empty string from config, else from the environment
fn config_string(config: &Dynamic, name: &str, env: &str) -> Option<String> {
    config
        .attr(name)
        .as_str()
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var(env).ok().filter(|value| !value.is_empty()))
}

fn psp_factory() -> Box<dyn ResourceWithConfigure> {
    Box::new(resources::PspResource::new())
}

#[async_trait]
impl Provider for UptimeRobotProvider {
    fn type_name(&self) -> &str {
        "uptimerobot"
    }

    async fn schema(&self, _ctx: Context) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("UptimeRobot provider")
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .description(&format!("API key. Can also be set with {}", API_KEY_ENV))
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description(&format!(
                        "API base URL, defaults to {}. Can also be set with {}",
                        api::DEFAULT_ENDPOINT,
                        ENDPOINT_ENV
                    ))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("settle_timeout_seconds", AttributeType::Number)
                    .description("How long to wait for changes to become visible, default 30")
                    .optional()
                    .build(),
            )
            .build()
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let config = &request.config.value;
        let mut diagnostics = vec![];

        let settle = match config.attr("settle_timeout_seconds").as_number() {
            None => SettleConfig::default(),
            Some(seconds) if seconds.is_finite() && seconds > 0.0 => {
                SettleConfig::default().with_timeout(Duration::from_secs_f64(seconds))
            }
            Some(seconds) => {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid settle_timeout_seconds",
                        format!("Expected a positive number of seconds, got {}", seconds),
                    )
                    .with_attribute(AttributePath::new("settle_timeout_seconds")),
                );
                SettleConfig::default()
            }
        };

        let endpoint = config_string(config, "endpoint", ENDPOINT_ENV)
            .unwrap_or_else(|| api::DEFAULT_ENDPOINT.to_string());
        let api_key = config_string(config, "api_key", API_KEY_ENV);
        if api_key.is_none() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing API key",
                    format!(
                        "api_key is required (set in provider config or {} env var)",
                        API_KEY_ENV
                    ),
                )
                .with_attribute(AttributePath::new("api_key")),
            );
        }

        let api_key = match api_key {
            Some(api_key) if !has_errors(&diagnostics) => api_key,
            _ => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        match api::Client::new(&endpoint, &api_key) {
            Ok(client) => {
                tracing::info!(endpoint = %endpoint, "provider configured");
                let data = UptimeRobotProviderData::new(client, settle);
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(e) => {
                diagnostics.push(
                    Diagnostic::error("Failed to create API client", e.to_string())
                        .with_attribute(AttributePath::new("endpoint")),
                );
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        HashMap::from([(
            resources::psp::TYPE_NAME.to_string(),
            psp_factory as ResourceFactory,
        )])
    }
}
