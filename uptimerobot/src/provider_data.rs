//! Provider data handed to every resource at configure time

use crate::api::{Client, PspBackend};
use std::sync::Arc;
use tfplug::SettleConfig;

#[derive(Clone)]
pub struct UptimeRobotProviderData {
    pub backend: Arc<dyn PspBackend>,
    /// How long create, update and delete wait for the API to converge
    pub settle: SettleConfig,
}

impl UptimeRobotProviderData {
    pub fn new(client: Client, settle: SettleConfig) -> Self {
        Self {
            backend: Arc::new(client),
            settle,
        }
    }

    pub fn with_backend(backend: Arc<dyn PspBackend>, settle: SettleConfig) -> Self {
        Self { backend, settle }
    }
}
