pub mod client;
pub mod common;
pub mod error;
pub mod monitors;
pub mod psp;
#[cfg(test)]
pub mod test_helpers;

pub use client::{Client, RetryConfig, DEFAULT_ENDPOINT};
pub use common::Field;
pub use error::ApiError;
pub use monitors::Monitor;
pub use psp::{Colors, CustomSettings, Features, Font, Page, Psp, PspPayload};

use async_trait::async_trait;

/// The remote operations the status page resource depends on.
///
/// [`Client`] is the production implementation; tests substitute scripted
/// backends to simulate replication lag and partial application.
#[async_trait]
pub trait PspBackend: Send + Sync {
    async fn get_psp(&self, id: i64) -> Result<Psp, ApiError>;
    async fn create_psp(&self, payload: &PspPayload) -> Result<Psp, ApiError>;
    async fn update_psp(&self, id: i64, payload: &PspPayload) -> Result<Psp, ApiError>;
    async fn delete_psp(&self, id: i64) -> Result<(), ApiError>;
    async fn get_monitor(&self, id: i64) -> Result<Monitor, ApiError>;
}

#[async_trait]
impl PspBackend for Client {
    async fn get_psp(&self, id: i64) -> Result<Psp, ApiError> {
        self.psps().get(id).await
    }

    async fn create_psp(&self, payload: &PspPayload) -> Result<Psp, ApiError> {
        self.psps().create(payload).await
    }

    async fn update_psp(&self, id: i64, payload: &PspPayload) -> Result<Psp, ApiError> {
        self.psps().update(id, payload).await
    }

    async fn delete_psp(&self, id: i64) -> Result<(), ApiError> {
        self.psps().delete(id).await
    }

    async fn get_monitor(&self, id: i64) -> Result<Monitor, ApiError> {
        self.monitors().get(id).await
    }
}
