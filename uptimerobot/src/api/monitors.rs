//! Monitor API implementation
//!
//! Only lookups are needed: status pages reference monitors by id.

use super::error::ApiError;
use crate::api::Client;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: i64,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

pub struct MonitorsApi<'a> {
    client: &'a Client,
}

impl<'a> MonitorsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: i64) -> Result<Monitor, ApiError> {
        self.client.get(&format!("/monitors/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn get_monitor_decodes_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/monitors/42")
            .with_body(r#"{"id":42,"friendlyName":"API","status":"UP"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let monitor = client.monitors().get(42).await.unwrap();

        assert_eq!(monitor.friendly_name.as_deref(), Some("API"));
    }

    #[tokio::test]
    async fn missing_monitor_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/monitors/43")
            .with_status(404)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();

        assert!(client.monitors().get(43).await.unwrap_err().is_not_found());
    }
}
