use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::common::{ApiErrorResponse, ApiResponse};
use super::error::ApiError;

pub const DEFAULT_ENDPOINT: &str = "https://api.uptimerobot.com/v3";

/// UptimeRobot API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
    retry_config: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

/// Which failures a request may be retried after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryPolicy {
    /// Replaying the request cannot duplicate its effect
    Idempotent,
    /// Only retried when the server provably did not act on it (429, or no
    /// connection)
    NotIdempotent,
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, ApiError> {
        Self::with_config(endpoint, api_key, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        endpoint: &str,
        api_key: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(endpoint)
            .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidEndpoint(format!(
                "{}: scheme must be http or https",
                endpoint
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .build()?;

        let base_url = endpoint.trim_end_matches('/').to_string();
        let auth_header = format!("Bearer {}", api_key);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                auth_header,
                retry_config,
            }),
        })
    }

    /// Public status page operations
    pub fn psps(&self) -> crate::api::psp::PspApi<'_> {
        crate::api::psp::PspApi::new(self)
    }

    /// Monitor operations
    pub fn monitors(&self) -> crate::api::monitors::MonitorsApi<'_> {
        crate::api::monitors::MonitorsApi::new(self)
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("GET request to: {}", url);

                self.inner
                    .http_client
                    .get(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .send()
                    .await
            },
            path,
            RetryPolicy::Idempotent,
        )
        .await
    }

    /// Execute a POST request. Creates are not idempotent, so a 5xx or a
    /// timeout is returned instead of replayed
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("POST request to: {}", url);

                self.inner
                    .http_client
                    .post(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .json(body)
                    .send()
                    .await
            },
            path,
            RetryPolicy::NotIdempotent,
        )
        .await
    }

    /// Execute a PATCH request with retry logic
    pub async fn patch<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("PATCH request to: {}", url);

                self.inner
                    .http_client
                    .patch(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .json(body)
                    .send()
                    .await
            },
            path,
            RetryPolicy::Idempotent,
        )
        .await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("DELETE request to: {}", url);

                self.inner
                    .http_client
                    .delete(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .send()
                    .await
            },
            path,
            RetryPolicy::Idempotent,
        )
        .await
    }

    /// Execute request with retry logic
    async fn execute_with_retry<F, Fut, T>(
        &self,
        request_fn: F,
        path: &str,
        policy: RetryPolicy,
    ) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
        T: for<'de> Deserialize<'de>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return self.parse_success_response(response).await;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(ApiError::AuthError);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        if policy == RetryPolicy::NotIdempotent {
                            tracing::warn!(
                                path,
                                status = status.as_u16(),
                                "not retrying non-idempotent request"
                            );
                            return Err(ApiError::ServiceUnavailable);
                        }
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return self.handle_error_response(response, path).await;
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        let timeout = ApiError::Timeout(self.inner.retry_config.timeout_seconds);
                        if policy == RetryPolicy::NotIdempotent {
                            return Err(timeout);
                        }
                        last_error = Some(timeout);
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response; the body may or may not carry a data wrapper
    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        // 204 and friends: let unit-like targets decode from null
        let text = if text.trim().is_empty() {
            "null".to_string()
        } else {
            text
        };

        match serde_json::from_str::<ApiResponse<T>>(&text) {
            Ok(wrapper) => Ok(wrapper.data),
            Err(_) => match serde_json::from_str::<T>(&text) {
                Ok(data) => Ok(data),
                Err(e) => {
                    tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
                    Err(ApiError::ParseError(format!(
                        "Failed to parse response: {}",
                        e
                    )))
                }
            },
        }
    }

    /// Handle error response
    async fn handle_error_response<T>(
        &self,
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let body = serde_json::from_str::<ApiErrorResponse>(&text).unwrap_or_default();

        match status {
            reqwest::StatusCode::NOT_FOUND => Err(ApiError::NotFound {
                path: path.to_string(),
            }),
            reqwest::StatusCode::FORBIDDEN => Err(ApiError::Forbidden {
                message: body.message().map(str::to_string).unwrap_or(text),
                code: body.code,
            }),
            _ => Err(ApiError::ApiError {
                status: status.as_u16(),
                message: body.message().map(str::to_string).unwrap_or(text),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::Value;

    fn fast_retries() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn client_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/psps/1")
            .match_header("authorization", "Bearer secret-key")
            .with_body(r#"{"id":1}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret-key").unwrap();
        let body: Value = client.get("/psps/1").await.unwrap();

        assert_eq!(body["id"], 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_unwraps_data_envelope() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/monitors/7")
            .with_body(r#"{"data":{"id":7}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let body: Value = client.get("/monitors/7").await.unwrap();

        assert_eq!(body["id"], 7);
    }

    #[tokio::test]
    async fn client_classifies_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/psps/404")
            .with_status(404)
            .with_body(r#"{"message":"PSP not found"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let result: Result<Value, _> = client.get("/psps/404").await;

        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn client_classifies_forbidden_with_code() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/monitors/9")
            .with_status(403)
            .with_body(r#"{"code":"FORBIDDEN_MONITOR","message":"not your monitor"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let result: Result<Value, _> = client.get("/monitors/9").await;

        match result {
            Err(ApiError::Forbidden { code, message }) => {
                assert_eq!(code.as_deref(), Some("FORBIDDEN_MONITOR"));
                assert_eq!(message, "not your monitor");
            }
            other => panic!("Expected Forbidden error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn client_handles_authentication_failure() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/psps/1")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "bad", fast_retries()).unwrap();
        let result: Result<Value, _> = client.get("/psps/1").await;

        assert!(matches!(result, Err(ApiError::AuthError)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_retries_server_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/psps/1")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "key", fast_retries()).unwrap();
        let result: Result<Value, _> = client.get("/psps/1").await;

        assert!(matches!(result, Err(ApiError::ServiceUnavailable)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_does_not_replay_failed_create() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/psps")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "key", fast_retries()).unwrap();
        let result: Result<Value, _> = client.post("/psps", &serde_json::json!({})).await;

        assert!(matches!(result, Err(ApiError::ServiceUnavailable)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_retries_rate_limited_create() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/psps")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "key", fast_retries()).unwrap();
        let result: Result<Value, _> = client.post("/psps", &serde_json::json!({})).await;

        assert!(matches!(result, Err(ApiError::RateLimited)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_accepts_empty_delete_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/psps/1")
            .with_status(204)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let result: Result<(), _> = client.delete("/psps/1").await;

        tokio_test::assert_ok!(result);
    }

    #[tokio::test]
    async fn client_strips_trailing_slash_from_endpoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/psps/1")
            .with_body("{}")
            .create_async()
            .await;

        let client = Client::new(&format!("{}/", server.url()), "key").unwrap();
        let _: Value = client.get("/psps/1").await.unwrap();

        mock.assert_async().await;
    }

    #[test]
    fn client_rejects_invalid_endpoints() {
        assert!(matches!(
            Client::new("not a url", "key"),
            Err(ApiError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            Client::new("ftp://api.uptimerobot.com", "key"),
            Err(ApiError::InvalidEndpoint(_))
        ));
    }
}
