//! HTTP Client
//!
//! `HttpCapability` over a shared `reqwest::Client`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use automation_hub_core::{CoreError, CoreResult, HttpCapability, HttpRequest, HttpResponse};

/// Generic HTTP caller used by `api_call` steps.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Client with a per-request timeout.
    pub fn new(timeout: Duration) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::http(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpCapability for HttpClient {
    async fn call(&self, request: HttpRequest) -> CoreResult<HttpResponse> {
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| CoreError::validation(format!("Invalid HTTP method: {}", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CoreError::http(format!("{} {} failed: {e}", request.method, request.url)))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| CoreError::http(format!("Failed to read response body: {e}")))?;

        debug!(url = %request.url, status, "HTTP call finished");
        Ok(HttpResponse {
            status,
            body: parse_body(text),
        })
    }
}

/// JSON when the body parses, otherwise the raw text as a JSON string.
fn parse_body(text: String) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
