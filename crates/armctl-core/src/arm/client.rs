//! Authenticated HTTP access to the management endpoint

use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::auth::TokenCredential;
use crate::error::{CoreError, Result};

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// A response with its body already read
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `Value::Null` for empty or non-JSON bodies
    pub body: Value,
}

impl ArmResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Turn an unsuccessful response into an API error
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(api_error(self.status, &self.body))
        }
    }
}

/// Build an API error from an ARM error body (`{"error": {"code", "message"}}`)
pub fn api_error(status: StatusCode, body: &Value) -> CoreError {
    let error = body.get("error").unwrap_or(body);
    let code = error
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    CoreError::api(status.as_u16(), code, message)
}

/// Bearer-authenticated client for one management endpoint
#[derive(Clone)]
pub struct ArmClient {
    http: Client,
    endpoint: String,
    scope: String,
    credential: Arc<dyn TokenCredential>,
}

impl ArmClient {
    pub fn new(endpoint: &str, credential: Arc<dyn TokenCredential>) -> Result<Self> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        url::Url::parse(&endpoint).map_err(|e| {
            CoreError::Validation(format!("invalid management endpoint '{}': {}", endpoint, e))
        })?;
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("armctl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            scope: format!("{}/.default", endpoint),
            http,
            endpoint,
            credential,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Absolute URL for a resource path with its api-version
    pub fn url(&self, path: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.endpoint, path, api_version)
    }

    /// Send a request to an absolute URL
    pub async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<ArmResponse> {
        let token = self.credential.get_token(&self.scope).await?;
        trace!(%method, url, "request");

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, format!("Bearer {}", token.token));
        if let Some(body) = body {
            request = request.json(body);
        } else if method == Method::POST {
            request = request.header(reqwest::header::CONTENT_LENGTH, 0);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        trace!(%method, url, %status, "response");

        Ok(ArmResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_arm_error_body() {
        let body = json!({"error": {"code": "Conflict", "message": "busy"}});
        let err = api_error(StatusCode::CONFLICT, &body);
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "API error (409 Conflict): busy");
    }

    #[test]
    fn falls_back_to_reason_phrase() {
        let err = api_error(StatusCode::NOT_FOUND, &Value::Null);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Not Found"));
    }
}
