//! Bing custom search client
//!
//! Data-plane call made by the `custom-search` sample with a key obtained
//! from the cognitive services account it just created.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{CoreError, Result};

/// Public custom search endpoint
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/custom/search";

const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// A custom web search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub custom_config: String,
    pub query: String,
}

/// Web pages section of a search response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPages {
    #[serde(default)]
    pub web_search_url: Option<String>,
    #[serde(default)]
    pub total_estimated_matches: Option<u64>,
    #[serde(default)]
    pub value: Vec<WebPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPage {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Something that answers custom web searches
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, key: &str, query: &SearchQuery) -> Result<Option<WebPages>>;
}

/// HTTP implementation of [`WebSearch`]
#[derive(Debug, Clone)]
pub struct CustomSearchClient {
    client: Client,
    endpoint: String,
}

impl Default for CustomSearchClient {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_ENDPOINT)
    }
}

impl CustomSearchClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl WebSearch for CustomSearchClient {
    async fn search(&self, key: &str, query: &SearchQuery) -> Result<Option<WebPages>> {
        debug!(endpoint = %self.endpoint, q = %query.query, "custom search");
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| CoreError::Validation(format!("invalid search endpoint: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("q", &query.query)
            .append_pair("customconfig", &query.custom_config)
            .append_pair("safeSearch", "Strict")
            .append_pair("textFormat", "Raw");

        let response = self
            .client
            .get(url)
            .header(KEY_HEADER, key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Error bodies are best effort
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let (code, message) = search_error(&body);
            return Err(CoreError::api(
                status.as_u16(),
                code,
                message.unwrap_or_else(|| status.to_string()),
            ));
        }

        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text)?;
        match body.get("webPages") {
            Some(pages) => Ok(Some(serde_json::from_value(pages.clone())?)),
            None => Ok(None),
        }
    }
}

fn search_error(body: &Value) -> (Option<String>, Option<String>) {
    let error = body
        .get("error")
        .or_else(|| body.get("errors").and_then(|e| e.get(0)));
    let code = error
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);
    (code, message)
}
