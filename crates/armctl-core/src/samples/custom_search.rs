use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::SampleSettings;
use crate::error::{CoreError, Result};
use crate::search::{CustomSearchClient, SearchQuery, WebSearch};
use crate::sequencer::{Steps, Workflow};

const NAMESPACE: &str = "Microsoft.CognitiveServices";
const API_VERSION: &str = "2017-04-18";

pub(super) const SETTINGS: &[(&str, &str)] = &[
    ("account", "sample-custom-search"),
    ("sku", "S1"),
    ("query", "Xbox"),
    ("custom_config", ""),
    ("search_endpoint", crate::search::DEFAULT_SEARCH_ENDPOINT),
];

/// Custom search account, its first key, and one query against it
///
/// The query needs a custom configuration id from the search portal; without
/// one the account is still created and the query step is skipped.
#[derive(Clone)]
pub struct CustomSearch {
    account: String,
    sku: String,
    query: String,
    custom_config: Option<String>,
    search: Arc<dyn WebSearch>,
}

impl std::fmt::Debug for CustomSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomSearch")
            .field("account", &self.account)
            .field("sku", &self.sku)
            .field("query", &self.query)
            .field("custom_config", &self.custom_config)
            .finish_non_exhaustive()
    }
}

impl CustomSearch {
    pub fn from_settings(settings: &SampleSettings) -> Result<Self> {
        let search = match settings.search() {
            Some(search) => search,
            None => {
                let endpoint = settings.value(SETTINGS, "search_endpoint");
                url::Url::parse(&endpoint).map_err(|e| {
                    CoreError::Validation(format!("invalid search endpoint '{}': {}", endpoint, e))
                })?;
                Arc::new(CustomSearchClient::new(endpoint))
            }
        };
        Ok(Self {
            account: settings.value(SETTINGS, "account"),
            sku: settings.value(SETTINGS, "sku"),
            query: settings.value(SETTINGS, "query"),
            custom_config: settings.get_opt("custom_config").map(str::to_string),
            search,
        })
    }
}

#[async_trait]
impl Workflow for CustomSearch {
    fn name(&self) -> &str {
        "custom-search"
    }

    async fn provision(&self, steps: &mut Steps<'_>) -> Result<()> {
        let account = steps.resource(NAMESPACE, "accounts", &self.account, API_VERSION);
        let body = json!({
            "location": "global",
            "kind": "Bing.CustomSearch",
            "sku": {"name": self.sku},
            "properties": {},
        });
        steps.create("cognitive services account", &account, &body).await?;

        let keys = steps.action("list keys", &account, "listKeys", None).await?;
        let key = keys
            .as_ref()
            .and_then(|k| k.get("key1"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CoreError::Validation(format!("account '{}' returned no key1", self.account))
            })?
            .to_string();

        let Some(custom_config) = &self.custom_config else {
            steps.record("custom search skipped: no custom config id", None, None);
            return Ok(());
        };
        let query = SearchQuery {
            custom_config: custom_config.clone(),
            query: self.query.clone(),
        };
        let pages = self.search.search(&key, &query).await?;
        let detail = match pages {
            Some(pages) => serde_json::to_value(pages)?,
            None => Value::Null,
        };
        steps.record("web pages", None, Some(detail));
        Ok(())
    }
}
