use async_trait::async_trait;
use serde_json::json;

use super::SampleSettings;
use crate::error::Result;
use crate::sequencer::{Steps, TeardownPolicy, Workflow};

const NAMESPACE: &str = "Microsoft.Web";
const API_VERSION: &str = "2021-03-01";

pub(super) const SETTINGS: &[(&str, &str)] = &[
    ("plan", "sample-web-plan"),
    ("site", "sample-web-app"),
    ("static_site", "sample-static-site"),
    ("repository_url", "https://github.com/colawwj/azure-rest-api-specs"),
    ("branch", "master"),
    ("repository_token", ""),
];

/// App service plan, a web app on it, and optionally a static site
///
/// The static site is only created when a repository token is supplied.
#[derive(Debug, Clone)]
pub struct WebApp {
    plan: String,
    site: String,
    static_site: String,
    repository_url: String,
    branch: String,
    repository_token: Option<String>,
}

impl WebApp {
    pub fn from_settings(settings: &SampleSettings) -> Self {
        Self {
            plan: settings.value(SETTINGS, "plan"),
            site: settings.value(SETTINGS, "site"),
            static_site: settings.value(SETTINGS, "static_site"),
            repository_url: settings.value(SETTINGS, "repository_url"),
            branch: settings.value(SETTINGS, "branch"),
            repository_token: settings.get_opt("repository_token").map(str::to_string),
        }
    }
}

#[async_trait]
impl Workflow for WebApp {
    fn name(&self) -> &str {
        "web-app"
    }

    fn teardown_policy(&self) -> TeardownPolicy {
        TeardownPolicy::Disabled
    }

    async fn provision(&self, steps: &mut Steps<'_>) -> Result<()> {
        let plan = steps.resource(NAMESPACE, "serverfarms", &self.plan, API_VERSION);
        let body = json!({
            "location": steps.location(),
            "kind": "app",
            "sku": {"name": "S1", "capacity": 1, "tier": "Standard"},
        });
        let plan = steps.create("app service plan", &plan, &body).await?;

        let site = steps.resource(NAMESPACE, "sites", &self.site, API_VERSION);
        let body = json!({
            "location": steps.location(),
            "properties": {"serverFarmId": plan.id},
        });
        steps.create("web app", &site, &body).await?;

        let config = site.child("config", "web");
        steps.get("app configuration", &config).await?;

        match &self.repository_token {
            Some(token) => {
                let static_site =
                    steps.resource(NAMESPACE, "staticSites", &self.static_site, API_VERSION);
                let body = json!({
                    "location": steps.location(),
                    "sku": {"name": "Free"},
                    "properties": {
                        "repositoryUrl": self.repository_url,
                        "branch": self.branch,
                        "repositoryToken": token,
                        "buildProperties": {"appLocation": "app", "apiLocation": "api"},
                    }
                });
                steps.create("static site", &static_site, &body).await?;
            }
            None => steps.record("static site skipped: no repository token", None, None),
        }
        Ok(())
    }
}
