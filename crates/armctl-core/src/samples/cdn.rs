use async_trait::async_trait;
use serde_json::{Value, json};

use super::SampleSettings;
use crate::error::Result;
use crate::resource::ResourceRef;
use crate::sequencer::{Steps, Workflow};

const NAMESPACE: &str = "Microsoft.Cdn";
const API_VERSION: &str = "2021-06-01";

pub(super) const PROFILE_SETTINGS: &[(&str, &str)] = &[
    ("profile", "sample2cdn2profile"),
    ("sku", "Premium_Verizon"),
];

pub(super) const ENDPOINT_SETTINGS: &[(&str, &str)] = &[
    ("profile", "sample2cdn2profile"),
    ("sku", "Premium_Verizon"),
    ("endpoint", "sample-endpoint"),
    ("origin_host", "sample2.azureedge.net"),
    ("purge_path", "/sample"),
];

fn profile_body(sku: &str) -> Value {
    // CDN profiles are not regional
    json!({
        "location": "Global",
        "sku": {"name": sku},
    })
}

async fn create_profile(steps: &mut Steps<'_>, name: &str, sku: &str) -> Result<ResourceRef> {
    let profile = steps.resource(NAMESPACE, "profiles", name, API_VERSION);
    steps.create("cdn profile", &profile, &profile_body(sku)).await?;
    Ok(profile)
}

/// CDN profile plus a single-sign-on URI for its management portal
#[derive(Debug, Clone)]
pub struct CdnProfile {
    profile: String,
    sku: String,
}

impl CdnProfile {
    pub fn from_settings(settings: &SampleSettings) -> Self {
        Self {
            profile: settings.value(PROFILE_SETTINGS, "profile"),
            sku: settings.value(PROFILE_SETTINGS, "sku"),
        }
    }
}

#[async_trait]
impl Workflow for CdnProfile {
    fn name(&self) -> &str {
        "cdn-profile"
    }

    async fn provision(&self, steps: &mut Steps<'_>) -> Result<()> {
        let profile = create_profile(steps, &self.profile, &self.sku).await?;
        let sso = steps
            .action("generate sso uri", &profile, "generateSsoUri", None)
            .await?;
        if let Some(uri) = sso
            .as_ref()
            .and_then(|v| v.get("ssoUriValue"))
            .and_then(Value::as_str)
        {
            steps.record("sso uri", Some(uri.to_string()), None);
        }
        Ok(())
    }
}

/// CDN endpoint lifecycle: create, purge cached content, stop, start
#[derive(Debug, Clone)]
pub struct CdnEndpoint {
    profile: String,
    sku: String,
    endpoint: String,
    origin_host: String,
    purge_path: String,
}

impl CdnEndpoint {
    pub fn from_settings(settings: &SampleSettings) -> Self {
        Self {
            profile: settings.value(ENDPOINT_SETTINGS, "profile"),
            sku: settings.value(ENDPOINT_SETTINGS, "sku"),
            endpoint: settings.value(ENDPOINT_SETTINGS, "endpoint"),
            origin_host: settings.value(ENDPOINT_SETTINGS, "origin_host"),
            purge_path: settings.value(ENDPOINT_SETTINGS, "purge_path"),
        }
    }
}

#[async_trait]
impl Workflow for CdnEndpoint {
    fn name(&self) -> &str {
        "cdn-endpoint"
    }

    async fn provision(&self, steps: &mut Steps<'_>) -> Result<()> {
        let profile = create_profile(steps, &self.profile, &self.sku).await?;

        let endpoint = profile.child("endpoints", &self.endpoint);
        let body = json!({
            "location": "Global",
            "properties": {
                "origins": [
                    {"name": "sample1", "properties": {"hostName": self.origin_host}}
                ]
            }
        });
        steps.create("cdn endpoint", &endpoint, &body).await?;

        let purge = json!({"contentPaths": [self.purge_path]});
        steps
            .action("cdn endpoint purge content", &endpoint, "purge", Some(&purge))
            .await?;
        steps.action("cdn endpoint stop", &endpoint, "stop", None).await?;
        steps.action("cdn endpoint start", &endpoint, "start", None).await?;
        Ok(())
    }
}
