use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::SampleSettings;
use crate::error::{CoreError, Result};
use crate::sequencer::{Steps, Workflow};

const NAMESPACE: &str = "Microsoft.Resources";
const API_VERSION: &str = "2021-04-01";
const DEFAULT_TEMPLATE_DIR: &str = "testdata";

pub(super) const SETTINGS: &[(&str, &str)] = &[
    ("deployment", "sample-deployment"),
    ("mode", "Incremental"),
];

/// Incremental template deployment followed by a validation of the same template
#[derive(Debug, Clone)]
pub struct Deployment {
    deployment: String,
    mode: String,
    template_dir: PathBuf,
}

impl Deployment {
    pub fn from_settings(settings: &SampleSettings) -> Self {
        Self {
            deployment: settings.value(SETTINGS, "deployment"),
            mode: settings.value(SETTINGS, "mode"),
            template_dir: settings
                .template_dir()
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIR)),
        }
    }
}

/// Read a JSON object from disk
///
/// Only well-formedness is checked; the provider validates the content.
pub async fn read_json_object(path: &Path) -> Result<Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CoreError::Template {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| CoreError::Template {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    if !value.is_object() {
        return Err(CoreError::Template {
            path: path.display().to_string(),
            message: "expected a JSON object".to_string(),
        });
    }
    Ok(value)
}

/// Accept both a bare parameter map and a full deployment parameters file
fn parameter_values(file: Value) -> Value {
    match file.get("parameters") {
        Some(inner) if inner.is_object() && file.get("$schema").is_some() => inner.clone(),
        _ => file,
    }
}

#[async_trait]
impl Workflow for Deployment {
    fn name(&self) -> &str {
        "deployment"
    }

    async fn provision(&self, steps: &mut Steps<'_>) -> Result<()> {
        let deployment = steps.resource(NAMESPACE, "deployments", &self.deployment, API_VERSION);
        steps.exists("deployment is exist", &deployment).await?;

        let template_path = self.template_dir.join("template.json");
        let parameters_path = self.template_dir.join("parameters.json");
        debug!(template = %template_path.display(), "reading template");
        let template = read_json_object(&template_path).await?;
        let parameters = parameter_values(read_json_object(&parameters_path).await?);

        let body = json!({
            "properties": {
                "template": template,
                "parameters": parameters,
                "mode": self.mode,
            }
        });
        steps.create("created deployment", &deployment, &body).await?;
        steps
            .action("validate deployment", &deployment, "validate", Some(&body))
            .await?;
        Ok(())
    }
}
