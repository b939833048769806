use async_trait::async_trait;
use serde_json::json;

use super::SampleSettings;
use crate::error::Result;
use crate::sequencer::{Steps, Workflow};

const NAMESPACE: &str = "Microsoft.ContainerRegistry";
const API_VERSION: &str = "2021-09-01";

pub(super) const SETTINGS: &[(&str, &str)] = &[
    ("registry", "sample2registry"),
    ("replication", "sample2replication"),
    ("replication_location", "eastus"),
];

/// Premium registry geo-replicated to a second region
#[derive(Debug, Clone)]
pub struct ContainerRegistry {
    registry: String,
    replication: String,
    replication_location: String,
}

impl ContainerRegistry {
    pub fn from_settings(settings: &SampleSettings) -> Self {
        Self {
            registry: settings.value(SETTINGS, "registry"),
            replication: settings.value(SETTINGS, "replication"),
            replication_location: settings.value(SETTINGS, "replication_location"),
        }
    }
}

#[async_trait]
impl Workflow for ContainerRegistry {
    fn name(&self) -> &str {
        "container-registry"
    }

    async fn provision(&self, steps: &mut Steps<'_>) -> Result<()> {
        let registry = steps.resource(NAMESPACE, "registries", &self.registry, API_VERSION);
        let body = json!({
            "location": steps.location(),
            "tags": {"key": "value"},
            "sku": {"name": "Premium"},
            "properties": {"adminUserEnabled": true},
        });
        steps.create("registry", &registry, &body).await?;

        let replication = registry.child("replications", &self.replication);
        let body = json!({"location": self.replication_location});
        steps.create("replication", &replication, &body).await?;

        steps.get("get replication", &replication).await?;
        Ok(())
    }
}
