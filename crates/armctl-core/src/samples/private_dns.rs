use async_trait::async_trait;
use serde_json::json;

use super::SampleSettings;
use crate::error::Result;
use crate::sequencer::{Steps, Workflow};

const NAMESPACE: &str = "Microsoft.Network";
const API_VERSION: &str = "2020-06-01";

pub(super) const SETTINGS: &[(&str, &str)] = &[
    ("zone", "sample.private.zone"),
    ("zone_location", "global"),
];

/// Private DNS zone
#[derive(Debug, Clone)]
pub struct PrivateDns {
    zone: String,
    zone_location: String,
}

impl PrivateDns {
    pub fn from_settings(settings: &SampleSettings) -> Self {
        Self {
            zone: settings.value(SETTINGS, "zone"),
            zone_location: settings.value(SETTINGS, "zone_location"),
        }
    }
}

#[async_trait]
impl Workflow for PrivateDns {
    fn name(&self) -> &str {
        "private-dns"
    }

    async fn provision(&self, steps: &mut Steps<'_>) -> Result<()> {
        let zone = steps.resource(NAMESPACE, "privateDnsZones", &self.zone, API_VERSION);
        steps
            .create("private zone", &zone, &json!({"location": self.zone_location}))
            .await?;
        Ok(())
    }
}
