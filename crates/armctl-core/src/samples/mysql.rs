use async_trait::async_trait;
use serde_json::json;

use super::SampleSettings;
use crate::error::{CoreError, Result};
use crate::sequencer::{Steps, Workflow};

const NAMESPACE: &str = "Microsoft.DBforMySQL";
const API_VERSION: &str = "2017-12-01";

pub(super) const SETTINGS: &[(&str, &str)] = &[
    ("server", "sample2server"),
    ("sku", "GP_Gen5_2"),
    ("tier", "GeneralPurpose"),
    ("family", "Gen5"),
    ("capacity", "2"),
];

/// Single MySQL server, read back after creation
#[derive(Debug, Clone)]
pub struct MySql {
    server: String,
    sku: String,
    tier: String,
    family: String,
    capacity: String,
}

impl MySql {
    pub fn from_settings(settings: &SampleSettings) -> Self {
        Self {
            server: settings.value(SETTINGS, "server"),
            sku: settings.value(SETTINGS, "sku"),
            tier: settings.value(SETTINGS, "tier"),
            family: settings.value(SETTINGS, "family"),
            capacity: settings.value(SETTINGS, "capacity"),
        }
    }
}

#[async_trait]
impl Workflow for MySql {
    fn name(&self) -> &str {
        "mysql"
    }

    async fn provision(&self, steps: &mut Steps<'_>) -> Result<()> {
        let capacity: u32 = self.capacity.parse().map_err(|_| {
            CoreError::Validation(format!("capacity '{}' is not a number", self.capacity))
        })?;

        let server = steps.resource(NAMESPACE, "servers", &self.server, API_VERSION);
        let body = json!({
            "location": steps.location(),
            "properties": {"createMode": "Default"},
            "sku": {
                "name": self.sku,
                "tier": self.tier,
                "capacity": capacity,
                "family": self.family,
            },
        });
        let created = steps.create("mysql server", &server, &body).await?;
        let fetched = steps.get("get mysql server", &server).await?;

        if !created.id.eq_ignore_ascii_case(&fetched.id) {
            return Err(CoreError::Validation(format!(
                "server id changed between create ({}) and get ({})",
                created.id, fetched.id
            )));
        }
        Ok(())
    }
}
