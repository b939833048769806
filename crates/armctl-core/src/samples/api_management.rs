use async_trait::async_trait;
use serde_json::json;

use super::SampleSettings;
use crate::error::{CoreError, Result};
use crate::resource::ResourceRef;
use crate::sequencer::{Steps, TeardownPolicy, Workflow};

const NAMESPACE: &str = "Microsoft.ApiManagement";
const API_VERSION: &str = "2021-08-01";

pub(super) const SETTINGS: &[(&str, &str)] = &[
    ("service", "sample-api-service"),
    ("publisher_name", "sample"),
    ("publisher_email", "xxx@wircesoft.com"),
    ("capacity", "2"),
];

/// Purge a soft-deleted API Management service, then recreate it
///
/// The service takes a long time to provision, so a run leaves it in place.
#[derive(Debug, Clone)]
pub struct ApiManagement {
    service: String,
    publisher_name: String,
    publisher_email: String,
    capacity: String,
}

impl ApiManagement {
    pub fn from_settings(settings: &SampleSettings) -> Self {
        Self {
            service: settings.value(SETTINGS, "service"),
            publisher_name: settings.value(SETTINGS, "publisher_name"),
            publisher_email: settings.value(SETTINGS, "publisher_email"),
            capacity: settings.value(SETTINGS, "capacity"),
        }
    }
}

#[async_trait]
impl Workflow for ApiManagement {
    fn name(&self) -> &str {
        "api-management"
    }

    fn teardown_policy(&self) -> TeardownPolicy {
        TeardownPolicy::Disabled
    }

    async fn provision(&self, steps: &mut Steps<'_>) -> Result<()> {
        let deleted = ResourceRef::in_subscription(
            NAMESPACE,
            vec![
                ("locations".to_string(), steps.location().to_string()),
                ("deletedservices".to_string(), self.service.clone()),
            ],
            API_VERSION,
        );
        match steps.delete("delete service", &deleted).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                steps.record("no soft-deleted service to purge", None, None);
            }
            Err(e) => return Err(e),
        }

        let capacity: u32 = self.capacity.parse().map_err(|_| {
            CoreError::Validation(format!("capacity '{}' is not a number", self.capacity))
        })?;
        let service = steps.resource(NAMESPACE, "service", &self.service, API_VERSION);
        let body = json!({
            "location": steps.location(),
            "properties": {
                "publisherName": self.publisher_name,
                "publisherEmail": self.publisher_email,
            },
            "sku": {"name": "Standard", "capacity": capacity},
        });
        steps.create("api management service again", &service, &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::sequencer::Sequencer;
    use crate::testing::{Call, CallKind, FakeClock, FakeProvider};

    #[tokio::test]
    async fn purges_before_recreating() {
        let provider = FakeProvider::new("sub");
        let clock = FakeClock::new();
        let config = RunConfig::new("sub");
        let sample = ApiManagement::from_settings(&SampleSettings::default());

        let report = Sequencer::new(&config, &provider)
            .with_clock(&clock)
            .run(&sample)
            .await
            .unwrap();

        let verbs: Vec<_> = provider
            .calls()
            .into_iter()
            .filter(|c| c.kind() != CallKind::Poll)
            .collect();
        assert_eq!(
            verbs[1],
            Call::Delete {
                id: "/subscriptions/sub/providers/Microsoft.ApiManagement/locations/westus/deletedservices/sample-api-service".into()
            }
        );
        assert!(matches!(verbs[2], Call::Create { .. }));
        assert!(!report.torn_down);
    }

    #[tokio::test]
    async fn missing_soft_deleted_service_is_tolerated() {
        let provider = FakeProvider::new("sub");
        provider.fail(CallKind::Delete, Some("sample-api-service"), 404, "ServiceNotFound");
        let clock = FakeClock::new();
        let config = RunConfig::new("sub");
        let sample = ApiManagement::from_settings(&SampleSettings::default());

        let report = Sequencer::new(&config, &provider)
            .with_clock(&clock)
            .run(&sample)
            .await
            .unwrap();

        assert!(
            report
                .steps
                .iter()
                .any(|s| s.label == "no soft-deleted service to purge")
        );
        assert_eq!(provider.calls_of(CallKind::Create).len(), 1);
    }
}
