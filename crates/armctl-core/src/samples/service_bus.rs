use async_trait::async_trait;
use serde_json::{Value, json};

use super::SampleSettings;
use crate::error::Result;
use crate::sequencer::{Steps, Workflow};

const NETWORK: &str = "Microsoft.Network";
const NETWORK_API_VERSION: &str = "2021-05-01";
const SERVICE_BUS: &str = "Microsoft.ServiceBus";
const SERVICE_BUS_API_VERSION: &str = "2021-11-01";

pub(super) const SETTINGS: &[(&str, &str)] = &[
    ("virtual_network", "sample-virtual-network"),
    ("subnet", "sample-subnet"),
    ("namespace", "sample-sb-namespace"),
    ("authorization_rule", "sample-sb-authorization-rule"),
    ("address_space", "10.0.0.0/16"),
    ("subnet_prefix", "10.0.0.0/24"),
];

const ALLOWED_IPS: [&str; 5] = ["1.1.1.1", "1.1.1.2", "1.1.1.3", "1.1.1.4", "1.1.1.5"];

/// Premium Service Bus namespace reachable only from one subnet
#[derive(Debug, Clone)]
pub struct ServiceBus {
    virtual_network: String,
    subnet: String,
    namespace: String,
    authorization_rule: String,
    address_space: String,
    subnet_prefix: String,
}

impl ServiceBus {
    pub fn from_settings(settings: &SampleSettings) -> Self {
        Self {
            virtual_network: settings.value(SETTINGS, "virtual_network"),
            subnet: settings.value(SETTINGS, "subnet"),
            namespace: settings.value(SETTINGS, "namespace"),
            authorization_rule: settings.value(SETTINGS, "authorization_rule"),
            address_space: settings.value(SETTINGS, "address_space"),
            subnet_prefix: settings.value(SETTINGS, "subnet_prefix"),
        }
    }
}

fn network_rule_set(subnet_id: &str) -> Value {
    let ip_rules: Vec<Value> = ALLOWED_IPS
        .iter()
        .map(|ip| json!({"action": "Allow", "ipMask": ip}))
        .collect();
    json!({
        "properties": {
            "defaultAction": "Deny",
            "virtualNetworkRules": [
                {
                    "subnet": {"id": subnet_id},
                    "ignoreMissingVnetServiceEndpoint": true
                }
            ],
            "ipRules": ip_rules,
        }
    })
}

#[async_trait]
impl Workflow for ServiceBus {
    fn name(&self) -> &str {
        "service-bus"
    }

    async fn provision(&self, steps: &mut Steps<'_>) -> Result<()> {
        let vnet = steps.resource(
            NETWORK,
            "virtualNetworks",
            &self.virtual_network,
            NETWORK_API_VERSION,
        );
        let body = json!({
            "location": steps.location(),
            "properties": {
                "addressSpace": {"addressPrefixes": [self.address_space]}
            }
        });
        steps.create("virtual network", &vnet, &body).await?;

        let subnet = vnet.child("subnets", &self.subnet);
        let body = json!({"properties": {"addressPrefix": self.subnet_prefix}});
        let subnet = steps.create("subnet", &subnet, &body).await?;

        let namespace = steps.resource(
            SERVICE_BUS,
            "namespaces",
            &self.namespace,
            SERVICE_BUS_API_VERSION,
        );
        let body = json!({
            "location": steps.location(),
            "sku": {"name": "Premium", "tier": "Premium"},
        });
        steps.create("service bus namespace", &namespace, &body).await?;

        let rule = namespace.child("AuthorizationRules", &self.authorization_rule);
        let body = json!({"properties": {"rights": ["Listen", "Send"]}});
        steps
            .create("service bus namespace authorization rule", &rule, &body)
            .await?;

        let rule_set = namespace.child("networkRuleSets", "default");
        steps
            .create(
                "service bus namespace network rule set",
                &rule_set,
                &network_rule_set(&subnet.id),
            )
            .await?;
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
    async fn rule_set_references_created_subnet() {
        let provider = FakeProvider::new("sub");
        let clock = FakeClock::new();
        let config = RunConfig::new("sub").with_keep_resources(true);
        let sample = ServiceBus::from_settings(&SampleSettings::default());

        let report = Sequencer::new(&config, &provider)
            .with_clock(&clock)
            .run(&sample)
            .await
            .unwrap();

        let subnet_id = report
            .steps
            .iter()
            .find(|s| s.label == "subnet")
            .and_then(|s| s.id.clone())
            .unwrap();
        let rule_set_id = report.steps.last().unwrap().id.clone().unwrap();
        let rule_set = provider.resource(&rule_set_id).unwrap();
        assert_eq!(
            rule_set["properties"]["virtualNetworkRules"][0]["subnet"]["id"],
            json!(subnet_id)
        );
        assert_eq!(rule_set["properties"]["ipRules"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn subnet_failure_stops_before_namespace() {
        let provider = FakeProvider::new("sub");
        provider.fail(CallKind::Create, Some("sample-subnet"), 400, "InvalidAddressPrefix");
        let clock = FakeClock::new();
        let config = RunConfig::new("sub");
        let sample = ServiceBus::from_settings(&SampleSettings::default());

        let err = Sequencer::new(&config, &provider)
            .with_clock(&clock)
            .run(&sample)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("InvalidAddressPrefix"));
        let creates = provider.calls_of(CallKind::Create);
        assert_eq!(creates.len(), 2);
        assert!(
            !creates
                .iter()
                .any(|c| matches!(c, Call::Create { id } if id.contains("namespaces")))
        );
        assert!(provider.calls_of(CallKind::DeleteGroup).is_empty());
    }
}
