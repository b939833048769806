//! The immutable configuration bundle handed to every stage of a run
//!
//! Built once at startup from (highest precedence first) explicit
//! overrides, the process environment, the selected profile and the
//! built-in defaults. Nothing reads the environment after this point.

use std::time::Duration;

use super::config::Profile;
use super::error::{ConfigError, Result};
use super::polling::PollConfig;

pub const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
pub const ENV_KEEP_RESOURCE: &str = "KEEP_RESOURCE";
pub const ENV_LOCATION: &str = "ARMCTL_LOCATION";
pub const ENV_RESOURCE_GROUP: &str = "ARMCTL_RESOURCE_GROUP";

pub const DEFAULT_LOCATION: &str = "westus";
pub const DEFAULT_RESOURCE_GROUP: &str = "sample-resource-group";
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// Values supplied explicitly (command-line flags); each one wins when set
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub subscription_id: Option<String>,
    pub location: Option<String>,
    pub resource_group: Option<String>,
    pub keep_resources: Option<bool>,
    pub poll_interval: Option<Duration>,
    pub poll_timeout: Option<Duration>,
    pub management_endpoint: Option<String>,
}

/// Configuration for one provisioning run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub subscription_id: String,
    pub location: String,
    pub resource_group: String,
    /// Suppresses teardown when true
    pub keep_resources: bool,
    pub poll: PollConfig,
    pub management_endpoint: String,
}

impl RunConfig {
    /// Defaults for everything but the subscription
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            location: DEFAULT_LOCATION.to_string(),
            resource_group: DEFAULT_RESOURCE_GROUP.to_string(),
            keep_resources: false,
            poll: PollConfig::default(),
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_resource_group(mut self, resource_group: impl Into<String>) -> Self {
        self.resource_group = resource_group.into();
        self
    }

    pub fn with_keep_resources(mut self, keep: bool) -> Self {
        self.keep_resources = keep;
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_management_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.management_endpoint = endpoint.into();
        self
    }

    /// Resolve from the real process environment with no profile
    pub fn from_env() -> Result<Self> {
        Self::resolve(|var| std::env::var(var).ok(), None, &RunOverrides::default())
    }

    /// Resolve a run configuration
    ///
    /// `lookup` reads an environment variable. The subscription id is the only
    /// required input; its absence is reported before any remote call is made.
    /// The keep flag is set by an explicit override or by `KEEP_RESOURCE`
    /// holding any non-empty value. Profile values still holding an
    /// unexpanded `${VAR}` count as unset.
    pub fn resolve<F>(lookup: F, profile: Option<&Profile>, overrides: &RunOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |var: &str| lookup(var).filter(|v| !v.is_empty());

        let subscription_id = overrides
            .subscription_id
            .clone()
            .filter(|v| !v.is_empty())
            .or_else(|| env(ENV_SUBSCRIPTION_ID))
            .or_else(|| profile.and_then(|p| usable(&p.subscription_id)))
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv {
                var: ENV_SUBSCRIPTION_ID.to_string(),
            })?;

        let location = overrides
            .location
            .clone()
            .or_else(|| env(ENV_LOCATION))
            .or_else(|| profile.and_then(|p| usable(&p.location)))
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        if location.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "location".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let resource_group = overrides
            .resource_group
            .clone()
            .or_else(|| env(ENV_RESOURCE_GROUP))
            .or_else(|| profile.and_then(|p| usable(&p.resource_group)))
            .unwrap_or_else(|| DEFAULT_RESOURCE_GROUP.to_string());
        if resource_group.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "resource_group".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let keep_resources =
            overrides.keep_resources.unwrap_or(false) || env(ENV_KEEP_RESOURCE).is_some();

        let mut poll = profile
            .and_then(|p| p.polling.as_ref())
            .map(|s| s.to_poll_config())
            .unwrap_or_default();
        if let Some(interval) = overrides.poll_interval {
            poll.interval = interval;
        }
        if let Some(timeout) = overrides.poll_timeout {
            poll.timeout = timeout;
        }
        if poll.interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval".to_string(),
                message: "must be at least one second".to_string(),
            });
        }

        let management_endpoint = overrides
            .management_endpoint
            .clone()
            .or_else(|| profile.and_then(|p| usable(&p.management_endpoint)))
            .unwrap_or_else(|| DEFAULT_MANAGEMENT_ENDPOINT.to_string());

        Ok(Self {
            subscription_id,
            location,
            resource_group,
            keep_resources,
            poll,
            management_endpoint,
        })
    }
}

/// A profile value with something left to use
fn usable(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !v.is_empty() && !v.contains("${"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollSettings;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_subscription_is_fatal() {
        let err = RunConfig::resolve(env_of(&[]), None, &RunOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv { ref var } if var == ENV_SUBSCRIPTION_ID));
        assert_eq!(err.to_string(), "AZURE_SUBSCRIPTION_ID is not set.");
    }

    #[test]
    fn empty_subscription_is_treated_as_missing() {
        let result = RunConfig::resolve(
            env_of(&[(ENV_SUBSCRIPTION_ID, "")]),
            None,
            &RunOverrides::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn unexpanded_profile_subscription_is_missing() {
        let profile = Profile {
            subscription_id: Some("${AZURE_SUBSCRIPTION_ID}".into()),
            location: Some("${ARMCTL_LOCATION}".into()),
            ..Default::default()
        };
        let err = RunConfig::resolve(env_of(&[]), Some(&profile), &RunOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv { ref var } if var == ENV_SUBSCRIPTION_ID));

        let config = RunConfig::resolve(
            env_of(&[(ENV_SUBSCRIPTION_ID, "sub")]),
            Some(&profile),
            &RunOverrides::default(),
        )
        .unwrap();
        assert_eq!(config.location, DEFAULT_LOCATION);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let overrides = RunOverrides {
            poll_interval: Some(Duration::ZERO),
            ..Default::default()
        };
        let err = RunConfig::resolve(env_of(&[(ENV_SUBSCRIPTION_ID, "sub")]), None, &overrides)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "poll_interval"));

        let profile = Profile {
            polling: Some(PollSettings {
                interval_secs: 0,
                timeout_secs: 60,
            }),
            ..Default::default()
        };
        assert!(
            RunConfig::resolve(
                env_of(&[(ENV_SUBSCRIPTION_ID, "sub")]),
                Some(&profile),
                &RunOverrides::default(),
            )
            .is_err()
        );
    }

    #[test]
    fn defaults_apply() {
        let config = RunConfig::resolve(
            env_of(&[(ENV_SUBSCRIPTION_ID, "sub")]),
            None,
            &RunOverrides::default(),
        )
        .unwrap();
        assert_eq!(config, RunConfig::new("sub"));
        assert!(!config.keep_resources);
    }

    #[test]
    fn keep_flag_is_presence_of_any_non_empty_value() {
        for value in ["1", "true", "false", "no"] {
            let config = RunConfig::resolve(
                env_of(&[(ENV_SUBSCRIPTION_ID, "sub"), (ENV_KEEP_RESOURCE, value)]),
                None,
                &RunOverrides::default(),
            )
            .unwrap();
            assert!(config.keep_resources, "value {value:?} should keep");
        }

        let config = RunConfig::resolve(
            env_of(&[(ENV_SUBSCRIPTION_ID, "sub"), (ENV_KEEP_RESOURCE, "")]),
            None,
            &RunOverrides::default(),
        )
        .unwrap();
        assert!(!config.keep_resources);
    }

    #[test]
    fn precedence_override_env_profile() {
        let profile = Profile {
            subscription_id: Some("profile-sub".into()),
            location: Some("northeurope".into()),
            resource_group: Some("profile-rg".into()),
            polling: Some(PollSettings {
                interval_secs: 1,
                timeout_secs: 5,
            }),
            ..Default::default()
        };
        let overrides = RunOverrides {
            resource_group: Some("flag-rg".into()),
            poll_timeout: Some(Duration::from_secs(9)),
            ..Default::default()
        };

        let config = RunConfig::resolve(
            env_of(&[(ENV_LOCATION, "eastus2")]),
            Some(&profile),
            &overrides,
        )
        .unwrap();

        assert_eq!(config.subscription_id, "profile-sub");
        assert_eq!(config.location, "eastus2");
        assert_eq!(config.resource_group, "flag-rg");
        assert_eq!(config.poll.interval, Duration::from_secs(1));
        assert_eq!(config.poll.timeout, Duration::from_secs(9));
    }
}
