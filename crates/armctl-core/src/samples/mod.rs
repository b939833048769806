//! The provisioning samples
//!
//! Each sample is a [`Workflow`] with the resource names, SKUs and
//! locations of the program it replaces as defaults. Any of those can be
//! changed with `key=value` settings.

use clap::ValueEnum;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::search::WebSearch;
use crate::sequencer::Workflow;

mod api_management;
mod cdn;
mod container_registry;
mod custom_search;
mod deployment;
mod mysql;
mod private_dns;
mod service_bus;
mod web_app;

pub use api_management::ApiManagement;
pub use cdn::{CdnEndpoint, CdnProfile};
pub use container_registry::ContainerRegistry;
pub use custom_search::CustomSearch;
pub use deployment::Deployment;
pub use mysql::MySql;
pub use private_dns::PrivateDns;
pub use service_bus::ServiceBus;
pub use web_app::WebApp;

/// Every sample the CLI can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SampleKind {
    ApiManagement,
    CdnProfile,
    CdnEndpoint,
    ContainerRegistry,
    Deployment,
    Mysql,
    PrivateDns,
    ServiceBus,
    WebApp,
    CustomSearch,
}

impl SampleKind {
    pub fn all() -> &'static [SampleKind] {
        &[
            SampleKind::ApiManagement,
            SampleKind::CdnProfile,
            SampleKind::CdnEndpoint,
            SampleKind::ContainerRegistry,
            SampleKind::Deployment,
            SampleKind::Mysql,
            SampleKind::PrivateDns,
            SampleKind::ServiceBus,
            SampleKind::WebApp,
            SampleKind::CustomSearch,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SampleKind::ApiManagement => "api-management",
            SampleKind::CdnProfile => "cdn-profile",
            SampleKind::CdnEndpoint => "cdn-endpoint",
            SampleKind::ContainerRegistry => "container-registry",
            SampleKind::Deployment => "deployment",
            SampleKind::Mysql => "mysql",
            SampleKind::PrivateDns => "private-dns",
            SampleKind::ServiceBus => "service-bus",
            SampleKind::WebApp => "web-app",
            SampleKind::CustomSearch => "custom-search",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SampleKind::ApiManagement => {
                "Purge a soft-deleted API Management service, then create it again"
            }
            SampleKind::CdnProfile => "Create a CDN profile and generate an SSO URI",
            SampleKind::CdnEndpoint => "Create a CDN endpoint, purge content, stop and start it",
            SampleKind::ContainerRegistry => "Create a container registry with a geo-replication",
            SampleKind::Deployment => "Deploy and validate a resource manager template",
            SampleKind::Mysql => "Create a MySQL server and read it back",
            SampleKind::PrivateDns => "Create a private DNS zone",
            SampleKind::ServiceBus => {
                "Create a Service Bus namespace locked down to a virtual network subnet"
            }
            SampleKind::WebApp => "Create an app service plan, a web app and an optional static site",
            SampleKind::CustomSearch => "Create a custom search account and run a query",
        }
    }

    /// Accepted setting keys with their defaults (empty = unset)
    pub fn settings(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            SampleKind::ApiManagement => api_management::SETTINGS,
            SampleKind::CdnProfile => cdn::PROFILE_SETTINGS,
            SampleKind::CdnEndpoint => cdn::ENDPOINT_SETTINGS,
            SampleKind::ContainerRegistry => container_registry::SETTINGS,
            SampleKind::Deployment => deployment::SETTINGS,
            SampleKind::Mysql => mysql::SETTINGS,
            SampleKind::PrivateDns => private_dns::SETTINGS,
            SampleKind::ServiceBus => service_bus::SETTINGS,
            SampleKind::WebApp => web_app::SETTINGS,
            SampleKind::CustomSearch => custom_search::SETTINGS,
        }
    }

    /// Build the workflow, rejecting settings the sample does not know
    pub fn build(&self, settings: &SampleSettings) -> Result<Box<dyn Workflow>> {
        settings.check_keys(*self)?;
        let workflow: Box<dyn Workflow> = match self {
            SampleKind::ApiManagement => Box::new(ApiManagement::from_settings(settings)),
            SampleKind::CdnProfile => Box::new(CdnProfile::from_settings(settings)),
            SampleKind::CdnEndpoint => Box::new(CdnEndpoint::from_settings(settings)),
            SampleKind::ContainerRegistry => Box::new(ContainerRegistry::from_settings(settings)),
            SampleKind::Deployment => Box::new(Deployment::from_settings(settings)),
            SampleKind::Mysql => Box::new(MySql::from_settings(settings)),
            SampleKind::PrivateDns => Box::new(PrivateDns::from_settings(settings)),
            SampleKind::ServiceBus => Box::new(ServiceBus::from_settings(settings)),
            SampleKind::WebApp => Box::new(WebApp::from_settings(settings)),
            SampleKind::CustomSearch => Box::new(CustomSearch::from_settings(settings)?),
        };
        Ok(workflow)
    }
}

impl std::fmt::Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-run sample settings
#[derive(Clone, Default)]
pub struct SampleSettings {
    values: BTreeMap<String, String>,
    template_dir: Option<PathBuf>,
    search: Option<Arc<dyn WebSearch>>,
}

impl std::fmt::Debug for SampleSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleSettings")
            .field("values", &self.values)
            .field("template_dir", &self.template_dir)
            .field("search", &self.search.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl SampleSettings {
    /// Parse `key=value` pairs
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut settings = Self::default();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                CoreError::Validation(format!("setting '{}' is not of the form key=value", pair))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CoreError::Validation(format!(
                    "setting '{}' has an empty key",
                    pair
                )));
            }
            settings.values.insert(key.to_string(), value.to_string());
        }
        Ok(settings)
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    /// Use a specific search client instead of the HTTP one
    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    /// Setting value, or `default` when unset
    pub fn get(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Setting value when set and non-empty
    pub fn get_opt(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn template_dir(&self) -> Option<&PathBuf> {
        self.template_dir.as_ref()
    }

    pub fn search(&self) -> Option<Arc<dyn WebSearch>> {
        self.search.clone()
    }

    fn check_keys(&self, kind: SampleKind) -> Result<()> {
        let known = kind.settings();
        for key in self.values.keys() {
            if !known.iter().any(|(k, _)| k == key) {
                let expected: Vec<_> = known.iter().map(|(k, _)| *k).collect();
                return Err(CoreError::Validation(format!(
                    "unknown setting '{}' for sample '{}' (expected one of: {})",
                    key,
                    kind,
                    expected.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Value for a declared key, falling back to its declared default
    fn value(&self, defaults: &[(&str, &str)], key: &str) -> String {
        let default = defaults
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or_default();
        self.get(key, default)
    }
}
