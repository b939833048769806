//! Resolution of run configuration and the authenticated ARM provider

use armctl_core::arm::ArmProvider;
use armctl_core::auth::credential_for;
use armctl_core::{Config, CredentialSource, Profile, RunConfig, RunOverrides};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result as CliResult;

/// Holds the loaded profiles file and builds per-run collaborators from it
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

impl ConnectionManager {
    /// Create a new connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Save the configuration to the appropriate location
    pub fn save_config(&self) -> CliResult<()> {
        match &self.config_path {
            Some(path) => self.config.save_to_path(path)?,
            None => self.config.save()?,
        }
        Ok(())
    }

    /// Path of the profiles file in use
    pub fn config_file(&self) -> CliResult<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_path()?),
        }
    }

    fn profile(&self, profile_name: Option<&str>) -> CliResult<Option<&Profile>> {
        let resolved = self.config.resolve_profile(profile_name)?;
        match resolved {
            Some((name, profile)) => {
                info!("Using profile: {}", name);
                Ok(Some(profile))
            }
            None => {
                debug!("No profile selected, using environment only");
                Ok(None)
            }
        }
    }

    /// Resolve the immutable run configuration
    ///
    /// Flags win over the environment, which wins over the profile. Fails
    /// before anything remote happens when no subscription is available.
    pub fn run_config(
        &self,
        profile_name: Option<&str>,
        overrides: &RunOverrides,
    ) -> CliResult<RunConfig> {
        let profile = self.profile(profile_name)?;
        let config = RunConfig::resolve(|var| std::env::var(var).ok(), profile, overrides)?;
        debug!(
            subscription = %config.subscription_id,
            group = %config.resource_group,
            location = %config.location,
            keep = config.keep_resources,
            "resolved run configuration"
        );
        Ok(config)
    }

    /// Build the ARM provider with the profile's credential source
    pub fn create_provider(
        &self,
        profile_name: Option<&str>,
        run_config: &RunConfig,
    ) -> CliResult<ArmProvider> {
        let source = self
            .profile(profile_name)?
            .map(|p| p.credential.clone())
            .unwrap_or(CredentialSource::Default);
        debug!("Credential source: {}", source);

        let credential = credential_for(&source, |var| std::env::var(var).ok())?;
        debug!("Using {}", credential.name());
        Ok(ArmProvider::new(run_config, Arc::from(credential))?)
    }
}
