//! Configuration file management for armctl
//!
//! Handles loading named profiles from a TOML file. A profile pins the
//! subscription, region, resource group, credential source and polling
//! behaviour so runs can be repeated without re-exporting environment
//! variables.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::credential::CredentialSource;
use super::error::{ConfigError, Result};
use super::polling::PollSettings;

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Management endpoint override (sovereign clouds, test servers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_endpoint: Option<String>,
    #[serde(default)]
    pub credential: CredentialSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling: Option<PollSettings>,
}

impl Config {
    /// Resolve which profile applies
    ///
    /// An explicit name must exist. Without one, `default_profile` is used
    /// when set, then a lone profile. No profiles at all is not an error:
    /// everything can come from the environment.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<Option<(&str, &Profile)>> {
        if let Some(name) = explicit_profile {
            return self
                .profiles
                .get_key_value(name)
                .map(|(k, p)| Some((k.as_str(), p)))
                .ok_or_else(|| ConfigError::ProfileNotFound {
                    name: name.to_string(),
                });
        }

        if let Some(name) = &self.default_profile {
            return self
                .profiles
                .get_key_value(name)
                .map(|(k, p)| Some((k.as_str(), p)))
                .ok_or_else(|| ConfigError::ProfileNotFound { name: name.clone() });
        }

        if self.profiles.len() == 1 {
            return Ok(self.profiles.iter().next().map(|(k, p)| (k.as_str(), p)));
        }

        Ok(None)
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, `~/.config/armctl/config.toml` is preferred when it (or its
    /// directory) exists, otherwise the platform location is used.
    ///
    /// On Linux: ~/.config/armctl/config.toml
    /// On Windows: %APPDATA%\armctl\armctl\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("armctl")
                    .join("config.toml");

                if linux_style_path.exists()
                    || linux_style_path
                        .parent()
                        .map(|p| p.exists())
                        .unwrap_or(false)
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "armctl", "armctl").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand environment variables in configuration content
    ///
    /// Supports ${VAR} and ${VAR:-default}. Unset variables are left as-is so
    /// profiles that are not used do not need their variables exported; a
    /// run resolved from such a profile treats the value as unset.
    ///
    /// ```toml
    /// subscription_id = "${AZURE_SUBSCRIPTION_ID}"
    /// location = "${ARMCTL_LOCATION:-westus}"
    /// ```
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}
