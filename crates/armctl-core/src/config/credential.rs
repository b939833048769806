//! Credential sources stored in profiles
//!
//! A profile names *where* a bearer token comes from, never the token
//! itself unless the user explicitly stores one. Values may reference
//! environment variables (`${AZURE_CLIENT_SECRET}`) which are expanded when
//! the config file is loaded, and every field also falls back to its
//! conventional environment variable at resolution time.

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, Result};

pub const ENV_ACCESS_TOKEN: &str = "AZURE_ACCESS_TOKEN";
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";

/// Where the management API bearer token is obtained from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CredentialSource {
    /// Environment token, then client secret, then the Azure CLI
    #[default]
    Default,
    /// Azure CLI only (`az account get-access-token`)
    Cli,
    /// Service principal with a client secret
    ClientSecret {
        #[serde(default)]
        tenant_id: String,
        #[serde(default)]
        client_id: String,
        #[serde(default)]
        client_secret: String,
    },
    /// A pre-issued bearer token
    Token {
        #[serde(default)]
        token: String,
    },
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::Default => write!(f, "default"),
            CredentialSource::Cli => write!(f, "cli"),
            CredentialSource::ClientSecret { .. } => write!(f, "client-secret"),
            CredentialSource::Token { .. } => write!(f, "token"),
        }
    }
}

/// Resolve a configured value, preferring the environment variable when set
///
/// Resolution order:
/// 1. `env_var` if present and non-empty
/// 2. `value` if non-empty
/// 3. otherwise an error naming both
pub fn resolve_value<F>(value: &str, env_var: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(env_value) = lookup(env_var).filter(|v| !v.is_empty()) {
        return Ok(env_value);
    }
    if !value.is_empty() {
        return Ok(value.to_string());
    }
    Err(ConfigError::CredentialError(format!(
        "no value configured and {} is not set",
        env_var
    )))
}
