//! Bearer tokens for the management API
//!
//! Three sources are supported: a pre-issued token from the environment, a
//! service principal with a client secret (OAuth2 client-credentials grant),
//! and the Azure CLI's cached login. [`ChainedCredential`] tries them in
//! order and caches the first token it gets until shortly before expiry.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::credential::{
    ENV_ACCESS_TOKEN, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_TENANT_ID, resolve_value,
};
use crate::config::CredentialSource;
use crate::error::{CoreError, Result};

/// Scope for the public-cloud management API
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Tokens this close to expiry are refreshed
const EXPIRY_SKEW_MINUTES: i64 = 5;

/// Lifetime assumed for tokens whose expiry is unknown
const STATIC_TOKEN_LIFETIME_MINUTES: i64 = 60;

/// A bearer token and its expiry
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// Usable at `now` with the refresh skew applied
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_on - ChronoDuration::minutes(EXPIRY_SKEW_MINUTES) > now
    }
}

/// A source of bearer tokens
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Source name for logs and error messages
    fn name(&self) -> &str;

    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

/// A token handed over as-is
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    fn name(&self) -> &str {
        "environment token"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        if self.token.is_empty() {
            return Err(CoreError::Authentication(format!(
                "{} is empty",
                ENV_ACCESS_TOKEN
            )));
        }
        Ok(AccessToken::new(
            self.token.clone(),
            Utc::now() + ChronoDuration::minutes(STATIC_TOKEN_LIFETIME_MINUTES),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<Value>,
}

/// Service principal authenticating with a client secret
pub struct ClientSecretCredential {
    client: Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

impl ClientSecretCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            authority: DEFAULT_AUTHORITY.to_string(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Use a different login endpoint (sovereign clouds, tests)
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &str {
        "client secret"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let url = format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id);
        let form = serde_urlencoded::to_string([
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ])
        .map_err(|e| CoreError::Authentication(e.to_string()))?;

        debug!(tenant = %self.tenant_id, client = %self.client_id, "requesting token");
        let response = self
            .client
            .post(&url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(form)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let description = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("token request rejected");
            return Err(CoreError::Authentication(format!(
                "{} ({})",
                description, status
            )));
        }

        let parsed: TokenResponse = serde_json::from_value(body)
            .map_err(|e| CoreError::Authentication(format!("unexpected token response: {}", e)))?;
        let lifetime = parsed
            .expires_in
            .as_ref()
            .and_then(seconds)
            .unwrap_or(STATIC_TOKEN_LIFETIME_MINUTES * 60);
        Ok(AccessToken::new(
            parsed.access_token,
            Utc::now() + ChronoDuration::seconds(lifetime),
        ))
    }
}

/// `expires_in` arrives as a number or a numeric string
fn seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Token from the Azure CLI's login session
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    program: String,
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self {
            program: "az".to_string(),
        }
    }
}

impl AzureCliCredential {
    /// Use a different executable (tests)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &str {
        "azure cli"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let resource = scope.trim_end_matches("/.default");
        let output = tokio::process::Command::new(&self.program)
            .args([
                "account",
                "get-access-token",
                "--output",
                "json",
                "--resource",
                resource,
            ])
            .output()
            .await
            .map_err(|e| {
                CoreError::Authentication(format!("could not run '{}': {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::Authentication(format!(
                "'{} account get-access-token' failed: {}",
                self.program,
                stderr.trim()
            )));
        }
        parse_cli_token(&output.stdout)
    }
}

/// Parse `az account get-access-token` output
pub(crate) fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken> {
    let value: Value = serde_json::from_slice(stdout)
        .map_err(|e| CoreError::Authentication(format!("unexpected az output: {}", e)))?;
    let token = value
        .get("accessToken")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::Authentication("az output has no accessToken".to_string()))?;

    // newer CLIs report epoch seconds; older ones only a local timestamp
    let expires_on = value
        .get("expires_on")
        .and_then(seconds)
        .and_then(|s| Utc.timestamp_opt(s, 0).single())
        .or_else(|| {
            value
                .get("expiresOn")
                .and_then(Value::as_str)
                .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
                .and_then(|naive| Local.from_local_datetime(&naive).single())
                .map(|local| local.with_timezone(&Utc))
        })
        .ok_or_else(|| CoreError::Authentication("az output has no expiry".to_string()))?;

    Ok(AccessToken::new(token, expires_on))
}

/// Tries each source in turn and caches tokens per scope
pub struct ChainedCredential {
    sources: Vec<Box<dyn TokenCredential>>,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl ChainedCredential {
    pub fn new(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        Self {
            sources,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TokenCredential for ChainedCredential {
    fn name(&self) -> &str {
        "credential chain"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.get(scope)
            && token.is_fresh_at(Utc::now())
        {
            return Ok(token.clone());
        }

        let mut failures = Vec::new();
        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    debug!(source = source.name(), expires_on = %token.expires_on, "acquired token");
                    cache.insert(scope.to_string(), token.clone());
                    return Ok(token);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "credential source failed");
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no credential sources configured".to_string());
        }
        Err(CoreError::Authentication(failures.join("; ")))
    }
}

/// Build the credential for a profile's source
///
/// `lookup` reads environment variables; environment values override the
/// profile's stored ones. The default source builds the full chain from
/// whatever is available.
pub fn credential_for<F>(source: &CredentialSource, lookup: F) -> Result<Box<dyn TokenCredential>>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |var: &str| lookup(var).filter(|v| !v.is_empty());

    let credential: Box<dyn TokenCredential> = match source {
        CredentialSource::Default => {
            let mut sources: Vec<Box<dyn TokenCredential>> = Vec::new();
            if let Some(token) = env(ENV_ACCESS_TOKEN) {
                sources.push(Box::new(StaticTokenCredential::new(token)));
            }
            if let (Some(tenant), Some(client), Some(secret)) =
                (env(ENV_TENANT_ID), env(ENV_CLIENT_ID), env(ENV_CLIENT_SECRET))
            {
                sources.push(Box::new(ClientSecretCredential::new(tenant, client, secret)));
            }
            sources.push(Box::new(AzureCliCredential::default()));
            Box::new(ChainedCredential::new(sources))
        }
        CredentialSource::Cli => Box::new(ChainedCredential::new(vec![Box::new(
            AzureCliCredential::default(),
        )])),
        CredentialSource::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
        } => {
            let tenant = resolve_value(tenant_id, ENV_TENANT_ID, &lookup)?;
            let client = resolve_value(client_id, ENV_CLIENT_ID, &lookup)?;
            let secret = resolve_value(client_secret, ENV_CLIENT_SECRET, &lookup)?;
            Box::new(ChainedCredential::new(vec![Box::new(
                ClientSecretCredential::new(tenant, client, secret),
            )]))
        }
        CredentialSource::Token { token } => {
            let token = resolve_value(token, ENV_ACCESS_TOKEN, &lookup)?;
            Box::new(StaticTokenCredential::new(token))
        }
    };
    Ok(credential)
}
