//! Profile management command implementations

use armctl_core::config::PollSettings;
use armctl_core::{CredentialSource, Profile};
use serde_json::{Value, json};
use tracing::debug;

use crate::cli::{CredentialKind, OutputFormat, ProfileCommands};
use crate::connection::ConnectionManager;
use crate::error::{ArmctlError, Result as CliResult};
use crate::output::print_output;

/// Handle profile management commands
pub fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &mut ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<()> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format),
        Path => handle_path(conn_mgr, output_format),
        Show { name } => handle_show(conn_mgr, name, output_format),
        Set {
            name,
            subscription_id,
            location,
            resource_group,
            management_endpoint,
            credential,
            tenant_id,
            client_id,
            client_secret,
            token,
            poll_interval,
            poll_timeout,
            default,
        } => {
            let credential = credential_source(
                *credential,
                tenant_id.as_deref(),
                client_id.as_deref(),
                client_secret.as_deref(),
                token.as_deref(),
            );
            let polling = match (poll_interval, poll_timeout) {
                (None, None) => None,
                (interval, timeout) => {
                    let defaults = PollSettings::default();
                    Some(PollSettings {
                        interval_secs: interval.unwrap_or(defaults.interval_secs),
                        timeout_secs: timeout.unwrap_or(defaults.timeout_secs),
                    })
                }
            };
            let profile = Profile {
                subscription_id: subscription_id.clone(),
                location: location.clone(),
                resource_group: resource_group.clone(),
                tenant_id: tenant_id.clone(),
                management_endpoint: management_endpoint.clone(),
                credential,
                polling,
            };
            handle_set(conn_mgr, name, profile, *default)
        }
        Remove { name } => handle_remove(conn_mgr, name),
    }
}

fn credential_source(
    kind: CredentialKind,
    tenant_id: Option<&str>,
    client_id: Option<&str>,
    client_secret: Option<&str>,
    token: Option<&str>,
) -> CredentialSource {
    match kind {
        CredentialKind::Default => CredentialSource::Default,
        CredentialKind::Cli => CredentialSource::Cli,
        CredentialKind::ClientSecret => CredentialSource::ClientSecret {
            tenant_id: tenant_id.unwrap_or_default().to_string(),
            client_id: client_id.unwrap_or_default().to_string(),
            client_secret: client_secret.unwrap_or_default().to_string(),
        },
        CredentialKind::Token => CredentialSource::Token {
            token: token.unwrap_or_default().to_string(),
        },
    }
}

/// Profile fields safe to display; secrets are reported as configured or not
fn profile_summary(name: &str, profile: &Profile, is_default: bool) -> Value {
    let mut summary = json!({
        "name": name,
        "default": is_default,
        "subscription_id": profile.subscription_id,
        "location": profile.location,
        "resource_group": profile.resource_group,
        "credential": profile.credential.to_string(),
    });
    if let Some(endpoint) = &profile.management_endpoint {
        summary["management_endpoint"] = json!(endpoint);
    }
    match &profile.credential {
        CredentialSource::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
        } => {
            summary["tenant_id"] = json!(tenant_id);
            summary["client_id"] = json!(client_id);
            summary["client_secret_configured"] = json!(!client_secret.is_empty());
        }
        CredentialSource::Token { token } => {
            summary["token_configured"] = json!(!token.is_empty());
        }
        CredentialSource::Default | CredentialSource::Cli => {}
    }
    if let Some(polling) = &profile.polling {
        summary["poll_interval_secs"] = json!(polling.interval_secs);
        summary["poll_timeout_secs"] = json!(polling.timeout_secs);
    }
    summary
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    debug!("Listing all configured profiles");
    let default = conn_mgr.config.default_profile.as_deref();
    let profiles: Vec<Value> = conn_mgr
        .config
        .list_profiles()
        .into_iter()
        .map(|(name, profile)| profile_summary(name, profile, default == Some(name.as_str())))
        .collect();

    match output_format {
        OutputFormat::Json | OutputFormat::Yaml => print_output(profiles, output_format)?,
        OutputFormat::Table => {
            if profiles.is_empty() {
                println!("No profiles configured.");
                println!("Create one with: armctl profile set <name> --subscription-id <id>");
                return Ok(());
            }
            let rows: Vec<Value> = profiles
                .iter()
                .map(|p| {
                    let marker = if p["default"].as_bool() == Some(true) { "*" } else { "" };
                    json!({
                        "name": p["name"],
                        "default": marker,
                        "subscription": p["subscription_id"],
                        "location": p["location"],
                        "credential": p["credential"],
                    })
                })
                .collect();
            print_output(rows, output_format)?;
        }
    }
    Ok(())
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let config_path = conn_mgr.config_file()?;

    match output_format {
        OutputFormat::Json | OutputFormat::Yaml => {
            print_output(json!({"config_path": config_path.to_str()}), output_format)?;
        }
        OutputFormat::Table => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let profile = conn_mgr
        .config
        .profiles
        .get(name)
        .ok_or_else(|| ArmctlError::ProfileNotFound { name: name.into() })?;
    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);
    print_output(profile_summary(name, profile, is_default), output_format)?;
    Ok(())
}

fn handle_set(
    conn_mgr: &mut ConnectionManager,
    name: &str,
    profile: Profile,
    make_default: bool,
) -> CliResult<()> {
    debug!("Setting profile: {}", name);
    let existed = conn_mgr.config.profiles.contains_key(name);
    conn_mgr.config.set_profile(name.to_string(), profile);
    if make_default || conn_mgr.config.default_profile.is_none() {
        conn_mgr.config.default_profile = Some(name.to_string());
    }
    conn_mgr.save_config()?;

    if existed {
        println!("Profile '{}' updated", name);
    } else {
        println!("Profile '{}' created", name);
    }
    if conn_mgr.config.default_profile.as_deref() == Some(name) {
        println!("Default profile: {}", name);
    }
    Ok(())
}

fn handle_remove(conn_mgr: &mut ConnectionManager, name: &str) -> CliResult<()> {
    debug!("Removing profile: {}", name);
    if conn_mgr.config.remove_profile(name).is_none() {
        return Err(ArmctlError::ProfileNotFound { name: name.into() });
    }
    conn_mgr.save_config()?;
    println!("Profile '{}' removed", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_secret_summary_hides_secret() {
        let profile = Profile {
            subscription_id: Some("sub".to_string()),
            credential: credential_source(
                CredentialKind::ClientSecret,
                Some("tenant"),
                Some("client"),
                Some("s3cret"),
                None,
            ),
            ..Default::default()
        };
        let summary = profile_summary("ci", &profile, true);
        assert_eq!(summary["credential"], "client-secret");
        assert_eq!(summary["client_secret_configured"], true);
        assert!(!summary.to_string().contains("s3cret"));
    }

    #[test]
    fn token_without_value_is_reported_unset() {
        let source = credential_source(CredentialKind::Token, None, None, None, None);
        let profile = Profile {
            credential: source,
            ..Default::default()
        };
        assert_eq!(profile_summary("t", &profile, false)["token_configured"], false);
    }
}
