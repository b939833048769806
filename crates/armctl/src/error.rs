//! Error types for armctl
//!
//! Library errors are mapped onto a small set of user-facing kinds, each
//! with suggestions printed as a cargo-style diagnostic.

use armctl_core::{ConfigError, CoreError, ErrorCategory};
use colored::Colorize;
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Configuration error: AZURE_SUBSCRIPTION_ID is not set.
///
///   tip: export AZURE_SUBSCRIPTION_ID or pass --subscription
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Option<String>,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: None,
            tips: Vec::new(),
        }
    }

    /// Add a detail line below the error message.
    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            commands.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        if let Some(detail) = &self.detail {
            eprintln!("  {}", detail);
        }

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
            for cmd in commands {
                eprintln!("      {}", cmd);
            }
        }
    }
}

/// Main error type for the armctl application
#[derive(Error, Debug)]
pub enum ArmctlError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("{message}")]
    ApiError { status: Option<u16>, message: String },

    #[error("{message}")]
    OperationFailed { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("File error for '{path}': {message}")]
    FileError { path: String, message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for armctl operations
pub type Result<T> = std::result::Result<T, ArmctlError>;

impl ArmctlError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ArmctlError::Configuration(message) if message.contains("AZURE_SUBSCRIPTION_ID") => vec![
                "Export AZURE_SUBSCRIPTION_ID or pass --subscription <id>".to_string(),
                "Store it in a profile: armctl profile set <name> --subscription-id <id>".to_string(),
            ],
            ArmctlError::ProfileNotFound { name } => vec![
                "List available profiles: armctl profile list".to_string(),
                format!("Create profile '{}': armctl profile set {}", name, name),
            ],
            ArmctlError::AuthenticationFailed { .. } => vec![
                "Log in with the Azure CLI: az login".to_string(),
                "Or export AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET".to_string(),
                "Check the profile's credential: armctl profile show <profile>".to_string(),
            ],
            ArmctlError::ApiError {
                status: Some(401 | 403),
                ..
            } => vec![
                "Verify the identity has access to the subscription".to_string(),
                "Check the subscription id: armctl profile show <profile>".to_string(),
            ],
            ArmctlError::ApiError {
                status: Some(404), ..
            } => vec!["Verify the subscription, resource group and names are correct".to_string()],
            ArmctlError::Timeout { .. } => vec![
                "Raise the limit with --poll-timeout <secs>".to_string(),
                "Resources may still be provisioning; clean up with: armctl cleanup".to_string(),
            ],
            ArmctlError::OperationFailed { .. } => {
                vec!["Remove what was created with: armctl cleanup".to_string()]
            }
            ArmctlError::InvalidInput { .. } => vec![
                "List samples and their settings: armctl samples".to_string(),
            ],
            ArmctlError::FileError { path, .. } => vec![
                format!("Check that file exists: {}", path),
                "Point the deployment sample elsewhere with --template-dir".to_string(),
            ],
            ArmctlError::ConnectionError { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify the management endpoint in your profile".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Extra context shown under the message
    fn detail(&self) -> Option<&'static str> {
        match self {
            ArmctlError::OperationFailed { .. } | ArmctlError::Timeout { .. } => {
                Some("Resources created before the failure were left in place.")
            }
            _ => None,
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&format!("{}", self));
        if let Some(detail) = self.detail() {
            diag = diag.detail(detail);
        }

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion, &[]);
        }

        diag.print();
    }
}

impl From<ConfigError> for ArmctlError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => ArmctlError::ProfileNotFound { name },
            other => ArmctlError::Configuration(other.to_string()),
        }
    }
}

impl From<CoreError> for ArmctlError {
    fn from(err: CoreError) -> Self {
        let category = err.category();
        match err {
            CoreError::Config(config_err) => ArmctlError::from(config_err),
            CoreError::Authentication(message) => ArmctlError::AuthenticationFailed { message },
            CoreError::Api { status, .. } => ArmctlError::ApiError {
                status: Some(status),
                message: err.to_string(),
            },
            CoreError::OperationFailed { .. } => ArmctlError::OperationFailed {
                message: err.to_string(),
            },
            CoreError::OperationTimeout { .. } => ArmctlError::Timeout {
                message: err.to_string(),
            },
            CoreError::Template { path, message } => ArmctlError::FileError { path, message },
            CoreError::Validation(message) => ArmctlError::InvalidInput { message },
            CoreError::Http(e) if e.is_timeout() => ArmctlError::Timeout {
                message: e.to_string(),
            },
            CoreError::Http(e) => ArmctlError::ConnectionError {
                message: e.to_string(),
            },
            other => match category {
                ErrorCategory::RemoteApi => ArmctlError::ApiError {
                    status: None,
                    message: other.to_string(),
                },
                _ => ArmctlError::OutputError {
                    message: other.to_string(),
                },
            },
        }
    }
}

impl From<serde_json::Error> for ArmctlError {
    fn from(err: serde_json::Error) -> Self {
        ArmctlError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for ArmctlError {
    fn from(err: std::io::Error) -> Self {
        ArmctlError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<anyhow::Error> for ArmctlError {
    fn from(err: anyhow::Error) -> Self {
        ArmctlError::OutputError {
            message: format!("{:#}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_subscription_keeps_message() {
        let err = ArmctlError::from(ConfigError::MissingEnv {
            var: "AZURE_SUBSCRIPTION_ID".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: AZURE_SUBSCRIPTION_ID is not set."
        );
        assert!(!err.suggestions().is_empty());
    }

    #[test]
    fn api_errors_keep_status_and_service_text() {
        let err = ArmctlError::from(CoreError::api(
            403,
            Some("AuthorizationFailed".to_string()),
            "no access",
        ));
        assert!(matches!(err, ArmctlError::ApiError { status: Some(403), .. }));
        assert!(err.to_string().contains("no access"));
        assert!(!err.suggestions().is_empty());
    }

    #[test]
    fn core_profile_errors_are_not_double_wrapped() {
        let err = ArmctlError::from(CoreError::Config(ConfigError::ProfileNotFound {
            name: "prod".to_string(),
        }));
        assert_eq!(err.to_string(), "Profile 'prod' not found");
    }
}
