//! Unified error handling for armctl-core
//!
//! Every failure a run can hit falls into one of four categories: bad local
//! configuration, credential failure, an error reported by the management
//! API, or a long-running operation that ended badly. None of them are
//! retried; they all stop the run.
//!
//! # Example
//!
//! ```rust
//! use armctl_core::{CoreError, ErrorCategory};
//!
//! let err = CoreError::Api {
//!     status: 404,
//!     code: Some("ResourceGroupNotFound".to_string()),
//!     message: "Resource group 'x' could not be found.".to_string(),
//! };
//! assert!(err.is_not_found());
//! assert_eq!(err.category(), ErrorCategory::RemoteApi);
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Bad or missing local configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No credential source produced a token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Error response from the management API, surfaced verbatim
    #[error("API error ({status}{}): {message}", .code.as_deref().map(|c| format!(" {}", c)).unwrap_or_default())]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A long-running operation reached a failed or canceled state
    #[error("Operation '{operation}' ended with status {status}: {message}")]
    OperationFailed {
        operation: String,
        status: String,
        message: String,
    },

    /// A long-running operation did not finish in time
    #[error("Operation '{operation}' timed out after {timeout:?}")]
    OperationTimeout { operation: String, timeout: Duration },

    /// Deployment template or parameters file could not be used
    #[error("Template error for '{path}': {message}")]
    Template { path: String, message: String },

    /// Input rejected before any remote call
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Coarse classification used for logging and exit diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    RemoteApi,
    Polling,
    Local,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Authentication => write!(f, "authentication"),
            ErrorCategory::RemoteApi => write!(f, "remote-api"),
            ErrorCategory::Polling => write!(f, "polling"),
            ErrorCategory::Local => write!(f, "local"),
        }
    }
}

impl CoreError {
    /// Build an API error from a status and an optional ARM error body
    pub fn api(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        CoreError::Api {
            status,
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Config(_) | CoreError::Validation(_) => ErrorCategory::Configuration,
            CoreError::Authentication(_) => ErrorCategory::Authentication,
            CoreError::Api { status, .. } if *status == 401 => ErrorCategory::Authentication,
            CoreError::Api { .. } | CoreError::Http(_) => ErrorCategory::RemoteApi,
            CoreError::OperationFailed { .. } | CoreError::OperationTimeout { .. } => {
                ErrorCategory::Polling
            }
            CoreError::Template { .. } | CoreError::Json(_) | CoreError::Io(_) => {
                ErrorCategory::Local
            }
        }
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::Api { status: 404, .. })
    }

    /// Returns true if this is an authentication/authorization error
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            CoreError::Authentication(_) | CoreError::Api { status: 401 | 403, .. }
        )
    }

    /// Returns true if this is a conflict/precondition error (409/412)
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Api { status: 409 | 412, .. })
    }

    /// Returns true if the API throttled the request (429)
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        matches!(self, CoreError::Api { status: 429, .. })
    }

    /// Returns true if this is a timeout of any kind
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            CoreError::OperationTimeout { .. } => true,
            CoreError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}
