//! Long-running operation handles and their status vocabulary

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of a long-running operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationStatus {
    /// Parse a provider status string (case-insensitive)
    ///
    /// Any value that is not one of the three terminal states is treated as
    /// still in progress; ARM reports a wide range of transitional states
    /// (`Accepted`, `Creating`, `Updating`, `Deleting`, `Running`, ...).
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" | "success" | "completed" => OperationStatus::Succeeded,
            "failed" | "error" => OperationStatus::Failed,
            "canceled" | "cancelled" => OperationStatus::Canceled,
            _ => OperationStatus::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationStatus::InProgress)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::InProgress => write!(f, "InProgress"),
            OperationStatus::Succeeded => write!(f, "Succeeded"),
            OperationStatus::Failed => write!(f, "Failed"),
            OperationStatus::Canceled => write!(f, "Canceled"),
        }
    }
}

/// How the status of a pending operation is observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollKind {
    /// Status document with a `status` field (`Azure-AsyncOperation`)
    AsyncOperation,
    /// `Location` URL: 202 while running, 200/204 once done
    Location,
    /// The resource itself, watching `properties.provisioningState`
    ProvisioningState,
    /// Opaque to the caller (in-memory providers)
    Opaque,
}

/// Handle to an operation started by a `begin_*` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Opaque id, unique per provider
    pub id: String,
    /// Human-readable label, e.g. `create Microsoft.Cdn/profiles 'p'`
    pub description: String,
    pub status: OperationStatus,
    /// Result body once known (set immediately for synchronous completions)
    pub result: Option<Value>,
    pub poll_url: Option<String>,
    pub poll_kind: PollKind,
    /// Where the final representation is read after success
    pub final_url: Option<String>,
}

impl Operation {
    /// An operation that finished within the initial call
    pub fn completed(id: impl Into<String>, description: impl Into<String>, result: Option<Value>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: OperationStatus::Succeeded,
            result,
            poll_url: None,
            poll_kind: PollKind::Opaque,
            final_url: None,
        }
    }

    /// An operation that must be polled
    pub fn pending(id: impl Into<String>, description: impl Into<String>, poll_kind: PollKind) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: OperationStatus::InProgress,
            result: None,
            poll_url: None,
            poll_kind,
            final_url: None,
        }
    }

    pub fn with_poll_url(mut self, url: impl Into<String>) -> Self {
        self.poll_url = Some(url.into());
        self
    }

    pub fn with_final_url(mut self, url: impl Into<String>) -> Self {
        self.final_url = Some(url.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One observation of an operation's status
#[derive(Debug, Clone, PartialEq)]
pub struct OperationPoll {
    pub status: OperationStatus,
    /// Final body, present on success when the provider has one
    pub result: Option<Value>,
    /// Provider error message for failed operations
    pub error: Option<String>,
}

impl OperationPoll {
    pub fn in_progress() -> Self {
        Self {
            status: OperationStatus::InProgress,
            result: None,
            error: None,
        }
    }

    pub fn succeeded(result: Option<Value>) -> Self {
        Self {
            status: OperationStatus::Succeeded,
            result,
            error: None,
        }
    }

    pub fn failed(status: OperationStatus, error: impl Into<String>) -> Self {
        Self {
            status,
            result: None,
            error: Some(error.into()),
        }
    }
}
