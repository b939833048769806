//! Blocking wait for long-running operations
//!
//! Most management calls return an [`Operation`] that must be polled until
//! it reaches a terminal state before the next step may start. This module
//! provides that loop, with the interval and upper bound taken from
//! [`PollConfig`] and time read through a [`Clock`] so tests can run it
//! against virtual time.

use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::config::PollConfig;
use crate::error::{CoreError, Result};
use crate::operation::{Operation, OperationStatus};
use crate::provider::ResourceProvider;

/// Source of time for the poll loop
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Progress events emitted while waiting on an operation
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Polling has begun
    Started { operation: String },
    /// One status read
    Polling {
        operation: String,
        status: OperationStatus,
        elapsed: Duration,
    },
    /// Terminal success
    Completed { operation: String },
    /// Terminal failure or cancellation
    Failed { operation: String, error: String },
}

/// Callback type for progress updates
///
/// The CLI uses this to drive a spinner; library callers usually pass `None`.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Poll `operation` until it reaches a terminal state
///
/// An operation that is already terminal is resolved without any remote
/// call. Otherwise exactly one `poll_operation` is issued per observed state,
/// separated by `config.interval`.
///
/// # Returns
///
/// The operation's result body on success (`None` when the provider has
/// none, e.g. deletes), `OperationFailed` on failure or cancellation, and
/// `OperationTimeout` once more than `config.timeout` has elapsed.
pub async fn wait_until_terminal(
    provider: &dyn ResourceProvider,
    operation: &Operation,
    config: &PollConfig,
    clock: &dyn Clock,
    on_progress: Option<&ProgressCallback>,
) -> Result<Option<Value>> {
    match operation.status {
        OperationStatus::Succeeded => return Ok(operation.result.clone()),
        OperationStatus::Failed | OperationStatus::Canceled => {
            return Err(CoreError::OperationFailed {
                operation: operation.description.clone(),
                status: operation.status.to_string(),
                message: "operation failed on submission".to_string(),
            });
        }
        OperationStatus::InProgress => {}
    }

    let start = clock.now();
    emit(
        on_progress,
        ProgressEvent::Started {
            operation: operation.description.clone(),
        },
    );

    loop {
        let elapsed = clock.now().saturating_duration_since(start);
        if elapsed > config.timeout {
            let error = format!("timed out after {:?}", config.timeout);
            emit(
                on_progress,
                ProgressEvent::Failed {
                    operation: operation.description.clone(),
                    error,
                },
            );
            return Err(CoreError::OperationTimeout {
                operation: operation.description.clone(),
                timeout: config.timeout,
            });
        }

        let poll = provider.poll_operation(operation).await?;
        trace!(operation = %operation.description, status = %poll.status, "polled");

        emit(
            on_progress,
            ProgressEvent::Polling {
                operation: operation.description.clone(),
                status: poll.status,
                elapsed,
            },
        );

        match poll.status {
            OperationStatus::Succeeded => {
                debug!(operation = %operation.description, ?elapsed, "operation succeeded");
                emit(
                    on_progress,
                    ProgressEvent::Completed {
                        operation: operation.description.clone(),
                    },
                );
                return Ok(poll.result.or_else(|| operation.result.clone()));
            }
            OperationStatus::Failed | OperationStatus::Canceled => {
                let message = poll
                    .error
                    .unwrap_or_else(|| format!("operation ended with status {}", poll.status));
                emit(
                    on_progress,
                    ProgressEvent::Failed {
                        operation: operation.description.clone(),
                        error: message.clone(),
                    },
                );
                return Err(CoreError::OperationFailed {
                    operation: operation.description.clone(),
                    status: poll.status.to_string(),
                    message,
                });
            }
            OperationStatus::InProgress => {
                clock.sleep(config.interval).await;
            }
        }
    }
}

fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
