//! The capability interface every stage talks to
//!
//! One method per verb the samples actually use. The ARM REST provider and
//! the in-memory fake both implement it, so the orchestration is tested
//! without touching a real subscription.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::operation::{Operation, OperationPoll};
use crate::resource::{Resource, ResourceGroup, ResourceRef};

/// Remote management API
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Create or update a resource group; a no-op when it already matches
    async fn ensure_group(&self, name: &str, location: &str) -> Result<ResourceGroup>;

    /// Start a create-or-update of `resource` with `body`
    async fn begin_create(&self, resource: &ResourceRef, body: &Value) -> Result<Operation>;

    /// Read a resource back
    async fn get_resource(&self, resource: &ResourceRef) -> Result<Resource>;

    /// Existence check without fetching the representation
    async fn resource_exists(&self, resource: &ResourceRef) -> Result<bool>;

    /// Invoke a resource action (`purge`, `start`, `listKeys`, ...)
    async fn begin_action(
        &self,
        resource: &ResourceRef,
        action: &str,
        body: Option<&Value>,
    ) -> Result<Operation>;

    /// Delete a single resource
    async fn begin_delete(&self, resource: &ResourceRef) -> Result<Operation>;

    /// Delete a resource group and everything in it
    async fn begin_delete_group(&self, name: &str) -> Result<Operation>;

    /// Observe the current status of a pending operation
    async fn poll_operation(&self, operation: &Operation) -> Result<OperationPoll>;
}
