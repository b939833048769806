//! [`ResourceProvider`] over the Azure Resource Manager REST API
//!
//! Every resource is addressed by its ARM id and api-version, so one
//! generic provider serves all samples. Creates are `PUT`s (create or
//! update), actions are `POST {id}/{action}`, deletes are `DELETE`.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use crate::auth::TokenCredential;
use crate::config::RunConfig;
use crate::error::{CoreError, Result};
use crate::operation::{Operation, OperationPoll, OperationStatus, PollKind};
use crate::provider::ResourceProvider;
use crate::resource::{Resource, ResourceGroup, ResourceRef};

pub mod client;
pub mod lro;

pub use client::{ArmClient, ArmResponse};
use lro::Verb;

/// api-version used for resource group calls
pub const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";

/// Live provider for one subscription
pub struct ArmProvider {
    client: ArmClient,
    subscription_id: String,
    next_op: AtomicU64,
}

impl ArmProvider {
    pub fn new(config: &RunConfig, credential: Arc<dyn TokenCredential>) -> Result<Self> {
        Ok(Self {
            client: ArmClient::new(&config.management_endpoint, credential)?,
            subscription_id: config.subscription_id.clone(),
            next_op: AtomicU64::new(0),
        })
    }

    fn resource_url(&self, resource: &ResourceRef) -> String {
        self.client
            .url(&resource.id(&self.subscription_id), &resource.api_version)
    }

    fn group_url(&self, name: &str) -> String {
        self.client.url(
            &ResourceGroup::id_for(&self.subscription_id, name),
            RESOURCE_GROUPS_API_VERSION,
        )
    }

    fn operation_id(&self) -> String {
        format!("arm-{}", self.next_op.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait]
impl ResourceProvider for ArmProvider {
    fn name(&self) -> &str {
        "arm"
    }

    async fn ensure_group(&self, name: &str, location: &str) -> Result<ResourceGroup> {
        let url = self.group_url(name);
        info!(group = name, location, "ensuring resource group");
        let response = self
            .client
            .send(Method::PUT, &url, Some(&json!({"location": location})))
            .await?
            .error_for_status()?;
        Ok(serde_json::from_value(response.body)?)
    }

    async fn begin_create(&self, resource: &ResourceRef, body: &Value) -> Result<Operation> {
        let url = self.resource_url(resource);
        let response = self.client.send(Method::PUT, &url, Some(body)).await?;
        debug!(resource = %resource, status = %response.status, "create submitted");
        lro::classify(
            self.operation_id(),
            format!("create {}", resource),
            Verb::Put,
            response,
            &url,
        )
    }

    async fn get_resource(&self, resource: &ResourceRef) -> Result<Resource> {
        let url = self.resource_url(resource);
        let response = self
            .client
            .send(Method::GET, &url, None)
            .await?
            .error_for_status()?;
        Resource::from_value(response.body)
    }

    async fn resource_exists(&self, resource: &ResourceRef) -> Result<bool> {
        let url = self.resource_url(resource);
        let response = self.client.send(Method::HEAD, &url, None).await?;
        match response.status {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            _ => response.error_for_status().map(|_| true),
        }
    }

    async fn begin_action(
        &self,
        resource: &ResourceRef,
        action: &str,
        body: Option<&Value>,
    ) -> Result<Operation> {
        let id = resource.id(&self.subscription_id);
        let url = self
            .client
            .url(&format!("{}/{}", id, action), &resource.api_version);
        let response = self.client.send(Method::POST, &url, body).await?;
        debug!(resource = %resource, action, status = %response.status, "action submitted");
        lro::classify(
            self.operation_id(),
            format!("{} {}", action, resource),
            Verb::Post,
            response,
            &self.resource_url(resource),
        )
    }

    async fn begin_delete(&self, resource: &ResourceRef) -> Result<Operation> {
        let url = self.resource_url(resource);
        let response = self.client.send(Method::DELETE, &url, None).await?;
        lro::classify(
            self.operation_id(),
            format!("delete {}", resource),
            Verb::Delete,
            response,
            &url,
        )
    }

    async fn begin_delete_group(&self, name: &str) -> Result<Operation> {
        let url = self.group_url(name);
        info!(group = name, "deleting resource group");
        let response = self.client.send(Method::DELETE, &url, None).await?;
        lro::classify(
            self.operation_id(),
            format!("delete resource group '{}'", name),
            Verb::Delete,
            response,
            &url,
        )
    }

    async fn poll_operation(&self, operation: &Operation) -> Result<OperationPoll> {
        if operation.poll_kind == PollKind::Opaque {
            return Err(CoreError::Validation(format!(
                "operation '{}' cannot be polled",
                operation.id
            )));
        }
        let poll_url = operation.poll_url.as_deref().ok_or_else(|| {
            CoreError::Validation(format!("operation '{}' has no poll URL", operation.id))
        })?;

        let response = self.client.send(Method::GET, poll_url, None).await?;
        let mut poll = lro::interpret(operation, response)?;

        if poll.status == OperationStatus::Succeeded
            && let Some(final_url) = operation.final_url.as_deref()
            && final_url != poll_url
        {
            let response = self
                .client
                .send(Method::GET, final_url, None)
                .await?
                .error_for_status()?;
            if response.body != Value::Null {
                poll.result = Some(response.body);
            }
        }
        Ok(poll)
    }
}
