//! Stage sequencing shared by every sample
//!
//! A run is always: ensure the resource group, run the workflow's steps one
//! after another, then tear the group down unless the resources are kept.
//! The first error aborts the run; nothing after it is attempted, teardown
//! included.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::error::Result;
use crate::poller::{Clock, ProgressCallback, TokioClock, wait_until_terminal};
use crate::provider::ResourceProvider;
use crate::resource::{Resource, ResourceRef};

static TOKIO_CLOCK: TokioClock = TokioClock;

/// Whether a workflow deletes its resource group at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TeardownPolicy {
    /// Delete the group unless the keep flag is set
    WhenNotKept,
    /// Never delete the group after `run`; `cleanup` still can
    Disabled,
}

/// How far a run got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    NotStarted,
    GroupEnsured,
    Provisioned,
    TornDown,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::NotStarted => write!(f, "not-started"),
            Stage::GroupEnsured => write!(f, "group-ensured"),
            Stage::Provisioned => write!(f, "provisioned"),
            Stage::TornDown => write!(f, "torn-down"),
        }
    }
}

/// One logged result of a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutput {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub sample: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    pub steps: Vec<StepOutput>,
    pub stage: Stage,
    pub torn_down: bool,
}

/// A provisioning workflow run between group ensure and teardown
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Sample name used in logs and reports
    fn name(&self) -> &str;

    fn teardown_policy(&self) -> TeardownPolicy {
        TeardownPolicy::WhenNotKept
    }

    /// Create and inspect resources, strictly in order
    async fn provision(&self, steps: &mut Steps<'_>) -> Result<()>;
}

/// Handle through which a workflow talks to the provider
///
/// Each method issues one remote call, waits for any long-running
/// operation to finish, and logs the outcome before returning.
pub struct Steps<'a> {
    config: &'a RunConfig,
    provider: &'a dyn ResourceProvider,
    clock: &'a dyn Clock,
    on_progress: Option<&'a ProgressCallback>,
    outputs: Vec<StepOutput>,
}

impl<'a> Steps<'a> {
    fn new(
        config: &'a RunConfig,
        provider: &'a dyn ResourceProvider,
        clock: &'a dyn Clock,
        on_progress: Option<&'a ProgressCallback>,
    ) -> Self {
        Self {
            config,
            provider,
            clock,
            on_progress,
            outputs: Vec::new(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        self.config
    }

    pub fn group(&self) -> &str {
        &self.config.resource_group
    }

    pub fn location(&self) -> &str {
        &self.config.location
    }

    pub fn subscription_id(&self) -> &str {
        &self.config.subscription_id
    }

    /// A top-level resource in the run's resource group
    pub fn resource(
        &self,
        namespace: &str,
        resource_type: &str,
        name: &str,
        api_version: &str,
    ) -> ResourceRef {
        ResourceRef::in_group(self.group(), namespace, resource_type, name, api_version)
    }

    pub fn outputs(&self) -> &[StepOutput] {
        &self.outputs
    }

    /// Create or update `resource` and return what the provider reports
    pub async fn create(&mut self, label: &str, resource: &ResourceRef, body: &Value) -> Result<Resource> {
        debug!(resource = %resource, "creating");
        let operation = self.provider.begin_create(resource, body).await?;
        let result = wait_until_terminal(
            self.provider,
            &operation,
            &self.config.poll,
            self.clock,
            self.on_progress,
        )
        .await?;

        let created = match result {
            Some(value) => Resource::from_value(value)?,
            None => self.provider.get_resource(resource).await?,
        };
        self.push(label, Some(created.id.clone()), None);
        Ok(created)
    }

    pub async fn get(&mut self, label: &str, resource: &ResourceRef) -> Result<Resource> {
        let found = self.provider.get_resource(resource).await?;
        self.push(label, Some(found.id.clone()), None);
        Ok(found)
    }

    pub async fn exists(&mut self, label: &str, resource: &ResourceRef) -> Result<bool> {
        let exists = self.provider.resource_exists(resource).await?;
        self.push(label, None, Some(Value::Bool(exists)));
        Ok(exists)
    }

    /// Invoke `action` on `resource` and wait for it to finish
    pub async fn action(
        &mut self,
        label: &str,
        resource: &ResourceRef,
        action: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        debug!(resource = %resource, action, "invoking action");
        let operation = self.provider.begin_action(resource, action, body).await?;
        let result = wait_until_terminal(
            self.provider,
            &operation,
            &self.config.poll,
            self.clock,
            self.on_progress,
        )
        .await?;
        self.push(label, Some(resource.id(self.subscription_id())), result.clone());
        Ok(result)
    }

    pub async fn delete(&mut self, label: &str, resource: &ResourceRef) -> Result<()> {
        let operation = self.provider.begin_delete(resource).await?;
        wait_until_terminal(
            self.provider,
            &operation,
            &self.config.poll,
            self.clock,
            self.on_progress,
        )
        .await?;
        self.push(label, Some(resource.id(self.subscription_id())), None);
        Ok(())
    }

    /// Record a local result (no remote call)
    pub fn record(&mut self, label: &str, id: Option<String>, detail: Option<Value>) {
        self.push(label, id, detail);
    }

    fn push(&mut self, label: &str, id: Option<String>, detail: Option<Value>) {
        match &id {
            Some(id) => info!("{}: {}", label, id),
            None => info!("{}", label),
        }
        self.outputs.push(StepOutput {
            label: label.to_string(),
            id,
            detail,
        });
    }
}

/// Drives a [`Workflow`] through the run stages
pub struct Sequencer<'a> {
    config: &'a RunConfig,
    provider: &'a dyn ResourceProvider,
    clock: &'a dyn Clock,
    on_progress: Option<ProgressCallback>,
}

impl<'a> Sequencer<'a> {
    pub fn new(config: &'a RunConfig, provider: &'a dyn ResourceProvider) -> Self {
        Self {
            config,
            provider,
            clock: &TOKIO_CLOCK,
            on_progress: None,
        }
    }

    /// Use a different time source (tests)
    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Run `workflow` end to end
    ///
    /// Ensures the resource group, provisions, then deletes the group when
    /// the workflow's policy allows it and the keep flag is unset. Any error
    /// is returned as-is and leaves the provisioned resources in place.
    pub async fn run(&self, workflow: &dyn Workflow) -> Result<RunReport> {
        let config = self.config;
        info!(
            sample = workflow.name(),
            provider = self.provider.name(),
            group = %config.resource_group,
            location = %config.location,
            "starting run"
        );

        let mut steps = Steps::new(config, self.provider, self.clock, self.on_progress.as_ref());

        let group = self
            .provider
            .ensure_group(&config.resource_group, &config.location)
            .await?;
        steps.record("resources group", Some(group.id.clone()), None);
        let mut stage = advance(Stage::NotStarted, Stage::GroupEnsured);

        workflow.provision(&mut steps).await?;
        stage = advance(stage, Stage::Provisioned);

        let torn_down = match workflow.teardown_policy() {
            TeardownPolicy::Disabled => {
                debug!(sample = workflow.name(), "teardown disabled for this sample");
                false
            }
            TeardownPolicy::WhenNotKept => self.teardown().await?,
        };
        if torn_down {
            stage = advance(stage, Stage::TornDown);
        }

        Ok(RunReport {
            sample: workflow.name().to_string(),
            subscription_id: config.subscription_id.clone(),
            resource_group: config.resource_group.clone(),
            location: config.location.clone(),
            steps: steps.outputs,
            stage,
            torn_down,
        })
    }

    /// Delete the run's resource group unless resources are kept
    ///
    /// Returns `true` when the group was deleted, `false` when the keep flag
    /// suppressed it or the group was already gone.
    pub async fn teardown(&self) -> Result<bool> {
        let config = self.config;
        if config.keep_resources {
            info!(group = %config.resource_group, "keeping resources");
            return Ok(false);
        }

        let operation = match self.provider.begin_delete_group(&config.resource_group).await {
            Ok(op) => op,
            Err(e) if e.is_not_found() => {
                info!(group = %config.resource_group, "resource group already absent");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        wait_until_terminal(
            self.provider,
            &operation,
            &config.poll,
            self.clock,
            self.on_progress.as_ref(),
        )
        .await?;
        info!("cleaned up successfully.");
        Ok(true)
    }
}

fn advance(current: Stage, next: Stage) -> Stage {
    debug!(from = %current, to = %next, "stage");
    next
}
