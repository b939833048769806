//! In-memory test doubles for the provider and the clock
//!
//! [`FakeProvider`] records every call in order, echoes ARM-shaped ids, and
//! lets a test script how many `InProgress` states an operation reports
//! before its terminal state, or make any verb fail. [`FakeClock`] only
//! moves when something sleeps on it.
//!
//! ```rust
//! use armctl_core::testing::{Call, FakeProvider};
//! use armctl_core::ResourceProvider;
//!
//! # tokio_test_block(async {
//! let provider = FakeProvider::new("sub");
//! provider.ensure_group("rg", "westus").await.unwrap();
//! assert_eq!(
//!     provider.calls(),
//!     vec![Call::EnsureGroup { name: "rg".into(), location: "westus".into() }]
//! );
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{CoreError, Result};
use crate::operation::{Operation, OperationPoll, OperationStatus, PollKind};
use crate::poller::Clock;
use crate::provider::ResourceProvider;
use crate::resource::{Resource, ResourceGroup, ResourceGroupProperties, ResourceRef};

/// A recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EnsureGroup { name: String, location: String },
    Create { id: String },
    Get { id: String },
    Exists { id: String },
    Action { id: String, action: String },
    Delete { id: String },
    DeleteGroup { name: String },
    Poll { operation: String },
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Call::EnsureGroup { .. } => CallKind::EnsureGroup,
            Call::Create { .. } => CallKind::Create,
            Call::Get { .. } => CallKind::Get,
            Call::Exists { .. } => CallKind::Exists,
            Call::Action { .. } => CallKind::Action,
            Call::Delete { .. } => CallKind::Delete,
            Call::DeleteGroup { .. } => CallKind::DeleteGroup,
            Call::Poll { .. } => CallKind::Poll,
        }
    }
}

/// Verb of a [`Call`], used for failure injection and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    EnsureGroup,
    Create,
    Get,
    Exists,
    Action,
    Delete,
    DeleteGroup,
    Poll,
}

#[derive(Debug, Clone)]
struct Script {
    running: usize,
    terminal: OperationStatus,
}

#[derive(Debug, Clone)]
struct Failure {
    kind: CallKind,
    target: Option<String>,
    status: u16,
    message: String,
}

#[derive(Debug, Clone)]
enum Effect {
    Upsert { id: String },
    Remove { id: String },
    RemoveGroup { name: String },
    Nothing,
}

#[derive(Debug, Clone)]
struct PendingOp {
    remaining: usize,
    terminal: OperationStatus,
    effect: Effect,
    result: Option<Value>,
    polls: usize,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    groups: HashMap<String, ResourceGroup>,
    resources: HashMap<String, Value>,
    scripts: HashMap<String, Script>,
    failures: Vec<Failure>,
    operations: HashMap<String, PendingOp>,
    next_op: usize,
}

/// In-memory [`ResourceProvider`]
#[derive(Debug)]
pub struct FakeProvider {
    subscription_id: String,
    state: Mutex<State>,
}

impl FakeProvider {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls of one kind, in order
    pub fn calls_of(&self, kind: CallKind) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.kind() == kind)
            .cloned()
            .collect()
    }

    /// Number of status reads issued for one operation
    pub fn poll_count(&self, operation_id: &str) -> usize {
        self.lock()
            .operations
            .get(operation_id)
            .map(|op| op.polls)
            .unwrap_or(0)
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.lock().groups.contains_key(name)
    }

    /// Stored representation of a resource by id
    pub fn resource(&self, id: &str) -> Option<Value> {
        self.lock().resources.get(id).cloned()
    }

    pub fn resource_count(&self) -> usize {
        self.lock().resources.len()
    }

    /// Make the create of resource `name` report `running` in-progress
    /// states before `terminal`
    pub fn script_create(&self, name: &str, running: usize, terminal: OperationStatus) {
        self.script(name.to_string(), running, terminal);
    }

    /// Same as [`script_create`](Self::script_create) for an action
    pub fn script_action(&self, name: &str, action: &str, running: usize, terminal: OperationStatus) {
        self.script(format!("{}/{}", name, action), running, terminal);
    }

    /// Same as [`script_create`](Self::script_create) for a group delete
    pub fn script_delete_group(&self, name: &str, running: usize, terminal: OperationStatus) {
        self.script(format!("group:{}", name), running, terminal);
    }

    fn script(&self, key: String, running: usize, terminal: OperationStatus) {
        self.lock().scripts.insert(key, Script { running, terminal });
    }

    /// Fail every call of `kind` (optionally only those whose target name
    /// matches) with an API error
    pub fn fail(&self, kind: CallKind, target: Option<&str>, status: u16, message: &str) {
        self.lock().failures.push(Failure {
            kind,
            target: target.map(str::to_string),
            status,
            message: message.to_string(),
        });
    }

    /// Seed a resource as if it already existed
    pub fn insert_resource(&self, resource: &ResourceRef, body: Value) {
        let id = resource.id(&self.subscription_id);
        let value = representation(&id, resource, &body, "Succeeded");
        self.lock().resources.insert(id, value);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_failure(state: &State, kind: CallKind, target: &str) -> Result<()> {
        let hit = state.failures.iter().find(|f| {
            f.kind == kind && f.target.as_deref().map(|t| t == target).unwrap_or(true)
        });
        match hit {
            Some(f) => Err(CoreError::api(f.status, None, f.message.clone())),
            None => Ok(()),
        }
    }

    fn start_op(
        state: &mut State,
        key: &str,
        description: String,
        effect: Effect,
        result: Option<Value>,
    ) -> Operation {
        state.next_op += 1;
        let id = format!("op-{}", state.next_op);
        let script = state.scripts.get(key).cloned().unwrap_or(Script {
            running: 0,
            terminal: OperationStatus::Succeeded,
        });
        state.operations.insert(
            id.clone(),
            PendingOp {
                remaining: script.running,
                terminal: script.terminal,
                effect,
                result,
                polls: 0,
            },
        );
        Operation::pending(id, description, PollKind::Opaque)
    }

    fn parent_exists(&self, state: &State, resource: &ResourceRef) -> Result<()> {
        if let Some(group) = resource.group()
            && !state.groups.contains_key(group)
        {
            return Err(CoreError::api(
                404,
                Some("ResourceGroupNotFound".to_string()),
                format!("Resource group '{}' could not be found.", group),
            ));
        }
        if resource.path.len() > 1 {
            let mut parent = resource.clone();
            parent.path.pop();
            let parent_id = parent.id(&self.subscription_id);
            if !state.resources.contains_key(&parent_id) {
                return Err(CoreError::api(
                    404,
                    Some("ParentResourceNotFound".to_string()),
                    format!("Parent resource '{}' not found.", parent_id),
                ));
            }
        }
        Ok(())
    }
}

fn representation(id: &str, resource: &ResourceRef, body: &Value, state: &str) -> Value {
    let mut properties = body.get("properties").cloned().unwrap_or_else(|| json!({}));
    if let Value::Object(map) = &mut properties {
        map.insert("provisioningState".to_string(), json!(state));
    }
    let mut value = json!({
        "id": id,
        "name": resource.name(),
        "type": resource.type_name(),
        "properties": properties,
    });
    if let Some(location) = body.get("location") {
        value["location"] = location.clone();
    }
    if let Some(sku) = body.get("sku") {
        value["sku"] = sku.clone();
    }
    value
}

fn default_action_result(resource: &ResourceRef, action: &str, stored: Option<&Value>) -> Option<Value> {
    match action {
        "listKeys" => Some(json!({"key1": "fake-key-1", "key2": "fake-key-2"})),
        "generateSsoUri" => Some(json!({
            "ssoUriValue": format!("https://sso.example.invalid/{}", resource.name())
        })),
        "validate" => Some(json!({"properties": {"provisioningState": "Succeeded"}})),
        _ => stored.cloned(),
    }
}

#[async_trait]
impl ResourceProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn ensure_group(&self, name: &str, location: &str) -> Result<ResourceGroup> {
        let mut state = self.lock();
        state.calls.push(Call::EnsureGroup {
            name: name.to_string(),
            location: location.to_string(),
        });
        Self::check_failure(&state, CallKind::EnsureGroup, name)?;

        let group = ResourceGroup {
            id: ResourceGroup::id_for(&self.subscription_id, name),
            name: name.to_string(),
            location: location.to_string(),
            properties: Some(ResourceGroupProperties {
                provisioning_state: Some("Succeeded".to_string()),
            }),
        };
        state.groups.insert(name.to_string(), group.clone());
        Ok(group)
    }

    async fn begin_create(&self, resource: &ResourceRef, body: &Value) -> Result<Operation> {
        let id = resource.id(&self.subscription_id);
        let mut state = self.lock();
        state.calls.push(Call::Create { id: id.clone() });
        Self::check_failure(&state, CallKind::Create, resource.name())?;
        self.parent_exists(&state, resource)?;

        let value = representation(&id, resource, body, "Creating");
        state.resources.entry(id.clone()).or_insert(value);

        let finished = representation(&id, resource, body, "Succeeded");
        let op = Self::start_op(
            &mut state,
            resource.name(),
            format!("create {}", resource),
            Effect::Upsert { id },
            Some(finished),
        );
        Ok(op)
    }

    async fn get_resource(&self, resource: &ResourceRef) -> Result<Resource> {
        let id = resource.id(&self.subscription_id);
        let mut state = self.lock();
        state.calls.push(Call::Get { id: id.clone() });
        Self::check_failure(&state, CallKind::Get, resource.name())?;

        if let Some(value) = state.resources.get(&id) {
            return Resource::from_value(value.clone());
        }
        // configuration singletons exist as soon as their parent does
        if resource.path.len() > 1
            && resource.path.last().map(|(t, _)| t == "config").unwrap_or(false)
            && self.parent_exists(&state, resource).is_ok()
        {
            return Resource::from_value(representation(&id, resource, &json!({}), "Succeeded"));
        }
        Err(CoreError::api(
            404,
            Some("ResourceNotFound".to_string()),
            format!("The Resource '{}' was not found.", resource.type_name()),
        ))
    }

    async fn resource_exists(&self, resource: &ResourceRef) -> Result<bool> {
        let id = resource.id(&self.subscription_id);
        let mut state = self.lock();
        state.calls.push(Call::Exists { id: id.clone() });
        Self::check_failure(&state, CallKind::Exists, resource.name())?;
        Ok(state.resources.contains_key(&id))
    }

    async fn begin_action(
        &self,
        resource: &ResourceRef,
        action: &str,
        _body: Option<&Value>,
    ) -> Result<Operation> {
        let id = resource.id(&self.subscription_id);
        let mut state = self.lock();
        state.calls.push(Call::Action {
            id: id.clone(),
            action: action.to_string(),
        });
        Self::check_failure(&state, CallKind::Action, resource.name())?;

        let key = format!("{}/{}", resource.name(), action);
        let result = default_action_result(resource, action, state.resources.get(&id));
        if result.is_none() && !state.resources.contains_key(&id) {
            return Err(CoreError::api(
                404,
                Some("ResourceNotFound".to_string()),
                format!("The Resource '{}' was not found.", resource.type_name()),
            ));
        }
        let op = Self::start_op(
            &mut state,
            &key,
            format!("{} {}", action, resource),
            Effect::Nothing,
            result,
        );
        Ok(op)
    }

    async fn begin_delete(&self, resource: &ResourceRef) -> Result<Operation> {
        let id = resource.id(&self.subscription_id);
        let mut state = self.lock();
        state.calls.push(Call::Delete { id: id.clone() });
        Self::check_failure(&state, CallKind::Delete, resource.name())?;

        let op = Self::start_op(
            &mut state,
            &format!("delete:{}", resource.name()),
            format!("delete {}", resource),
            Effect::Remove { id },
            None,
        );
        Ok(op)
    }

    async fn begin_delete_group(&self, name: &str) -> Result<Operation> {
        let mut state = self.lock();
        state.calls.push(Call::DeleteGroup {
            name: name.to_string(),
        });
        Self::check_failure(&state, CallKind::DeleteGroup, name)?;

        let op = Self::start_op(
            &mut state,
            &format!("group:{}", name),
            format!("delete resource group '{}'", name),
            Effect::RemoveGroup {
                name: name.to_string(),
            },
            None,
        );
        Ok(op)
    }

    async fn poll_operation(&self, operation: &Operation) -> Result<OperationPoll> {
        let mut state = self.lock();
        state.calls.push(Call::Poll {
            operation: operation.id.clone(),
        });
        Self::check_failure(&state, CallKind::Poll, &operation.id)?;

        let pending = match state.operations.get_mut(&operation.id) {
            Some(op) => op,
            None => {
                return Err(CoreError::api(
                    404,
                    None,
                    format!("operation '{}' not found", operation.id),
                ));
            }
        };
        pending.polls += 1;
        if pending.remaining > 0 {
            pending.remaining -= 1;
            return Ok(OperationPoll::in_progress());
        }

        let terminal = pending.terminal;
        let result = pending.result.clone();
        let effect = std::mem::replace(&mut pending.effect, Effect::Nothing);

        if terminal != OperationStatus::Succeeded {
            return Ok(OperationPoll::failed(
                terminal,
                format!("{} ended with status {}", operation.description, terminal),
            ));
        }

        match effect {
            Effect::Upsert { id } => {
                if let Some(body) = &result {
                    state.resources.insert(id, body.clone());
                }
            }
            Effect::Remove { id } => {
                state.resources.remove(&id);
            }
            Effect::RemoveGroup { name } => {
                state.groups.remove(&name);
                let prefix = format!(
                    "{}/",
                    ResourceGroup::id_for(&self.subscription_id, &name)
                );
                state.resources.retain(|id, _| !id.starts_with(&prefix));
            }
            Effect::Nothing => {}
        }

        Ok(OperationPoll::succeeded(result))
    }
}

/// Virtual clock: `sleep` advances time instantly and is recorded
#[derive(Debug)]
pub struct FakeClock {
    start: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Every sleep requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Total virtual time elapsed
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|o| *o).unwrap_or_default()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += duration;
        }
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(group: &str) -> ResourceRef {
        ResourceRef::in_group(group, "Microsoft.DBforMySQL", "servers", "s", "2017-12-01")
    }

    #[tokio::test]
    async fn create_requires_group() {
        let provider = FakeProvider::new("sub");
        let err = provider
            .begin_create(&server("missing"), &json!({}))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn child_requires_parent() {
        let provider = FakeProvider::new("sub");
        provider.ensure_group("rg", "westus").await.unwrap();
        let child = server("rg").child("databases", "db");
        let err = provider.begin_create(&child, &json!({})).await.unwrap_err();
        assert!(err.to_string().contains("ParentResourceNotFound"));
    }

    #[tokio::test]
    async fn group_delete_cascades() {
        let provider = FakeProvider::new("sub");
        provider.ensure_group("rg", "westus").await.unwrap();
        provider.insert_resource(&server("rg"), json!({"location": "westus"}));
        assert_eq!(provider.resource_count(), 1);

        let op = provider.begin_delete_group("rg").await.unwrap();
        let poll = provider.poll_operation(&op).await.unwrap();

        assert_eq!(poll.status, OperationStatus::Succeeded);
        assert!(!provider.has_group("rg"));
        assert_eq!(provider.resource_count(), 0);
    }

    #[tokio::test]
    async fn failure_injection_targets_by_name() {
        let provider = FakeProvider::new("sub");
        provider.fail(CallKind::EnsureGroup, Some("bad"), 403, "denied");
        assert!(provider.ensure_group("good", "westus").await.is_ok());
        let err = provider.ensure_group("bad", "westus").await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn clock_advances_only_on_sleep() {
        let clock = FakeClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_secs(10)).await;
        assert_eq!(clock.now() - before, Duration::from_secs(10));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(10)]);
    }
}
