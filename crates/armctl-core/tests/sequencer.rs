//! Ordering and teardown guarantees of a run, checked against the in-memory provider

use armctl_core::testing::{Call, CallKind, FakeClock, FakeProvider};
use armctl_core::{
    CoreError, OperationStatus, PollConfig, RunConfig, SampleKind, SampleSettings, Sequencer,
    Stage, Steps, Workflow,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;

fn config(keep: bool) -> RunConfig {
    RunConfig::new("sub")
        .with_resource_group("rg")
        .with_keep_resources(keep)
        .with_poll(PollConfig::new(Duration::from_secs(10), Duration::from_secs(600)))
}

/// Creates a server and reads it back by (group, name)
struct CreateThenGet;

#[async_trait]
impl Workflow for CreateThenGet {
    fn name(&self) -> &str {
        "create-then-get"
    }

    async fn provision(&self, steps: &mut Steps<'_>) -> armctl_core::Result<()> {
        let server = steps.resource("Microsoft.DBforMySQL", "servers", "s", "2017-12-01");
        steps
            .create("server", &server, &json!({"location": steps.location()}))
            .await?;
        steps.get("get server", &server).await?;
        Ok(())
    }
}

#[tokio::test]
async fn group_is_ensured_before_any_create() {
    let provider = FakeProvider::new("sub");
    let clock = FakeClock::new();
    let config = config(false);

    for kind in SampleKind::all() {
        let settings = match kind {
            SampleKind::Deployment => SampleSettings::default()
                .with_template_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata")),
            _ => SampleSettings::default(),
        };
        let workflow = kind.build(&settings).unwrap();
        Sequencer::new(&config, &provider)
            .with_clock(&clock)
            .run(workflow.as_ref())
            .await
            .unwrap_or_else(|e| panic!("{} failed: {}", kind, e));
    }

    // every run starts with an ensure and no create precedes its own ensure
    let calls = provider.calls();
    let mut ensured = false;
    for call in &calls {
        match call {
            Call::EnsureGroup { .. } => ensured = true,
            Call::Create { .. } | Call::Action { .. } | Call::Get { .. } | Call::Exists { .. } => {
                assert!(ensured, "{:?} issued before the group was ensured", call)
            }
            Call::DeleteGroup { .. } => ensured = false,
            _ => {}
        }
    }
    assert_eq!(
        provider.calls_of(CallKind::EnsureGroup).len(),
        SampleKind::all().len()
    );
}

#[tokio::test]
async fn ensure_failure_stops_everything() {
    let provider = FakeProvider::new("sub");
    provider.fail(CallKind::EnsureGroup, None, 403, "AuthorizationFailed");
    let clock = FakeClock::new();
    let config = config(false);

    let err = Sequencer::new(&config, &provider)
        .with_clock(&clock)
        .run(&CreateThenGet)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Api { status: 403, .. }));
    assert_eq!(
        provider.calls(),
        vec![Call::EnsureGroup {
            name: "rg".into(),
            location: "westus".into()
        }]
    );
}

#[tokio::test]
async fn waits_through_every_running_state() {
    let provider = FakeProvider::new("sub");
    provider.script_create("s", 3, OperationStatus::Succeeded);
    let clock = FakeClock::new();
    let config = config(true);

    Sequencer::new(&config, &provider)
        .with_clock(&clock)
        .run(&CreateThenGet)
        .await
        .unwrap();

    let calls = provider.calls();
    let polls = calls.iter().filter(|c| c.kind() == CallKind::Poll).count();
    assert_eq!(polls, 4);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(10); 3]);

    // the read-back comes only after the last poll
    let last_poll = calls.iter().rposition(|c| c.kind() == CallKind::Poll).unwrap();
    let get = calls.iter().position(|c| c.kind() == CallKind::Get).unwrap();
    assert!(get > last_poll);
}

#[tokio::test]
async fn failed_operation_aborts_without_teardown() {
    let provider = FakeProvider::new("sub");
    provider.script_create("s", 1, OperationStatus::Failed);
    let clock = FakeClock::new();
    let config = config(false);

    let err = Sequencer::new(&config, &provider)
        .with_clock(&clock)
        .run(&CreateThenGet)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::OperationFailed { .. }));
    assert!(provider.calls_of(CallKind::Get).is_empty());
    assert!(provider.calls_of(CallKind::DeleteGroup).is_empty());
}

#[tokio::test]
async fn keep_flag_suppresses_teardown() {
    let provider = FakeProvider::new("sub");
    let clock = FakeClock::new();
    let config = config(true);
    let sequencer = Sequencer::new(&config, &provider).with_clock(&clock);

    let report = sequencer.run(&CreateThenGet).await.unwrap();
    let cleaned = sequencer.teardown().await.unwrap();

    assert_eq!(report.stage, Stage::Provisioned);
    assert!(!report.torn_down);
    assert!(!cleaned);
    assert!(provider.calls_of(CallKind::DeleteGroup).is_empty());
    assert!(provider.has_group("rg"));
}

#[tokio::test]
async fn teardown_runs_once_after_everything_else() {
    let provider = FakeProvider::new("sub");
    provider.script_delete_group("rg", 2, OperationStatus::Succeeded);
    let clock = FakeClock::new();
    let config = config(false);

    let report = Sequencer::new(&config, &provider)
        .with_clock(&clock)
        .run(&CreateThenGet)
        .await
        .unwrap();

    let calls = provider.calls();
    let deletes: Vec<_> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind() == CallKind::DeleteGroup)
        .collect();
    assert_eq!(deletes.len(), 1);
    let (delete_at, _) = deletes[0];
    assert!(
        calls[..delete_at]
            .iter()
            .any(|c| c.kind() == CallKind::Get)
    );
    assert!(calls[delete_at + 1..].iter().all(|c| c.kind() == CallKind::Poll));
    assert_eq!(report.stage, Stage::TornDown);
    assert!(!provider.has_group("rg"));
    assert_eq!(provider.resource_count(), 0);
}

#[tokio::test]
async fn explicit_cleanup_deletes_group() {
    let provider = FakeProvider::new("sub");
    let clock = FakeClock::new();
    let config = config(false);
    let sequencer = Sequencer::new(&config, &provider).with_clock(&clock);

    let kept = SampleKind::WebApp.build(&SampleSettings::default()).unwrap();
    sequencer.run(kept.as_ref()).await.unwrap();
    assert!(provider.calls_of(CallKind::DeleteGroup).is_empty());

    assert!(sequencer.teardown().await.unwrap());
    assert_eq!(
        provider.calls_of(CallKind::DeleteGroup),
        vec![Call::DeleteGroup { name: "rg".into() }]
    );
}

#[tokio::test]
async fn create_then_get_yields_same_id() {
    let provider = FakeProvider::new("sub");
    let clock = FakeClock::new();
    let config = config(true);

    let report = Sequencer::new(&config, &provider)
        .with_clock(&clock)
        .run(&CreateThenGet)
        .await
        .unwrap();

    assert_eq!(report.steps[1].id, report.steps[2].id);
    assert_eq!(
        report.steps[1].id.as_deref(),
        Some("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.DBforMySQL/servers/s")
    );
}

#[tokio::test]
async fn poll_timeout_is_reported() {
    let provider = FakeProvider::new("sub");
    provider.script_create("s", 1000, OperationStatus::Succeeded);
    let clock = FakeClock::new();
    let config = RunConfig::new("sub")
        .with_resource_group("rg")
        .with_poll(PollConfig::new(Duration::from_secs(10), Duration::from_secs(60)));

    let err = Sequencer::new(&config, &provider)
        .with_clock(&clock)
        .run(&CreateThenGet)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(clock.elapsed() >= Duration::from_secs(60));
    assert!(provider.calls_of(CallKind::DeleteGroup).is_empty());
}
