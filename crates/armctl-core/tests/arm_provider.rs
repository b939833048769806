//! Live provider behaviour against a mock management endpoint

use armctl_core::arm::ArmProvider;
use armctl_core::auth::StaticTokenCredential;
use armctl_core::testing::FakeClock;
use armctl_core::{
    CoreError, OperationStatus, PollConfig, PollKind, ResourceProvider, ResourceRef, RunConfig,
    wait_until_terminal,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GROUP_PATH: &str = "/subscriptions/sub/resourceGroups/rg";
const SERVER_PATH: &str =
    "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.DBforMySQL/servers/s1";

fn provider(server: &MockServer) -> ArmProvider {
    let config = RunConfig::new("sub")
        .with_resource_group("rg")
        .with_management_endpoint(server.uri());
    ArmProvider::new(&config, Arc::new(StaticTokenCredential::new("test-token"))).unwrap()
}

fn mysql() -> ResourceRef {
    ResourceRef::in_group("rg", "Microsoft.DBforMySQL", "servers", "s1", "2017-12-01")
}

fn poll_config() -> PollConfig {
    PollConfig::new(Duration::from_secs(5), Duration::from_secs(300))
}

#[tokio::test]
async fn ensure_group_puts_location() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(GROUP_PATH))
        .and(query_param("api-version", "2021-04-01"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({"location": "westus"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "/subscriptions/sub/resourceGroups/rg",
            "name": "rg",
            "location": "westus",
            "properties": {"provisioningState": "Succeeded"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let group = provider(&server).ensure_group("rg", "westus").await.unwrap();
    assert_eq!(group.name, "rg");
    assert_eq!(group.provisioning_state(), Some("Succeeded"));
}

#[tokio::test]
async fn create_follows_async_operation_then_reads_resource() {
    let server = MockServer::start().await;
    let status_url = format!("{}/operations/op1", server.uri());

    Mock::given(method("PUT"))
        .and(path(SERVER_PATH))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Azure-AsyncOperation", status_url.as_str())
                .set_body_json(json!({"properties": {"provisioningState": "Creating"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SERVER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": SERVER_PATH,
            "name": "s1",
            "type": "Microsoft.DBforMySQL/servers",
            "properties": {"provisioningState": "Succeeded"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let clock = FakeClock::new();
    let op = provider
        .begin_create(&mysql(), &json!({"location": "westus"}))
        .await
        .unwrap();
    assert_eq!(op.poll_kind, PollKind::AsyncOperation);

    let result = wait_until_terminal(&provider, &op, &poll_config(), &clock, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result["id"], SERVER_PATH);
    assert_eq!(clock.sleeps().len(), 2);
}

#[tokio::test]
async fn failed_async_operation_carries_service_message() {
    let server = MockServer::start().await;
    let status_url = format!("{}/operations/op2", server.uri());

    Mock::given(method("PUT"))
        .and(path(SERVER_PATH))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", status_url.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": {"code": "SkuNotAvailable", "message": "not offered in westus"}
        })))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let op = provider.begin_create(&mysql(), &json!({})).await.unwrap();
    let err = wait_until_terminal(&provider, &op, &poll_config(), &FakeClock::new(), None)
        .await
        .unwrap_err();

    match err {
        CoreError::OperationFailed { status, message, .. } => {
            assert_eq!(status, "Failed");
            assert!(message.contains("SkuNotAvailable"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn group_delete_polls_location_until_done() {
    let server = MockServer::start().await;
    let location = format!("{}/operationresults/del1", server.uri());

    Mock::given(method("DELETE"))
        .and(path(GROUP_PATH))
        .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationresults/del1"))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationresults/del1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let clock = FakeClock::new();
    let op = provider.begin_delete_group("rg").await.unwrap();
    assert_eq!(op.poll_kind, PollKind::Location);

    let result = wait_until_terminal(&provider, &op, &poll_config(), &clock, None)
        .await
        .unwrap();
    assert_eq!(result, None);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
}

#[tokio::test]
async fn provisioning_state_is_polled_on_the_resource() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(SERVER_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": SERVER_PATH,
            "properties": {"provisioningState": "Accepted"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SERVER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": SERVER_PATH,
            "properties": {"provisioningState": "Updating"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SERVER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": SERVER_PATH,
            "name": "s1",
            "properties": {"provisioningState": "Succeeded"}
        })))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let op = provider.begin_create(&mysql(), &json!({})).await.unwrap();
    assert_eq!(op.poll_kind, PollKind::ProvisioningState);

    let poll = provider.poll_operation(&op).await.unwrap();
    assert_eq!(poll.status, OperationStatus::InProgress);
    let poll = provider.poll_operation(&op).await.unwrap();
    assert_eq!(poll.status, OperationStatus::Succeeded);
    assert_eq!(poll.result.unwrap()["name"], "s1");
}

#[tokio::test]
async fn not_found_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SERVER_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "ResourceNotFound", "message": "The Resource was not found."}
        })))
        .mount(&server)
        .await;

    let err = provider(&server).get_resource(&mysql()).await.unwrap_err();
    assert!(err.is_not_found());
    match err {
        CoreError::Api { code, message, .. } => {
            assert_eq!(code.as_deref(), Some("ResourceNotFound"));
            assert_eq!(message, "The Resource was not found.");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unauthorized_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "AuthorizationFailed", "message": "no access"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .ensure_group("rg", "westus")
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn exists_uses_head() {
    let server = MockServer::start().await;
    let deployments = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Resources/deployments";
    Mock::given(method("HEAD"))
        .and(path(format!("{}/present", deployments)))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path(format!("{}/absent", deployments)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let present = ResourceRef::in_group("rg", "Microsoft.Resources", "deployments", "present", "2021-04-01");
    let absent = ResourceRef::in_group("rg", "Microsoft.Resources", "deployments", "absent", "2021-04-01");
    assert!(provider.resource_exists(&present).await.unwrap());
    assert!(!provider.resource_exists(&absent).await.unwrap());
}

#[tokio::test]
async fn action_posts_to_resource_suffix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/listKeys", SERVER_PATH)))
        .and(query_param("api-version", "2017-12-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key1": "k"})))
        .expect(1)
        .mount(&server)
        .await;

    let op = provider(&server)
        .begin_action(&mysql(), "listKeys", None)
        .await
        .unwrap();
    assert!(op.is_terminal());
    assert_eq!(op.result, Some(json!({"key1": "k"})));
}
