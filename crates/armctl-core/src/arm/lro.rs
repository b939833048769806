//! Long-running operation detection and status reads
//!
//! ARM signals an asynchronous operation in one of three ways, checked in
//! this order:
//!
//! 1. an `Azure-AsyncOperation` header: poll it, read `status` from the JSON
//! 2. a `Location` header on a 202: poll it, 202 means still running
//! 3. a 200/201 whose `properties.provisioningState` is not terminal: poll
//!    the resource itself
//!
//! Anything else finished within the initial call.

use reqwest::StatusCode;
use serde_json::Value;

use super::client::{ArmResponse, api_error};
use crate::error::Result;
use crate::operation::{Operation, OperationPoll, OperationStatus, PollKind};

pub const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";
pub const LOCATION_HEADER: &str = "location";

/// What kind of request started the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// PUT; the final state is the resource itself
    Put,
    /// POST action; the final state is whatever the service returns
    Post,
    Delete,
}

/// Classify an initial response
///
/// `resource_url` is the resource's own URL, used as the final read for PUTs
/// and as the poll target when only `provisioningState` is available.
pub fn classify(
    id: String,
    description: String,
    verb: Verb,
    response: ArmResponse,
    resource_url: &str,
) -> Result<Operation> {
    let response = response.error_for_status()?;
    let async_url = response.header(ASYNC_OPERATION_HEADER).map(str::to_string);
    let location = response.header(LOCATION_HEADER).map(str::to_string);

    if let Some(url) = async_url {
        let op = Operation::pending(id, description, PollKind::AsyncOperation).with_poll_url(url);
        return Ok(match (verb, location) {
            (Verb::Put, _) => op.with_final_url(resource_url),
            (Verb::Post, Some(location)) => op.with_final_url(location),
            _ => op,
        });
    }

    if response.status == StatusCode::ACCEPTED
        && let Some(url) = location
    {
        let op = Operation::pending(id, description, PollKind::Location).with_poll_url(url);
        return Ok(match verb {
            Verb::Put => op.with_final_url(resource_url),
            _ => op,
        });
    }

    let body = non_null(response.body);
    if verb == Verb::Put
        && let Some(state) = provisioning_state(body.as_ref())
    {
        match OperationStatus::parse(state) {
            OperationStatus::InProgress => {
                return Ok(
                    Operation::pending(id, description, PollKind::ProvisioningState)
                        .with_poll_url(resource_url),
                );
            }
            status @ (OperationStatus::Failed | OperationStatus::Canceled) => {
                let mut op = Operation::completed(id, description, body);
                op.status = status;
                return Ok(op);
            }
            OperationStatus::Succeeded => {}
        }
    }

    Ok(Operation::completed(id, description, body))
}

/// Interpret one status read for `operation`
pub fn interpret(operation: &Operation, response: ArmResponse) -> Result<OperationPoll> {
    match operation.poll_kind {
        PollKind::AsyncOperation => {
            let response = response.error_for_status()?;
            let status = response
                .body
                .get("status")
                .and_then(Value::as_str)
                .map(OperationStatus::parse)
                .unwrap_or(OperationStatus::InProgress);
            Ok(match status {
                OperationStatus::InProgress => OperationPoll::in_progress(),
                OperationStatus::Succeeded => {
                    OperationPoll::succeeded(response.body.get("properties").cloned())
                }
                failed => OperationPoll::failed(failed, failure_message(&response.body)),
            })
        }
        PollKind::Location => {
            if response.status == StatusCode::ACCEPTED {
                return Ok(OperationPoll::in_progress());
            }
            if !response.status.is_success() {
                let err = api_error(response.status, &response.body);
                return Ok(OperationPoll::failed(OperationStatus::Failed, err.to_string()));
            }
            Ok(OperationPoll::succeeded(non_null(response.body)))
        }
        PollKind::ProvisioningState => {
            let response = response.error_for_status()?;
            let status = provisioning_state(Some(&response.body))
                .map(OperationStatus::parse)
                .unwrap_or(OperationStatus::Succeeded);
            Ok(match status {
                OperationStatus::InProgress => OperationPoll::in_progress(),
                OperationStatus::Succeeded => OperationPoll::succeeded(non_null(response.body)),
                failed => OperationPoll::failed(
                    failed,
                    format!("provisioningState is {}", failed),
                ),
            })
        }
        PollKind::Opaque => Ok(OperationPoll::in_progress()),
    }
}

fn provisioning_state(body: Option<&Value>) -> Option<&str> {
    body?
        .get("properties")?
        .get("provisioningState")?
        .as_str()
}

fn non_null(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}

fn failure_message(body: &Value) -> String {
    let error = body.get("error");
    let code = error.and_then(|e| e.get("code")).and_then(Value::as_str);
    let message = error.and_then(|e| e.get("message")).and_then(Value::as_str);
    match (code, message) {
        (Some(code), Some(message)) => format!("{}: {}", code, message),
        (None, Some(message)) => message.to_string(),
        (Some(code), None) => code.to_string(),
        (None, None) => "operation failed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde_json::json;

    fn response(status: u16, headers: &[(&'static str, &str)], body: Value) -> ArmResponse {
        let mut map = HeaderMap::new();
        for (k, v) in headers {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        ArmResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: map,
            body,
        }
    }

    const RESOURCE: &str = "https://arm/r?api-version=1";

    #[test]
    fn async_operation_header_wins() {
        let r = response(
            201,
            &[
                ("azure-asyncoperation", "https://arm/ops/1"),
                ("location", "https://arm/loc/1"),
            ],
            json!({"properties": {"provisioningState": "Creating"}}),
        );
        let op = classify("1".into(), "create".into(), Verb::Put, r, RESOURCE).unwrap();
        assert_eq!(op.poll_kind, PollKind::AsyncOperation);
        assert_eq!(op.poll_url.as_deref(), Some("https://arm/ops/1"));
        assert_eq!(op.final_url.as_deref(), Some(RESOURCE));
    }

    #[test]
    fn accepted_with_location() {
        let r = response(202, &[("location", "https://arm/loc/1")], Value::Null);
        let op = classify("1".into(), "delete".into(), Verb::Delete, r, RESOURCE).unwrap();
        assert_eq!(op.poll_kind, PollKind::Location);
        assert_eq!(op.final_url, None);
    }

    #[test]
    fn transitional_provisioning_state_polls_resource() {
        let r = response(
            201,
            &[],
            json!({"properties": {"provisioningState": "Accepted"}}),
        );
        let op = classify("1".into(), "create".into(), Verb::Put, r, RESOURCE).unwrap();
        assert_eq!(op.poll_kind, PollKind::ProvisioningState);
        assert_eq!(op.poll_url.as_deref(), Some(RESOURCE));
    }

    #[test]
    fn synchronous_completion() {
        let r = response(200, &[], json!({"id": "x", "properties": {"provisioningState": "Succeeded"}}));
        let op = classify("1".into(), "create".into(), Verb::Put, r, RESOURCE).unwrap();
        assert!(op.is_terminal());
        assert_eq!(op.result.unwrap()["id"], "x");

        let r = response(204, &[], Value::Null);
        let op = classify("2".into(), "delete".into(), Verb::Delete, r, RESOURCE).unwrap();
        assert_eq!(op.status, OperationStatus::Succeeded);
        assert_eq!(op.result, None);
    }

    #[test]
    fn initial_error_is_api_error() {
        let r = response(
            400,
            &[],
            json!({"error": {"code": "InvalidTemplate", "message": "bad"}}),
        );
        let err = classify("1".into(), "create".into(), Verb::Put, r, RESOURCE).unwrap_err();
        assert!(err.to_string().contains("InvalidTemplate"));
    }

    #[test]
    fn async_status_document() {
        let op = Operation::pending("1", "create", PollKind::AsyncOperation);
        let running = interpret(&op, response(200, &[], json!({"status": "InProgress"}))).unwrap();
        assert_eq!(running.status, OperationStatus::InProgress);

        let failed = interpret(
            &op,
            response(
                200,
                &[],
                json!({"status": "Failed", "error": {"code": "Quota", "message": "exceeded"}}),
            ),
        )
        .unwrap();
        assert_eq!(failed.status, OperationStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("Quota: exceeded"));
    }

    #[test]
    fn location_status_codes() {
        let op = Operation::pending("1", "delete", PollKind::Location);
        assert_eq!(
            interpret(&op, response(202, &[], Value::Null)).unwrap().status,
            OperationStatus::InProgress
        );
        assert_eq!(
            interpret(&op, response(204, &[], Value::Null)).unwrap().status,
            OperationStatus::Succeeded
        );
        assert_eq!(
            interpret(&op, response(409, &[], Value::Null)).unwrap().status,
            OperationStatus::Failed
        );
    }
}
