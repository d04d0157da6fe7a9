// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Tool execution endpoints
//!
//! Validation runs in a fixed order so that an unknown connector is reported
//! before the body is looked at, and nothing reaches the relay unless the
//! connector permits the tool:
//!
//! 1. connector exists (404)
//! 2. body parses and names a tool (400)
//! 3. tool belongs to the connector (400)
//! 4. enrich, relay, shape

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;
use connector_bridge_core::{iso_timestamp, ToolInvocationRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{ApiError, AppState};

/// Successful tool run
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    pub status: &'static str,
    pub tool: String,
    pub connector: String,
    pub result: Value,
    pub timestamp: String,
}

/// POST /connectors/:connector_id/execute
pub async fn execute_connector(
    State(state): State<AppState>,
    Path(connector_id): Path<String>,
    body: Result<Json<ToolInvocationRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    if !state.registry.contains(&connector_id) {
        return Err(ApiError::connector_not_found(&connector_id));
    }

    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    execute_invocation(&state, &connector_id, request)
        .await
        .map(Json)
}

/// Shared by single and batch execution
async fn execute_invocation(
    state: &AppState,
    connector_id: &str,
    request: ToolInvocationRequest,
) -> Result<ExecuteResponse, ApiError> {
    let connector = state
        .registry
        .lookup(connector_id)
        .ok_or_else(|| ApiError::connector_not_found(connector_id))?;

    let tool = request
        .tool
        .filter(|tool| !tool.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Request body must name a 'tool'".to_string()))?;

    if !connector.has_tool(&tool) {
        return Err(ApiError::BadRequest(format!(
            "Tool {} not available for connector {}",
            tool, connector.id
        )));
    }

    debug!(connector = %connector.id, tool = %tool, "Executing tool");

    let payload = state
        .enricher
        .enrich(request.arguments, request.context, &connector.id);
    let result = state.relay.invoke(&connector.id, &tool, payload).await?;

    Ok(ExecuteResponse {
        status: "success",
        tool,
        connector: connector.id.clone(),
        result,
        timestamp: iso_timestamp(Utc::now()),
    })
}

/// Batch body: a bare array of items or `{"requests": [...]}`
///
/// Items stay as raw JSON so one malformed entry fails alone.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchRequest {
    Items(Vec<Value>),
    Wrapped { requests: Vec<Value> },
}

impl BatchRequest {
    fn into_items(self) -> Vec<Value> {
        match self {
            BatchRequest::Items(items) | BatchRequest::Wrapped { requests: items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchItem {
    connector_id: String,
    #[serde(default)]
    request: ToolInvocationRequest,
}

#[derive(Debug, Serialize)]
pub struct BatchItemError {
    pub status_code: u16,
    pub detail: String,
}

impl From<&ApiError> for BatchItemError {
    fn from(err: &ApiError) -> Self {
        Self {
            status_code: err.status_code().as_u16(),
            detail: err.detail().to_string(),
        }
    }
}

/// Outcome of one batch entry, at the same index as its input
#[derive(Debug, Serialize)]
pub struct BatchItemResult {
    pub index: usize,
    pub connector_id: Option<String>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ExecuteResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchItemError>,
}

impl BatchItemResult {
    fn success(index: usize, connector_id: String, response: ExecuteResponse) -> Self {
        Self {
            index,
            connector_id: Some(connector_id),
            status: "success",
            response: Some(response),
            error: None,
        }
    }

    fn failure(index: usize, connector_id: Option<String>, err: &ApiError) -> Self {
        Self {
            index,
            connector_id,
            status: "error",
            response: None,
            error: Some(err.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub batch_results: Vec<BatchItemResult>,
    pub total_requests: usize,
    pub successful: usize,
    pub failed: usize,
}

/// POST /connectors/batch
///
/// Items run one after another in input order. A failing item never
/// stops the items after it.
pub async fn execute_batch(
    State(state): State<AppState>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Json(batch) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let items = batch.into_items();

    let mut batch_results = Vec::with_capacity(items.len());
    for (index, raw) in items.into_iter().enumerate() {
        batch_results.push(run_batch_item(&state, index, raw).await);
    }

    let total_requests = batch_results.len();
    let successful = batch_results.iter().filter(|r| r.is_success()).count();
    let failed = total_requests - successful;

    info!(total_requests, successful, failed, "Batch executed");

    Ok(Json(BatchResponse {
        batch_results,
        total_requests,
        successful,
        failed,
    }))
}

async fn run_batch_item(state: &AppState, index: usize, raw: Value) -> BatchItemResult {
    let raw_connector_id = raw
        .get("connector_id")
        .and_then(Value::as_str)
        .map(String::from);

    let item: BatchItem = match serde_json::from_value(raw) {
        Ok(item) => item,
        Err(e) => {
            let err = ApiError::BadRequest(format!("Invalid batch item: {}", e));
            return BatchItemResult::failure(index, raw_connector_id, &err);
        }
    };

    match execute_invocation(state, &item.connector_id, item.request).await {
        Ok(response) => BatchItemResult::success(index, item.connector_id, response),
        Err(err) => BatchItemResult::failure(index, Some(item.connector_id), &err),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::api::test_support::{post_json, send, state_with, RecordingRelay};
    use crate::relay::RelayError;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_execute_success() {
        let relay = RecordingRelay::ok(json!({"ok": true}));
        let (status, body) = post_json(
            router(state_with(relay.clone())),
            "/connectors/alpha/execute",
            json!({"tool": "search", "arguments": {"q": "x"}}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["tool"], "search");
        assert_eq!(body["connector"], "alpha");
        assert_eq!(body["result"], json!({"ok": true}));
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));

        let calls = relay.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].connector_id, "alpha");
        assert_eq!(calls[0].tool, "search");
        assert_eq!(calls[0].payload["q"], "x");
    }

    #[tokio::test]
    async fn test_gateway_fields_override_caller() {
        let relay = RecordingRelay::ok(json!({}));
        let (status, _) = post_json(
            router(state_with(relay.clone())),
            "/connectors/alpha/execute",
            json!({
                "tool": "summarize",
                "arguments": {"case_id": "FORGED", "depth": 1},
                "context": {"connector_id": "beta", "depth": 2, "user_context": "admin"}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let payload = &relay.calls()[0].payload;
        assert_eq!(payload["case_id"], "1FDV-23-0001009");
        assert_eq!(payload["connector_id"], "alpha");
        assert_eq!(payload["user_context"], "mobile_app_user");
        assert_eq!(payload["depth"], 2);
        assert!(payload["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_connector_skips_relay() {
        let relay = RecordingRelay::ok(json!({}));
        let (status, body) = post_json(
            router(state_with(relay.clone())),
            "/connectors/ghost/execute",
            json!({"tool": "search"}),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Connector ghost not found");
        assert!(relay.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_connector_wins_over_bad_body() {
        let relay = RecordingRelay::ok(json!({}));
        let request = Request::builder()
            .method("POST")
            .uri("/connectors/ghost/execute")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, _) = send(router(state_with(relay)), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tool_not_permitted() {
        let relay = RecordingRelay::ok(json!({}));
        let (status, body) = post_json(
            router(state_with(relay.clone())),
            "/connectors/alpha/execute",
            json!({"tool": "translate"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert!(body["detail"].as_str().unwrap().contains("translate"));
        assert!(relay.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_tool_and_malformed_body() {
        let relay = RecordingRelay::ok(json!({}));

        let (status, _) = post_json(
            router(state_with(relay.clone())),
            "/connectors/alpha/execute",
            json!({"arguments": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("POST")
            .uri("/connectors/alpha/execute")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(router(state_with(relay.clone())), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");

        assert!(relay.calls().is_empty());
    }

    #[tokio::test]
    async fn test_relay_failures_map_to_status() {
        let cases = [
            (
                RelayError::Timeout(Duration::from_secs(30)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                RelayError::Upstream {
                    status: 500,
                    message: "boom".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                RelayError::Network("connection refused".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                RelayError::Protocol("expected value".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (relay_error, expected) in cases {
            let message = relay_error.to_string();
            let relay = RecordingRelay::new(move |_, _| Err(clone_error(&relay_error)));
            let (status, body) = post_json(
                router(state_with(relay.clone())),
                "/connectors/alpha/execute",
                json!({"tool": "search"}),
            )
            .await;

            assert_eq!(status, expected);
            assert_eq!(body["detail"], message);
            assert_eq!(relay.calls().len(), 1);
        }
    }

    fn clone_error(err: &RelayError) -> RelayError {
        match err {
            RelayError::Upstream { status, message } => RelayError::Upstream {
                status: *status,
                message: message.clone(),
            },
            RelayError::Network(msg) => RelayError::Network(msg.clone()),
            RelayError::Timeout(after) => RelayError::Timeout(*after),
            RelayError::Protocol(msg) => RelayError::Protocol(msg.clone()),
            RelayError::Config(msg) => RelayError::Config(msg.clone()),
        }
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let relay = RecordingRelay::ok(json!({"ok": true}));
        let (status, body) = post_json(
            router(state_with(relay.clone())),
            "/connectors/batch",
            json!([
                {"connector_id": "alpha", "request": {"tool": "search"}},
                {"connector_id": "ghost", "request": {"tool": "search"}},
                {"connector_id": "beta", "request": {"tool": "translate"}}
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_requests"], 3);
        assert_eq!(body["successful"], 2);
        assert_eq!(body["failed"], 1);

        let results = body["batch_results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        for (i, entry) in results.iter().enumerate() {
            assert_eq!(entry["index"], i);
        }
        assert_eq!(results[0]["status"], "success");
        assert_eq!(results[0]["response"]["result"], json!({"ok": true}));
        assert_eq!(results[1]["status"], "error");
        assert_eq!(results[1]["connector_id"], "ghost");
        assert_eq!(results[1]["error"]["status_code"], 404);
        assert!(results[1].get("response").is_none());
        assert_eq!(results[2]["status"], "success");

        let calls = relay.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].connector_id, "alpha");
        assert_eq!(calls[1].connector_id, "beta");
    }

    #[tokio::test]
    async fn test_batch_wrapped_with_malformed_item() {
        let relay = RecordingRelay::new(|_, tool| match tool {
            "summarize" => Err(RelayError::Timeout(Duration::from_secs(30))),
            _ => Ok(json!({})),
        });
        let (status, body) = post_json(
            router(state_with(relay.clone())),
            "/connectors/batch",
            json!({"requests": [
                {"request": {"tool": "search"}},
                {"connector_id": "alpha", "request": {"tool": "summarize"}},
                {"connector_id": "alpha", "request": {"tool": "search"}}
            ]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_requests"], 3);
        assert_eq!(body["successful"], 1);
        assert_eq!(body["failed"], 2);

        let results = body["batch_results"].as_array().unwrap();
        assert_eq!(results[0]["error"]["status_code"], 400);
        assert!(results[0]["connector_id"].is_null());
        assert_eq!(results[1]["error"]["status_code"], 504);
        assert_eq!(results[2]["status"], "success");
        assert_eq!(relay.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let relay = RecordingRelay::ok(json!({}));
        let (status, body) =
            post_json(router(state_with(relay)), "/connectors/batch", json!([])).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_requests"], 0);
        assert_eq!(body["batch_results"], json!([]));
    }

    #[tokio::test]
    async fn test_batch_rejects_non_list_body() {
        let relay = RecordingRelay::ok(json!({}));
        let (status, body) = post_json(
            router(state_with(relay)),
            "/connectors/batch",
            json!({"connector_id": "alpha"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }
}
