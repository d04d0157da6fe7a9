// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod connectors;
pub mod dashboard;
pub mod execute;
pub mod health;

pub use connectors::{get_connector, list_connectors, ConnectorDetail};
pub use dashboard::{case_status, mobile_dashboard, CaseStatusResponse, DashboardResponse};
pub use execute::{
    execute_batch, execute_connector, BatchItemResult, BatchRequest, BatchResponse,
    ExecuteResponse,
};
pub use health::{health_check, service_info, HealthResponse, SERVICE_NAME};

use crate::relay::{RelayError, ToolRelay};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use connector_bridge_core::{CaseProfile, ConnectorRegistry, RequestEnricher};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::BadGateway(_) => "bad_gateway",
            ApiError::GatewayTimeout(_) => "gateway_timeout",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::BadGateway(msg)
            | ApiError::GatewayTimeout(msg)
            | ApiError::Internal(msg) => msg,
        }
    }

    pub fn connector_not_found(connector_id: &str) -> Self {
        ApiError::NotFound(format!("Connector {} not found", connector_id))
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Upstream { .. } | RelayError::Network(_) => {
                ApiError::BadGateway(err.to_string())
            }
            RelayError::Timeout(_) => ApiError::GatewayTimeout(err.to_string()),
            RelayError::Protocol(_) | RelayError::Config(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        }

        let body = ErrorResponse {
            error: self.kind(),
            detail: self.detail().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    detail: String,
}

/// Shared application state
///
/// Everything here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectorRegistry>,
    pub relay: Arc<dyn ToolRelay>,
    pub case: Arc<CaseProfile>,
    pub enricher: Arc<RequestEnricher>,
}

impl AppState {
    pub fn new(registry: ConnectorRegistry, relay: Arc<dyn ToolRelay>, case: CaseProfile) -> Self {
        let enricher = RequestEnricher::from_case(&case);
        Self {
            registry: Arc::new(registry),
            relay,
            case: Arc::new(case),
            enricher: Arc::new(enricher),
        }
    }
}

/// All bridge routes, without transport layers
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/connectors", get(list_connectors))
        .route("/connectors/batch", post(execute_batch))
        .route("/connectors/:connector_id", get(get_connector))
        .route("/connectors/:connector_id/execute", post(execute_connector))
        .route("/mobile/dashboard", get(mobile_dashboard))
        .route("/case/:case_id/status", get(case_status))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use connector_bridge_core::{Connector, EnrichedPayload};
    use serde_json::Value;
    use std::sync::Mutex;
    use tower::ServiceExt;

    type Responder = Box<dyn Fn(&str, &str) -> Result<Value, RelayError> + Send + Sync>;

    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub connector_id: String,
        pub tool: String,
        pub payload: EnrichedPayload,
    }

    /// Relay double that records every call and answers from a closure
    pub struct RecordingRelay {
        calls: Mutex<Vec<RecordedCall>>,
        responder: Responder,
    }

    impl RecordingRelay {
        pub fn new<F>(responder: F) -> Arc<Self>
        where
            F: Fn(&str, &str) -> Result<Value, RelayError> + Send + Sync + 'static,
        {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                responder: Box::new(responder),
            })
        }

        pub fn ok(value: Value) -> Arc<Self> {
            Self::new(move |_, _| Ok(value.clone()))
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ToolRelay for RecordingRelay {
        async fn invoke(
            &self,
            connector_id: &str,
            tool: &str,
            payload: EnrichedPayload,
        ) -> Result<Value, RelayError> {
            self.calls.lock().unwrap().push(RecordedCall {
                connector_id: connector_id.to_string(),
                tool: tool.to_string(),
                payload,
            });
            (self.responder)(connector_id, tool)
        }
    }

    pub fn alpha_registry() -> ConnectorRegistry {
        ConnectorRegistry::new(vec![
            Connector::new("alpha", "Alpha", ["search", "summarize"]).case_associated(true),
            Connector::new("beta", "Beta", ["translate"]),
        ])
        .unwrap()
    }

    pub fn state_with(relay: Arc<RecordingRelay>) -> AppState {
        AppState::new(alpha_registry(), relay, CaseProfile::default())
    }

    pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();
        send(app, request).await
    }

    pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}
