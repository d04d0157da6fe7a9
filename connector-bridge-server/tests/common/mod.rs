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

//! In-process stand-in for the upstream MCP tool server

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use connector_bridge_server::config::UpstreamConfig;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const STUB_TOKEN: &str = "stub-secret-token";

/// How the stub answers every `POST /mcp`
#[derive(Debug, Clone)]
pub enum StubMode {
    Json(Value),
    Status(u16),
    InvalidJson,
    Slow(Duration),
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub headers: HeaderMap,
    pub body: Value,
}

struct StubState {
    mode: StubMode,
    requests: Mutex<Vec<CapturedRequest>>,
}

pub struct StubUpstream {
    pub base_url: String,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubUpstream {
    pub async fn start(mode: StubMode) -> Self {
        let state = Arc::new(StubState {
            mode,
            requests: Mutex::new(Vec::new()),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/mcp", post(handle_mcp))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    /// Upstream settings pointing at this stub
    pub fn upstream_config(&self, api_key: Option<&str>) -> UpstreamConfig {
        UpstreamConfig {
            base_url: self.base_url.clone(),
            api_key: api_key.map(String::from),
            ..Default::default()
        }
    }

    /// Same as `upstream_config` but every timeout is one second
    pub fn fast_config(&self, api_key: Option<&str>) -> UpstreamConfig {
        UpstreamConfig {
            timeout_secs: 1,
            attempt_timeout_secs: 1,
            connect_timeout_secs: 1,
            ..self.upstream_config(api_key)
        }
    }
}

impl Drop for StubUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_mcp(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state
        .requests
        .lock()
        .unwrap()
        .push(CapturedRequest { headers, body });

    match &state.mode {
        StubMode::Json(value) => Json(value.clone()).into_response(),
        StubMode::Status(code) => (
            StatusCode::from_u16(*code).unwrap(),
            "upstream exploded",
        )
            .into_response(),
        StubMode::InvalidJson => (StatusCode::OK, "<html>not json</html>").into_response(),
        StubMode::Slow(delay) => {
            tokio::time::sleep(*delay).await;
            Json(json!({"late": true})).into_response()
        }
    }
}
