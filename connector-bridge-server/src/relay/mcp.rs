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

use super::{McpEnvelope, RelayError, ToolRelay};
use crate::config::UpstreamConfig;
use connector_bridge_core::EnrichedPayload;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const HEADER_CASE_ID: &str = "x-case-id";
pub const HEADER_CONNECTOR_ID: &str = "x-connector-id";

/// Longest slice of an upstream error body echoed back to callers
const MAX_ERROR_BODY: usize = 512;

/// reqwest-backed relay to `{base_url}/mcp`
pub struct McpRelay {
    client: reqwest::Client,
    endpoint: String,
    /// Content type, bearer and case headers; identical on every call
    base_headers: HeaderMap,
    deadline: Duration,
    attempt_timeout: Duration,
    connect_timeout: Duration,
}

impl McpRelay {
    /// Fails when the bearer token or case id cannot be sent as a header
    pub fn new(config: &UpstreamConfig, case_id: impl Into<String>) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.attempt_timeout())
            .build()
            .map_err(|e| RelayError::Config(e.without_url().to_string()))?;

        let api_key = config.api_key.as_deref().filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!("No upstream API key configured, MCP calls will be sent unauthenticated");
        }

        let mut base_headers = HeaderMap::new();
        base_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|_| {
                RelayError::Config("API key is not a valid HTTP header value".to_string())
            })?;
            base_headers.insert(AUTHORIZATION, value);
        }
        let case_id: String = case_id.into();
        base_headers.insert(HEADER_CASE_ID, header_value("Case id", &case_id)?);

        Ok(Self {
            client,
            endpoint: format!("{}/mcp", config.base_url.trim_end_matches('/')),
            base_headers,
            deadline: config.deadline(),
            attempt_timeout: config.attempt_timeout(),
            connect_timeout: config.connect_timeout(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(&self, connector_id: &str) -> Result<HeaderMap, RelayError> {
        let mut headers = self.base_headers.clone();
        headers.insert(HEADER_CONNECTOR_ID, header_value("Connector id", connector_id)?);
        Ok(headers)
    }

    async fn send(
        &self,
        connector_id: &str,
        tool: &str,
        payload: &EnrichedPayload,
    ) -> Result<Value, RelayError> {
        let envelope = McpEnvelope::tools_call(tool, payload);

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers(connector_id)?)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                message: truncate(&body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| RelayError::Protocol(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> RelayError {
        if e.is_timeout() {
            return RelayError::Timeout(self.fired_timeout(e.is_connect()));
        }
        // Drop the URL so upstream addresses never reach callers
        RelayError::Network(e.without_url().to_string())
    }

    /// Which client timeout expired: connect or the whole attempt
    fn fired_timeout(&self, during_connect: bool) -> Duration {
        if during_connect {
            self.connect_timeout
        } else {
            self.attempt_timeout
        }
    }
}

#[async_trait::async_trait]
impl ToolRelay for McpRelay {
    async fn invoke(
        &self,
        connector_id: &str,
        tool: &str,
        payload: EnrichedPayload,
    ) -> Result<Value, RelayError> {
        let start = Instant::now();

        let result = match tokio::time::timeout(
            self.deadline,
            self.send(connector_id, tool, &payload),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RelayError::Timeout(self.deadline)),
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(
                connector = connector_id,
                tool = tool,
                latency_ms,
                "MCP tool call succeeded"
            ),
            Err(e) => warn!(
                connector = connector_id,
                tool = tool,
                latency_ms,
                error = %e,
                "MCP tool call failed"
            ),
        }

        result
    }
}

fn header_value(label: &str, value: &str) -> Result<HeaderValue, RelayError> {
    HeaderValue::from_str(value).map_err(|_| {
        RelayError::Config(format!(
            "{} '{}' is not a valid HTTP header value",
            label,
            value.escape_debug()
        ))
    })
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
