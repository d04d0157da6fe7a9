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

//! Upstream Relay
//!
//! Forwards one enriched tool call to the upstream MCP tool server and maps
//! the outcome into a [`RelayError`] class the façade can turn into an HTTP
//! status:
//!
//! | Outcome                         | Error            |
//! |---------------------------------|------------------|
//! | 2xx with JSON body              | `Ok(body)`       |
//! | non-2xx                         | `Upstream`       |
//! | connect / transport failure     | `Network`        |
//! | deadline or transport timeout   | `Timeout`        |
//! | 2xx with unparseable body       | `Protocol`       |
//! | value unusable as a header      | `Config`         |
//!
//! Exactly one attempt is made per call. There is no retry.

mod mcp;

pub use mcp::{McpRelay, HEADER_CASE_ID, HEADER_CONNECTOR_ID};

use connector_bridge_core::EnrichedPayload;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Relay failure classes
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("MCP server returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("MCP server unreachable: {0}")]
    Network(String),

    #[error("MCP server did not respond within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("MCP server sent an invalid response: {0}")]
    Protocol(String),

    /// Local relay settings that cannot be put on the wire
    #[error("Invalid relay configuration: {0}")]
    Config(String),
}

/// `tools/call` request envelope
#[derive(Debug, Clone, Serialize)]
pub struct McpEnvelope<'a> {
    pub method: &'static str,
    pub params: McpCallParams<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct McpCallParams<'a> {
    pub name: &'a str,
    pub arguments: &'a EnrichedPayload,
}

impl<'a> McpEnvelope<'a> {
    pub const TOOLS_CALL: &'static str = "tools/call";

    pub fn tools_call(tool: &'a str, arguments: &'a EnrichedPayload) -> Self {
        Self {
            method: Self::TOOLS_CALL,
            params: McpCallParams {
                name: tool,
                arguments,
            },
        }
    }
}

/// Outbound seam between the façade and the upstream tool server
#[async_trait::async_trait]
pub trait ToolRelay: Send + Sync {
    /// Run `tool` for `connector_id` upstream and return the parsed response body
    async fn invoke(
        &self,
        connector_id: &str,
        tool: &str,
        payload: EnrichedPayload,
    ) -> Result<Value, RelayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let mut payload = EnrichedPayload::new();
        payload.insert("q".to_string(), json!("x"));

        let envelope = McpEnvelope::tools_call("search", &payload);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "method": "tools/call",
                "params": {"name": "search", "arguments": {"q": "x"}}
            })
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = RelayError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "MCP server did not respond within 30s");
    }
}
