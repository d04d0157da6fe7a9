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

//! Tool invocation requests and payload enrichment
//!
//! The enricher merges, in order:
//!
//! 1. caller `arguments`
//! 2. caller `context` (wins over `arguments`)
//! 3. gateway fields `case_id`, `connector_id`, `timestamp`, `user_context`
//!    (win over everything the caller sent)
//!
//! Argument values are passed through untouched.

use crate::case::CaseProfile;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FIELD_CASE_ID: &str = "case_id";
pub const FIELD_CONNECTOR_ID: &str = "connector_id";
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_USER_CONTEXT: &str = "user_context";

/// Body sent upstream under `params.arguments`
pub type EnrichedPayload = Map<String, Value>;

/// Caller request for a single tool run
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ToolInvocationRequest {
    /// Required; kept optional so a missing field is reported as a bad request
    /// instead of a deserialization failure
    #[serde(default)]
    pub tool: Option<String>,

    #[serde(default)]
    pub arguments: Map<String, Value>,

    #[serde(default)]
    pub context: Map<String, Value>,
}

impl ToolInvocationRequest {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: Some(tool.into()),
            ..Default::default()
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// Stamps gateway-controlled attribution onto caller payloads
#[derive(Debug, Clone)]
pub struct RequestEnricher {
    case_id: String,
    user_context: String,
}

impl RequestEnricher {
    pub fn new(case_id: impl Into<String>, user_context: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            user_context: user_context.into(),
        }
    }

    pub fn from_case(case: &CaseProfile) -> Self {
        Self::new(case.case_id.clone(), case.user_context.clone())
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    /// Enrich with the current UTC time
    pub fn enrich(
        &self,
        arguments: Map<String, Value>,
        context: Map<String, Value>,
        connector_id: &str,
    ) -> EnrichedPayload {
        self.enrich_at(arguments, context, connector_id, Utc::now())
    }

    pub fn enrich_at(
        &self,
        arguments: Map<String, Value>,
        context: Map<String, Value>,
        connector_id: &str,
        at: DateTime<Utc>,
    ) -> EnrichedPayload {
        let mut payload = arguments;
        payload.extend(context);

        payload.insert(FIELD_CASE_ID.to_string(), Value::from(self.case_id.as_str()));
        payload.insert(FIELD_CONNECTOR_ID.to_string(), Value::from(connector_id));
        payload.insert(FIELD_TIMESTAMP.to_string(), Value::from(iso_timestamp(at)));
        payload.insert(
            FIELD_USER_CONTEXT.to_string(),
            Value::from(self.user_context.as_str()),
        );

        payload
    }
}

/// RFC 3339, UTC, millisecond precision, `Z` suffix
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn enricher() -> RequestEnricher {
        RequestEnricher::new("CASE-1", "tester")
    }

    #[test]
    fn test_context_overrides_arguments() {
        let payload = enricher().enrich(
            object(json!({"q": "x", "limit": 5})),
            object(json!({"limit": 10, "locale": "en"})),
            "alpha",
        );

        assert_eq!(payload["q"], json!("x"));
        assert_eq!(payload["limit"], json!(10));
        assert_eq!(payload["locale"], json!("en"));
    }

    #[test]
    fn test_fixed_fields_cannot_be_spoofed() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let payload = enricher().enrich_at(
            object(json!({
                "case_id": "OTHER",
                "connector_id": "other",
                "timestamp": "1999-01-01",
            })),
            object(json!({"user_context": "admin", "case_id": "ALSO-OTHER"})),
            "alpha",
            at,
        );

        assert_eq!(payload[FIELD_CASE_ID], json!("CASE-1"));
        assert_eq!(payload[FIELD_CONNECTOR_ID], json!("alpha"));
        assert_eq!(payload[FIELD_TIMESTAMP], json!("2025-01-02T03:04:05.000Z"));
        assert_eq!(payload[FIELD_USER_CONTEXT], json!("tester"));
    }

    #[test]
    fn test_values_pass_through_unchanged() {
        let nested = json!({"deep": [1, null, {"x": true}], "n": 1.5});
        let payload = enricher().enrich(
            object(json!({ "blob": nested.clone() })),
            Map::new(),
            "alpha",
        );
        assert_eq!(payload["blob"], nested);
        assert_eq!(payload.len(), 5);
    }

    #[test]
    fn test_request_defaults() {
        let request: ToolInvocationRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.tool.is_none());
        assert!(request.arguments.is_empty());
        assert!(request.context.is_empty());

        let request = ToolInvocationRequest::new("search").with_argument("q", json!("x"));
        assert_eq!(request.tool.as_deref(), Some("search"));
        assert_eq!(request.arguments["q"], json!("x"));
    }

    #[test]
    fn test_enricher_from_case() {
        let enricher = RequestEnricher::from_case(&CaseProfile::default());
        assert_eq!(enricher.case_id(), "1FDV-23-0001009");
    }
}
