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

use axum::{extract::State, Json};
use chrono::Utc;
use connector_bridge_core::iso_timestamp;
use serde::Serialize;
use tracing::debug;

use crate::api::AppState;

pub const SERVICE_NAME: &str = "perplexity-app-connector-bridge";
const SERVICE_TITLE: &str = "Perplexity App Connector Bridge";

/// Health check response structure
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub connectors_available: usize,
    pub total_tools: usize,
    pub timestamp: String,
}

/// GET /health - Liveness plus registry counts
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Health check requested");

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connectors_available: state.registry.len(),
        total_tools: state.registry.total_tools(),
        timestamp: iso_timestamp(Utc::now()),
    })
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub title: String,
    pub version: String,
    pub description: String,
    pub case_id: String,
    pub connectors_available: usize,
    pub total_tools: usize,
    pub endpoints: Vec<EndpointInfo>,
}

const ENDPOINTS: &[EndpointInfo] = &[
    EndpointInfo {
        method: "GET",
        path: "/health",
        description: "Liveness and catalog counts",
    },
    EndpointInfo {
        method: "GET",
        path: "/connectors",
        description: "List all connectors",
    },
    EndpointInfo {
        method: "GET",
        path: "/connectors/{connector_id}",
        description: "Connector detail",
    },
    EndpointInfo {
        method: "POST",
        path: "/connectors/{connector_id}/execute",
        description: "Run one tool through a connector",
    },
    EndpointInfo {
        method: "POST",
        path: "/connectors/batch",
        description: "Run several tools in order",
    },
    EndpointInfo {
        method: "GET",
        path: "/mobile/dashboard",
        description: "Case and connector overview for the mobile app",
    },
    EndpointInfo {
        method: "GET",
        path: "/case/{case_id}/status",
        description: "Status snapshot of the configured case",
    },
];

/// GET / - Service descriptor
pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        title: SERVICE_TITLE.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "Relays connector tool calls from the Perplexity app to the MCP tool server"
            .to_string(),
        case_id: state.case.case_id.clone(),
        connectors_available: state.registry.len(),
        total_tools: state.registry.total_tools(),
        endpoints: ENDPOINTS.to_vec(),
    })
}
