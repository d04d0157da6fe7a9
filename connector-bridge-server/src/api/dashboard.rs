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

//! Mobile dashboard and case snapshot endpoints
//!
//! Both are built from configuration and the registry alone. Neither calls
//! the upstream server.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use connector_bridge_core::{iso_timestamp, CaseProfile, ConnectorRegistry};
use serde::Serialize;

use crate::api::{ApiError, AppState};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuickAction {
    pub name: &'static str,
    pub connector: &'static str,
    pub tool: &'static str,
}

const QUICK_ACTIONS: &[QuickAction] = &[
    QuickAction {
        name: "Legal Research",
        connector: "legal_ai",
        tool: "legal_research",
    },
    QuickAction {
        name: "Process Files",
        connector: "fileops",
        tool: "file_process",
    },
    QuickAction {
        name: "Search Memory",
        connector: "case_management",
        tool: "memory_search",
    },
];

/// Shortcuts whose connector and tool are both registered
pub fn quick_actions(registry: &ConnectorRegistry) -> Vec<QuickAction> {
    QUICK_ACTIONS
        .iter()
        .filter(|action| registry.has_tool(action.connector, action.tool))
        .copied()
        .collect()
}

#[derive(Debug, Serialize)]
pub struct CaseOverview {
    pub case_id: String,
    pub status: String,
    pub next_hearing: String,
    pub exhibits_ready: u32,
}

impl From<&CaseProfile> for CaseOverview {
    fn from(case: &CaseProfile) -> Self {
        Self {
            case_id: case.case_id.clone(),
            status: case.status.clone(),
            next_hearing: case.next_hearing.clone(),
            exhibits_ready: case.exhibits_ready,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConnectorStatus {
    pub online: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub case_overview: CaseOverview,
    pub connector_status: ConnectorStatus,
    pub quick_actions: Vec<QuickAction>,
    pub timestamp: String,
}

/// GET /mobile/dashboard
pub async fn mobile_dashboard(State(state): State<AppState>) -> Json<DashboardResponse> {
    let registry = state.registry.as_ref();

    // Every registered connector counts as online; there is no probe
    Json(DashboardResponse {
        case_overview: CaseOverview::from(state.case.as_ref()),
        connector_status: ConnectorStatus {
            online: registry.len(),
            total: registry.len(),
        },
        quick_actions: quick_actions(registry),
        timestamp: iso_timestamp(Utc::now()),
    })
}

#[derive(Debug, Serialize)]
pub struct CaseStatusResponse {
    pub case_id: String,
    pub status: String,
    pub next_hearing: String,
    pub exhibits_ready: u32,
    pub case_connectors: Vec<String>,
    pub case_tools_available: usize,
    pub timestamp: String,
}

/// GET /case/:case_id/status
pub async fn case_status(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<CaseStatusResponse>, ApiError> {
    if !state.case.matches(&case_id) {
        return Err(ApiError::NotFound(format!("Case {} not found", case_id)));
    }

    let case = state.case.as_ref();
    Ok(Json(CaseStatusResponse {
        case_id: case.case_id.clone(),
        status: case.status.clone(),
        next_hearing: case.next_hearing.clone(),
        exhibits_ready: case.exhibits_ready,
        case_connectors: state
            .registry
            .case_associated()
            .map(|c| c.id.clone())
            .collect(),
        case_tools_available: state.registry.case_tool_count(),
        timestamp: iso_timestamp(Utc::now()),
    }))
}
