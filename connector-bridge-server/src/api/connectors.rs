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

//! Connector catalog endpoints

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use connector_bridge_core::{Connector, ConnectorRegistry};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::api::{ApiError, AppState};

/// Connector fields plus the derived tool count
#[derive(Debug, serde::Serialize)]
pub struct ConnectorDetail<'a> {
    #[serde(flatten)]
    pub connector: &'a Connector,
    pub tools_count: usize,
}

impl<'a> From<&'a Connector> for ConnectorDetail<'a> {
    fn from(connector: &'a Connector) -> Self {
        Self {
            connector,
            tools_count: connector.tools_count(),
        }
    }
}

/// `{id: detail, ...}` in registry definition order
struct Catalog<'a>(&'a ConnectorRegistry);

impl Serialize for Catalog<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for connector in self.0.list() {
            map.serialize_entry(&connector.id, &ConnectorDetail::from(connector))?;
        }
        map.end()
    }
}

#[derive(serde::Serialize)]
struct ConnectorListResponse<'a> {
    connectors: Catalog<'a>,
    total_connectors: usize,
    total_tools: usize,
    case_id: &'a str,
}

/// GET /connectors - Full catalog
pub async fn list_connectors(State(state): State<AppState>) -> Response {
    let registry = state.registry.as_ref();

    Json(ConnectorListResponse {
        connectors: Catalog(registry),
        total_connectors: registry.len(),
        total_tools: registry.total_tools(),
        case_id: &state.case.case_id,
    })
    .into_response()
}

/// GET /connectors/:connector_id - Single connector
pub async fn get_connector(
    State(state): State<AppState>,
    Path(connector_id): Path<String>,
) -> Result<Response, ApiError> {
    let connector = state
        .registry
        .lookup(&connector_id)
        .ok_or_else(|| ApiError::connector_not_found(&connector_id))?;

    Ok(Json(ConnectorDetail::from(connector)).into_response())
}
