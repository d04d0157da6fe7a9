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

//! Connector Bridge Core
//!
//! Domain types shared by the bridge server: the static connector catalog,
//! the process-wide case profile and the request enricher that stamps every
//! outbound tool call with gateway-controlled attribution fields.
//!
//! Everything in this crate is synchronous and free of I/O.

pub mod case;
pub mod connector;
pub mod invocation;

pub use case::CaseProfile;
pub use connector::{default_connectors, Connector, ConnectorRegistry, Priority, RegistryError};
pub use invocation::{
    iso_timestamp, EnrichedPayload, RequestEnricher, ToolInvocationRequest, FIELD_CASE_ID,
    FIELD_CONNECTOR_ID, FIELD_TIMESTAMP, FIELD_USER_CONTEXT,
};
