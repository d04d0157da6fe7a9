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

//! Connector catalog
//!
//! A connector is a named group of tools that the upstream MCP server is
//! allowed to run on behalf of the bridge. The catalog is fixed for the
//! lifetime of the process: it is built once at startup (from the built-in
//! defaults or from configuration) and then only read.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Catalog validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Connector id cannot be empty")]
    EmptyId,

    #[error("Duplicate connector id: {0}")]
    DuplicateConnector(String),

    #[error("Connector {connector} declares an empty tool name")]
    EmptyToolName { connector: String },

    #[error("Connector {connector} declares tool {tool} more than once")]
    DuplicateTool { connector: String, tool: String },
}

/// Advisory priority label. Nothing schedules on it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Static connector metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Tool names the upstream may run for this connector, in display order
    pub tools: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
    /// Connector works on the configured case
    #[serde(default)]
    pub case_associated: bool,
}

impl Connector {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        tools: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            tools: tools.into_iter().map(Into::into).collect(),
            category: String::new(),
            priority: Priority::default(),
            case_associated: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn case_associated(mut self, associated: bool) -> Self {
        self.case_associated = associated;
        self
    }

    pub fn has_tool(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }

    pub fn tools_count(&self) -> usize {
        self.tools.len()
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.id.trim().is_empty() {
            return Err(RegistryError::EmptyId);
        }

        let mut seen = HashSet::with_capacity(self.tools.len());
        for tool in &self.tools {
            if tool.trim().is_empty() {
                return Err(RegistryError::EmptyToolName {
                    connector: self.id.clone(),
                });
            }
            if !seen.insert(tool.as_str()) {
                return Err(RegistryError::DuplicateTool {
                    connector: self.id.clone(),
                    tool: tool.clone(),
                });
            }
        }

        Ok(())
    }
}

/// The built-in catalog served when configuration does not provide one.
pub fn default_connectors() -> Vec<Connector> {
    vec![
        Connector::new("fileops", "FileOps Suite", ["file_process", "gdrive_access"])
            .with_description("File processing and Google Drive access for case documents")
            .with_category("file_management")
            .with_priority(Priority::High)
            .case_associated(true),
        Connector::new(
            "legal_ai",
            "Legal AI Suite",
            ["legal_research", "evidence_fusion"],
        )
        .with_description("Legal research and evidence fusion")
        .with_category("legal")
        .with_priority(Priority::Critical)
        .case_associated(true),
        Connector::new(
            "advanced_labs",
            "Advanced Labs",
            ["quantum_process", "vr_simulation"],
        )
        .with_description("Experimental processing and simulation tools")
        .with_category("research")
        .with_priority(Priority::Low),
        Connector::new(
            "case_management",
            "Case Management",
            ["memory_search", "case_orchestration"],
        )
        .with_description("Case memory search and orchestration")
        .with_category("case_management")
        .with_priority(Priority::Critical)
        .case_associated(true),
    ]
}

/// Immutable connector registry
///
/// Keeps definition order for listings and a side index for O(1) lookups.
/// There are no mutation methods; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ConnectorRegistry {
    connectors: Vec<Connector>,
    index: HashMap<String, usize>,
}

impl ConnectorRegistry {
    /// Build a registry, rejecting duplicate ids and duplicate tools
    pub fn new(connectors: Vec<Connector>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(connectors.len());

        for (position, connector) in connectors.iter().enumerate() {
            connector.validate()?;
            if index.insert(connector.id.clone(), position).is_some() {
                return Err(RegistryError::DuplicateConnector(connector.id.clone()));
            }
        }

        debug!(connectors = connectors.len(), "Connector registry built");

        Ok(Self { connectors, index })
    }

    /// Registry holding [`default_connectors`]
    pub fn with_defaults() -> Result<Self, RegistryError> {
        Self::new(default_connectors())
    }

    pub fn lookup(&self, connector_id: &str) -> Option<&Connector> {
        self.index
            .get(connector_id)
            .map(|&position| &self.connectors[position])
    }

    pub fn contains(&self, connector_id: &str) -> bool {
        self.index.contains_key(connector_id)
    }

    /// Connectors in definition order
    pub fn list(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.iter()
    }

    pub fn has_tool(&self, connector_id: &str, tool: &str) -> bool {
        self.lookup(connector_id)
            .map(|connector| connector.has_tool(tool))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub fn total_tools(&self) -> usize {
        self.connectors.iter().map(Connector::tools_count).sum()
    }

    pub fn case_associated(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.iter().filter(|c| c.case_associated)
    }

    /// Number of tools reachable through case-associated connectors
    pub fn case_tool_count(&self) -> usize {
        self.case_associated().map(Connector::tools_count).sum()
    }
}
