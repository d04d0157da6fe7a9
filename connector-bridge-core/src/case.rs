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

use serde::{Deserialize, Serialize};

/// The single case this bridge process serves.
///
/// Every outbound tool call is attributed to `case_id`; callers cannot
/// choose a different case per request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CaseProfile {
    #[serde(default = "default_case_id")]
    pub case_id: String,

    /// Display status, e.g. "Active"
    #[serde(default = "default_status")]
    pub status: String,

    /// Next hearing date (ISO date)
    #[serde(default = "default_next_hearing")]
    pub next_hearing: String,

    #[serde(default = "default_exhibits_ready")]
    pub exhibits_ready: u32,

    /// Label stamped into every enriched payload as `user_context`
    #[serde(default = "default_user_context")]
    pub user_context: String,
}

fn default_case_id() -> String {
    "1FDV-23-0001009".to_string()
}

fn default_status() -> String {
    "Active".to_string()
}

fn default_next_hearing() -> String {
    "2025-11-08".to_string()
}

fn default_exhibits_ready() -> u32 {
    8
}

fn default_user_context() -> String {
    "mobile_app_user".to_string()
}

impl Default for CaseProfile {
    fn default() -> Self {
        Self {
            case_id: default_case_id(),
            status: default_status(),
            next_hearing: default_next_hearing(),
            exhibits_ready: default_exhibits_ready(),
            user_context: default_user_context(),
        }
    }
}

impl CaseProfile {
    /// Exact, case-sensitive match against the configured case id
    pub fn matches(&self, case_id: &str) -> bool {
        self.case_id == case_id
    }
}
