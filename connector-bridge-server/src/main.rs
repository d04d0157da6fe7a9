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

use anyhow::Result;
use clap::Parser;
use connector_bridge_server::{config::ServerConfig, run_server};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address (overrides config file)
    #[arg(long, env = "BRIDGE_HTTP_ADDR")]
    http_addr: Option<String>,

    /// Upstream MCP server base URL (overrides config file)
    #[arg(long, env = "BRIDGE_MCP_SERVER_URL")]
    mcp_server_url: Option<String>,

    /// Case identifier stamped on every tool call
    #[arg(long, env = "BRIDGE_CASE_ID")]
    case_id: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = ServerConfig::load(args.config)?;

    // Apply CLI overrides
    if let Some(addr) = args.http_addr {
        config.server.listen_addr = addr;
    }
    if let Some(url) = args.mcp_server_url {
        config.upstream.base_url = url;
    }
    if let Some(case_id) = args.case_id {
        config.case.case_id = case_id;
    }
    if args.log_json {
        config.logging.json = true;
    }

    run_server(config).await
}
