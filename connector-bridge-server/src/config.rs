// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use connector_bridge_core::{default_connectors, CaseProfile, Connector, ConnectorRegistry};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connector Bridge Server Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub case: CaseProfile,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Replaces the built-in connector catalog when non-empty
    #[serde(default)]
    pub connectors: Vec<Connector>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP listen address (e.g., "0.0.0.0:8080")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Allowed CORS origins (empty = allow all)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Upstream MCP tool server
#[derive(Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL; calls go to `{base_url}/mcp`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token. Calls are sent unauthenticated when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Overall deadline for one tool call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transport timeout for the single HTTP attempt, in seconds
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,

    /// `EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(default)]
    pub filter: Option<String>,
}

// Keep the token out of startup logs.
impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("attempt_timeout_secs", &self.attempt_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl UpstreamConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// Default values
fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_base_url() -> String {
    "https://perplexity-mcp-server-production.railway.app".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_attempt_timeout_secs() -> u64 {
    25
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            enable_cors: default_enable_cors(),
            cors_origins: vec![],
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Lenient boolean for environment flags
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_flag<F>(lookup: &F, name: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => match parse_flag(&raw) {
            Some(flag) => Ok(Some(flag)),
            None => anyhow::bail!(
                "{}={:?} is not a flag; use true/false, 1/0, yes/no or on/off",
                name,
                raw
            ),
        },
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with priority: env > file > defaults
    ///
    /// An explicitly named file that does not exist is an error, never a
    /// silent fall back to the built-in upstream.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::from_file(&path)
                    .with_context(|| format!("Failed to load config file {}", path.display()))?
            }
            None => Self::default(),
        };

        // Override with environment variables
        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Override fields whose variable is set. `lookup` abstracts the process
    /// environment so tests can feed a map.
    ///
    /// Supported environment variables:
    /// - BRIDGE_HTTP_ADDR: HTTP listen address (default: 0.0.0.0:8080)
    /// - PORT: listen on 0.0.0.0:$PORT (ignored when BRIDGE_HTTP_ADDR is set)
    /// - BRIDGE_MCP_SERVER_URL: upstream MCP server base URL
    /// - BRIDGE_MCP_API_KEY: upstream bearer token
    /// - BRIDGE_CASE_ID: case identifier stamped on every call
    /// - BRIDGE_UPSTREAM_TIMEOUT_SECS: overall upstream deadline (default: 30)
    /// - BRIDGE_ENABLE_CORS: Enable CORS (default: true)
    /// - BRIDGE_LOG_JSON: JSON log output (default: false)
    ///
    /// Flags accept `true/false`, `1/0`, `yes/no` and `on/off`; any other
    /// value is an error.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BRIDGE_HTTP_ADDR") {
            self.server.listen_addr = addr;
        } else if let Some(port) = lookup("PORT") {
            if let Ok(port) = port.trim().parse::<u16>() {
                self.server.listen_addr = format!("0.0.0.0:{}", port);
            }
        }

        if let Some(flag) = env_flag(&lookup, "BRIDGE_ENABLE_CORS")? {
            self.server.enable_cors = flag;
        }

        if let Some(url) = lookup("BRIDGE_MCP_SERVER_URL") {
            self.upstream.base_url = url;
        }

        if let Some(key) = lookup("BRIDGE_MCP_API_KEY") {
            let key = key.trim();
            if !key.is_empty() {
                self.upstream.api_key = Some(key.to_string());
            }
        }

        if let Some(timeout) = lookup("BRIDGE_UPSTREAM_TIMEOUT_SECS") {
            if let Ok(val) = timeout.parse::<u64>() {
                // A shorter deadline pulls the per-attempt timeouts down with it
                self.upstream.timeout_secs = val;
                self.upstream.attempt_timeout_secs = self.upstream.attempt_timeout_secs.min(val);
                self.upstream.connect_timeout_secs = self.upstream.connect_timeout_secs.min(val);
            }
        }

        if let Some(case_id) = lookup("BRIDGE_CASE_ID") {
            self.case.case_id = case_id;
        }

        if let Some(flag) = env_flag(&lookup, "BRIDGE_LOG_JSON")? {
            self.logging.json = flag;
        }

        Ok(())
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    /// Build the connector registry from configuration, falling back to the
    /// built-in catalog
    pub fn connector_registry(&self) -> Result<ConnectorRegistry> {
        let connectors = if self.connectors.is_empty() {
            default_connectors()
        } else {
            self.connectors.clone()
        };
        Ok(ConnectorRegistry::new(connectors)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Validate socket address
        self.socket_addr()?;

        let url = url::Url::parse(&self.upstream.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!(
                "Upstream base URL must use http or https, got '{}'",
                url.scheme()
            );
        }

        let upstream = &self.upstream;
        if upstream.timeout_secs == 0
            || upstream.attempt_timeout_secs == 0
            || upstream.connect_timeout_secs == 0
        {
            anyhow::bail!("Upstream timeouts must be greater than zero");
        }
        if upstream.attempt_timeout_secs > upstream.timeout_secs
            || upstream.connect_timeout_secs > upstream.timeout_secs
        {
            anyhow::bail!(
                "Upstream attempt/connect timeouts cannot exceed the overall deadline of {}s",
                upstream.timeout_secs
            );
        }

        if self.case.case_id.trim().is_empty() {
            anyhow::bail!("Case id cannot be empty");
        }

        // Values sent as upstream headers must be valid header text
        if let Some(key) = &self.upstream.api_key {
            if HeaderValue::from_str(&format!("Bearer {}", key)).is_err() {
                anyhow::bail!("Upstream API key is not a valid HTTP header value");
            }
        }
        HeaderValue::from_str(&self.case.case_id).with_context(|| {
            format!(
                "Case id '{}' is not a valid HTTP header value",
                self.case.case_id.escape_debug()
            )
        })?;

        // Validate connector catalog
        let registry = self.connector_registry()?;
        for connector in registry.list() {
            HeaderValue::from_str(&connector.id).with_context(|| {
                format!(
                    "Connector id '{}' is not a valid HTTP header value",
                    connector.id.escape_debug()
                )
            })?;
        }

        Ok(())
    }
}
