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

pub mod api;
pub mod config;
pub mod relay;

use anyhow::{Context, Result};
use axum::{http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::AppState;
use config::{HttpServerConfig, LoggingConfig, ServerConfig};
use relay::McpRelay;

const DEFAULT_LOG_FILTER: &str = "connector_bridge_server=info,tower_http=info";

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured filter directive.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match &config.filter {
            Some(directive) => EnvFilter::try_new(directive)
                .with_context(|| format!("Invalid log filter '{}'", directive))?,
            None => EnvFilter::new(DEFAULT_LOG_FILTER),
        },
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }
    Ok(())
}

/// Router plus CORS and request tracing layers
pub fn build_app(state: AppState, config: &HttpServerConfig) -> Result<Router> {
    let cors = if config.enable_cors {
        let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

        if config.cors_origins.is_empty() {
            tracing::warn!("CORS: Allowing all origins. Set cors_origins to restrict them");
            cors.allow_origin(Any)
        } else {
            tracing::info!("CORS: Allowing origins: {:?}", config.cors_origins);
            let origins = config
                .cors_origins
                .iter()
                .map(|origin| {
                    HeaderValue::from_str(origin)
                        .with_context(|| format!("Invalid CORS origin '{}'", origin))
                })
                .collect::<Result<Vec<_>>>()?;
            cors.allow_origin(AllowOrigin::list(origins))
        }
    } else {
        CorsLayer::new()
    };

    Ok(api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// Run the connector bridge until Ctrl-C
pub async fn run_server(config: ServerConfig) -> Result<()> {
    init_tracing(&config.logging)?;

    tracing::info!("Starting connector bridge");
    tracing::info!("Configuration: {:#?}", config);

    config.validate()?;

    let registry = config.connector_registry()?;
    tracing::info!(
        connectors = registry.len(),
        tools = registry.total_tools(),
        "Connector registry loaded"
    );

    let relay = McpRelay::new(&config.upstream, config.case.case_id.clone())?;
    tracing::info!("Relaying tool calls to {}", relay.endpoint());

    let state = AppState::new(registry, Arc::new(relay), config.case.clone());
    let app = build_app(state, &config.server)?;

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Connector bridge listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Connector bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
