//! API Server Module
//!
//! Router construction and the serve loop.

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use sqlsage_core::QueryService;

use crate::handlers::{handle_query, health_check, ApiState};
use crate::models::ApiConfig;

/// Main API server
pub struct ApiServer {
    /// Server configuration
    config: ApiConfig,
    /// Shared state
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Create a new API server around an already-constructed pipeline
    pub fn new(config: ApiConfig, service: Arc<QueryService>) -> Self {
        let state = Arc::new(ApiState { service });
        Self { config, state }
    }

    /// Build the application router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/query", post(handle_query))
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the API server
    pub async fn start(&self) -> Result<()> {
        info!(
            "Starting SqlSage API server on {}:{}",
            self.config.host, self.config.port
        );

        let app = self.router();

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address: {e}"))?;
        info!("SqlSage API server listening on {addr}");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start API server: {e}"))?;

        Ok(())
    }
}
