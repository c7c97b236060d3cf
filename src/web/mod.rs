//! Web server module.

mod handlers;

pub use handlers::*;

use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: DashboardConfig,
    pub dashboard: Dashboard,
}

/// HTTP surface of the dashboard.
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(config: DashboardConfig, dashboard: Dashboard) -> Self {
        Self {
            state: AppState { config, dashboard },
        }
    }

    /// Build the router with all routes.
    pub fn routes(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/health", get(handlers::handle_health))
            // Dashboard views
            .route("/api/dashboard/configs", get(handlers::handle_get_configs))
            .route("/api/dashboard/stats", get(handlers::handle_get_stats))
            .route("/api/dashboard/results", get(handlers::handle_get_results))
            .route("/api/dashboard/success-rate", get(handlers::handle_get_success_rate))
            .route("/api/dashboard/series/{config_id}", get(handlers::handle_get_series))
            // Dashboard controls
            .route("/api/dashboard/window", put(handlers::handle_set_window))
            .route(
                "/api/dashboard/panels/{config_id}/window",
                put(handlers::handle_set_panel_window),
            )
            .route("/api/dashboard/filters", put(handlers::handle_set_filters))
            .route("/api/dashboard/interval", put(handlers::handle_set_interval))
            // Config pass-through
            .route("/api/configs", post(handlers::handle_create_config))
            .route(
                "/api/configs/{id}",
                put(handlers::handle_update_config).delete(handlers::handle_delete_config),
            )
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
