//! pingdumb - network test dashboard service

use pingdumb::api::ApiClient;
use pingdumb::channel::WebSocketConnector;
use pingdumb::config::DashboardConfig;
use pingdumb::dashboard::{Dashboard, DashboardState};
use pingdumb::web::Server;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("pingdumb=info".parse()?))
        .init();

    // Load configuration
    let cfg = DashboardConfig::load();
    tracing::info!("Starting pingdumb on port {}...", cfg.http_port);
    tracing::info!("Using backend at {} (live: {})", cfg.api_url, cfg.ws_url);
    tracing::info!("Display timezone {}, window {} minutes", cfg.timezone, cfg.window.minutes());

    let api = ApiClient::new(&cfg.api_url)?;
    let state = DashboardState::new(cfg.window, cfg.history_range, cfg.timezone);
    let dashboard = Dashboard::new(state, api);

    // Open the live channel; history loads in the background
    let _initial_load = dashboard.start(WebSocketConnector::new(&cfg.ws_url)).await;

    // Start web server
    let server = Server::new(cfg, dashboard.clone());
    let served = tokio::select! {
        r = server.start() => r,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            Ok(())
        }
    };

    dashboard.shutdown().await;
    served
}
