//! HTTP request handlers.

use super::AppState;
use crate::dashboard::{ConfigFilter, DashboardStats, QuickStats};
use crate::model::{TestConfig, TestResult};
use crate::telemetry::{HistoryRange, TimeWindow, WindowSelection};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ============================================================================
// Health
// ============================================================================

pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let channel = state.dashboard.channel_state().await;
    Json(serde_json::json!({ "status": "ok", "channel": channel }))
}

// ============================================================================
// Dashboard views
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ConfigPanel {
    #[serde(flatten)]
    pub config: TestConfig,
    pub window_minutes: u32,
    pub selection: WindowSelection,
    pub latest: Option<TestResult>,
}

pub async fn handle_get_configs(State(state): State<AppState>) -> impl IntoResponse {
    let dashboard = state.dashboard.read().await;

    let panels: Vec<ConfigPanel> = dashboard
        .configs()
        .iter()
        .map(|c| ConfigPanel {
            config: c.clone(),
            window_minutes: dashboard.panel_window(&c.id).minutes(),
            selection: dashboard.panel_selection(&c.id),
            latest: dashboard.latest_result(&c.id).cloned(),
        })
        .collect();

    Json(panels)
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub quick: QuickStats,
    pub window_minutes: u32,
    pub window_presets: &'static [u32],
    pub range: HistoryRange,
    pub config_id: Option<String>,
}

pub async fn handle_get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let dashboard = state.dashboard.read().await;
    Json(StatsResponse {
        stats: dashboard.stats(),
        quick: dashboard.quick_stats(),
        window_minutes: dashboard.global_window().minutes(),
        window_presets: &TimeWindow::PRESETS,
        range: dashboard.history_range(),
        config_id: dashboard.config_filter().config_id().map(str::to_string),
    })
}

#[derive(Debug, Deserialize)]
pub struct TableQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

pub async fn handle_get_results(
    State(state): State<AppState>,
    Query(query): Query<TableQuery>,
) -> impl IntoResponse {
    Json(state.dashboard.read().await.table(query.limit))
}

pub async fn handle_get_success_rate(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.read().await.success_rate(Utc::now()))
}

pub async fn handle_get_series(
    State(state): State<AppState>,
    Path(config_id): Path<String>,
) -> impl IntoResponse {
    match state.dashboard.read().await.series(&config_id, Utc::now()) {
        Some(view) => Json(view).into_response(),
        None => (StatusCode::NOT_FOUND, "Config not found").into_response(),
    }
}

// ============================================================================
// Dashboard controls
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct WindowRequest {
    pub minutes: u32,
}

pub async fn handle_set_window(
    State(state): State<AppState>,
    Json(req): Json<WindowRequest>,
) -> impl IntoResponse {
    let window = match TimeWindow::from_minutes(req.minutes) {
        Ok(w) => w,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    state.dashboard.write().await.set_global_window(window);
    tracing::info!("Global window set to {} minutes", window.minutes());
    Json(serde_json::json!({ "minutes": window.minutes() })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct PanelWindowRequest {
    /// `null` clears the override.
    #[serde(default)]
    pub minutes: Option<u32>,
}

pub async fn handle_set_panel_window(
    State(state): State<AppState>,
    Path(config_id): Path<String>,
    Json(req): Json<PanelWindowRequest>,
) -> impl IntoResponse {
    let window = match req.minutes.map(TimeWindow::from_minutes).transpose() {
        Ok(w) => w,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let mut dashboard = state.dashboard.write().await;
    if dashboard.configs().get(&config_id).is_none() {
        return (StatusCode::NOT_FOUND, "Config not found").into_response();
    }

    dashboard.set_panel_window(&config_id, window);
    Json(serde_json::json!({
        "config_id": config_id,
        "window_minutes": dashboard.panel_window(&config_id).minutes(),
        "selection": dashboard.panel_selection(&config_id),
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct FiltersRequest {
    pub range: String,
    #[serde(default)]
    pub config_id: Option<String>,
}

pub async fn handle_set_filters(
    State(state): State<AppState>,
    Json(req): Json<FiltersRequest>,
) -> impl IntoResponse {
    let range: HistoryRange = match req.range.parse() {
        Ok(r) => r,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("{}", e)).into_response(),
    };
    let filter = ConfigFilter::from_param(req.config_id.as_deref());

    tracing::info!("History filter: range={} config={:?}", range, filter.config_id());
    let config_id = filter.config_id().map(str::to_string);
    // The refetch runs in the background; the response does not wait for it.
    let _ = state.dashboard.set_history_filter(range, filter).await;

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "range": range, "config_id": config_id })),
    )
        .into_response()
}

// ============================================================================
// API: Configs
// ============================================================================

pub async fn handle_create_config(
    State(state): State<AppState>,
    Json(config): Json<TestConfig>,
) -> impl IntoResponse {
    match state.dashboard.create_config(&config).await {
        Ok(saved) => Json(saved).into_response(),
        Err(e) => {
            tracing::warn!("Failed to create config {}: {}", config.name, e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

pub async fn handle_update_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(config): Json<TestConfig>,
) -> impl IntoResponse {
    match state.dashboard.update_config(&id, &config).await {
        Ok(saved) => Json(saved).into_response(),
        Err(e) => {
            tracing::warn!("Failed to update config {}: {}", id, e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IntervalRequest {
    pub seconds: u32,
}

pub async fn handle_set_interval(
    State(state): State<AppState>,
    Json(req): Json<IntervalRequest>,
) -> impl IntoResponse {
    if req.seconds == 0 {
        return (StatusCode::BAD_REQUEST, "Interval must be positive").into_response();
    }

    match state.dashboard.apply_interval_to_all(req.seconds).await {
        Ok(updated) => Json(serde_json::json!({
            "seconds": req.seconds,
            "updated": updated,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!("Failed to apply interval {}s: {}", req.seconds, e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

pub async fn handle_delete_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.dashboard.delete_config(&id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::warn!("Failed to delete config {}: {}", id, e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}
