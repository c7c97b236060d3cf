//! Configuration module for pingdumb.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::telemetry::{HistoryRange, TimeWindow};

use chrono_tz::Tz;
use std::env;

/// Dashboard configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// HTTP port for the dashboard service (default: 3000)
    pub http_port: u16,
    /// Base URL of the monitoring backend (default: "http://localhost:8000")
    pub api_url: String,
    /// Live result channel (default: derived from `api_url`)
    pub ws_url: String,
    /// Display timezone for labels and buckets (default: UTC)
    pub timezone: Tz,
    /// Global chart window (default: 60 minutes)
    pub window: TimeWindow,
    /// Initial history range (default: 1h)
    pub history_range: HistoryRange,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let api_url = "http://localhost:8000".to_string();
        Self {
            http_port: 3000,
            ws_url: derive_ws_url(&api_url),
            api_url,
            timezone: chrono_tz::UTC,
            window: TimeWindow::default(),
            history_range: HistoryRange::default(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PINGDUMB_HTTP_PORT`: HTTP port (default: 3000)
    /// - `PINGDUMB_API_URL`: backend base URL (default: "http://localhost:8000")
    /// - `PINGDUMB_WS_URL`: live channel URL (default: `ws://<api host>/ws`)
    /// - `PINGDUMB_TIMEZONE`: IANA timezone name (default: "UTC")
    /// - `PINGDUMB_WINDOW_MINUTES`: global chart window (default: 60)
    /// - `PINGDUMB_HISTORY_RANGE`: one of 1h, 6h, 24h, 7d, 30d (default: "1h")
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(port_str) = lookup("PINGDUMB_HTTP_PORT") {
            match port_str.parse() {
                Ok(port) => cfg.http_port = port,
                Err(_) => tracing::warn!("Ignoring invalid PINGDUMB_HTTP_PORT: {}", port_str),
            }
        }

        if let Some(api_url) = lookup("PINGDUMB_API_URL") {
            cfg.api_url = api_url.trim_end_matches('/').to_string();
        }

        cfg.ws_url = lookup("PINGDUMB_WS_URL").unwrap_or_else(|| derive_ws_url(&cfg.api_url));

        if let Some(tz_str) = lookup("PINGDUMB_TIMEZONE") {
            match tz_str.parse::<Tz>() {
                Ok(tz) => cfg.timezone = tz,
                Err(_) => tracing::warn!("Ignoring unknown PINGDUMB_TIMEZONE: {}", tz_str),
            }
        }

        if let Some(minutes) = lookup("PINGDUMB_WINDOW_MINUTES") {
            match minutes.parse::<u32>().ok().and_then(|m| TimeWindow::from_minutes(m).ok()) {
                Some(window) => cfg.window = window,
                None => tracing::warn!("Ignoring invalid PINGDUMB_WINDOW_MINUTES: {}", minutes),
            }
        }

        if let Some(range) = lookup("PINGDUMB_HISTORY_RANGE") {
            match range.parse() {
                Ok(r) => cfg.history_range = r,
                Err(e) => tracing::warn!("Ignoring PINGDUMB_HISTORY_RANGE: {}", e),
            }
        }

        cfg
    }
}

/// `http://host:port` becomes `ws://host:port/ws`, `https` becomes `wss`.
fn derive_ws_url(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}/ws", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}/ws", rest)
    } else {
        format!("ws://{}/ws", base)
    }
}
