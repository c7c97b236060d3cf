//! Client for the monitoring backend's REST API.

use crate::model::{TestConfig, TestResult};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status} for {url}")]
    Status { status: u16, url: String },
}

/// Parameters of a history request.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub since: DateTime<Utc>,
    /// `None` requests every config.
    pub config_id: Option<String>,
}

impl HistoryQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![(
            "since",
            self.since.to_rfc3339_opts(SecondsFormat::Millis, true),
        )];
        if let Some(id) = &self.config_id {
            params.push(("config_id", id.clone()));
        }
        params
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        // Requests carry no timeout.
        let http = reqwest::Client::builder()
            .user_agent(concat!("pingdumb/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Malformed configs are skipped.
    pub async fn fetch_configs(&self) -> Result<Vec<TestConfig>, ApiError> {
        let url = self.url("/api/configs");
        let response = self.http.get(&url).send().await?;
        read_rows(response, url).await
    }

    /// Malformed results are skipped.
    pub async fn fetch_results(&self, query: &HistoryQuery) -> Result<Vec<TestResult>, ApiError> {
        let url = self.url("/api/results");
        let response = self
            .http
            .get(&url)
            .query(&query.params())
            .send()
            .await?;
        read_rows(response, url).await
    }

    pub async fn create_config(&self, config: &TestConfig) -> Result<TestConfig, ApiError> {
        let url = self.url("/api/configs");
        let response = self.http.post(&url).json(config).send().await?;
        read_json(response, url).await
    }

    pub async fn update_config(&self, id: &str, config: &TestConfig) -> Result<TestConfig, ApiError> {
        let url = self.url(&format!("/api/configs/{}", id));
        let response = self.http.put(&url).json(config).send().await?;
        read_json(response, url).await
    }

    pub async fn delete_config(&self, id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("/api/configs/{}", id));
        let response = self.http.delete(&url).send().await?;
        check_status(&response, &url)?;
        Ok(())
    }
}

fn check_status(response: &reqwest::Response, url: &str) -> Result<(), ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(())
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response, url: String) -> Result<T, ApiError> {
    check_status(&response, &url)?;
    Ok(response.json().await?)
}

/// Decode a JSON array row by row, dropping rows that do not decode.
async fn read_rows<T: DeserializeOwned>(response: reqwest::Response, url: String) -> Result<Vec<T>, ApiError> {
    let rows: Vec<serde_json::Value> = read_json(response, url.clone()).await?;
    let total = rows.len();

    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Api: skipping malformed row from {}: {}", url, e);
                None
            }
        })
        .collect();

    if decoded.len() < total {
        tracing::debug!("Api: kept {}/{} rows from {}", decoded.len(), total, url);
    }
    Ok(decoded)
}
