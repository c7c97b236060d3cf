//! Dashboard runtime: owns the state, keeps it fed from the backend and the
//! live channel.

mod state;

pub use state::*;

use crate::api::{ApiClient, ApiError, HistoryQuery};
use crate::channel::{ChannelManager, ChannelState, Connector};
use crate::model::{TestConfig, TestResult};
use crate::telemetry::HistoryRange;

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;

/// Cloneable handle shared by the web layer.
#[derive(Clone)]
pub struct Dashboard {
    state: Arc<RwLock<DashboardState>>,
    api: ApiClient,
    channel: Arc<Mutex<Option<ChannelManager>>>,
}

impl Dashboard {
    pub fn new(state: DashboardState, api: ApiClient) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            api,
            channel: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, DashboardState> {
        self.state.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, DashboardState> {
        self.state.write().await
    }

    /// Open the live channel, then load configs and history in the
    /// background. Returns as soon as the channel task is running; the
    /// returned handle completes when the initial load does.
    pub async fn start<C: Connector>(&self, connector: C) -> JoinHandle<()> {
        let (tx, rx) = mpsc::channel(1000);
        tokio::spawn(run_result_writer(rx, self.state.clone()));

        tracing::info!("Dashboard: opening live channel to {}", connector.describe());
        let manager = ChannelManager::spawn(connector, tx);
        *self.channel.lock().await = Some(manager);

        let this = self.clone();
        tokio::spawn(async move {
            this.refresh_configs().await;
            this.refresh_history().await;
        })
    }

    pub async fn channel_state(&self) -> ChannelState {
        match self.channel.lock().await.as_ref() {
            Some(m) => m.state(),
            None => ChannelState::Disconnected,
        }
    }

    /// Reload the config set. On failure the previous set is kept.
    pub async fn refresh_configs(&self) {
        match self.api.fetch_configs().await {
            Ok(configs) => {
                tracing::debug!("Dashboard: loaded {} configs", configs.len());
                self.state.write().await.apply_configs(configs);
            }
            Err(e) => tracing::warn!("Dashboard: failed to fetch configs: {}", e),
        }
    }

    /// Fetch history for the current filters. On failure the buffered
    /// results are kept.
    pub async fn refresh_history(&self) {
        let query = {
            let state = self.state.read().await;
            HistoryQuery {
                since: state.history_range().since(Utc::now()),
                config_id: state.config_filter().config_id().map(str::to_string),
            }
        };

        match self.api.fetch_results(&query).await {
            Ok(results) => {
                tracing::debug!("Dashboard: loaded {} historical results", results.len());
                self.state.write().await.apply_history(results);
            }
            Err(e) => tracing::warn!("Dashboard: failed to fetch results: {}", e),
        }
    }

    /// Change the history filters and refetch in the background. Earlier
    /// fetches still in flight are not cancelled; whichever completes last
    /// determines the buffer.
    pub async fn set_history_filter(&self, range: HistoryRange, filter: ConfigFilter) -> JoinHandle<()> {
        self.state.write().await.set_history_filter(range, filter);

        let this = self.clone();
        tokio::spawn(async move { this.refresh_history().await })
    }

    pub async fn create_config(&self, config: &TestConfig) -> Result<TestConfig, ApiError> {
        let saved = self.api.create_config(config).await?;
        self.refresh_configs().await;
        Ok(saved)
    }

    pub async fn update_config(&self, id: &str, config: &TestConfig) -> Result<TestConfig, ApiError> {
        let saved = self.api.update_config(id, config).await?;
        self.refresh_configs().await;
        Ok(saved)
    }

    pub async fn delete_config(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete_config(id).await?;
        self.refresh_configs().await;
        Ok(())
    }

    /// Set every config's sampling interval, one update at a time. Stops at
    /// the first failure; configs already updated keep the new interval.
    pub async fn apply_interval_to_all(&self, interval: u32) -> Result<usize, ApiError> {
        let configs: Vec<TestConfig> = self.state.read().await.configs().iter().cloned().collect();

        let mut updated = 0;
        for mut config in configs {
            config.interval = interval;
            if let Err(e) = self.api.update_config(&config.id, &config).await {
                self.refresh_configs().await;
                return Err(e);
            }
            updated += 1;
        }

        tracing::info!("Dashboard: interval set to {}s on {} configs", interval, updated);
        self.refresh_configs().await;
        Ok(updated)
    }

    /// Stop the live channel. State stays readable.
    pub async fn shutdown(&self) {
        if let Some(manager) = self.channel.lock().await.take() {
            manager.shutdown().await;
        }
    }
}

/// Apply pushed results in arrival order until the channel closes.
async fn run_result_writer(mut rx: mpsc::Receiver<TestResult>, state: Arc<RwLock<DashboardState>>) {
    while let Some(result) = rx.recv().await {
        tracing::trace!("Dashboard: push {} for {}", result.id, result.config_id);
        state.write().await.apply_push(result);
    }
    tracing::debug!("Dashboard: result writer stopped");
}
