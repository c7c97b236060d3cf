//! Live result channel.
//!
//! Holds one push connection open, forwards every decoded result to the
//! dashboard and reconnects after a fixed delay whenever the connection
//! drops or cannot be opened. Retries continue until shutdown.

mod state;
mod transport;

pub use state::*;
pub use transport::*;

use crate::model::{decode_result, TestResult};

use futures_util::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

/// Pause between a close and the next connect attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Handle to the background connection task.
pub struct ChannelManager {
    state_rx: watch::Receiver<ChannelState>,
    stop_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl ChannelManager {
    /// Start connecting immediately. Decoded results are sent to `tx` in
    /// arrival order.
    pub fn spawn<C: Connector>(connector: C, tx: mpsc::Sender<TestResult>) -> Self {
        Self::with_delay(connector, tx, RECONNECT_DELAY)
    }

    pub fn with_delay<C: Connector>(
        connector: C,
        tx: mpsc::Sender<TestResult>,
        delay: Duration,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (stop_tx, _) = broadcast::channel(1);
        let stop_rx = stop_tx.subscribe();

        let handle = tokio::spawn(run_channel(connector, tx, state_tx, stop_rx, delay));

        Self {
            state_rx,
            stop_tx,
            handle,
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Close the connection, cancel any pending retry and wait for the task
    /// to finish.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(());
        if let Err(e) = self.handle.await {
            tracing::error!("Channel task failed: {}", e);
        }
    }
}

async fn run_channel<C: Connector>(
    connector: C,
    tx: mpsc::Sender<TestResult>,
    state_tx: watch::Sender<ChannelState>,
    mut stop_rx: broadcast::Receiver<()>,
    delay: Duration,
) {
    let endpoint = connector.describe();
    let mut machine = ChannelMachine::new();
    let mut action = machine.handle(ChannelEvent::Start);

    'run: loop {
        let _ = state_tx.send(machine.state());

        match action {
            ChannelAction::Connect => {
                let attempt = tokio::select! {
                    _ = stop_rx.recv() => break 'run,
                    attempt = connector.connect() => attempt,
                };

                let mut stream = match attempt {
                    Ok(stream) => stream,
                    Err(e) => {
                        tracing::warn!("Channel: {} unavailable: {}", endpoint, e);
                        action = machine.handle(ChannelEvent::Close);
                        continue;
                    }
                };

                machine.handle(ChannelEvent::Open);
                let _ = state_tx.send(machine.state());
                tracing::info!("Channel: connected to {}", endpoint);

                loop {
                    tokio::select! {
                        _ = stop_rx.recv() => break 'run,
                        frame = stream.next() => match frame {
                            Some(Ok(text)) => {
                                let result = match decode_result(&text) {
                                    Ok(r) => r,
                                    Err(e) => {
                                        tracing::warn!("Channel: dropping undecodable message: {}", e);
                                        continue;
                                    }
                                };
                                if tx.send(result).await.is_err() {
                                    tracing::debug!("Channel: receiver gone, stopping");
                                    break 'run;
                                }
                            }
                            Some(Err(e)) => {
                                tracing::warn!("Channel: {} failed: {}", endpoint, e);
                                break;
                            }
                            None => break,
                        }
                    }
                }

                tracing::info!(
                    "Channel: disconnected from {}, retrying in {:?}",
                    endpoint,
                    delay
                );
                action = machine.handle(ChannelEvent::Close);
            }
            ChannelAction::ScheduleRetry => {
                tokio::select! {
                    _ = stop_rx.recv() => break 'run,
                    _ = tokio::time::sleep(delay) => {}
                }
                action = machine.handle(ChannelEvent::RetryTimerFired);
            }
            ChannelAction::None => break,
        }
    }

    machine.handle(ChannelEvent::Teardown);
    let _ = state_tx.send(machine.state());
    tracing::info!("Channel: closed");
}
