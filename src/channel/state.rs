//! Connection state machine for the push channel.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    AwaitingRetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    Start,
    Open,
    /// Connection closed or failed, including a failed connect attempt.
    Close,
    RetryTimerFired,
    Teardown,
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    None,
    Connect,
    ScheduleRetry,
}

/// Pure transition logic. After `Teardown` every event is ignored, so no
/// further connect or retry can be requested.
#[derive(Debug, Clone)]
pub struct ChannelMachine {
    state: ChannelState,
    torn_down: bool,
}

impl Default for ChannelMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelMachine {
    pub fn new() -> Self {
        Self {
            state: ChannelState::Disconnected,
            torn_down: false,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn handle(&mut self, event: ChannelEvent) -> ChannelAction {
        use ChannelEvent::*;
        use ChannelState::*;

        if self.torn_down {
            return ChannelAction::None;
        }

        let (next, action) = match (self.state, event) {
            (_, Teardown) => {
                self.torn_down = true;
                (Disconnected, ChannelAction::None)
            }
            (Disconnected, Start) => (Connecting, ChannelAction::Connect),
            (Connecting, Open) => (Connected, ChannelAction::None),
            (Connecting | Connected, Close) => (AwaitingRetry, ChannelAction::ScheduleRetry),
            (AwaitingRetry, RetryTimerFired) => (Connecting, ChannelAction::Connect),
            (state, _) => (state, ChannelAction::None),
        };

        self.state = next;
        action
    }
}
