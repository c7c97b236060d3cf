//! Time windows: the global default, per-panel overrides and the coarser
//! history range used for backend queries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum WindowError {
    #[error("time window must be a positive number of minutes, got {0}")]
    InvalidMinutes(u32),
    #[error("unknown history range: {0}")]
    UnknownRange(String),
}

/// A rolling display window, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeWindow {
    minutes: u32,
}

impl TimeWindow {
    /// Windows offered by the panel selectors.
    pub const PRESETS: [u32; 7] = [5, 15, 30, 60, 240, 720, 1440];

    pub const HOUR: TimeWindow = TimeWindow { minutes: 60 };

    pub fn from_minutes(minutes: u32) -> Result<Self, WindowError> {
        if minutes == 0 {
            return Err(WindowError::InvalidMinutes(minutes));
        }
        Ok(Self { minutes })
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes as i64)
    }

    /// Oldest instant still inside the window.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }

    pub fn contains(&self, ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        ts >= self.cutoff(now)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::HOUR
    }
}

impl TryFrom<u32> for TimeWindow {
    type Error = WindowError;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        Self::from_minutes(minutes)
    }
}

impl From<TimeWindow> for u32 {
    fn from(w: TimeWindow) -> u32 {
        w.minutes
    }
}

/// Effective window for a panel: its local override if set, else the global
/// default.
pub fn resolve(local: Option<TimeWindow>, global: TimeWindow) -> TimeWindow {
    local.unwrap_or(global)
}

/// What a panel's window selector shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "minutes", rename_all = "snake_case")]
pub enum WindowSelection {
    Global,
    Custom(TimeWindow),
}

/// Per-panel window overrides keyed by config id.
#[derive(Debug, Clone, Default)]
pub struct PanelWindows {
    overrides: HashMap<String, TimeWindow>,
}

impl PanelWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear a panel's override. Clearing falls back to the global
    /// default.
    pub fn set(&mut self, panel: &str, window: Option<TimeWindow>) {
        match window {
            Some(w) => {
                self.overrides.insert(panel.to_string(), w);
            }
            None => {
                self.overrides.remove(panel);
            }
        }
    }

    pub fn get(&self, panel: &str) -> Option<TimeWindow> {
        self.overrides.get(panel).copied()
    }

    pub fn effective(&self, panel: &str, global: TimeWindow) -> TimeWindow {
        resolve(self.get(panel), global)
    }

    /// An override equal to the global default is shown as `Global`.
    pub fn selection(&self, panel: &str, global: TimeWindow) -> WindowSelection {
        match self.get(panel) {
            Some(w) if w != global => WindowSelection::Custom(w),
            _ => WindowSelection::Global,
        }
    }
}

/// Range controlling which history is fetched from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryRange {
    #[default]
    LastHour,
    Last6Hours,
    Last24Hours,
    Last7Days,
    Last30Days,
}

impl HistoryRange {
    pub const ALL: [HistoryRange; 5] = [
        HistoryRange::LastHour,
        HistoryRange::Last6Hours,
        HistoryRange::Last24Hours,
        HistoryRange::Last7Days,
        HistoryRange::Last30Days,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryRange::LastHour => "1h",
            HistoryRange::Last6Hours => "6h",
            HistoryRange::Last24Hours => "24h",
            HistoryRange::Last7Days => "7d",
            HistoryRange::Last30Days => "30d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            HistoryRange::LastHour => Duration::hours(1),
            HistoryRange::Last6Hours => Duration::hours(6),
            HistoryRange::Last24Hours => Duration::hours(24),
            HistoryRange::Last7Days => Duration::days(7),
            HistoryRange::Last30Days => Duration::days(30),
        }
    }

    /// Lower bound for the history query.
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryRange {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| WindowError::UnknownRange(s.to_string()))
    }
}

impl Serialize for HistoryRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HistoryRange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
