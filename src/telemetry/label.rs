//! Axis labels whose granularity follows the effective window.

use super::TimeWindow;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Label granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelTier {
    /// `14:05`, for windows up to an hour.
    Clock,
    /// `2:05 PM`, for windows up to a day.
    Meridiem,
    /// `Oct 18, 2:05 PM`, for anything longer.
    Dated,
}

impl LabelTier {
    pub fn for_window(window: TimeWindow) -> Self {
        match window.minutes() {
            0..=60 => LabelTier::Clock,
            61..=1440 => LabelTier::Meridiem,
            _ => LabelTier::Dated,
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            LabelTier::Clock => "%H:%M",
            LabelTier::Meridiem => "%-I:%M %p",
            LabelTier::Dated => "%b %-d, %-I:%M %p",
        }
    }
}

/// Formats instants in the display timezone at a fixed tier.
#[derive(Debug, Clone, Copy)]
pub struct TimeLabeler {
    tier: LabelTier,
    tz: Tz,
}

impl TimeLabeler {
    pub fn for_window(window: TimeWindow, tz: Tz) -> Self {
        Self {
            tier: LabelTier::for_window(window),
            tz,
        }
    }

    pub fn label(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.tz)
            .format(self.tier.pattern())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn labeler(minutes: u32, tz: Tz) -> TimeLabeler {
        TimeLabeler::for_window(TimeWindow::from_minutes(minutes).unwrap(), tz)
    }

    #[test]
    fn test_tier_boundaries() {
        let tier = |m| LabelTier::for_window(TimeWindow::from_minutes(m).unwrap());
        assert_eq!(tier(5), LabelTier::Clock);
        assert_eq!(tier(60), LabelTier::Clock);
        assert_eq!(tier(61), LabelTier::Meridiem);
        assert_eq!(tier(1440), LabelTier::Meridiem);
        assert_eq!(tier(1441), LabelTier::Dated);
    }

    #[test]
    fn test_label_formats() {
        let ts = Utc.with_ymd_and_hms(2024, 10, 18, 14, 5, 30).unwrap();
        assert_eq!(labeler(15, chrono_tz::UTC).label(ts), "14:05");
        assert_eq!(labeler(240, chrono_tz::UTC).label(ts), "2:05 PM");
        assert_eq!(labeler(10080, chrono_tz::UTC).label(ts), "Oct 18, 2:05 PM");
    }

    #[test]
    fn test_label_uses_display_timezone() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 14, 5, 0).unwrap();
        // Chicago is UTC-6 in January.
        assert_eq!(labeler(60, chrono_tz::America::Chicago).label(ts), "08:05");
    }
}
