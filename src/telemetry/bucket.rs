//! Success-rate buckets.
//!
//! Results are grouped into 5-minute slots keyed by hour-of-day and floored
//! minute (`"10:5"` covers 10:05–10:09). The date is not part of the key.

use super::TimeWindow;
use crate::model::TestResult;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Width of a bucket in minutes.
pub const BUCKET_MINUTES: u32 = 5;

/// How emitted buckets are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketOrder {
    /// String comparison of the keys. `"10:0"` sorts before `"9:30"`.
    Lexicographic,
    /// Earliest sample time in each bucket.
    #[default]
    Chronological,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub hour: u32,
    pub minute: u32,
}

impl BucketKey {
    pub fn for_time(ts: DateTime<Utc>, tz: Tz) -> Self {
        let local = ts.with_timezone(&tz);
        Self {
            hour: local.hour(),
            minute: local.minute() / BUCKET_MINUTES * BUCKET_MINUTES,
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    key: BucketKey,
    total: usize,
    successful: usize,
    first_seen: DateTime<Utc>,
}

/// One point of the success-rate chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessRatePoint {
    pub time: String,
    /// Percentage, 0–100.
    pub success_rate: f64,
    pub total: usize,
    #[serde(skip)]
    pub successful: usize,
}

/// Group in-window results into buckets and compute each bucket's success
/// percentage.
pub fn aggregate_success_rate<'a, I>(
    results: I,
    window: TimeWindow,
    now: DateTime<Utc>,
    tz: Tz,
    order: BucketOrder,
) -> Vec<SuccessRatePoint>
where
    I: IntoIterator<Item = &'a TestResult>,
{
    let cutoff = window.cutoff(now);
    let mut buckets: HashMap<BucketKey, Bucket> = HashMap::new();

    for result in results.into_iter().filter(|r| r.timestamp >= cutoff) {
        let key = BucketKey::for_time(result.timestamp, tz);
        let bucket = buckets.entry(key).or_insert(Bucket {
            key,
            total: 0,
            successful: 0,
            first_seen: result.timestamp,
        });
        bucket.total += 1;
        if result.success {
            bucket.successful += 1;
        }
        bucket.first_seen = bucket.first_seen.min(result.timestamp);
    }

    let mut buckets: Vec<Bucket> = buckets.into_values().collect();
    match order {
        BucketOrder::Lexicographic => {
            buckets.sort_by_cached_key(|b| b.key.to_string());
        }
        BucketOrder::Chronological => {
            buckets.sort_by_key(|b| b.first_seen);
        }
    }

    buckets
        .into_iter()
        .map(|b| SuccessRatePoint {
            time: b.key.to_string(),
            success_rate: 100.0 * b.successful as f64 / b.total as f64,
            total: b.total,
            successful: b.successful,
        })
        .collect()
}

/// Keep only the last `n` points.
pub fn most_recent(mut points: Vec<SuccessRatePoint>, n: usize) -> Vec<SuccessRatePoint> {
    if points.len() > n {
        points.drain(..points.len() - n);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, success: bool) -> TestResult {
        TestResult {
            id: format!("{}:{}", h, m),
            config_id: "c1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 10, h, m, 0).unwrap(),
            success,
            response_time: None,
            error: None,
            data: None,
        }
    }

    fn hours(h: u32) -> TimeWindow {
        TimeWindow::from_minutes(h * 60).unwrap()
    }

    #[test]
    fn test_two_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 10, 30, 0).unwrap();
        let results = [at(10, 2, true), at(10, 3, false), at(10, 7, true)];

        let points = aggregate_success_rate(
            &results,
            hours(1),
            now,
            chrono_tz::UTC,
            BucketOrder::Chronological,
        );

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].time, "10:0");
        assert_eq!(points[0].total, 2);
        assert_eq!(points[0].successful, 1);
        assert_eq!(points[0].success_rate, 50.0);
        assert_eq!(points[1].time, "10:5");
        assert_eq!(points[1].total, 1);
        assert_eq!(points[1].success_rate, 100.0);
    }

    #[test]
    fn test_out_of_window_excluded() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let results = [at(10, 59, true), at(11, 0, true), at(11, 30, false)];

        let points = aggregate_success_rate(
            &results,
            hours(1),
            now,
            chrono_tz::UTC,
            BucketOrder::Chronological,
        );

        let total: usize = points.iter().map(|p| p.total).sum();
        assert_eq!(total, 2);
        assert!(points.iter().all(|p| p.time != "10:55"));
    }

    #[test]
    fn test_lexicographic_order_reproduces_string_sort() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 11, 0, 0).unwrap();
        let results = [at(9, 30, true), at(10, 0, true), at(10, 45, false)];

        let points = aggregate_success_rate(
            &results,
            hours(4),
            now,
            chrono_tz::UTC,
            BucketOrder::Lexicographic,
        );

        let keys: Vec<_> = points.iter().map(|p| p.time.as_str()).collect();
        assert_eq!(keys, vec!["10:0", "10:45", "9:30"]);
    }

    #[test]
    fn test_chronological_order_across_hours() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 11, 0, 0).unwrap();
        let results = [at(10, 45, false), at(9, 30, true), at(10, 0, true)];

        let points = aggregate_success_rate(
            &results,
            hours(4),
            now,
            chrono_tz::UTC,
            BucketOrder::Chronological,
        );

        let keys: Vec<_> = points.iter().map(|p| p.time.as_str()).collect();
        assert_eq!(keys, vec!["9:30", "10:0", "10:45"]);
    }

    #[test]
    fn test_chronological_order_across_midnight() {
        let late = TestResult {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 23, 55, 0).unwrap(),
            ..at(0, 0, true)
        };
        let early = at(0, 5, false);
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 30, 0).unwrap();

        let points = aggregate_success_rate(
            [&early, &late],
            hours(1),
            now,
            chrono_tz::UTC,
            BucketOrder::Chronological,
        );
        let keys: Vec<_> = points.iter().map(|p| p.time.as_str()).collect();
        assert_eq!(keys, vec!["23:55", "0:5"]);

        let points = aggregate_success_rate(
            [&early, &late],
            hours(1),
            now,
            chrono_tz::UTC,
            BucketOrder::Lexicographic,
        );
        let keys: Vec<_> = points.iter().map(|p| p.time.as_str()).collect();
        assert_eq!(keys, vec!["0:5", "23:55"]);
    }

    #[test]
    fn test_bucket_key_in_display_timezone() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 16, 7, 0).unwrap();
        let key = BucketKey::for_time(ts, chrono_tz::America::Chicago);
        assert_eq!(key.to_string(), "10:5");
    }

    #[test]
    fn test_most_recent() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 23, 0, 0).unwrap();
        let results: Vec<_> = (0..20).map(|i| at(20 + i / 12, (i % 12) * 5, true)).collect();

        let points = aggregate_success_rate(
            &results,
            hours(4),
            now,
            chrono_tz::UTC,
            BucketOrder::Chronological,
        );
        assert_eq!(points.len(), 20);

        let recent = most_recent(points, 12);
        assert_eq!(recent.len(), 12);
        assert_eq!(recent[0].time, "20:40");
        assert_eq!(recent[11].time, "21:35");
    }

    #[test]
    fn test_empty_input() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 23, 0, 0).unwrap();
        let results: Vec<TestResult> = Vec::new();
        let points = aggregate_success_rate(
            &results,
            hours(1),
            now,
            chrono_tz::UTC,
            BucketOrder::Chronological,
        );
        assert!(points.is_empty());
    }
}
