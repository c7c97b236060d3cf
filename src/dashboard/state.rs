//! Dashboard state and the views derived from it.
//!
//! Every view is recomputed from the buffered results on each call, so the
//! effective window is always measured against the caller's `now`.

use crate::model::{
    BandwidthPayload, ConfigSet, DnsPayload, HttpPayload, PingPayload, TestConfig, TestKind,
    TestResult, TraceroutePayload,
};
use crate::telemetry::{
    aggregate_success_rate, is_public_resolver, most_recent, pivot, BucketOrder, HistoryRange,
    PanelWindows, ResultBuffer, Series, SuccessRatePoint, TimeLabeler, TimeWindow,
    WindowSelection,
};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Buckets shown by the success-rate panel.
pub const SUCCESS_RATE_BUCKETS: usize = 12;

/// History filter by config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigFilter {
    #[default]
    All,
    Only(String),
}

impl ConfigFilter {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None | Some("") | Some("all") => ConfigFilter::All,
            Some(id) => ConfigFilter::Only(id.to_string()),
        }
    }

    pub fn config_id(&self) -> Option<&str> {
        match self {
            ConfigFilter::All => None,
            ConfigFilter::Only(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_configs: usize,
    pub enabled_configs: usize,
    /// Successes among the newest `total_configs` results.
    pub recent_successes: usize,
    pub recent_failures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickStats {
    /// Mean over results that report an elapsed time.
    pub avg_response_time_ms: Option<f64>,
    /// Percentage over all buffered results.
    pub success_rate: Option<f64>,
    pub total_results: usize,
}

/// One line of the recent-results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub id: String,
    pub config_id: String,
    pub name: String,
    pub kind: TestKind,
    pub success: bool,
    pub response_time: String,
    pub details: String,
    pub error: Option<String>,
    pub timestamp: String,
}

/// A chart panel: its window selection plus the pivoted series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub config_id: String,
    pub name: String,
    pub kind: TestKind,
    pub window_minutes: u32,
    pub selection: WindowSelection,
    pub series: Series,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    configs: ConfigSet,
    buffer: ResultBuffer,
    global_window: TimeWindow,
    panels: PanelWindows,
    range: HistoryRange,
    filter: ConfigFilter,
    tz: Tz,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(TimeWindow::default(), HistoryRange::default(), chrono_tz::UTC)
    }
}

impl DashboardState {
    pub fn new(global_window: TimeWindow, range: HistoryRange, tz: Tz) -> Self {
        Self {
            configs: ConfigSet::default(),
            buffer: ResultBuffer::new(),
            global_window,
            panels: PanelWindows::new(),
            range,
            filter: ConfigFilter::All,
            tz,
        }
    }

    /// A result pushed over the live channel.
    pub fn apply_push(&mut self, result: TestResult) {
        self.buffer.push(result);
    }

    /// A completed history fetch replaces the buffer.
    pub fn apply_history(&mut self, results: Vec<TestResult>) {
        self.buffer.replace(results);
    }

    pub fn apply_configs(&mut self, configs: Vec<TestConfig>) {
        self.configs = ConfigSet::new(configs);
    }

    pub fn configs(&self) -> &ConfigSet {
        &self.configs
    }

    pub fn buffer(&self) -> &ResultBuffer {
        &self.buffer
    }

    pub fn global_window(&self) -> TimeWindow {
        self.global_window
    }

    pub fn set_global_window(&mut self, window: TimeWindow) {
        self.global_window = window;
    }

    /// Set or clear a panel's override.
    pub fn set_panel_window(&mut self, config_id: &str, window: Option<TimeWindow>) {
        self.panels.set(config_id, window);
    }

    pub fn panel_window(&self, config_id: &str) -> TimeWindow {
        self.panels.effective(config_id, self.global_window)
    }

    pub fn panel_selection(&self, config_id: &str) -> WindowSelection {
        self.panels.selection(config_id, self.global_window)
    }

    pub fn history_range(&self) -> HistoryRange {
        self.range
    }

    pub fn config_filter(&self) -> &ConfigFilter {
        &self.filter
    }

    pub fn set_history_filter(&mut self, range: HistoryRange, filter: ConfigFilter) {
        self.range = range;
        self.filter = filter;
    }

    /// Chart data for one config panel.
    ///
    /// Results whose config cannot be resolved are charted as the `Unknown`
    /// kind. `None` only when neither a config nor any buffered result
    /// carries the id.
    pub fn series(&self, config_id: &str, now: DateTime<Utc>) -> Option<PanelView> {
        if self.configs.get(config_id).is_none()
            && !self.buffer.iter().any(|r| r.config_id == config_id)
        {
            return None;
        }
        let kind = self.configs.kind_of(config_id);
        let window = self.panel_window(config_id);

        let mut selected: Vec<&TestResult> = self
            .buffer
            .iter()
            .filter(|r| r.config_id == config_id && window.contains(r.timestamp, now))
            .collect();
        selected.sort_by_key(|r| r.timestamp);

        let labeler = TimeLabeler::for_window(window, self.tz);
        Some(PanelView {
            config_id: config_id.to_string(),
            name: self.configs.name_of(config_id).to_string(),
            kind,
            window_minutes: window.minutes(),
            selection: self.panel_selection(config_id),
            series: pivot(kind, &selected, &labeler),
        })
    }

    /// Success-rate buckets under the global window.
    pub fn success_rate(&self, now: DateTime<Utc>) -> Vec<SuccessRatePoint> {
        let points = aggregate_success_rate(
            self.buffer.iter(),
            self.global_window,
            now,
            self.tz,
            BucketOrder::Chronological,
        );
        most_recent(points, SUCCESS_RATE_BUCKETS)
    }

    pub fn stats(&self) -> DashboardStats {
        let total = self.configs.len();
        let recent_successes = self.buffer.iter().take(total).filter(|r| r.success).count();
        let recent = self.buffer.len().min(total);

        DashboardStats {
            total_configs: total,
            enabled_configs: self.configs.iter().filter(|c| c.enabled).count(),
            recent_successes,
            recent_failures: recent - recent_successes,
        }
    }

    pub fn quick_stats(&self) -> QuickStats {
        let timed: Vec<f64> = self
            .buffer
            .iter()
            .filter_map(|r| r.response_time_ms())
            .filter(|ms| *ms > 0.0)
            .collect();
        let avg_response_time_ms = if timed.is_empty() {
            None
        } else {
            Some(timed.iter().sum::<f64>() / timed.len() as f64)
        };

        let total = self.buffer.len();
        let success_rate = if total == 0 {
            None
        } else {
            let ok = self.buffer.iter().filter(|r| r.success).count();
            Some(100.0 * ok as f64 / total as f64)
        };

        QuickStats {
            avg_response_time_ms,
            success_rate,
            total_results: total,
        }
    }

    /// Newest buffered result for a config.
    pub fn latest_result(&self, config_id: &str) -> Option<&TestResult> {
        self.buffer.iter().find(|r| r.config_id == config_id)
    }

    pub fn table(&self, limit: usize) -> Vec<ResultRow> {
        self.buffer
            .iter()
            .take(limit)
            .map(|r| {
                let kind = self.configs.kind_of(&r.config_id);
                ResultRow {
                    id: r.id.clone(),
                    config_id: r.config_id.clone(),
                    name: self.configs.name_of(&r.config_id).to_string(),
                    kind,
                    success: r.success,
                    response_time: format_response_time(r.response_time),
                    details: describe(kind, r),
                    error: r.error.clone(),
                    timestamp: r
                        .timestamp
                        .with_timezone(&self.tz)
                        .format("%m/%d/%Y, %I:%M:%S %p")
                        .to_string(),
                }
            })
            .collect()
    }
}

/// `-` when absent or zero, milliseconds below one second, seconds above.
pub fn format_response_time(seconds: Option<f64>) -> String {
    match seconds {
        None => "-".to_string(),
        Some(s) if s == 0.0 => "-".to_string(),
        Some(s) if s < 1.0 => format!("{:.0}ms", s * 1000.0),
        Some(s) => format!("{:.2}s", s),
    }
}

/// One-line summary of a result's payload.
pub fn describe(kind: TestKind, result: &TestResult) -> String {
    let data = match result.data.as_ref() {
        Some(d) if !d.is_null() => d,
        _ => return "-".to_string(),
    };

    match kind {
        TestKind::Ping => match PingPayload::from_data(Some(data)).and_then(|p| p.rtt) {
            Some(rtt) => format!("RTT: {}ms", rtt),
            None => "Ping successful".to_string(),
        },
        TestKind::Http => {
            let p = HttpPayload::from_data(Some(data)).unwrap_or_default();
            let status = p
                .status_code
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let kb = p.content_length.unwrap_or(0) as f64 / 1024.0;
            format!("Status: {} ({:.1}KB)", status, kb)
        }
        TestKind::Dns => describe_dns(&DnsPayload::from_data(Some(data)).unwrap_or_default()),
        TestKind::Traceroute => {
            let hops = TraceroutePayload::from_data(Some(data))
                .map(|t| t.hops())
                .unwrap_or(0);
            format!("Traceroute completed, {} hops", hops)
        }
        TestKind::SpeedtestOokla | TestKind::SpeedtestFast | TestKind::Iperf3 => {
            let p = BandwidthPayload::from_data(Some(data)).unwrap_or_default();
            format!(
                "Down {:.1} Mbps, Up {:.1} Mbps",
                p.download_mbps, p.upload_mbps
            )
        }
        TestKind::Unknown => {
            let raw = data.to_string();
            let head: String = raw.chars().take(50).collect();
            format!("{}...", head)
        }
    }
}

/// Local resolvers are listed with their timings; public ones are counted.
fn describe_dns(p: &DnsPayload) -> String {
    let mut parts = vec![format!(
        "Type: {}",
        p.record_type.as_deref().unwrap_or("-")
    )];

    if let Some(tested) = p.servers_tested.filter(|n| *n > 0) {
        parts.push(format!(
            "{}/{} servers ({:.1}%)",
            p.successful_queries.unwrap_or(0),
            tested,
            p.success_rate.unwrap_or(0.0)
        ));
    }

    let (public, local): (Vec<_>, Vec<_>) = p
        .successful_samples()
        .partition(|s| is_public_resolver(&s.server));
    for s in local {
        parts.push(format!(
            "{}: {:.1}ms",
            s.server,
            s.response_time.unwrap_or(0.0)
        ));
    }
    if !public.is_empty() {
        parts.push(format!("+{} public", public.len()));
    }

    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::PivotStrategy;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn config(id: &str, name: &str, kind: TestKind, enabled: bool) -> TestConfig {
        TestConfig {
            id: id.to_string(),
            name: name.to_string(),
            test_type: kind,
            target: "example.com".to_string(),
            enabled,
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn result(id: &str, config_id: &str, mins_ago: i64, success: bool) -> TestResult {
        TestResult {
            id: id.to_string(),
            config_id: config_id.to_string(),
            timestamp: now() - Duration::minutes(mins_ago),
            success,
            response_time: Some(0.1),
            error: None,
            data: None,
        }
    }

    fn state() -> DashboardState {
        let mut s = DashboardState::default();
        s.apply_configs(vec![
            config("p", "Ping", TestKind::Ping, true),
            config("d", "DNS", TestKind::Dns, true),
            config("h", "Web", TestKind::Http, false),
        ]);
        s
    }

    #[test]
    fn test_series_filters_by_config_and_window() {
        let mut s = state();
        s.apply_history(vec![
            result("old", "p", 90, true),
            result("a", "p", 30, true),
            result("b", "p", 10, true),
            result("other", "h", 5, true),
        ]);

        let view = s.series("p", now()).unwrap();
        assert_eq!(view.window_minutes, 60);
        assert_eq!(view.selection, WindowSelection::Global);
        assert_eq!(view.series.points.len(), 2);
        assert!(view.series.points[0].timestamp < view.series.points[1].timestamp);
        assert_eq!(view.series.points[0].time, "11:30");
    }

    #[test]
    fn test_panel_override_widens_window() {
        let mut s = state();
        s.apply_history(vec![result("old", "p", 90, true), result("new", "p", 10, true)]);

        s.set_panel_window("p", Some(TimeWindow::from_minutes(240).unwrap()));
        let view = s.series("p", now()).unwrap();
        assert_eq!(view.series.points.len(), 2);
        assert_eq!(
            view.selection,
            WindowSelection::Custom(TimeWindow::from_minutes(240).unwrap())
        );
        assert_eq!(view.series.points[0].time, "10:30 AM");

        // Other panels keep the global default.
        assert_eq!(s.panel_window("d").minutes(), 60);

        s.set_panel_window("p", None);
        assert_eq!(s.series("p", now()).unwrap().series.points.len(), 1);
    }

    #[test]
    fn test_global_window_change_applies_to_panels_without_override() {
        let mut s = state();
        s.apply_history(vec![result("a", "p", 20, true), result("b", "p", 3, true)]);
        s.set_global_window(TimeWindow::from_minutes(5).unwrap());
        assert_eq!(s.series("p", now()).unwrap().series.points.len(), 1);
    }

    #[test]
    fn test_series_unknown_config() {
        assert!(state().series("missing", now()).is_none());
    }

    #[test]
    fn test_series_for_unresolved_config_uses_unknown_kind() {
        let mut s = state();
        s.apply_push(result("a", "gone", 5, true));

        let view = s.series("gone", now()).unwrap();
        assert_eq!(view.name, "Unknown");
        assert_eq!(view.kind, TestKind::Unknown);
        assert_eq!(view.series.strategy, PivotStrategy::Scalar);
        assert_eq!(view.series.points.len(), 1);

        // Charts survive a config disappearing from the set.
        s.apply_push(result("b", "p", 5, true));
        s.apply_configs(vec![]);
        assert_eq!(s.series("p", now()).unwrap().kind, TestKind::Unknown);
    }

    #[test]
    fn test_series_recomputed_as_time_advances() {
        let mut s = state();
        s.apply_push(result("a", "p", 50, true));
        assert_eq!(s.series("p", now()).unwrap().series.points.len(), 1);
        let later = now() + Duration::minutes(15);
        assert!(s.series("p", later).unwrap().series.is_empty());
    }

    #[test]
    fn test_push_prepends() {
        let mut s = state();
        s.apply_history(vec![result("a", "p", 10, true)]);
        s.apply_push(result("b", "p", 0, false));
        assert_eq!(s.latest_result("p").unwrap().id, "b");
        assert_eq!(s.buffer().len(), 2);
    }

    #[test]
    fn test_stats() {
        let mut s = state();
        s.apply_history(vec![
            result("a", "p", 1, true),
            result("b", "d", 2, false),
            result("c", "h", 3, true),
            result("d", "p", 4, false),
        ]);

        let stats = s.stats();
        assert_eq!(stats.total_configs, 3);
        assert_eq!(stats.enabled_configs, 2);
        assert_eq!(stats.recent_successes, 2);
        assert_eq!(stats.recent_failures, 1);
    }

    #[test]
    fn test_quick_stats() {
        let mut s = state();
        assert_eq!(s.quick_stats().avg_response_time_ms, None);
        assert_eq!(s.quick_stats().success_rate, None);

        let mut slow = result("b", "p", 2, false);
        slow.response_time = Some(0.3);
        let mut untimed = result("c", "p", 3, true);
        untimed.response_time = None;
        s.apply_history(vec![result("a", "p", 1, true), slow, untimed]);

        let q = s.quick_stats();
        assert_eq!(q.total_results, 3);
        assert!((q.avg_response_time_ms.unwrap() - 200.0).abs() < 1e-9);
        assert!((q.success_rate.unwrap() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_rate_uses_global_window() {
        let mut s = state();
        s.apply_history(vec![
            result("a", "p", 2, true),
            result("b", "d", 2, false),
            result("old", "p", 120, false),
        ]);
        let points = s.success_rate(now());
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].success_rate, 50.0);
    }

    #[test]
    fn test_table_rows() {
        let mut s = state();
        let mut ping = result("a", "p", 1, true);
        ping.data = Some(json!({"rtt": 12.5}));
        let mut orphan = result("b", "gone", 2, false);
        orphan.error = Some("timeout".to_string());
        orphan.response_time = Some(1.234);
        s.apply_history(vec![ping, orphan]);

        let rows = s.table(20);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Ping");
        assert_eq!(rows[0].response_time, "100ms");
        assert_eq!(rows[0].details, "RTT: 12.5ms");
        assert_eq!(rows[0].timestamp, "03/10/2024, 11:59:00 AM");
        assert_eq!(rows[1].name, "Unknown");
        assert_eq!(rows[1].kind, TestKind::Unknown);
        assert_eq!(rows[1].response_time, "1.23s");
        assert_eq!(rows[1].error.as_deref(), Some("timeout"));

        assert_eq!(s.table(1).len(), 1);
    }

    #[test]
    fn test_format_response_time() {
        assert_eq!(format_response_time(None), "-");
        assert_eq!(format_response_time(Some(0.0)), "-");
        assert_eq!(format_response_time(Some(0.0456)), "46ms");
        assert_eq!(format_response_time(Some(2.5)), "2.50s");
    }

    #[test]
    fn test_describe_payloads() {
        let mut r = result("a", "x", 0, true);

        assert_eq!(describe(TestKind::Ping, &r), "-");

        r.data = Some(json!({"status_code": 200, "content_length": 2048}));
        assert_eq!(describe(TestKind::Http, &r), "Status: 200 (2.0KB)");

        r.data = Some(json!({"output": "traceroute to x\n 1 a\n 2 b\n 3 c"}));
        assert_eq!(describe(TestKind::Traceroute, &r), "Traceroute completed, 3 hops");

        r.data = Some(json!({
            "record_type": "A",
            "servers_tested": 3,
            "successful_queries": 2,
            "success_rate": 66.666,
            "results": [
                {"server": "192.168.1.1", "success": true, "response_time": 4.31},
                {"server": "8.8.8.8", "success": true, "response_time": 20.0},
                {"server": "1.1.1.1", "success": false}
            ]
        }));
        assert_eq!(
            describe(TestKind::Dns, &r),
            "Type: A, 2/3 servers (66.7%), 192.168.1.1: 4.3ms, +1 public"
        );

        r.data = Some(json!({"download_mbps": 95.24, "upload_mbps": 20.0}));
        assert_eq!(
            describe(TestKind::SpeedtestFast, &r),
            "Down 95.2 Mbps, Up 20.0 Mbps"
        );
    }

    #[test]
    fn test_config_filter_param() {
        assert_eq!(ConfigFilter::from_param(None), ConfigFilter::All);
        assert_eq!(ConfigFilter::from_param(Some("all")), ConfigFilter::All);
        assert_eq!(
            ConfigFilter::from_param(Some("c1")).config_id(),
            Some("c1")
        );
    }
}
