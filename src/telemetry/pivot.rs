//! Series pivots.
//!
//! Turns a config's chronologically sorted results into chart-ready series.
//! The strategy depends on the config's kind:
//!
//! - scalar kinds chart `responseTime` in milliseconds;
//! - DNS results are pivoted long-to-wide, one field per resolver;
//! - speedtest and iperf3 results copy their metrics through by name.
//!
//! A field missing from a point is a gap and must render as a break in the
//! line. Only the DNS pivot produces gaps; everywhere else a missing value is
//! a real zero.

use super::TimeLabeler;
use crate::model::{BandwidthPayload, DnsPayload, TestKind, TestResult};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

pub const RESPONSE_TIME_FIELD: &str = "responseTime";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandwidthProfile {
    /// Ookla speedtest: download, upload and ping.
    Ookla,
    /// fast.com: download only.
    Fast,
    /// iperf3: download, upload and retransmits.
    Iperf3,
}

struct BandwidthMetric {
    key: &'static str,
    label: &'static str,
    unit: &'static str,
    read: fn(&BandwidthPayload) -> f64,
}

fn read_download_mbps(p: &BandwidthPayload) -> f64 {
    p.download_mbps
}

fn read_upload_mbps(p: &BandwidthPayload) -> f64 {
    p.upload_mbps
}

fn read_ping_ms(p: &BandwidthPayload) -> f64 {
    p.ping_ms
}

fn read_retransmits(p: &BandwidthPayload) -> f64 {
    p.retransmits
}

const DOWNLOAD: BandwidthMetric = BandwidthMetric {
    key: "download",
    label: "Download",
    unit: "Mbps",
    read: read_download_mbps,
};

const UPLOAD: BandwidthMetric = BandwidthMetric {
    key: "upload",
    label: "Upload",
    unit: "Mbps",
    read: read_upload_mbps,
};

const PING: BandwidthMetric = BandwidthMetric {
    key: "ping",
    label: "Ping",
    unit: "ms",
    read: read_ping_ms,
};

const RETRANSMITS: BandwidthMetric = BandwidthMetric {
    key: "retransmits",
    label: "Retransmits",
    unit: "",
    read: read_retransmits,
};

const OOKLA_METRICS: &[BandwidthMetric] = &[DOWNLOAD, UPLOAD, PING];
const FAST_METRICS: &[BandwidthMetric] = &[DOWNLOAD];
const IPERF3_METRICS: &[BandwidthMetric] = &[DOWNLOAD, UPLOAD, RETRANSMITS];

impl BandwidthProfile {
    fn metrics(&self) -> &'static [BandwidthMetric] {
        match self {
            BandwidthProfile::Ookla => OOKLA_METRICS,
            BandwidthProfile::Fast => FAST_METRICS,
            BandwidthProfile::Iperf3 => IPERF3_METRICS,
        }
    }
}

/// How a kind's results become series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotStrategy {
    Scalar,
    Dns,
    Bandwidth(BandwidthProfile),
}

impl From<TestKind> for PivotStrategy {
    fn from(kind: TestKind) -> Self {
        match kind {
            TestKind::Ping | TestKind::Http | TestKind::Traceroute | TestKind::Unknown => {
                PivotStrategy::Scalar
            }
            TestKind::Dns => PivotStrategy::Dns,
            TestKind::SpeedtestOokla => PivotStrategy::Bandwidth(BandwidthProfile::Ookla),
            TestKind::SpeedtestFast => PivotStrategy::Bandwidth(BandwidthProfile::Fast),
            TestKind::Iperf3 => PivotStrategy::Bandwidth(BandwidthProfile::Iperf3),
        }
    }
}

impl PivotStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PivotStrategy::Scalar => "scalar",
            PivotStrategy::Dns => "dns",
            PivotStrategy::Bandwidth(BandwidthProfile::Ookla) => "bandwidth_ookla",
            PivotStrategy::Bandwidth(BandwidthProfile::Fast) => "bandwidth_fast",
            PivotStrategy::Bandwidth(BandwidthProfile::Iperf3) => "bandwidth_iperf3",
        }
    }
}

impl Serialize for PivotStrategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Describes one line of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesField {
    pub key: String,
    pub label: String,
    pub unit: &'static str,
}

/// One time point with its named values. A field absent from `values` is a
/// gap, and is omitted from the serialized point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub time: String,
    #[serde(skip)]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl SeriesPoint {
    fn new(result: &TestResult, labeler: &TimeLabeler) -> Self {
        Self {
            time: labeler.label(result.timestamp),
            timestamp: result.timestamp,
            values: BTreeMap::new(),
        }
    }

    /// `None` means the field is a gap at this point.
    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }

    pub fn is_gap(&self, field: &str) -> bool {
        !self.values.contains_key(field)
    }
}

/// Aligned series for one chart panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub strategy: PivotStrategy,
    pub fields: Vec<SeriesField>,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Pivot chronologically sorted, already window-filtered results for a
/// config of the given kind.
pub fn pivot(kind: TestKind, results: &[&TestResult], labeler: &TimeLabeler) -> Series {
    match PivotStrategy::from(kind) {
        PivotStrategy::Scalar => pivot_scalar(results, labeler),
        PivotStrategy::Dns => pivot_dns(results, labeler),
        PivotStrategy::Bandwidth(profile) => pivot_bandwidth(profile, results, labeler),
    }
}

fn pivot_scalar(results: &[&TestResult], labeler: &TimeLabeler) -> Series {
    let points = results
        .iter()
        .filter(|r| r.success)
        .map(|r| {
            let mut point = SeriesPoint::new(r, labeler);
            point.values.insert(
                RESPONSE_TIME_FIELD.to_string(),
                r.response_time_ms().unwrap_or(0.0),
            );
            point
        })
        .collect();

    Series {
        strategy: PivotStrategy::Scalar,
        fields: vec![SeriesField {
            key: RESPONSE_TIME_FIELD.to_string(),
            label: "Response Time".to_string(),
            unit: "ms",
        }],
        points,
    }
}

fn pivot_dns(results: &[&TestResult], labeler: &TimeLabeler) -> Series {
    let qualifying: Vec<(&TestResult, DnsPayload)> = results
        .iter()
        .filter(|r| r.success)
        .filter_map(|r| {
            DnsPayload::from_data(r.data.as_ref())
                .filter(|p| p.results.is_some())
                .map(|p| (*r, p))
        })
        .collect();

    let servers: BTreeSet<&str> = qualifying
        .iter()
        .flat_map(|(_, p)| p.successful_samples())
        .map(|s| s.server.as_str())
        .collect();

    let fields = servers
        .iter()
        .map(|server| SeriesField {
            key: server.to_string(),
            label: server_label(server),
            unit: "ms",
        })
        .collect();

    let points = qualifying
        .iter()
        .map(|(result, payload)| {
            let mut point = SeriesPoint::new(result, labeler);
            for sample in payload.successful_samples() {
                if let Some(ms) = sample.response_time {
                    point.values.insert(sample.server.clone(), ms);
                }
            }
            point
        })
        .collect();

    Series {
        strategy: PivotStrategy::Dns,
        fields,
        points,
    }
}

fn pivot_bandwidth(
    profile: BandwidthProfile,
    results: &[&TestResult],
    labeler: &TimeLabeler,
) -> Series {
    let metrics = profile.metrics();

    let points = results
        .iter()
        .filter(|r| r.success)
        .map(|r| {
            let payload = BandwidthPayload::from_data(r.data.as_ref()).unwrap_or_default();
            let mut point = SeriesPoint::new(r, labeler);
            for metric in metrics {
                point
                    .values
                    .insert(metric.key.to_string(), (metric.read)(&payload));
            }
            point
        })
        .collect();

    Series {
        strategy: PivotStrategy::Bandwidth(profile),
        fields: metrics
            .iter()
            .map(|m| SeriesField {
                key: m.key.to_string(),
                label: m.label.to_string(),
                unit: m.unit,
            })
            .collect(),
        points,
    }
}

/// Friendly legend name for a resolver address.
pub fn server_label(server: &str) -> String {
    match server {
        "8.8.8.8" => "Google".to_string(),
        "8.8.4.4" => "Google Alt".to_string(),
        "1.1.1.1" => "Cloudflare".to_string(),
        "1.0.0.1" => "Cloudflare Alt".to_string(),
        s if s.starts_with("192.168.") || s.starts_with("10.") || s.starts_with("172.") => {
            "Local".to_string()
        }
        s => s.to_string(),
    }
}

/// Whether a resolver is one of the well-known public ones.
pub fn is_public_resolver(server: &str) -> bool {
    matches!(server, "8.8.8.8" | "8.8.4.4" | "1.1.1.1" | "1.0.0.1")
}
