//! Typed views over the kind-specific result payload.
//!
//! The backend sends payloads as free-form JSON. Each view is read leniently:
//! a missing field takes its default, a payload of the wrong shape yields
//! `None`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

fn view<T: DeserializeOwned>(data: Option<&Value>) -> Option<T> {
    match data? {
        v @ Value::Object(_) => serde_json::from_value(v.clone()).ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PingPayload {
    #[serde(default)]
    pub rtt: Option<f64>,
}

impl PingPayload {
    pub fn from_data(data: Option<&Value>) -> Option<Self> {
        view(data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HttpPayload {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub content_length: Option<u64>,
}

impl HttpPayload {
    pub fn from_data(data: Option<&Value>) -> Option<Self> {
        view(data)
    }
}

/// One resolver's answer within a DNS result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DnsServerSample {
    pub server: String,
    #[serde(default)]
    pub success: bool,
    /// Milliseconds.
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DnsPayload {
    #[serde(default)]
    pub record_type: Option<String>,
    /// `None` when the payload carries no per-server list at all.
    #[serde(default)]
    pub results: Option<Vec<DnsServerSample>>,
    #[serde(default)]
    pub success_rate: Option<f64>,
    #[serde(default)]
    pub servers_tested: Option<u32>,
    #[serde(default)]
    pub successful_queries: Option<u32>,
    #[serde(default)]
    pub avg_response_time: Option<f64>,
}

impl DnsPayload {
    pub fn from_data(data: Option<&Value>) -> Option<Self> {
        view(data)
    }

    pub fn successful_samples(&self) -> impl Iterator<Item = &DnsServerSample> {
        self.results.iter().flatten().filter(|s| s.success)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TraceroutePayload {
    #[serde(default)]
    pub output: Option<String>,
}

impl TraceroutePayload {
    pub fn from_data(data: Option<&Value>) -> Option<Self> {
        view(data)
    }

    /// Hop count, taken as the output's line count minus the header line.
    pub fn hops(&self) -> usize {
        self.output
            .as_deref()
            .map(|o| o.split('\n').count().saturating_sub(1))
            .unwrap_or(0)
    }
}

/// Speedtest and iperf3 metrics. The backend always sends the full set for
/// a kind, so a missing field is a genuine zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BandwidthPayload {
    #[serde(default)]
    pub download_mbps: f64,
    #[serde(default)]
    pub upload_mbps: f64,
    #[serde(default)]
    pub ping_ms: f64,
    #[serde(default)]
    pub retransmits: f64,
}

impl BandwidthPayload {
    pub fn from_data(data: Option<&Value>) -> Option<Self> {
        view(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dns_payload() {
        let data = json!({
            "record_type": "A",
            "results": [
                {"server": "1.1.1.1", "success": true, "response_time": 11.5},
                {"server": "9.9.9.9", "success": false, "error": "timeout"}
            ],
            "success_rate": 50.0,
            "servers_tested": 2,
            "successful_queries": 1
        });
        let payload = DnsPayload::from_data(Some(&data)).unwrap();
        assert_eq!(payload.record_type.as_deref(), Some("A"));
        assert_eq!(payload.successful_samples().count(), 1);
        assert_eq!(payload.servers_tested, Some(2));
    }

    #[test]
    fn test_dns_payload_without_results() {
        let payload = DnsPayload::from_data(Some(&json!({"record_type": "MX"}))).unwrap();
        assert!(payload.results.is_none());
        assert_eq!(payload.successful_samples().count(), 0);
    }

    #[test]
    fn test_malformed_payload_is_none() {
        assert!(DnsPayload::from_data(None).is_none());
        assert!(DnsPayload::from_data(Some(&json!("oops"))).is_none());
        assert!(DnsPayload::from_data(Some(&json!({"results": "nope"}))).is_none());
        assert!(BandwidthPayload::from_data(Some(&json!({"download_mbps": "fast"}))).is_none());
    }

    #[test]
    fn test_bandwidth_missing_fields_are_zero() {
        let payload = BandwidthPayload::from_data(Some(&json!({"upload_mbps": 20.5}))).unwrap();
        assert_eq!(payload.download_mbps, 0.0);
        assert_eq!(payload.upload_mbps, 20.5);
    }

    #[test]
    fn test_traceroute_hops() {
        let payload = TraceroutePayload::from_data(Some(&json!({
            "output": "traceroute to 8.8.8.8\n 1 gw\n 2 isp\n 3 dns.google"
        })))
        .unwrap();
        assert_eq!(payload.hops(), 3);
    }
}
