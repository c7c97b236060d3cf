//! Test configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The kind of probe a config runs. Determines the payload shape and how
/// results are charted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Ping,
    Http,
    Dns,
    Traceroute,
    #[serde(alias = "speedtest-ookla")]
    SpeedtestOokla,
    #[serde(alias = "speedtest-fast")]
    SpeedtestFast,
    Iperf3,
    /// Results whose config is missing, or configs with a tag this build
    /// does not recognise.
    #[serde(other)]
    Unknown,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Ping => "ping",
            TestKind::Http => "http",
            TestKind::Dns => "dns",
            TestKind::Traceroute => "traceroute",
            TestKind::SpeedtestOokla => "speedtest_ookla",
            TestKind::SpeedtestFast => "speedtest_fast",
            TestKind::Iperf3 => "iperf3",
            TestKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured network test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub test_type: TestKind,
    pub target: String,
    /// Sampling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Probe timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_servers: Option<Vec<String>>,
}

fn default_interval() -> u32 {
    30
}

fn default_timeout() -> u32 {
    5
}

fn default_enabled() -> bool {
    true
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            test_type: TestKind::Ping,
            target: String::new(),
            interval: default_interval(),
            timeout: default_timeout(),
            enabled: default_enabled(),
            dns_servers: None,
        }
    }
}

/// Read-only lookup of configs by identifier, in the order the backend
/// returned them.
#[derive(Debug, Clone, Default)]
pub struct ConfigSet {
    configs: Vec<TestConfig>,
    index: HashMap<String, usize>,
}

impl ConfigSet {
    pub fn new(configs: Vec<TestConfig>) -> Self {
        let index = configs
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        Self { configs, index }
    }

    pub fn get(&self, id: &str) -> Option<&TestConfig> {
        self.index.get(id).map(|&i| &self.configs[i])
    }

    /// Kind of the owning config, or `Unknown` when it cannot be resolved.
    pub fn kind_of(&self, config_id: &str) -> TestKind {
        self.get(config_id)
            .map(|c| c.test_type)
            .unwrap_or(TestKind::Unknown)
    }

    /// Display name of the owning config, or `"Unknown"`.
    pub fn name_of(&self, config_id: &str) -> &str {
        self.get(config_id).map(|c| c.name.as_str()).unwrap_or("Unknown")
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestConfig> {
        self.configs.iter()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        let kinds: Vec<TestKind> = serde_json::from_str(
            r#"["ping","http","dns","traceroute","speedtest_ookla","speedtest-fast","iperf3"]"#,
        )
        .unwrap();
        assert_eq!(
            kinds,
            vec![
                TestKind::Ping,
                TestKind::Http,
                TestKind::Dns,
                TestKind::Traceroute,
                TestKind::SpeedtestOokla,
                TestKind::SpeedtestFast,
                TestKind::Iperf3,
            ]
        );
        assert_eq!(
            serde_json::to_string(&TestKind::SpeedtestOokla).unwrap(),
            "\"speedtest_ookla\""
        );
    }

    #[test]
    fn test_unrecognised_kind_is_unknown() {
        let kind: TestKind = serde_json::from_str("\"mtr\"").unwrap();
        assert_eq!(kind, TestKind::Unknown);
    }

    #[test]
    fn test_config_defaults() {
        let cfg: TestConfig = serde_json::from_str(
            r#"{"id":"a","name":"Google","test_type":"ping","target":"8.8.8.8"}"#,
        )
        .unwrap();
        assert_eq!(cfg.interval, 30);
        assert_eq!(cfg.timeout, 5);
        assert!(cfg.enabled);
        assert!(cfg.dns_servers.is_none());
    }

    #[test]
    fn test_config_set_lookup() {
        let set = ConfigSet::new(vec![TestConfig {
            id: "dns-1".to_string(),
            name: "Resolvers".to_string(),
            test_type: TestKind::Dns,
            ..Default::default()
        }]);

        assert_eq!(set.kind_of("dns-1"), TestKind::Dns);
        assert_eq!(set.name_of("dns-1"), "Resolvers");
        assert_eq!(set.kind_of("missing"), TestKind::Unknown);
        assert_eq!(set.name_of("missing"), "Unknown");
        assert_eq!(set.len(), 1);
    }
}
