//! Configuration schema.
//!
//! Every section and field is optional; omitted values take the defaults
//! below. Unknown keys are rejected so typos surface at load time.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::history::{DEFAULT_HISTORY_CAPACITY, DEFAULT_HISTORY_LIMIT};

/// Default deployment record location.
pub const DEFAULT_DEPLOYMENT_FILE: &str = "deployed_admin.json";

/// Default per-call upstream timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default `watch` sampling interval.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(3);

/// Upper bound for the mock token collection.
pub const MAX_MOCK_TOKENS: u64 = 1000;

// ============================================================================
// Root
// ============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Data source selection.
    pub source: SourceConfig,
    /// Mock data generation.
    pub mock: MockConfig,
    /// History buffer.
    pub history: HistoryConfig,
    /// Particle field.
    pub particles: ParticlesConfig,
    /// `watch` command.
    pub watch: WatchConfig,
}

// ============================================================================
// Sections
// ============================================================================

/// Which data source to use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Contract when reachable configuration exists, otherwise mock.
    #[default]
    Auto,
    /// Always the mock source.
    Mock,
    /// Always the contract source.
    Contract,
}

/// `source` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Source selection.
    pub kind: SourceKind,
    /// JSON-RPC endpoint. Blank is treated as unset.
    pub rpc_url: Option<String>,
    /// Path of the deployment record.
    pub deployment_file: PathBuf,
    /// Per-call timeout (humantime, e.g. `10s`).
    #[serde(
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub timeout: Duration,
    /// Retry failed upstream reads against the mock source.
    pub fallback_to_mock: bool,
}

impl SourceConfig {
    /// The RPC URL, if set to something non-blank.
    #[must_use]
    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_url.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Auto,
            rpc_url: None,
            deployment_file: PathBuf::from(DEFAULT_DEPLOYMENT_FILE),
            timeout: DEFAULT_TIMEOUT,
            fallback_to_mock: true,
        }
    }
}

/// `mock` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MockConfig {
    /// RNG seed for the token collection.
    pub seed: u64,
    /// Number of mock tokens.
    pub token_count: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            token_count: 10,
        }
    }
}

/// `history` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// Retained readings.
    pub capacity: usize,
    /// Readings returned when no limit is given.
    pub default_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            default_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// `particles` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParticlesConfig {
    /// Particle count.
    pub count: usize,
    /// Canvas width.
    pub width: f64,
    /// Canvas height.
    pub height: f64,
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        Self {
            count: 50,
            width: 800.0,
            height: 600.0,
        }
    }
}

/// `watch` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Sampling interval (humantime).
    #[serde(
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_WATCH_INTERVAL,
        }
    }
}

// ============================================================================
// Duration (de)serialization
// ============================================================================

fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom)
}

fn serialize_duration<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_duration(*value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mapping_yields_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.history.capacity, 100);
        assert_eq!(config.source.timeout, Duration::from_secs(10));
        assert!(config.source.fallback_to_mock);
    }

    #[test]
    fn parses_humantime_durations() {
        let config: AppConfig =
            serde_yaml::from_str("source:\n  timeout: 1500ms\nwatch:\n  interval: 1m\n").unwrap();
        assert_eq!(config.source.timeout, Duration::from_millis(1500));
        assert_eq!(config.watch.interval, Duration::from_secs(60));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(serde_yaml::from_str::<AppConfig>("histroy:\n  capacity: 5\n").is_err());
        assert!(serde_yaml::from_str::<AppConfig>("history:\n  capcity: 5\n").is_err());
    }

    #[test]
    fn source_kind_names() {
        let config: AppConfig = serde_yaml::from_str("source:\n  kind: contract\n").unwrap();
        assert_eq!(config.source.kind, SourceKind::Contract);
        assert!(serde_yaml::from_str::<AppConfig>("source:\n  kind: chain\n").is_err());
    }

    #[test]
    fn blank_rpc_url_is_unset() {
        let source = SourceConfig {
            rpc_url: Some("  ".into()),
            ..SourceConfig::default()
        };
        assert_eq!(source.rpc_url(), None);

        let source = SourceConfig {
            rpc_url: Some(" http://localhost:8545 ".into()),
            ..SourceConfig::default()
        };
        assert_eq!(source.rpc_url(), Some("http://localhost:8545"));
    }

    #[test]
    fn duration_serializes_as_humantime() {
        let yaml = serde_yaml::to_string(&WatchConfig::default()).unwrap();
        assert!(yaml.contains("interval: 3s"), "{yaml}");
    }
}
