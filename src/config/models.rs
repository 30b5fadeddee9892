use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::aggregate::{Dimension, TimeBucket};
use crate::geo::GeoClientConfig;
use crate::record::Delimiter;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub clean: CleanConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub aggregate: AggregateConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Object store provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    Local,
    S3,
    Memory,
}

impl Default for StoreProvider {
    fn default() -> Self {
        StoreProvider::Local
    }
}

/// One object store endpoint (used for both input and output)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub provider: StoreProvider,
    /// Root directory for the local provider
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// S3 access key (loaded from environment, not from config file)
    #[serde(skip)]
    pub access_key: Option<String>,
    /// S3 secret key (loaded from environment, not from config file)
    #[serde(skip)]
    pub secret_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: StoreProvider::default(),
            root: default_store_root(),
            bucket: default_bucket(),
            endpoint: None,
            region: None,
            access_key: None,
            secret_key: None,
        }
    }
}

fn default_store_root() -> PathBuf {
    PathBuf::from("data/objects")
}

fn default_bucket() -> String {
    "logsift".to_string()
}

/// Where raw log lines come from and how they are delimited
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default = "default_input_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub delimiter: Delimiter,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            prefix: default_input_prefix(),
            delimiter: Delimiter::default(),
        }
    }
}

fn default_input_prefix() -> String {
    "logs".to_string()
}

/// Cleaner settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanConfig {
    /// Health-check/probe user agents whose traffic is dropped entirely
    #[serde(default = "default_drop_user_agents")]
    pub drop_user_agents: Vec<String>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            drop_user_agents: default_drop_user_agents(),
        }
    }
}

fn default_drop_user_agents() -> Vec<String> {
    ["datadog", "healthchecker", "kube-probe", "aws-elb"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Geolocation cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Whether a failure cached by an earlier run is retried this run
    #[serde(default = "default_retry_cached_failures")]
    pub retry_cached_failures: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            retry_cached_failures: default_retry_cached_failures(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/geo_cache")
}

fn default_retry_cached_failures() -> bool {
    true
}

/// External lookup service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LookupConfig {
    #[serde(default = "default_lookup_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum in-flight lookups (respects the service's rate limits)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_lookup_user_agent")]
    pub user_agent: String,
}

impl LookupConfig {
    pub fn client_config(&self) -> GeoClientConfig {
        GeoClientConfig {
            endpoint: self.endpoint.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: default_lookup_endpoint(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            user_agent: default_lookup_user_agent(),
        }
    }
}

fn default_lookup_endpoint() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_concurrency() -> usize {
    4
}

fn default_lookup_user_agent() -> String {
    "logsift/0.1.0".to_string()
}

/// Automated-traffic rule set (versioned so reports can say which rules
/// classified them)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_version")]
    pub version: String,
    #[serde(default = "default_bot_patterns")]
    pub patterns: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            version: default_bot_version(),
            patterns: default_bot_patterns(),
        }
    }
}

fn default_bot_version() -> String {
    "builtin-1".to_string()
}

fn default_bot_patterns() -> Vec<String> {
    ["bot", "crawler", "spider", "googlebot", "python-urllib"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Grouping configuration for the aggregation output
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregateConfig {
    #[serde(default)]
    pub time_bucket: TimeBucket,
    #[serde(default = "default_dimensions")]
    pub dimensions: Vec<Dimension>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            time_bucket: TimeBucket::default(),
            dimensions: default_dimensions(),
        }
    }
}

fn default_dimensions() -> Vec<Dimension> {
    vec![Dimension::Country, Dimension::StatusClass]
}

/// Where the four datasets are written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default = "default_output_prefix")]
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            prefix: default_output_prefix(),
        }
    }
}

fn default_output_prefix() -> String {
    "datasets".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.input.prefix, "logs");
        assert_eq!(config.input.delimiter, Delimiter::Comma);
        assert_eq!(config.cache.path, PathBuf::from("data/geo_cache"));
        assert!(config.cache.retry_cached_failures);
        assert_eq!(config.lookup.concurrency, 4);
        assert_eq!(config.aggregate.time_bucket, TimeBucket::Hour);
        assert_eq!(
            config.aggregate.dimensions,
            vec![Dimension::Country, Dimension::StatusClass]
        );
        assert_eq!(config.output.prefix, "datasets");
    }

    #[test]
    fn test_lookup_client_config_conversion() {
        let lookup = LookupConfig::default();
        let client = lookup.client_config();
        assert_eq!(client.endpoint, "http://ip-api.com/json");
        assert_eq!(client.connect_timeout, Duration::from_secs(3));
        assert_eq!(client.request_timeout, Duration::from_secs(5));
    }
}
