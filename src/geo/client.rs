//! HTTP client for the external geolocation lookup service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// A lookup-service error. Always non-fatal to the batch: the record
/// proceeds with absent geolocation and the failure is cached.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Connection timeout")]
    Timeout,

    #[error("Rate limited by lookup service")]
    RateLimited,

    #[error("Address not resolvable: {0}")]
    NotFound(String),

    #[error("HTTP {0}")]
    Http(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Request failed: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, LookupError>;

/// Resolved location for one IP. Each field may be absent in a partial
/// answer from the service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

/// Capability to resolve one IP address to a location. Injected into the
/// resolver so tests can substitute a mock.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn resolve(&self, ip: &str) -> Result<GeoLocation>;
}

/// Lookup client configuration
#[derive(Debug, Clone)]
pub struct GeoClientConfig {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for GeoClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://ip-api.com/json".to_string(),
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(5),
            user_agent: "logsift/0.1.0".to_string(),
        }
    }
}

/// Wire format of the lookup service response
#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default, rename = "regionName")]
    region_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

/// reqwest-backed lookup against an ip-api.com compatible endpoint
pub struct HttpGeoClient {
    client: Client,
    endpoint: String,
}

impl HttpGeoClient {
    pub fn new(config: GeoClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeoLookup for HttpGeoClient {
    async fn resolve(&self, ip: &str) -> Result<GeoLocation> {
        let url = format!(
            "{}/{}?fields=status,message,country,regionName,city,query",
            self.endpoint, ip
        );
        debug!(ip, "Requesting geolocation");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LookupError::RateLimited);
        }
        if !status.is_success() {
            return Err(LookupError::Http(status.as_u16()));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Malformed(e.to_string()))?;

        match body.status.as_str() {
            "success" => Ok(GeoLocation {
                country: body.country,
                region: body.region_name,
                city: body.city,
            }),
            "fail" => Err(LookupError::NotFound(
                body.message.unwrap_or_else(|| "no detail".to_string()),
            )),
            other => Err(LookupError::Malformed(format!(
                "unexpected status field: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults() {
        let config = GeoClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "logsift/0.1.0");
    }

    #[test]
    fn test_endpoint_trailing_slash_stripped() {
        let client = HttpGeoClient::new(GeoClientConfig {
            endpoint: "http://example.test/json/".to_string(),
            ..GeoClientConfig::default()
        })
        .unwrap();
        assert_eq!(client.endpoint, "http://example.test/json");
    }

    #[test]
    fn test_api_response_success_shape() {
        let body = r#"{"status":"success","country":"United States","regionName":"California","city":"San Jose","query":"203.0.113.5"}"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "success");
        assert_eq!(parsed.country.as_deref(), Some("United States"));
        assert_eq!(parsed.region_name.as_deref(), Some("California"));
    }

    #[test]
    fn test_api_response_fail_shape() {
        let body = r#"{"status":"fail","message":"private range","query":"10.0.0.1"}"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "fail");
        assert_eq!(parsed.message.as_deref(), Some("private range"));
        assert_eq!(parsed.country, None);
    }
}
