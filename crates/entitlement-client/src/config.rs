//! Billing API Configuration

use serde::{Deserialize, Serialize};
use url::Url;

use entitlement_core::{EntitlementError, Result};

/// Billing API connection settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend (e.g. `https://api.example.com`)
    pub api_url: String,

    /// Per-request timeout in seconds (ignored on wasm32)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    10
}

impl ApiConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("ENTITLEMENT_API_URL")
            .map_err(|_| EntitlementError::Config("ENTITLEMENT_API_URL not set".into()))?;
        let timeout_secs = std::env::var("ENTITLEMENT_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_timeout_secs);

        Ok(Self {
            api_url,
            timeout_secs,
        })
    }

    /// Parsed base URL, normalized to end in `/` so joins append
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.api_url.trim().to_string();
        if raw.is_empty() {
            return Err(EntitlementError::Config("API URL is empty".into()));
        }
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| EntitlementError::Config(format!("invalid API URL {raw}: {e}")))
    }

    /// Absolute URL for an endpoint path like `me` or `stripe/checkout`
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url()?
            .join(path.trim_start_matches('/'))
            .map_err(|e| EntitlementError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = ApiConfig::new("https://api.example.com/v1");
        assert_eq!(config.endpoint("/me").unwrap().as_str(), "https://api.example.com/v1/me");
        assert_eq!(
            config.endpoint("stripe/checkout").unwrap().as_str(),
            "https://api.example.com/v1/stripe/checkout"
        );
    }

    #[test]
    fn test_empty_url_is_config_error() {
        assert!(matches!(
            ApiConfig::new("  ").base_url(),
            Err(EntitlementError::Config(_))
        ));
    }

    #[test]
    fn test_timeout_defaults() {
        let config: ApiConfig = serde_json::from_str(r#"{"api_url": "http://localhost:8000"}"#).unwrap();
        assert_eq!(config.timeout_secs, 10);
    }
}
