//! Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EntitlementError, Result};

/// Polling budget for one reconciliation session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Maximum authoritative reads per session
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after every attempt that did not confirm the paid plan
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Settle at `Inconclusive` instead of `Free` when every attempt failed
    /// at transport level
    #[serde(default)]
    pub surface_inconclusive: bool,
}

const fn default_max_attempts() -> u32 {
    5
}
const fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            surface_inconclusive: false,
        }
    }
}

impl ReconcileConfig {
    /// Read overrides from `RECONCILE_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_attempts = std::env::var("RECONCILE_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_attempts);
        let retry_delay_ms = std::env::var("RECONCILE_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.retry_delay_ms);
        let surface_inconclusive = std::env::var("RECONCILE_SURFACE_INCONCLUSIVE")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.surface_inconclusive);

        Self {
            max_attempts,
            retry_delay_ms,
            surface_inconclusive,
        }
    }

    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Worst case before a freshly paid user would see `Free`
    pub const fn worst_case(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(self.max_attempts as u64))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(EntitlementError::Config(
                "max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Checkout launcher settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Where to send anonymous users who click "upgrade"
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

fn default_login_path() -> String {
    "/login".into()
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_defaults() {
        let config = ReconcileConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.worst_case(), Duration::from_secs(5));
        assert!(!config.surface_inconclusive);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ReconcileConfig = serde_json::from_str(r#"{"max_attempts": 3}"#).unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay_ms, 1000);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = ReconcileConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
