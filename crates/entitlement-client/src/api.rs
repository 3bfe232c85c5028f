//! Billing API Client
//!
//! `reqwest` implementation of the two calls the reconciliation protocol
//! consumes:
//!
//! - `GET /me` → `{ "id": 1, "email": "...", "is_pro": true }`
//! - `POST /stripe/checkout` → `{ "url": "https://checkout.stripe.com/..." }`
//!
//! Both send the session's bearer token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use entitlement_core::{
    CheckoutProvider, CheckoutRedirect, Credential, EntitlementError, EntitlementRecord,
    EntitlementSource, Principal, Result,
};

use crate::config::ApiConfig;

/// Body of `GET /me`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub id: Option<serde_json::Value>,

    #[serde(default)]
    pub email: Option<String>,

    /// `null` and missing both mean "not pro"
    #[serde(default)]
    pub is_pro: Option<bool>,
}

impl MeResponse {
    pub fn is_pro(&self) -> bool {
        self.is_pro.unwrap_or(false)
    }
}

/// Billing API client
pub struct BillingApi {
    client: reqwest::Client,
    me_url: Url,
    checkout_url: Url,
}

impl BillingApi {
    /// Create from configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(std::time::Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| EntitlementError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            me_url: config.endpoint("me")?,
            checkout_url: config.endpoint("stripe/checkout")?,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(&ApiConfig::from_env()?)
    }

    /// Fetch the current user's record
    pub async fn me(&self, credential: &Credential) -> Result<MeResponse> {
        let response = self
            .client
            .get(self.me_url.clone())
            .bearer_auth(credential.as_str())
            .send()
            .await
            .map_err(|e| EntitlementError::EntitlementFetchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EntitlementError::EntitlementFetchFailed(format!(
                "GET /me returned {status}"
            )));
        }

        response
            .json::<MeResponse>()
            .await
            .map_err(|e| EntitlementError::EntitlementFetchFailed(format!("invalid /me body: {e}")))
    }

    /// Ask the backend for a hosted checkout session
    pub async fn create_checkout(&self, credential: &Credential) -> Result<CheckoutRedirect> {
        let response = self
            .client
            .post(self.checkout_url.clone())
            .bearer_auth(credential.as_str())
            .send()
            .await
            .map_err(|e| EntitlementError::CheckoutInitiationFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let detail = body["detail"]
                .as_str()
                .or_else(|| body["error"].as_str())
                .unwrap_or("no detail");
            return Err(EntitlementError::CheckoutInitiationFailed(format!(
                "POST /stripe/checkout returned {status}: {detail}"
            )));
        }

        response
            .json::<CheckoutRedirect>()
            .await
            .map_err(|e| EntitlementError::CheckoutInitiationFailed(format!("invalid checkout body: {e}")))
    }
}

#[async_trait(?Send)]
impl EntitlementSource for BillingApi {
    async fn fetch(&self, credential: &Credential) -> Result<EntitlementRecord> {
        let me = self.me(credential).await?;
        Ok(EntitlementRecord { is_pro: me.is_pro() })
    }
}

#[async_trait(?Send)]
impl CheckoutProvider for BillingApi {
    async fn create_session(
        &self,
        credential: &Credential,
        principal: &Principal,
    ) -> Result<CheckoutRedirect> {
        tracing::debug!(principal = %principal, "Creating checkout session");
        self.create_checkout(credential).await
    }
}
