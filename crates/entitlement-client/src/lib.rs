//! # entitlement-client
//!
//! HTTP bindings for the billing backend.
//!
//! [`BillingApi`] implements both consumed interfaces of the reconciliation
//! protocol, [`EntitlementSource`](entitlement_core::EntitlementSource) and
//! [`CheckoutProvider`](entitlement_core::CheckoutProvider), on top of
//! `reqwest`. It builds for native targets and for `wasm32` (where `reqwest`
//! rides on `fetch`).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entitlement_client::{ApiConfig, BillingApi};
//!
//! let api = BillingApi::from_config(&ApiConfig::new("https://api.example.com"))?;
//! let me = api.me(&credential).await?;
//! ```

pub mod api;
pub mod config;

pub use api::{BillingApi, MeResponse};
pub use config::ApiConfig;

// Re-export core types for convenience
pub use entitlement_core::{
    CheckoutRedirect, Credential, EntitlementError, EntitlementRecord, Result,
};
