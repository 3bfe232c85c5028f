//! # entitlement-core
//!
//! Client-side reconciliation of the paid-plan flag after an external
//! checkout.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Pricing surface                          │
//! │  ┌──────────────────┐             ┌────────────────────────────┐ │
//! │  │ CheckoutLauncher │──navigate──▶│ hosted payment page        │ │
//! │  └──────────────────┘             └─────────────┬──────────────┘ │
//! │                                                 │ ?success=true  │
//! │  ┌───────────────────────┐   poll   ┌───────────▼──────────────┐ │
//! │  │ EntitlementReconciler │─────────▶│ EntitlementSource (/me)  │ │
//! │  │  latch + snapshot     │          └──────────────────────────┘ │
//! │  └───────────────────────┘                                       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All I/O sits behind traits ([`SessionContext`], [`EntitlementSource`],
//! [`CheckoutProvider`], [`Navigator`], [`Delay`]) so the protocol runs the
//! same in a browser tab, a terminal, or a unit test. Everything here is
//! single-threaded: futures are `?Send` and shared state is `Rc<RefCell<_>>`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entitlement_core::{EntitlementReconciler, ReconcileConfig, CheckoutReturn, TokioDelay};
//!
//! let reconciler = EntitlementReconciler::new(session, api, TokioDelay, ReconcileConfig::default())?;
//! reconciler.on_mount().await;
//! reconciler.on_return(CheckoutReturn::from_query("?success=true")).await;
//! ```

pub mod checkout;
pub mod config;
pub mod credential;
pub mod error;
pub mod reconciler;
pub mod signal;
pub mod snapshot;

pub use checkout::{CheckoutLaunch, CheckoutLauncher, CheckoutProvider, CheckoutRedirect, Navigator};
pub use config::{LauncherConfig, ReconcileConfig};
pub use credential::{Credential, MemorySession, Principal, SessionContext};
pub use error::{EntitlementError, Result};
pub use reconciler::{
    Delay, EntitlementReconciler, EntitlementRecord, EntitlementSource, NoopNotifier, Notifier,
    SettleReason, Settlement, Trigger,
};
#[cfg(feature = "tokio")]
pub use reconciler::TokioDelay;
pub use signal::{CheckoutReturn, NavigationId, RedirectLatch};
pub use snapshot::{EntitlementSnapshot, EntitlementState, SessionTicket, SharedSnapshot};
