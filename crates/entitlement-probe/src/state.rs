//! Probe State
//!
//! Terminal stand-ins for the browser collaborators: the notifier logs the
//! one-time notices and the navigator records where a browser would have
//! gone.

use std::cell::RefCell;
use std::rc::Rc;

use entitlement_client::BillingApi;
use entitlement_core::{
    EntitlementState, MemorySession, Navigator, Notifier, ReconcileConfig, Result,
};

/// Shared probe state
#[derive(Clone)]
pub struct ProbeState {
    /// Session holding the token from `--token` / `ACCESS_TOKEN`
    pub session: Rc<MemorySession>,

    /// Billing API client
    pub api: Rc<BillingApi>,

    /// Polling budget
    pub reconcile: ReconcileConfig,
}

/// Logs the notices a browser would show as toasts
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn checkout_completed(&self) {
        tracing::info!("🎉 Subscription activated! Welcome to Pro");
    }

    fn checkout_canceled(&self) {
        tracing::info!("Checkout canceled, no charge was made");
    }
}

/// Records the navigation target instead of opening a browser
#[derive(Debug, Default)]
pub struct LogNavigator {
    target: RefCell<Option<String>>,
}

impl LogNavigator {
    pub fn target(&self) -> Option<String> {
        self.target.borrow().clone()
    }
}

impl Navigator for LogNavigator {
    fn navigate(&self, url: &str) -> Result<()> {
        tracing::info!(%url, "Open this URL in a browser to continue");
        *self.target.borrow_mut() = Some(url.to_string());
        Ok(())
    }
}

/// Log line for each visible state change
pub fn log_transition(state: EntitlementState) {
    match state {
        EntitlementState::Idle | EntitlementState::Loading => tracing::info!("Checking plan…"),
        EntitlementState::Pro => tracing::info!("You're on Pro ✅"),
        EntitlementState::Free => tracing::info!("Free plan (upgrade available)"),
        EntitlementState::Inconclusive => {
            tracing::warn!("Could not reach the billing API, please refresh");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigator_records_target() {
        let navigator = LogNavigator::default();
        assert!(navigator.target().is_none());

        navigator.navigate("https://checkout.example.com/c/1").unwrap();
        assert_eq!(navigator.target().as_deref(), Some("https://checkout.example.com/c/1"));
    }
}
