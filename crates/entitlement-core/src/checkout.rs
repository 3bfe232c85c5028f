//! Checkout Launcher
//!
//! Turns "user clicked upgrade" into a top-level navigation to the hosted
//! payment page:
//!
//! ```text
//! ┌─────────────┐  create session  ┌─────────────────┐  redirect  ┌──────────────────────┐
//! │  Pricing    │─────────────────▶│  Hosted         │───────────▶│  /pricing?success=…  │
//! │  (upgrade)  │                  │  Checkout Page  │            │  (reconciler)        │
//! └─────────────┘                  └─────────────────┘            └──────────────────────┘
//! ```
//!
//! Nothing survives the navigation except persisted storage, so the launcher
//! mutates no client state.

use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LauncherConfig;
use crate::credential::{Credential, Principal, SessionContext};
use crate::error::{EntitlementError, Result};

/// Response of the "create checkout session" call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRedirect {
    #[serde(default)]
    pub url: Option<String>,
}

/// External collaborator that creates a hosted checkout session
#[async_trait(?Send)]
pub trait CheckoutProvider {
    async fn create_session(
        &self,
        credential: &Credential,
        principal: &Principal,
    ) -> Result<CheckoutRedirect>;
}

#[async_trait(?Send)]
impl<T: CheckoutProvider + ?Sized> CheckoutProvider for Rc<T> {
    async fn create_session(
        &self,
        credential: &Credential,
        principal: &Principal,
    ) -> Result<CheckoutRedirect> {
        (**self).create_session(credential, principal).await
    }
}

#[async_trait(?Send)]
impl<'a, T: CheckoutProvider + ?Sized> CheckoutProvider for &'a T {
    async fn create_session(
        &self,
        credential: &Credential,
        principal: &Principal,
    ) -> Result<CheckoutRedirect> {
        (**self).create_session(credential, principal).await
    }
}

/// Full top-level navigation (e.g. `window.location.href = url`)
pub trait Navigator {
    fn navigate(&self, url: &str) -> Result<()>;
}

impl<T: Navigator + ?Sized> Navigator for Rc<T> {
    fn navigate(&self, url: &str) -> Result<()> {
        (**self).navigate(url)
    }
}

impl<T: Navigator + ?Sized> Navigator for &T {
    fn navigate(&self, url: &str) -> Result<()> {
        (**self).navigate(url)
    }
}

/// Where the launcher sent the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutLaunch {
    pub principal: Principal,
    pub url: String,
}

/// Starts the external payment flow for the signed-in user
pub struct CheckoutLauncher<S, P, N> {
    session: S,
    provider: P,
    navigator: N,
    config: LauncherConfig,
}

impl<S, P, N> CheckoutLauncher<S, P, N>
where
    S: SessionContext,
    P: CheckoutProvider,
    N: Navigator,
{
    pub const fn new(session: S, provider: P, navigator: N, config: LauncherConfig) -> Self {
        Self {
            session,
            provider,
            navigator,
            config,
        }
    }

    /// Create a checkout session and navigate to it.
    ///
    /// `Unauthenticated` means the caller should [`redirect_to_login`]
    /// instead; `CheckoutInitiationFailed` is transient and safe to retry.
    ///
    /// [`redirect_to_login`]: Self::redirect_to_login
    pub async fn start_checkout(&self) -> Result<CheckoutLaunch> {
        let credential = self
            .session
            .credential()
            .ok_or(EntitlementError::Unauthenticated)?;

        let principal = credential.principal().map_err(|e| {
            tracing::warn!(error = %e, "Unreadable credential, treating as signed out");
            EntitlementError::Unauthenticated
        })?;

        let redirect = self
            .provider
            .create_session(&credential, &principal)
            .await
            .map_err(|e| match e {
                EntitlementError::CheckoutInitiationFailed(_) => e,
                other => EntitlementError::CheckoutInitiationFailed(other.to_string()),
            })?;

        let url = redirect
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| EntitlementError::CheckoutInitiationFailed("no checkout URL returned".into()))?;

        tracing::info!(principal = %principal, "Redirecting to hosted checkout");
        self.navigator.navigate(&url)?;

        Ok(CheckoutLaunch { principal, url })
    }

    /// Send the user to the login surface
    pub fn redirect_to_login(&self) -> Result<()> {
        self.navigator.navigate(&self.config.login_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{MemorySession, test_token};
    use std::cell::{Cell, RefCell};

    struct FixedProvider {
        response: Result<CheckoutRedirect>,
        calls: Cell<u32>,
        seen_subject: RefCell<Option<String>>,
    }

    impl FixedProvider {
        fn returning(response: Result<CheckoutRedirect>) -> Self {
            Self {
                response,
                calls: Cell::new(0),
                seen_subject: RefCell::new(None),
            }
        }
    }

    #[async_trait(?Send)]
    impl CheckoutProvider for FixedProvider {
        async fn create_session(
            &self,
            _credential: &Credential,
            principal: &Principal,
        ) -> Result<CheckoutRedirect> {
            self.calls.set(self.calls.get() + 1);
            *self.seen_subject.borrow_mut() = Some(principal.subject.clone());
            self.response.clone()
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        visited: RefCell<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, url: &str) -> Result<()> {
            self.visited.borrow_mut().push(url.to_string());
            Ok(())
        }
    }

    fn redirect(url: &str) -> Result<CheckoutRedirect> {
        Ok(CheckoutRedirect {
            url: Some(url.to_string()),
        })
    }

    #[tokio::test]
    async fn test_navigates_to_checkout_url() {
        let session = MemorySession::with_token(test_token(&serde_json::json!(12)));
        let provider = FixedProvider::returning(redirect("https://checkout.example.com/c/pay_1"));
        let navigator = RecordingNavigator::default();
        let launcher = CheckoutLauncher::new(&session, &provider, &navigator, LauncherConfig::default());

        let launch = launcher.start_checkout().await.unwrap();

        assert_eq!(launch.url, "https://checkout.example.com/c/pay_1");
        assert_eq!(launch.principal.subject, "12");
        assert_eq!(provider.seen_subject.borrow().as_deref(), Some("12"));
        assert_eq!(*navigator.visited.borrow(), vec!["https://checkout.example.com/c/pay_1"]);
    }

    #[tokio::test]
    async fn test_anonymous_is_unauthenticated() {
        let session = MemorySession::anonymous();
        let provider = FixedProvider::returning(redirect("https://checkout.example.com"));
        let navigator = RecordingNavigator::default();
        let launcher = CheckoutLauncher::new(&session, &provider, &navigator, LauncherConfig::default());

        let err = launcher.start_checkout().await.unwrap_err();

        assert_eq!(err, EntitlementError::Unauthenticated);
        assert_eq!(provider.calls.get(), 0);
        assert!(navigator.visited.borrow().is_empty());

        launcher.redirect_to_login().unwrap();
        assert_eq!(*navigator.visited.borrow(), vec!["/login"]);
    }

    #[tokio::test]
    async fn test_garbled_token_is_unauthenticated() {
        let session = MemorySession::with_token("garbage");
        let provider = FixedProvider::returning(redirect("https://checkout.example.com"));
        let navigator = RecordingNavigator::default();
        let launcher = CheckoutLauncher::new(&session, &provider, &navigator, LauncherConfig::default());

        assert_eq!(
            launcher.start_checkout().await.unwrap_err(),
            EntitlementError::Unauthenticated
        );
        assert_eq!(provider.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_missing_url_fails_without_navigation() {
        let session = MemorySession::with_token(test_token(&serde_json::json!("u1")));
        let provider = FixedProvider::returning(Ok(CheckoutRedirect { url: None }));
        let navigator = RecordingNavigator::default();
        let launcher = CheckoutLauncher::new(&session, &provider, &navigator, LauncherConfig::default());

        let err = launcher.start_checkout().await.unwrap_err();

        assert!(matches!(err, EntitlementError::CheckoutInitiationFailed(_)));
        assert!(err.is_retryable());
        assert!(navigator.visited.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_maps_to_initiation_failed() {
        let session = MemorySession::with_token(test_token(&serde_json::json!("u1")));
        let provider = FixedProvider::returning(Err(EntitlementError::Config("stripe not configured".into())));
        let navigator = RecordingNavigator::default();
        let launcher = CheckoutLauncher::new(&session, &provider, &navigator, LauncherConfig::default());

        let err = launcher.start_checkout().await.unwrap_err();

        assert!(matches!(err, EntitlementError::CheckoutInitiationFailed(_)));
        assert_eq!(provider.calls.get(), 1);
    }
}
