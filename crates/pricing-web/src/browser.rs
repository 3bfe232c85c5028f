//! Browser Adapters
//!
//! `web-sys` implementations of the reconciliation traits: the bearer token
//! lives in `localStorage`, delays ride on `setTimeout`, navigation assigns
//! `window.location.href`.

use std::time::Duration;

use async_trait::async_trait;
use leptos::prelude::*;
use wasm_bindgen::JsValue;

use entitlement_core::{Credential, Delay, EntitlementError, Navigator, Notifier, Result, SessionContext};

/// `localStorage` key holding the bearer token
pub const TOKEN_KEY: &str = "access_token";

/// Reads the token on every call so a sign-in in another tab is picked up
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserSession;

impl SessionContext for BrowserSession {
    fn credential(&self) -> Option<Credential> {
        let storage = web_sys::window()?.local_storage().ok()??;
        let token = storage.get_item(TOKEN_KEY).ok()??;
        Credential::new(token)
    }
}

/// `setTimeout` wrapped in a promise
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeoutDelay;

#[async_trait(?Send)]
impl Delay for TimeoutDelay {
    async fn sleep(&self, duration: Duration) {
        let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);

        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window().is_some_and(|window| {
                window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
                    .is_ok()
            });
            // No timer available: resume right away rather than hang the session
            if !scheduled {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });

        let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
    }
}

/// Full-page navigation
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowNavigator;

impl Navigator for WindowNavigator {
    fn navigate(&self, url: &str) -> Result<()> {
        let window =
            web_sys::window().ok_or_else(|| EntitlementError::Navigation("no window".into()))?;
        window
            .location()
            .set_href(url)
            .map_err(|e| EntitlementError::Navigation(format!("{e:?}")))
    }
}

/// Pushes notices into the page's toast signal
#[derive(Clone, Copy, Debug)]
pub struct ToastNotifier {
    pub toast: WriteSignal<Option<String>>,
}

impl Notifier for ToastNotifier {
    fn checkout_completed(&self) {
        self.toast.set(Some("🎉 Subscription activated! Welcome to Pro".into()));
    }

    fn checkout_canceled(&self) {
        self.toast.set(Some("Checkout canceled. You have not been charged.".into()));
    }
}
