//! Entitlement Reconciler
//!
//! Converges the client's cached plan flag with the authoritative record,
//! which a payment webhook updates at some point after checkout. The redirect
//! back to the app proves nothing about that webhook, so the reconciler polls.
//!
//! ## Polling protocol
//!
//! ```text
//!  attempt 1 ──false──▶ sleep ──▶ attempt 2 ──false──▶ sleep ──▶ attempt 3 ──true──▶ Pro
//!     ...
//!  attempt N ──false──▶ sleep ──▶ Free (budget exhausted)
//! ```
//!
//! - Attempts are strictly sequential within a session.
//! - The first `true` ends the session at `Pro`.
//! - A `false` never ends it early: it is indistinguishable from "webhook not
//!   delivered yet", so the full budget is spent before settling at `Free`.
//! - A transport failure costs one attempt, exactly like a `false`.
//!
//! Sessions triggered by mount and by redirect may overlap; they share one
//! [`SharedSnapshot`] whose merge rule keeps `Pro` from being regressed.

use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{AbortHandle, Abortable};
use serde::{Deserialize, Serialize};

use crate::config::ReconcileConfig;
use crate::credential::{Credential, SessionContext};
use crate::error::{EntitlementError, Result};
use crate::signal::{CheckoutReturn, NavigationId, RedirectLatch};
use crate::snapshot::{Begin, EntitlementSnapshot, EntitlementState, SessionTicket, SharedSnapshot};

/// One authoritative read (`{ "is_pro": bool }`)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementRecord {
    pub is_pro: bool,
}

/// Authoritative entitlement read.
///
/// Must be idempotent; the reconciler calls it repeatedly.
#[async_trait(?Send)]
pub trait EntitlementSource {
    async fn fetch(&self, credential: &Credential) -> Result<EntitlementRecord>;
}

#[async_trait(?Send)]
impl<T: EntitlementSource + ?Sized> EntitlementSource for Rc<T> {
    async fn fetch(&self, credential: &Credential) -> Result<EntitlementRecord> {
        (**self).fetch(credential).await
    }
}

/// Cooperative suspension between attempts
#[async_trait(?Send)]
pub trait Delay {
    async fn sleep(&self, duration: Duration);
}

/// `tokio::time::sleep`
#[cfg(feature = "tokio")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioDelay;

#[cfg(feature = "tokio")]
#[async_trait(?Send)]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// One-time user notices tied to the redirect signal
pub trait Notifier {
    /// Checkout just completed (fires once per redirect arrival)
    fn checkout_completed(&self);

    /// User backed out of the hosted payment page
    fn checkout_canceled(&self) {}
}

/// Notifier that drops everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn checkout_completed(&self) {}
}

/// What started a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Mount,
    Redirect,
    Manual,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mount => f.write_str("mount"),
            Self::Redirect => f.write_str("redirect"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// Why a session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleReason {
    /// Authoritative record reported the paid plan
    Confirmed,
    /// Every attempt spent without a `true`
    BudgetExhausted,
    /// No credential; nothing was polled
    Anonymous,
    /// `Pro` was already confirmed by another session
    AlreadyPro,
    /// A newer session owns the visible state
    Superseded,
    /// Torn down or reset mid-flight
    Cancelled,
}

/// Result of one reconciliation session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// Visible state once this session finished
    pub state: EntitlementState,

    /// Authoritative reads performed by this session
    pub attempts: u32,

    pub reason: SettleReason,

    pub session: Option<SessionTicket>,
}

impl Settlement {
    /// The exhausted budget as an error value, for logging
    pub fn exhaustion(&self) -> Option<EntitlementError> {
        match self.reason {
            SettleReason::BudgetExhausted => Some(EntitlementError::RetryBudgetExhausted {
                attempts: self.attempts,
            }),
            _ => None,
        }
    }
}

/// Owns the bounded polling protocol and the monotone plan state
pub struct EntitlementReconciler<S, E, D> {
    session: S,
    source: E,
    delay: D,
    config: ReconcileConfig,
    shared: SharedSnapshot,
    latch: RefCell<RedirectLatch>,
    notifier: Box<dyn Notifier>,
    /// One entry per wrapped session; the `Weak` dies once that future completes or is dropped
    aborts: RefCell<Vec<(AbortHandle, Weak<()>)>>,
}

impl<S, E, D> EntitlementReconciler<S, E, D>
where
    S: SessionContext,
    E: EntitlementSource,
    D: Delay,
{
    /// Create a reconciler in `Idle`
    pub fn new(session: S, source: E, delay: D, config: ReconcileConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            session,
            source,
            delay,
            config,
            shared: SharedSnapshot::new(),
            latch: RefCell::new(RedirectLatch::new()),
            notifier: Box::new(NoopNotifier),
            aborts: RefCell::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub const fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn state(&self) -> EntitlementState {
        self.shared.state()
    }

    pub fn snapshot(&self) -> Option<EntitlementSnapshot> {
        self.shared.snapshot()
    }

    /// Called on every visible state change
    pub fn subscribe(&self, listener: impl Fn(EntitlementState) + 'static) {
        self.shared.subscribe(listener);
    }

    /// Initial trigger when the owning surface mounts
    pub async fn on_mount(&self) -> Settlement {
        self.reconcile(Trigger::Mount).await
    }

    /// Feed the current URL's checkout marker.
    ///
    /// Safe to call on every re-render: only the first marker of a navigation
    /// notifies and re-enters `Loading`.
    pub async fn on_return(&self, signal: CheckoutReturn) -> Option<Settlement> {
        let consumed = {
            let mut latch = self.latch.borrow_mut();
            match latch.consume(signal) {
                Some(consumed) => consumed,
                None => {
                    if !signal.is_none() && latch.is_consumed() {
                        tracing::debug!(navigation = ?latch.navigation(), "Return marker already handled");
                    }
                    return None;
                }
            }
        };

        match consumed {
            CheckoutReturn::Completed => {
                tracing::info!("Checkout completed, re-checking plan");
                self.notifier.checkout_completed();
                Some(self.reconcile(Trigger::Redirect).await)
            }
            CheckoutReturn::Canceled => {
                tracing::info!("Checkout canceled");
                self.notifier.checkout_canceled();
                None
            }
            CheckoutReturn::None => None,
        }
    }

    /// A new navigation arrived; the redirect latch opens again
    pub fn begin_navigation(&self) -> NavigationId {
        self.latch.borrow_mut().begin_navigation()
    }

    /// Session reset (e.g. sign-out): back to `Idle`, `Pro` no longer final
    pub fn reset(&self) {
        self.shared.reset();
    }

    /// Wrap a session future so [`teardown`](Self::teardown) can abandon it
    pub fn abortable<F: Future>(&self, future: F) -> Abortable<impl Future<Output = F::Output>> {
        let (handle, registration) = AbortHandle::new_pair();
        let live = Rc::new(());

        let mut aborts = self.aborts.borrow_mut();
        aborts.retain(|(h, token)| !h.is_aborted() && token.strong_count() > 0);
        aborts.push((handle, Rc::downgrade(&live)));

        Abortable::new(
            async move {
                let _live = live;
                future.await
            },
            registration,
        )
    }

    /// The owning surface is gone: abandon outstanding sessions and stop
    /// mutating the snapshot
    pub fn teardown(&self) {
        self.shared.freeze();
        for (handle, _) in self.aborts.borrow_mut().drain(..) {
            handle.abort();
        }
        tracing::debug!("Reconciler torn down");
    }

    /// Run one reconciliation session to settlement
    pub async fn reconcile(&self, trigger: Trigger) -> Settlement {
        let Some(credential) = self.session.credential() else {
            self.shared.settle_anonymous();
            tracing::info!(%trigger, "No credential, plan is free");
            return Settlement {
                state: self.shared.state(),
                attempts: 0,
                reason: SettleReason::Anonymous,
                session: None,
            };
        };

        let ticket = match self.shared.begin() {
            Begin::Started(ticket) => ticket,
            Begin::AlreadyPro => {
                tracing::debug!(%trigger, "Plan already confirmed, skipping poll");
                return self.settlement(None, 0, SettleReason::AlreadyPro);
            }
            Begin::Frozen => return self.settlement(None, 0, SettleReason::Cancelled),
        };

        tracing::info!(%trigger, session = %ticket, "Reconciling plan");
        self.poll(ticket, &credential).await
    }

    async fn poll(&self, ticket: SessionTicket, credential: &Credential) -> Settlement {
        let mut attempts = 0;
        let mut failures = 0;

        for attempt in 1..=self.config.max_attempts {
            if !self.shared.is_live(ticket) {
                return self.settlement(Some(ticket), attempts, SettleReason::Cancelled);
            }
            if self.shared.state().is_pro() {
                return self.settlement(Some(ticket), attempts, SettleReason::AlreadyPro);
            }

            attempts = attempt;
            match self.source.fetch(credential).await {
                Ok(record) => {
                    self.shared.observe(ticket, attempt, record.is_pro);
                    if record.is_pro {
                        let reason = if self.shared.settle(ticket, EntitlementState::Pro) {
                            SettleReason::Confirmed
                        } else {
                            SettleReason::Cancelled
                        };
                        tracing::info!(session = %ticket, attempt, "Plan confirmed: pro");
                        return self.settlement(Some(ticket), attempts, reason);
                    }
                    tracing::debug!(session = %ticket, attempt, "Plan not active yet");
                }
                Err(err) => {
                    failures += 1;
                    tracing::warn!(session = %ticket, attempt, error = %err, "Entitlement fetch failed");
                }
            }

            self.delay.sleep(self.config.retry_delay()).await;
        }

        if !self.shared.is_live(ticket) {
            return self.settlement(Some(ticket), attempts, SettleReason::Cancelled);
        }

        let outcome = if self.config.surface_inconclusive && failures == attempts {
            EntitlementState::Inconclusive
        } else {
            EntitlementState::Free
        };

        let reason = if self.shared.settle(ticket, outcome) {
            tracing::info!(
                session = %ticket,
                attempts,
                failures,
                outcome = %outcome,
                "Retry budget exhausted"
            );
            SettleReason::BudgetExhausted
        } else if self.shared.state().is_pro() {
            SettleReason::AlreadyPro
        } else {
            SettleReason::Superseded
        };

        self.settlement(Some(ticket), attempts, reason)
    }

    fn settlement(&self, session: Option<SessionTicket>, attempts: u32, reason: SettleReason) -> Settlement {
        Settlement {
            state: self.shared.state(),
            attempts,
            reason,
            session,
        }
    }
}

impl<S, E, D> Drop for EntitlementReconciler<S, E, D> {
    fn drop(&mut self) {
        for (handle, _) in self.aborts.get_mut().drain(..) {
            handle.abort();
        }
    }
}
