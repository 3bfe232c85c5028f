//! Entitlement Snapshot
//!
//! Client-local cached view of the authoritative plan record, shared by every
//! reconciliation session of one reconciler.
//!
//! Updates follow a "highest confidence wins" merge instead of last write
//! wins:
//!
//! ```text
//!   Idle ──begin──▶ Loading ──settle(true)──▶ Pro   (final until reset)
//!                      │
//!                      └──settle(false)──▶ Free  (only the newest session)
//! ```
//!
//! A slow session that resolves `false` after a newer one already reached
//! `Pro` is dropped on the floor.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// UI-visible plan state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementState {
    /// Nothing triggered yet (renders like `Loading`)
    #[default]
    Idle,

    /// A reconciliation session is polling
    Loading,

    /// Paid plan confirmed
    Pro,

    /// Budget spent without seeing a paid plan, or anonymous
    Free,

    /// Every attempt failed at transport level (opt-in)
    Inconclusive,
}

impl EntitlementState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Pro => "pro",
            Self::Free => "free",
            Self::Inconclusive => "inconclusive",
        }
    }

    pub const fn is_pro(self) -> bool {
        matches!(self, Self::Pro)
    }
}

impl std::fmt::Display for EntitlementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last observed value of the authoritative record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementSnapshot {
    /// Paid plan?
    pub value: bool,

    /// 1-based poll attempt that produced `value`
    pub as_of: u32,

    pub observed_at: DateTime<Utc>,
}

/// Identifies one reconciliation session; later sessions compare greater
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionTicket(u64);

impl SessionTicket {
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of asking to start a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Begin {
    Started(SessionTicket),
    /// `Pro` is final; there is nothing left to poll for
    AlreadyPro,
    /// The owning surface is gone
    Frozen,
}

type Listener = Box<dyn Fn(EntitlementState)>;

#[derive(Debug, Default)]
struct Inner {
    state: EntitlementState,
    snapshot: Option<EntitlementSnapshot>,
    latest: u64,
    /// Sessions below this ticket were orphaned by a reset
    floor: u64,
    frozen: bool,
}

/// Shared, single-threaded snapshot with a monotone merge rule
#[derive(Clone, Default)]
pub struct SharedSnapshot {
    inner: Rc<RefCell<Inner>>,
    listeners: Rc<RefCell<Vec<Listener>>>,
}

impl SharedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EntitlementState {
        self.inner.borrow().state
    }

    pub fn snapshot(&self) -> Option<EntitlementSnapshot> {
        self.inner.borrow().snapshot.clone()
    }

    /// Register a listener for visible state changes.
    ///
    /// Listeners must not subscribe from inside a notification.
    pub fn subscribe(&self, listener: impl Fn(EntitlementState) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    /// Enter `Loading` for a new session, unless `Pro` already holds
    pub fn begin(&self) -> Begin {
        let ticket = {
            let mut inner = self.inner.borrow_mut();
            if inner.frozen {
                return Begin::Frozen;
            }
            if inner.state.is_pro() {
                return Begin::AlreadyPro;
            }
            inner.latest += 1;
            SessionTicket(inner.latest)
        };

        self.transition(EntitlementState::Loading);
        Begin::Started(ticket)
    }

    /// Whether `ticket` may still mutate anything
    pub fn is_live(&self, ticket: SessionTicket) -> bool {
        let inner = self.inner.borrow();
        !inner.frozen && ticket.0 >= inner.floor
    }

    /// Record one successful read. A `true` is never overwritten by a `false`.
    pub fn observe(&self, ticket: SessionTicket, attempt: u32, value: bool) -> bool {
        if !self.is_live(ticket) {
            return false;
        }

        let mut inner = self.inner.borrow_mut();
        let keep_existing = matches!(&inner.snapshot, Some(existing) if existing.value && !value);
        if keep_existing {
            return false;
        }

        inner.snapshot = Some(EntitlementSnapshot {
            value,
            as_of: attempt,
            observed_at: Utc::now(),
        });
        true
    }

    /// Settle a session. Returns whether `outcome` became the visible state.
    pub fn settle(&self, ticket: SessionTicket, outcome: EntitlementState) -> bool {
        let accepted = {
            let inner = self.inner.borrow();
            if inner.frozen || ticket.0 < inner.floor {
                false
            } else {
                match outcome {
                    EntitlementState::Pro => true,
                    EntitlementState::Free | EntitlementState::Inconclusive => {
                        ticket.0 == inner.latest && inner.state == EntitlementState::Loading
                    }
                    EntitlementState::Idle | EntitlementState::Loading => false,
                }
            }
        };

        if accepted {
            self.transition(outcome);
        } else {
            tracing::debug!(session = %ticket, outcome = %outcome, "Dropped stale settlement");
        }
        accepted
    }

    /// Settle without a session (anonymous principal)
    pub fn settle_anonymous(&self) -> bool {
        let accepted = {
            let inner = self.inner.borrow();
            !inner.frozen && !inner.state.is_pro()
        };
        if accepted {
            self.transition(EntitlementState::Free);
        }
        accepted
    }

    /// Forget everything, including a confirmed `Pro`
    pub fn reset(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.frozen {
                return;
            }
            inner.snapshot = None;
            inner.floor = inner.latest + 1;
        }
        self.transition(EntitlementState::Idle);
    }

    /// Stop accepting mutations; used on teardown
    pub fn freeze(&self) {
        self.inner.borrow_mut().frozen = true;
    }

    fn transition(&self, next: EntitlementState) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let changed = inner.state != next;
            inner.state = next;
            changed
        };

        if changed {
            tracing::debug!(state = %next, "Entitlement state changed");
            for listener in self.listeners.borrow().iter() {
                listener(next);
            }
        }
    }
}

impl std::fmt::Debug for SharedSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSnapshot")
            .field("inner", &self.inner.borrow())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(begin: Begin) -> SessionTicket {
        match begin {
            Begin::Started(ticket) => ticket,
            other => panic!("expected Started, got {other:?}"),
        }
    }

    #[test]
    fn test_begin_enters_loading() {
        let shared = SharedSnapshot::new();
        assert_eq!(shared.state(), EntitlementState::Idle);

        started(shared.begin());
        assert_eq!(shared.state(), EntitlementState::Loading);
    }

    #[test]
    fn test_pro_is_final() {
        let shared = SharedSnapshot::new();
        let ticket = started(shared.begin());
        assert!(shared.settle(ticket, EntitlementState::Pro));

        assert_eq!(shared.begin(), Begin::AlreadyPro);
        assert!(!shared.settle(ticket, EntitlementState::Free));
        assert!(!shared.settle_anonymous());
        assert_eq!(shared.state(), EntitlementState::Pro);
    }

    #[test]
    fn test_stale_free_does_not_override_pro() {
        let shared = SharedSnapshot::new();
        let mount = started(shared.begin());
        let redirect = started(shared.begin());

        assert!(shared.settle(redirect, EntitlementState::Pro));
        assert!(!shared.settle(mount, EntitlementState::Free));
        assert_eq!(shared.state(), EntitlementState::Pro);
    }

    #[test]
    fn test_older_session_free_ignored_while_newer_polls() {
        let shared = SharedSnapshot::new();
        let mount = started(shared.begin());
        let redirect = started(shared.begin());

        assert!(!shared.settle(mount, EntitlementState::Free));
        assert_eq!(shared.state(), EntitlementState::Loading);

        assert!(shared.settle(redirect, EntitlementState::Free));
        assert_eq!(shared.state(), EntitlementState::Free);
    }

    #[test]
    fn test_older_session_may_still_upgrade() {
        let shared = SharedSnapshot::new();
        let mount = started(shared.begin());
        let redirect = started(shared.begin());

        assert!(shared.settle(redirect, EntitlementState::Free));
        assert!(shared.settle(mount, EntitlementState::Pro));
        assert_eq!(shared.state(), EntitlementState::Pro);
    }

    #[test]
    fn test_observe_never_downgrades_value() {
        let shared = SharedSnapshot::new();
        let a = started(shared.begin());
        let b = started(shared.begin());

        assert!(shared.observe(b, 1, true));
        assert!(!shared.observe(a, 3, false));

        let snapshot = shared.snapshot().unwrap();
        assert!(snapshot.value);
        assert_eq!(snapshot.as_of, 1);
    }

    #[test]
    fn test_frozen_snapshot_rejects_everything() {
        let shared = SharedSnapshot::new();
        let ticket = started(shared.begin());
        shared.freeze();

        assert!(!shared.is_live(ticket));
        assert!(!shared.observe(ticket, 1, true));
        assert!(!shared.settle(ticket, EntitlementState::Pro));
        assert_eq!(shared.begin(), Begin::Frozen);
        assert_eq!(shared.state(), EntitlementState::Loading);
    }

    #[test]
    fn test_reset_clears_pro_and_stales_sessions() {
        let shared = SharedSnapshot::new();
        let ticket = started(shared.begin());
        shared.settle(ticket, EntitlementState::Pro);

        shared.reset();
        assert_eq!(shared.state(), EntitlementState::Idle);
        assert!(shared.snapshot().is_none());

        let fresh = started(shared.begin());
        assert!(fresh > ticket);
        assert!(!shared.settle(ticket, EntitlementState::Free));
    }

    #[test]
    fn test_listeners_see_each_change_once() {
        let shared = SharedSnapshot::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        shared.subscribe(move |state| sink.borrow_mut().push(state));

        let a = started(shared.begin());
        let b = started(shared.begin());
        shared.settle(b, EntitlementState::Pro);
        shared.settle(a, EntitlementState::Pro);

        assert_eq!(
            *seen.borrow(),
            vec![EntitlementState::Loading, EntitlementState::Pro]
        );
    }
}
