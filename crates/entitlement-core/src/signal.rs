//! Redirect Signals
//!
//! After the hosted payment page the provider sends the user back with
//! `?success=true` (or `?canceled=true`). The query string stays put across
//! re-renders, so the marker is treated as a one-shot event per navigation
//! and guarded by a [`RedirectLatch`].

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{EntitlementError, Result};

/// What the return URL says about the checkout that just ended
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutReturn {
    /// No marker on the URL
    #[default]
    None,

    /// `success=true`
    Completed,

    /// `canceled=true`
    Canceled,
}

impl CheckoutReturn {
    /// Classify from the two query values
    pub fn from_flags(success: Option<&str>, canceled: Option<&str>) -> Self {
        if success == Some("true") {
            Self::Completed
        } else if canceled == Some("true") {
            Self::Canceled
        } else {
            Self::None
        }
    }

    /// Classify a raw query string, with or without the leading `?`
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut success = None;
        let mut canceled = None;

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "success" => success = Some(value.into_owned()),
                "canceled" => canceled = Some(value.into_owned()),
                _ => {}
            }
        }

        Self::from_flags(success.as_deref(), canceled.as_deref())
    }

    /// Classify an absolute return URL
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| EntitlementError::Config(format!("bad return URL: {e}")))?;
        Ok(Self::from_query(parsed.query().unwrap_or_default()))
    }

    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Identifies one page navigation. The latch resets when this changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavigationId(u64);

impl NavigationId {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Single-use marker scoped to the current navigation
#[derive(Debug, Default)]
pub struct RedirectLatch {
    navigation: NavigationId,
    consumed: bool,
}

impl RedirectLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new navigation; the latch is open again
    pub fn begin_navigation(&mut self) -> NavigationId {
        self.navigation = self.navigation.next();
        self.consumed = false;
        self.navigation
    }

    pub const fn navigation(&self) -> NavigationId {
        self.navigation
    }

    pub const fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Returns the signal the first time a marker is seen in this
    /// navigation, `None` for absent markers and for every repeat.
    pub fn consume(&mut self, signal: CheckoutReturn) -> Option<CheckoutReturn> {
        if signal.is_none() || self.consumed {
            return None;
        }
        self.consumed = true;
        Some(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_query() {
        assert_eq!(CheckoutReturn::from_query("?success=true"), CheckoutReturn::Completed);
        assert_eq!(CheckoutReturn::from_query("tab=pro&success=true"), CheckoutReturn::Completed);
        assert_eq!(CheckoutReturn::from_query("success=false"), CheckoutReturn::None);
        assert_eq!(CheckoutReturn::from_query(""), CheckoutReturn::None);
    }

    #[test]
    fn test_parse_canceled_url() {
        let parsed = CheckoutReturn::from_url("https://app.example.com/pricing?canceled=true").unwrap();
        assert_eq!(parsed, CheckoutReturn::Canceled);
    }

    #[test]
    fn test_bad_url_is_config_error() {
        assert!(CheckoutReturn::from_url("not a url").is_err());
    }

    #[test]
    fn test_latch_fires_once_per_navigation() {
        let mut latch = RedirectLatch::new();

        assert_eq!(latch.consume(CheckoutReturn::Completed), Some(CheckoutReturn::Completed));
        // Same navigation, URL still carries the flag
        assert_eq!(latch.consume(CheckoutReturn::Completed), None);
        assert_eq!(latch.consume(CheckoutReturn::Completed), None);

        latch.begin_navigation();
        assert_eq!(latch.consume(CheckoutReturn::Completed), Some(CheckoutReturn::Completed));
    }

    #[test]
    fn test_absent_marker_does_not_close_latch() {
        let mut latch = RedirectLatch::new();
        assert_eq!(latch.consume(CheckoutReturn::None), None);
        assert!(!latch.is_consumed());
        assert!(latch.consume(CheckoutReturn::Completed).is_some());
    }
}
