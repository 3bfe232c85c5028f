//! Credentials and Session Context
//!
//! The bearer token lives in client-local storage owned by the auth
//! collaborator. This module only reads it, through [`SessionContext`], so the
//! reconciliation protocol never touches ambient storage directly.

use std::cell::RefCell;
use std::rc::Rc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{EntitlementError, Result};

/// Opaque bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token; blank tokens count as no credential at all
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Raw token, for the `Authorization` header
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read the principal out of the JWT payload segment.
    ///
    /// The signature is not checked; the issuer and the backend own that.
    pub fn principal(&self) -> Result<Principal> {
        let payload = self
            .0
            .split('.')
            .nth(1)
            .ok_or_else(|| EntitlementError::InvalidCredential("token has no payload segment".into()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| EntitlementError::InvalidCredential(e.to_string()))?;

        let claims: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| EntitlementError::InvalidCredential(e.to_string()))?;

        let subject = match claims.get("sub") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                return Err(EntitlementError::InvalidCredential(
                    "token has no subject".into(),
                ));
            }
        };

        Ok(Principal { subject })
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Authenticated user, as far as this client can tell
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque subject identifier (`sub` claim)
    pub subject: String,
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.subject)
    }
}

/// Source of the current session's credential.
///
/// Absence is the anonymous state, not an error.
pub trait SessionContext {
    /// Current credential, if any
    fn credential(&self) -> Option<Credential>;
}

impl<T: SessionContext + ?Sized> SessionContext for Rc<T> {
    fn credential(&self) -> Option<Credential> {
        (**self).credential()
    }
}

impl<T: SessionContext + ?Sized> SessionContext for &T {
    fn credential(&self) -> Option<Credential> {
        (**self).credential()
    }
}

/// In-memory session (tests, headless tools)
#[derive(Debug, Default)]
pub struct MemorySession {
    credential: RefCell<Option<Credential>>,
}

impl MemorySession {
    /// Anonymous session
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Session holding `token`
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            credential: RefCell::new(Credential::new(token)),
        }
    }

    pub fn sign_in(&self, token: impl Into<String>) {
        *self.credential.borrow_mut() = Credential::new(token);
    }

    pub fn sign_out(&self) {
        self.credential.borrow_mut().take();
    }
}

impl SessionContext for MemorySession {
    fn credential(&self) -> Option<Credential> {
        self.credential.borrow().clone()
    }
}

#[cfg(test)]
pub(crate) fn test_token(subject: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "sub": subject, "exp": 0 }).to_string());
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_anonymous() {
        assert!(Credential::new("   ").is_none());
        assert!(MemorySession::with_token("").credential().is_none());
    }

    #[test]
    fn test_principal_from_string_subject() {
        let credential = Credential::new(test_token(&serde_json::json!("42"))).unwrap();
        assert_eq!(credential.principal().unwrap().subject, "42");
    }

    #[test]
    fn test_principal_from_numeric_subject() {
        let credential = Credential::new(test_token(&serde_json::json!(7))).unwrap();
        assert_eq!(credential.principal().unwrap().subject, "7");
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        let credential = Credential::new("not-a-jwt").unwrap();
        assert!(matches!(
            credential.principal(),
            Err(EntitlementError::InvalidCredential(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = Credential::new("secret-token").unwrap();
        assert!(!format!("{credential:?}").contains("secret"));
    }

    #[test]
    fn test_sign_in_and_out() {
        let session = MemorySession::anonymous();
        assert!(session.credential().is_none());

        session.sign_in("abc");
        assert_eq!(session.credential().unwrap().as_str(), "abc");

        session.sign_out();
        assert!(session.credential().is_none());
    }
}
