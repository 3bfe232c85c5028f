//! Error Types

use thiserror::Error;

/// Result type alias for entitlement operations
pub type Result<T> = std::result::Result<T, EntitlementError>;

/// Entitlement and checkout errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntitlementError {
    /// No credential in the session; the caller must send the user to login
    #[error("Not authenticated")]
    Unauthenticated,

    /// Credential present but its payload could not be read
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// The payment provider did not hand back a checkout URL
    #[error("Checkout initiation failed: {0}")]
    CheckoutInitiationFailed(String),

    /// A single authoritative read failed (absorbed into the retry budget)
    #[error("Entitlement fetch failed: {0}")]
    EntitlementFetchFailed(String),

    /// Every poll attempt was spent without observing a paid plan
    #[error("Retry budget exhausted after {attempts} attempts")]
    RetryBudgetExhausted { attempts: u32 },

    /// Top-level navigation could not be performed
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EntitlementError {
    /// Check if the user can simply try again
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CheckoutInitiationFailed(_) | Self::EntitlementFetchFailed(_)
        )
    }

    /// Only these two surface to the user; everything else is logged
    pub const fn is_user_visible(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::CheckoutInitiationFailed(_))
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated | Self::InvalidCredential(_) => "Please login first.",
            Self::CheckoutInitiationFailed(_) => "Unable to start checkout. Please try again.",
            Self::Navigation(_) => "Could not open the payment page.",
            _ => "Something went wrong.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_auth_and_checkout_are_user_visible() {
        assert!(EntitlementError::Unauthenticated.is_user_visible());
        assert!(EntitlementError::CheckoutInitiationFailed("boom".into()).is_user_visible());
        assert!(!EntitlementError::EntitlementFetchFailed("timeout".into()).is_user_visible());
        assert!(!EntitlementError::RetryBudgetExhausted { attempts: 5 }.is_user_visible());
    }

    #[test]
    fn test_checkout_failure_is_retryable() {
        assert!(EntitlementError::CheckoutInitiationFailed("no url".into()).is_retryable());
        assert!(!EntitlementError::Unauthenticated.is_retryable());
    }
}
