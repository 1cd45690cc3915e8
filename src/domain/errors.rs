//! # Domain Errors
//!
//! Business rule violations raised by entities and value objects.
//!
//! Domain errors carry no infrastructure detail. The application layer maps
//! them onto the caller-facing [`ErrorKind`](crate::application::error::ErrorKind)
//! taxonomy.

use crate::domain::value_objects::offer_status::OfferStatus;
use thiserror::Error;

/// Error raised when a domain rule is violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A monetary amount was zero, negative, or otherwise unusable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The buyer and the seller of an offer are the same user.
    #[error("buyer and seller must be different users")]
    SelfDealing,

    /// The requested status change is not an edge of the offer state machine.
    #[error("invalid offer state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current status.
        from: OfferStatus,
        /// Requested status.
        to: OfferStatus,
    },

    /// Payment terms or validity window are malformed.
    #[error("invalid terms: {0}")]
    InvalidTerms(String),
}

impl DomainError {
    /// Creates an invalid amount error.
    #[must_use]
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount(message.into())
    }

    /// Creates an invalid terms error.
    #[must_use]
    pub fn invalid_terms(message: impl Into<String>) -> Self {
        Self::InvalidTerms(message.into())
    }

    /// Returns true if this is a state machine violation.
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidStateTransition { .. })
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_display() {
        let err = DomainError::InvalidStateTransition {
            from: OfferStatus::Countered,
            to: OfferStatus::Countered,
        };
        assert!(err.is_invalid_transition());
        assert_eq!(
            err.to_string(),
            "invalid offer state transition from COUNTERED to COUNTERED"
        );
    }

    #[test]
    fn helpers_build_messages() {
        assert!(
            DomainError::invalid_amount("must be positive")
                .to_string()
                .contains("must be positive")
        );
        assert!(
            DomainError::invalid_terms("validity in the past")
                .to_string()
                .contains("validity")
        );
        assert!(!DomainError::SelfDealing.is_invalid_transition());
    }
}
