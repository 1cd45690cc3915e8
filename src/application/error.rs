//! # Application Errors
//!
//! Error types returned by the negotiation engine.
//!
//! Every failure maps onto one [`ErrorKind`], the caller-facing taxonomy
//! shared by the engine API and the REST binding.
//!
//! # Error Hierarchy
//!
//! ```text
//! NegotiationError
//! ├── NotAuthenticated                    - No caller identity
//! ├── NotAuthorized(String)               - Caller lacks the role
//! ├── NotFound { resource, id }           - Offer, property or transaction missing
//! ├── Domain(DomainError)                 - Entity rule violations
//! ├── PropertyUnavailable(String)         - Listing not open for offers
//! ├── DuplicateActiveOffer(String)        - Buyer already has an active offer
//! ├── Conflict(String)                    - Lost a race on a transition
//! ├── Timeout(&'static str)               - Store call exceeded its deadline
//! └── Unavailable(InfrastructureError)    - Store or collaborator failure
//! ```
//!
//! # Examples
//!
//! ```
//! use offer_negotiation::application::error::{ErrorKind, InfrastructureError, NegotiationError};
//!
//! let err = NegotiationError::not_found("Offer", "offer-123");
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//!
//! let infra = InfrastructureError::external_service("listings", "connection refused");
//! let err = NegotiationError::from(infra);
//! assert_eq!(err.kind(), ErrorKind::Unavailable);
//! assert!(!err.user_message().contains("refused"));
//! ```

use crate::domain::errors::DomainError;
use crate::infrastructure::persistence::RepositoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Caller-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No authenticated caller.
    NotAuthenticated,
    /// The caller does not hold the required role.
    NotAuthorized,
    /// The referenced resource does not exist.
    NotFound,
    /// An amount was not strictly positive.
    InvalidAmount,
    /// Payment terms or validity window are malformed.
    InvalidTerms,
    /// Buyer and seller would be the same user.
    SelfDealing,
    /// The property is not open for offers.
    PropertyUnavailable,
    /// The buyer already holds an active offer on the property.
    DuplicateActiveOffer,
    /// The offer cannot make the requested transition.
    InvalidStateTransition,
    /// A store call exceeded its deadline.
    Timeout,
    /// A store or collaborator failed.
    Unavailable,
}

impl ErrorKind {
    /// Returns the kind name used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "NotAuthenticated",
            Self::NotAuthorized => "NotAuthorized",
            Self::NotFound => "NotFound",
            Self::InvalidAmount => "InvalidAmount",
            Self::InvalidTerms => "InvalidTerms",
            Self::SelfDealing => "SelfDealing",
            Self::PropertyUnavailable => "PropertyUnavailable",
            Self::DuplicateActiveOffer => "DuplicateActiveOffer",
            Self::InvalidStateTransition => "InvalidStateTransition",
            Self::Timeout => "Timeout",
            Self::Unavailable => "Unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infrastructure layer error.
///
/// Failures of the stores and external collaborators. Never shown to callers.
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// External service error.
    #[error("external service error: {service} - {message}")]
    ExternalService {
        /// Service name.
        service: String,
        /// Error message.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl InfrastructureError {
    /// Creates an external service error.
    #[must_use]
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Repository(RepositoryError::Connection(_)) | Self::ExternalService { .. }
        )
    }
}

/// Error returned by every engine operation.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// No authenticated caller.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Caller lacks the required role.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Resource not found.
    #[error("not found: {resource} with id {id}")]
    NotFound {
        /// Type of resource.
        resource: &'static str,
        /// Resource identifier.
        id: String,
    },

    /// Domain rule violation.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// Property not open for offers.
    #[error("property unavailable: {0}")]
    PropertyUnavailable(String),

    /// The buyer already holds an active offer on the property.
    #[error("duplicate active offer: {0}")]
    DuplicateActiveOffer(String),

    /// The offer changed underneath the operation and no longer permits it.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A store call exceeded its deadline.
    #[error("timeout during {0}")]
    Timeout(&'static str),

    /// Store or collaborator failure.
    #[error("unavailable: {0}")]
    Unavailable(#[from] InfrastructureError),
}

impl NegotiationError {
    /// Creates a not authorized error.
    #[must_use]
    pub fn not_authorized(reason: impl Into<String>) -> Self {
        Self::NotAuthorized(reason.into())
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Creates a property unavailable error.
    #[must_use]
    pub fn property_unavailable(property: impl fmt::Display) -> Self {
        Self::PropertyUnavailable(property.to_string())
    }

    /// Creates a duplicate active offer error.
    #[must_use]
    pub fn duplicate_active_offer(detail: impl Into<String>) -> Self {
        Self::DuplicateActiveOffer(detail.into())
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict(detail.into())
    }

    /// Returns the caller-facing category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::NotAuthorized(_) => ErrorKind::NotAuthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Domain(DomainError::InvalidAmount(_)) => ErrorKind::InvalidAmount,
            Self::Domain(DomainError::InvalidTerms(_)) => ErrorKind::InvalidTerms,
            Self::Domain(DomainError::SelfDealing) => ErrorKind::SelfDealing,
            Self::Domain(DomainError::InvalidStateTransition { .. }) | Self::Conflict(_) => {
                ErrorKind::InvalidStateTransition
            }
            Self::PropertyUnavailable(_) => ErrorKind::PropertyUnavailable,
            Self::DuplicateActiveOffer(_) => ErrorKind::DuplicateActiveOffer,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Returns a message safe to show to the caller.
    ///
    /// Infrastructure detail never appears here; it is logged instead.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "authentication required".to_string(),
            Self::NotAuthorized(reason) => format!("not authorized: {reason}"),
            Self::NotFound { resource, .. } => format!("{} not found", resource.to_lowercase()),
            Self::Domain(e) => e.to_string(),
            Self::PropertyUnavailable(_) => "property is not available for offers".to_string(),
            Self::DuplicateActiveOffer(_) => {
                "you already have an active offer on this property".to_string()
            }
            Self::Conflict(_) => {
                "the offer changed and no longer allows this action".to_string()
            }
            Self::Timeout(_) => "the request timed out, please retry".to_string(),
            Self::Unavailable(_) => "service temporarily unavailable, please retry".to_string(),
        }
    }

    /// Returns true if the caller may retry the same request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Unavailable(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this error rejects a state transition.
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        self.kind() == ErrorKind::InvalidStateTransition
    }
}

impl From<RepositoryError> for NegotiationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound { entity_type, id } => Self::not_found(entity_type, id),
            RepositoryError::Duplicate { id, .. } => Self::DuplicateActiveOffer(id),
            RepositoryError::VersionConflict { id, .. } => {
                Self::Conflict(format!("offer {id} was modified concurrently"))
            }
            RepositoryError::Conflict(detail) => Self::Conflict(detail),
            RepositoryError::Settled { property_id } => Self::PropertyUnavailable(property_id),
            other => Self::Unavailable(InfrastructureError::Repository(other)),
        }
    }
}

/// Result type for engine operations.
pub type NegotiationResult<T> = Result<T, NegotiationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::OfferStatus;

    mod infrastructure_error {
        use super::*;

        #[test]
        fn connection_failures_are_retryable() {
            let err = InfrastructureError::from(RepositoryError::connection("refused"));
            assert!(err.is_retryable());
            assert!(err.to_string().contains("repository"));
        }

        #[test]
        fn query_failures_are_not_retryable() {
            let err = InfrastructureError::from(RepositoryError::query("syntax"));
            assert!(!err.is_retryable());
        }

        #[test]
        fn external_service_display() {
            let err = InfrastructureError::external_service("listings", "503");
            assert!(err.to_string().contains("listings"));
            assert!(err.is_retryable());
        }
    }

    mod kinds {
        use super::*;

        #[test]
        fn domain_errors_map_to_their_kinds() {
            assert_eq!(
                NegotiationError::from(DomainError::invalid_amount("zero")).kind(),
                ErrorKind::InvalidAmount
            );
            assert_eq!(
                NegotiationError::from(DomainError::invalid_terms("blank")).kind(),
                ErrorKind::InvalidTerms
            );
            assert_eq!(
                NegotiationError::from(DomainError::SelfDealing).kind(),
                ErrorKind::SelfDealing
            );
            let transition = DomainError::InvalidStateTransition {
                from: OfferStatus::Accepted,
                to: OfferStatus::Rejected,
            };
            assert!(NegotiationError::from(transition).is_invalid_transition());
        }

        #[test]
        fn repository_errors_map_to_their_kinds() {
            assert!(
                NegotiationError::from(RepositoryError::not_found("Offer", "x")).is_not_found()
            );
            assert_eq!(
                NegotiationError::from(RepositoryError::duplicate("Offer", "b/p")).kind(),
                ErrorKind::DuplicateActiveOffer
            );
            assert_eq!(
                NegotiationError::from(RepositoryError::version_conflict("Offer", "x", 1, 2))
                    .kind(),
                ErrorKind::InvalidStateTransition
            );
            assert_eq!(
                NegotiationError::from(RepositoryError::conflict("already accepted")).kind(),
                ErrorKind::InvalidStateTransition
            );
            assert_eq!(
                NegotiationError::from(RepositoryError::settled("prop-1")).kind(),
                ErrorKind::PropertyUnavailable
            );
            assert_eq!(
                NegotiationError::from(RepositoryError::connection("down")).kind(),
                ErrorKind::Unavailable
            );
        }

        #[test]
        fn kind_display_matches_wire_name() {
            assert_eq!(ErrorKind::DuplicateActiveOffer.to_string(), "DuplicateActiveOffer");
            assert_eq!(
                serde_json::to_string(&ErrorKind::NotAuthenticated).unwrap_or_default(),
                "\"NotAuthenticated\""
            );
        }
    }

    mod messages {
        use super::*;

        #[test]
        fn user_message_hides_store_detail() {
            let err = NegotiationError::from(RepositoryError::query(
                "relation \"offers\" does not exist",
            ));
            assert!(!err.user_message().contains("relation"));
            assert!(err.to_string().contains("relation"));
        }

        #[test]
        fn not_found_message_names_resource() {
            let err = NegotiationError::not_found("Offer", "abc");
            assert_eq!(err.user_message(), "offer not found");
        }

        #[test]
        fn retryable_errors() {
            assert!(NegotiationError::Timeout("submit_offer").is_retryable());
            assert!(NegotiationError::from(RepositoryError::connection("down")).is_retryable());
            assert!(!NegotiationError::NotAuthenticated.is_retryable());
        }
    }
}
