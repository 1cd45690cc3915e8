//! # Repository Traits
//!
//! Port definitions for the Offer Store and the Transaction Store.
//!
//! The stores own no business rules, but they do own atomicity. Every
//! write method here is a single atomic unit:
//!
//! - [`OfferRepository::insert`] re-checks "one active offer per buyer and
//!   property" inside the same unit as the insert
//! - [`OfferRepository::update`] is a compare-and-swap on the offer version
//! - [`OfferRepository::commit_acceptance`] accepts, supersedes competitors,
//!   creates the transaction and links it back, all or nothing
//!
//! # Examples
//!
//! ```ignore
//! use offer_negotiation::infrastructure::persistence::traits::OfferRepository;
//!
//! async fn active_count(repo: &impl OfferRepository, property: &PropertyId) -> usize {
//!     let offers = repo.find_by_property(property).await.unwrap();
//!     offers.iter().filter(|o| o.is_active()).count()
//! }
//! ```

use crate::domain::entities::{Acceptance, Offer, Transaction};
use crate::domain::services::AcceptanceOutcome;
use crate::domain::value_objects::{OfferId, PropertyId, Timestamp, TransactionId, UserId};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Entity not found.
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        /// Type of entity.
        entity_type: &'static str,
        /// Entity identifier.
        id: String,
    },

    /// Uniqueness constraint violated.
    #[error("Duplicate entity: {entity_type} with id {id} already exists")]
    Duplicate {
        /// Type of entity.
        entity_type: &'static str,
        /// Entity identifier.
        id: String,
    },

    /// Optimistic locking conflict.
    #[error("Version conflict: {entity_type} with id {id} has been modified")]
    VersionConflict {
        /// Type of entity.
        entity_type: &'static str,
        /// Entity identifier.
        id: String,
        /// Expected version.
        expected: u64,
        /// Actual version.
        actual: u64,
    },

    /// The write contradicts the committed state of other rows.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The property already has an accepted offer and takes no new ones.
    #[error("Property {property_id} already has an accepted offer")]
    Settled {
        /// Property identifier.
        property_id: String,
    },

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error.
    #[error("Query error: {0}")]
    Query(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a version conflict error.
    #[must_use]
    pub fn version_conflict(
        entity_type: &'static str,
        id: impl Into<String>,
        expected: u64,
        actual: u64,
    ) -> Self {
        Self::VersionConflict {
            entity_type,
            id: id.into(),
            expected,
            actual,
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Creates a settled-property error.
    #[must_use]
    pub fn settled(property_id: impl Into<String>) -> Self {
        Self::Settled {
            property_id: property_id.into(),
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error.
    #[must_use]
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a duplicate error.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Returns true if this is a version conflict error.
    #[must_use]
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    /// Returns true if this is a state conflict error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns true if the property already has an accepted offer.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Input to [`OfferRepository::commit_acceptance`].
#[derive(Debug, Clone)]
pub struct AcceptanceRequest {
    /// The offer being accepted.
    pub offer_id: OfferId,
    /// The version the caller validated against.
    pub expected_version: u64,
    /// Direct (seller) or counter (buyer) acceptance.
    pub acceptance: Acceptance,
    /// Optional seller response text.
    pub response: Option<String>,
    /// Instant stamped on every write in the unit.
    pub now: Timestamp,
}

/// Offer Store.
#[async_trait]
pub trait OfferRepository: Send + Sync + fmt::Debug {
    /// Inserts a new offer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Settled` if the property already has an
    /// accepted offer, and `RepositoryError::Duplicate` if the buyer already
    /// holds an active offer on it. Both checks are atomic with the insert
    /// and with [`commit_acceptance`](Self::commit_acceptance).
    async fn insert(&self, offer: &Offer) -> RepositoryResult<()>;

    /// Gets an offer by ID.
    ///
    /// Returns `None` if the offer does not exist.
    async fn get(&self, id: &OfferId) -> RepositoryResult<Option<Offer>>;

    /// Replaces a stored offer if its version still equals `expected_version`.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::NotFound` if the offer does not exist
    /// - `RepositoryError::VersionConflict` if the stored version differs
    async fn update(&self, offer: &Offer, expected_version: u64) -> RepositoryResult<()>;

    /// Accepts an offer and applies every consequence as one atomic unit.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::NotFound` if the offer does not exist
    /// - `RepositoryError::VersionConflict` if the offer changed since it was
    ///   validated
    /// - `RepositoryError::Conflict` if the property already has a winner or
    ///   the transition is no longer valid
    async fn commit_acceptance(
        &self,
        request: AcceptanceRequest,
    ) -> RepositoryResult<AcceptanceOutcome>;

    /// Finds the buyer's active offer on a property, if any.
    async fn find_active(
        &self,
        buyer_id: &UserId,
        property_id: &PropertyId,
    ) -> RepositoryResult<Option<Offer>>;

    /// Finds offers made by a buyer, newest first.
    async fn find_by_buyer(&self, buyer_id: &UserId) -> RepositoryResult<Vec<Offer>>;

    /// Finds offers received by a seller, newest first.
    async fn find_by_seller(&self, seller_id: &UserId) -> RepositoryResult<Vec<Offer>>;

    /// Finds offers on a property, newest first.
    async fn find_by_property(&self, property_id: &PropertyId) -> RepositoryResult<Vec<Offer>>;

    /// Finds active offers whose validity ended before `now`.
    async fn find_lapsed(&self, now: Timestamp) -> RepositoryResult<Vec<Offer>>;

    /// Counts all offers.
    async fn count(&self) -> RepositoryResult<u64>;
}

/// Transaction Store (read side; writes happen in
/// [`OfferRepository::commit_acceptance`]).
#[async_trait]
pub trait TransactionRepository: Send + Sync + fmt::Debug {
    /// Gets a transaction by ID.
    async fn get(&self, id: &TransactionId) -> RepositoryResult<Option<Transaction>>;

    /// Gets the transaction created from an offer.
    async fn get_by_offer(&self, offer_id: &OfferId) -> RepositoryResult<Option<Transaction>>;

    /// Finds transactions on a property.
    async fn find_by_property(
        &self,
        property_id: &PropertyId,
    ) -> RepositoryResult<Vec<Transaction>>;

    /// Counts all transactions.
    async fn count(&self) -> RepositoryResult<u64>;
}
