//! # Transaction Entity
//!
//! The binding record created the instant an offer is accepted.
//!
//! The engine only ever creates transactions in
//! [`TransactionStatus::Initiated`]; later states belong to downstream deal
//! management and are only read back here.

use crate::domain::entities::offer::Offer;
use crate::domain::value_objects::{
    Amount, OfferId, PropertyId, Timestamp, TransactionId, UserId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Created by offer acceptance.
    #[default]
    Initiated,
    /// Downstream closing work is under way.
    InProgress,
    /// The deal closed.
    Completed,
    /// The deal fell through.
    Cancelled,
}

impl TransactionStatus {
    /// Returns the lowercase name used in storage and on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(Self::Initiated),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("invalid transaction status: {other}")),
        }
    }
}

/// A deal created from an accepted offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    offer_id: OfferId,
    property_id: PropertyId,
    buyer_id: UserId,
    seller_id: UserId,
    agreed_price: Amount,
    status: TransactionStatus,
    created_at: Timestamp,
}

impl Transaction {
    /// Initiates a transaction for an accepted offer at `agreed_price`.
    #[must_use]
    pub fn initiate(offer: &Offer, agreed_price: Amount, now: Timestamp) -> Self {
        Self {
            id: TransactionId::new_v4(),
            offer_id: offer.id(),
            property_id: offer.property_id().clone(),
            buyer_id: offer.buyer_id().clone(),
            seller_id: offer.seller_id().clone(),
            agreed_price,
            status: TransactionStatus::Initiated,
            created_at: now,
        }
    }

    /// Rebuilds a transaction from storage.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransactionId,
        offer_id: OfferId,
        property_id: PropertyId,
        buyer_id: UserId,
        seller_id: UserId,
        agreed_price: Amount,
        status: TransactionStatus,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            offer_id,
            property_id,
            buyer_id,
            seller_id,
            agreed_price,
            status,
            created_at,
        }
    }

    /// Returns the transaction ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the accepted offer this transaction came from.
    #[inline]
    #[must_use]
    pub fn offer_id(&self) -> OfferId {
        self.offer_id
    }

    /// Returns the property.
    #[inline]
    #[must_use]
    pub fn property_id(&self) -> &PropertyId {
        &self.property_id
    }

    /// Returns the buyer.
    #[inline]
    #[must_use]
    pub fn buyer_id(&self) -> &UserId {
        &self.buyer_id
    }

    /// Returns the seller.
    #[inline]
    #[must_use]
    pub fn seller_id(&self) -> &UserId {
        &self.seller_id
    }

    /// Returns the agreed price.
    #[inline]
    #[must_use]
    pub fn agreed_price(&self) -> Amount {
        self.agreed_price
    }

    /// Returns the status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Returns when the transaction was created.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction[{}] offer={} property={} price={} status={}",
            self.id, self.offer_id, self.property_id, self.agreed_price, self.status
        )
    }
}
