//! # Acceptance Settlement
//!
//! Pure domain logic for the atomic acceptance step.
//!
//! [`settle_acceptance`] takes the target offer plus every other offer on the
//! same property, as loaded inside the store's atomic unit, and produces the
//! full set of writes: the accepted offer linked to a fresh transaction,
//! every still-active competitor rejected as superseded, and every competitor
//! whose validity already lapsed moved to expired instead. Stores persist the
//! returned [`AcceptanceOutcome`] as one unit or not at all.
//!
//! # Examples
//!
//! ```
//! use offer_negotiation::domain::entities::{Acceptance, OfferBuilder};
//! use offer_negotiation::domain::services::acceptance::settle_acceptance;
//! use offer_negotiation::domain::value_objects::{Amount, PropertyId, Timestamp, UserId};
//!
//! let build = |buyer: &str, units: i64| {
//!     OfferBuilder::new(
//!         PropertyId::new("prop-1"),
//!         UserId::new(buyer),
//!         UserId::new("seller"),
//!         Amount::from_units(units).unwrap(),
//!     )
//!     .try_build()
//!     .unwrap()
//! };
//!
//! let winner = build("buyer-1", 100);
//! let loser = build("buyer-2", 90);
//!
//! let outcome = settle_acceptance(
//!     winner,
//!     vec![loser],
//!     Acceptance::Direct,
//!     None,
//!     Timestamp::now(),
//! )
//! .unwrap();
//!
//! assert_eq!(outcome.accepted.transaction_id(), Some(outcome.transaction.id()));
//! assert_eq!(outcome.superseded.len(), 1);
//! ```

use crate::domain::entities::{Acceptance, Offer, Transaction};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{OfferStatus, Timestamp};

/// Every write produced by accepting one offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceOutcome {
    /// The accepted offer, linked to `transaction`.
    pub accepted: Offer,
    /// Competing offers that were active and are now rejected.
    pub superseded: Vec<Offer>,
    /// Competing offers that had lapsed and are now expired.
    pub expired: Vec<Offer>,
    /// The transaction created for the accepted offer.
    pub transaction: Transaction,
}

/// Applies acceptance to `target` and rejects its active competitors.
///
/// `others` are the remaining offers on the same property; terminal ones are
/// ignored, except that an already accepted competitor aborts the settlement.
///
/// # Errors
///
/// - `DomainError::InvalidStateTransition` if the target cannot be accepted
///   this way, or if another offer on the property is already accepted
pub fn settle_acceptance(
    mut target: Offer,
    others: Vec<Offer>,
    acceptance: Acceptance,
    response: Option<String>,
    now: Timestamp,
) -> DomainResult<AcceptanceOutcome> {
    if others
        .iter()
        .any(|o| o.id() != target.id() && o.status() == OfferStatus::Accepted)
    {
        return Err(DomainError::InvalidStateTransition {
            from: target.status(),
            to: OfferStatus::Accepted,
        });
    }

    let final_price = target.accept(acceptance, response, now)?;
    let transaction = Transaction::initiate(&target, final_price, now);
    target.link_transaction(transaction.id())?;

    let mut superseded = Vec::new();
    let mut expired = Vec::new();
    for mut other in others {
        if other.id() == target.id()
            || other.property_id() != target.property_id()
            || !other.is_active()
        {
            continue;
        }
        if other.is_lapsed_at(&now) {
            other.expire(now)?;
            expired.push(other);
        } else {
            other.reject_superseded(now)?;
            superseded.push(other);
        }
    }

    Ok(AcceptanceOutcome {
        accepted: target,
        superseded,
        expired,
        transaction,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::domain::entities::{OfferBuilder, SUPERSEDED_RESPONSE};
    use crate::domain::value_objects::{Amount, PropertyId, UserId};

    fn offer(property: &str, buyer: &str, units: i64) -> Offer {
        OfferBuilder::new(
            PropertyId::new(property),
            UserId::new(buyer),
            UserId::new("seller"),
            Amount::from_units(units).unwrap(),
        )
        .try_build()
        .unwrap()
    }

    #[test]
    fn rejects_active_competitors_only() {
        let target = offer("p", "b1", 100);
        let mut countered = offer("p", "b2", 90);
        countered
            .counter(Amount::from_units(95).unwrap(), None, Timestamp::now())
            .unwrap();
        let mut withdrawn = offer("p", "b3", 80);
        withdrawn.withdraw(Timestamp::now()).unwrap();

        let outcome = settle_acceptance(
            target,
            vec![countered, withdrawn],
            Acceptance::Direct,
            None,
            Timestamp::now(),
        )
        .unwrap();

        assert_eq!(outcome.superseded.len(), 1);
        let rejected = &outcome.superseded[0];
        assert_eq!(rejected.status(), OfferStatus::Rejected);
        assert_eq!(rejected.seller_response(), Some(SUPERSEDED_RESPONSE));
    }

    #[test]
    fn lapsed_competitors_expire_instead_of_being_rejected() {
        let now = Timestamp::now();
        let target = offer("p", "b1", 100);
        let lapsed = OfferBuilder::new(
            PropertyId::new("p"),
            UserId::new("b2"),
            UserId::new("seller"),
            Amount::from_units(90).unwrap(),
        )
        .created_at(now.add_days(-10))
        .try_build()
        .unwrap();
        let live = offer("p", "b3", 95);

        let outcome =
            settle_acceptance(target, vec![lapsed, live], Acceptance::Direct, None, now).unwrap();

        assert_eq!(outcome.expired.len(), 1);
        assert_eq!(outcome.expired[0].status(), OfferStatus::Expired);
        assert_eq!(outcome.expired[0].seller_response(), None);
        assert_eq!(outcome.superseded.len(), 1);
        assert_eq!(outcome.superseded[0].buyer_id().as_str(), "b3");
    }

    #[test]
    fn transaction_price_matches_counter() {
        let mut target = offer("p", "b1", 100);
        target
            .counter(Amount::from_units(120).unwrap(), None, Timestamp::now())
            .unwrap();

        let outcome =
            settle_acceptance(target, vec![], Acceptance::Counter, None, Timestamp::now())
                .unwrap();

        assert_eq!(outcome.accepted.amount(), Amount::from_units(120).unwrap());
        assert_eq!(outcome.transaction.agreed_price(), outcome.accepted.amount());
        assert_eq!(outcome.accepted.transaction_id(), Some(outcome.transaction.id()));
    }

    #[test]
    fn existing_winner_aborts() {
        let target = offer("p", "b1", 100);
        let mut winner = offer("p", "b2", 110);
        winner
            .accept(Acceptance::Direct, None, Timestamp::now())
            .unwrap();

        let err =
            settle_acceptance(target, vec![winner], Acceptance::Direct, None, Timestamp::now())
                .unwrap_err();
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn terminal_target_aborts() {
        let mut target = offer("p", "b1", 100);
        target.withdraw(Timestamp::now()).unwrap();

        let result = settle_acceptance(target, vec![], Acceptance::Direct, None, Timestamp::now());
        assert!(result.is_err());
    }

    #[test]
    fn ignores_the_target_in_others() {
        let target = offer("p", "b1", 100);
        let copy = target.clone();

        let outcome =
            settle_acceptance(target, vec![copy], Acceptance::Direct, None, Timestamp::now())
                .unwrap();
        assert!(outcome.superseded.is_empty());
    }
}
