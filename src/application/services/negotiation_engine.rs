//! # Negotiation Engine
//!
//! Orchestrates the offer lifecycle: authorization, state transitions,
//! atomic acceptance, lazy expiry and post-commit dispatch.
//!
//! # Operation Flow
//!
//! ```text
//! caller -> authorize -> load (expire if lapsed) -> validate on a copy
//!        -> compare-and-swap in the store (retry on version conflict)
//!        -> notifications + domain events
//! ```
//!
//! Every store call is bounded by [`EngineConfig::store_timeout_ms`].
//! Notifications and events go out only after the store has committed and
//! their failures never reach the caller.

use crate::application::error::{
    ErrorKind, InfrastructureError, NegotiationError, NegotiationResult,
};
use crate::application::ports::{
    Caller, ListingLookup, Notification, NotificationKind, PropertySummary,
};
use crate::application::services::outbound::{Outbound, OutboundDispatcher};
use crate::domain::entities::{
    Acceptance, DEFAULT_VALIDITY_DAYS, Offer, OfferBuilder, SUPERSEDED_RESPONSE, Transaction,
};
use crate::domain::errors::DomainError;
use crate::domain::events::{
    OfferAccepted, OfferCountered, OfferEvent, OfferExpired, OfferRejected, OfferSubmitted,
    OfferWithdrawn, RejectionReason, TransactionCreated,
};
use crate::domain::services::AcceptanceOutcome;
use crate::domain::value_objects::{
    Amount, OfferId, OfferStatus, PaymentTerms, PropertyId, Timestamp, UserId,
};
use crate::infrastructure::persistence::{
    AcceptanceRequest, OfferRepository, RepositoryError, RepositoryResult, TransactionRepository,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Configuration for the negotiation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Validity window for offers submitted without an explicit expiry.
    pub default_validity_days: i64,
    /// Deadline for each store or listing call in milliseconds.
    pub store_timeout_ms: u64,
    /// Deadline for each notification or event in milliseconds.
    pub notify_timeout_ms: u64,
    /// Attempts at a compare-and-swap before giving up.
    pub max_commit_attempts: u32,
    /// Period of the background expiry sweep; `None` disables it.
    pub expiry_sweep_interval_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_validity_days: DEFAULT_VALIDITY_DAYS,
            store_timeout_ms: 5000,
            notify_timeout_ms: 2000,
            max_commit_attempts: 3,
            expiry_sweep_interval_secs: None,
        }
    }
}

impl EngineConfig {
    /// Sets the store timeout.
    #[must_use]
    pub fn with_store_timeout(mut self, timeout_ms: u64) -> Self {
        self.store_timeout_ms = timeout_ms;
        self
    }

    /// Sets the notification timeout.
    #[must_use]
    pub fn with_notify_timeout(mut self, timeout_ms: u64) -> Self {
        self.notify_timeout_ms = timeout_ms;
        self
    }

    /// Sets the default validity window.
    #[must_use]
    pub fn with_default_validity_days(mut self, days: i64) -> Self {
        self.default_validity_days = days;
        self
    }

    /// Sets the compare-and-swap attempt bound.
    #[must_use]
    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts;
        self
    }

    /// Returns the store timeout as a duration.
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Returns the notification timeout as a duration.
    #[must_use]
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }
}

/// Input to [`NegotiationEngine::submit_offer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOffer {
    /// The property to bid on.
    pub property_id: PropertyId,
    /// Offered amount; must be strictly positive.
    pub amount: Decimal,
    /// How the buyer intends to pay.
    #[serde(default)]
    pub payment_terms: PaymentTerms,
    /// Optional note to the seller.
    #[serde(default)]
    pub message: Option<String>,
    /// Optional expiry; must lie in the future.
    #[serde(default)]
    pub valid_until: Option<Timestamp>,
}

impl SubmitOffer {
    /// Creates a cash offer request.
    #[must_use]
    pub fn new(property_id: impl Into<PropertyId>, amount: Decimal) -> Self {
        Self {
            property_id: property_id.into(),
            amount,
            payment_terms: PaymentTerms::Cash,
            message: None,
            valid_until: None,
        }
    }

    /// Sets the payment terms.
    #[must_use]
    pub fn with_terms(mut self, terms: PaymentTerms) -> Self {
        self.payment_terms = terms;
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the expiry.
    #[must_use]
    pub fn with_valid_until(mut self, valid_until: Timestamp) -> Self {
        self.valid_until = Some(valid_until);
        self
    }
}

/// Which side of its offers an actor wants to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    /// Offers the actor made.
    Buyer,
    /// Offers the actor received.
    Seller,
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Seller => write!(f, "seller"),
        }
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Result of a successful acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedOffer {
    /// The accepted offer, linked to `transaction`.
    pub offer: Offer,
    /// The transaction created by the acceptance.
    pub transaction: Transaction,
    /// Competing offers rejected in the same step.
    pub superseded: Vec<OfferId>,
}

/// The offer negotiation engine.
///
/// Cheap to share behind an `Arc`; holds no business state of its own.
#[derive(Debug)]
pub struct NegotiationEngine {
    offers: Arc<dyn OfferRepository>,
    transactions: Arc<dyn TransactionRepository>,
    listings: Arc<dyn ListingLookup>,
    outbound: OutboundDispatcher,
    config: EngineConfig,
}

impl NegotiationEngine {
    /// Creates a new engine.
    #[must_use]
    pub fn new(
        offers: Arc<dyn OfferRepository>,
        transactions: Arc<dyn TransactionRepository>,
        listings: Arc<dyn ListingLookup>,
        outbound: OutboundDispatcher,
        config: EngineConfig,
    ) -> Self {
        Self {
            offers,
            transactions,
            listings,
            outbound,
            config,
        }
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========== Commands ==========

    /// Submits a new offer on behalf of the calling buyer.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` for anonymous callers
    /// - `NotFound` if the property does not exist
    /// - `PropertyUnavailable` if the listing is not open for offers
    /// - `SelfDealing` if the caller owns the property
    /// - `InvalidAmount` / `InvalidTerms` for malformed input
    /// - `PropertyUnavailable` if an offer on the property was already
    ///   accepted
    /// - `DuplicateActiveOffer` if the caller already has an active offer on
    ///   the property
    /// - `Timeout` / `Unavailable` on infrastructure failure
    pub async fn submit_offer(
        &self,
        caller: &Caller,
        request: SubmitOffer,
    ) -> NegotiationResult<Offer> {
        const OP: &str = "submit_offer";
        let buyer = caller.require_user()?.clone();

        let property = self.lookup_property(OP, &request.property_id).await?;
        if !property.is_available {
            return Err(NegotiationError::property_unavailable(&request.property_id));
        }
        if property.owner_id == buyer {
            return Err(DomainError::SelfDealing.into());
        }
        let amount = Amount::new(request.amount)?;

        let now = Timestamp::now();
        let mut builder = OfferBuilder::new(
            request.property_id.clone(),
            buyer.clone(),
            property.owner_id,
            amount,
        )
        .payment_terms(request.payment_terms)
        .validity_days(self.config.default_validity_days)
        .valid_until(request.valid_until)
        .created_at(now);
        if let Some(message) = request.message {
            builder = builder.message(message);
        }
        let offer = builder.try_build()?;

        match self.store_raw(OP, self.offers.insert(&offer)).await? {
            Ok(()) => {}
            Err(e) if e.is_duplicate() => {
                // A lapsed offer still counts as active until something resolves it.
                let existing = self
                    .store(OP, self.offers.find_active(&buyer, &request.property_id))
                    .await?;
                match existing {
                    Some(existing) if existing.is_lapsed_at(&now) => {
                        self.expire_lapsed(OP, existing, now).await?;
                        self.store_raw(OP, self.offers.insert(&offer))
                            .await?
                            .map_err(|e| self.insert_failure(e, &offer))?;
                    }
                    _ => return Err(self.insert_failure(e, &offer)),
                }
            }
            Err(e) => return Err(self.insert_failure(e, &offer)),
        }

        tracing::info!(
            offer_id = %offer.id(),
            property_id = %offer.property_id(),
            buyer_id = %offer.buyer_id(),
            amount = %offer.amount(),
            "offer submitted"
        );

        let notification = Notification::new(
            offer.seller_id().clone(),
            NotificationKind::OfferReceived,
            offer.id(),
            offer.property_id().clone(),
        )
        .with_amount(offer.amount())
        .with_message(offer.message().map(str::to_string));
        self.outbound
            .dispatch(
                Outbound::new()
                    .event(OfferEvent::Submitted(OfferSubmitted::new(&offer)))
                    .notify(notification),
            )
            .await;

        Ok(offer)
    }

    /// Accepts an offer as its seller, at the buyer's amount.
    ///
    /// Rejects every other active offer on the property and creates the
    /// transaction in the same atomic unit.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated`, `NotAuthorized` (caller is not the seller)
    /// - `NotFound` if the offer does not exist
    /// - `InvalidStateTransition` if the offer is terminal or another offer
    ///   on the property won first
    /// - `Timeout` / `Unavailable` on infrastructure failure
    pub async fn accept_offer(
        &self,
        caller: &Caller,
        offer_id: OfferId,
        response: Option<String>,
    ) -> NegotiationResult<AcceptedOffer> {
        self.accept_with(caller, offer_id, Acceptance::Direct, response)
            .await
    }

    /// Accepts the seller's counter as the buyer, at the counter amount.
    ///
    /// # Errors
    ///
    /// As [`accept_offer`](Self::accept_offer), with `NotAuthorized` when
    /// the caller is not the buyer and `InvalidStateTransition` unless the
    /// offer is countered.
    pub async fn accept_counter_offer(
        &self,
        caller: &Caller,
        offer_id: OfferId,
    ) -> NegotiationResult<AcceptedOffer> {
        self.accept_with(caller, offer_id, Acceptance::Counter, None)
            .await
    }

    /// Rejects an offer as its seller.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated`, `NotAuthorized`, `NotFound`
    /// - `InvalidStateTransition` if the offer is terminal
    /// - `Timeout` / `Unavailable` on infrastructure failure
    pub async fn reject_offer(
        &self,
        caller: &Caller,
        offer_id: OfferId,
        response: Option<String>,
    ) -> NegotiationResult<Offer> {
        const OP: &str = "reject_offer";
        let seller = caller.require_user()?;

        let offer = self
            .transition(
                OP,
                offer_id,
                |offer| require_seller(offer, seller, "only the seller can reject this offer"),
                |offer, now| Ok(offer.reject(response.clone(), now)?),
            )
            .await?;

        tracing::info!(
            offer_id = %offer.id(),
            property_id = %offer.property_id(),
            "offer rejected"
        );

        let notification = Notification::new(
            offer.buyer_id().clone(),
            NotificationKind::OfferRejected,
            offer.id(),
            offer.property_id().clone(),
        )
        .with_message(response);
        let event = OfferRejected::new(&offer, RejectionReason::SellerDecision, offer.updated_at());
        self.outbound
            .dispatch(
                Outbound::new()
                    .event(OfferEvent::Rejected(event))
                    .notify(notification),
            )
            .await;

        Ok(offer)
    }

    /// Records the seller's single counter-proposal.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated`, `NotAuthorized`, `NotFound`
    /// - `InvalidAmount` if `counter_amount` is not strictly positive
    /// - `InvalidStateTransition` unless the offer is pending
    /// - `Timeout` / `Unavailable` on infrastructure failure
    pub async fn counter_offer(
        &self,
        caller: &Caller,
        offer_id: OfferId,
        counter_amount: Decimal,
        message: Option<String>,
    ) -> NegotiationResult<Offer> {
        const OP: &str = "counter_offer";
        let seller = caller.require_user()?;

        let offer = self
            .transition(
                OP,
                offer_id,
                |offer| require_seller(offer, seller, "only the seller can counter this offer"),
                |offer, now| {
                    let amount = Amount::new(counter_amount)?;
                    Ok(offer.counter(amount, message.clone(), now)?)
                },
            )
            .await?;

        let counter = offer.counter_amount().unwrap_or(offer.amount());
        tracing::info!(
            offer_id = %offer.id(),
            property_id = %offer.property_id(),
            counter_amount = %counter,
            "offer countered"
        );

        let notification = Notification::new(
            offer.buyer_id().clone(),
            NotificationKind::OfferCountered,
            offer.id(),
            offer.property_id().clone(),
        )
        .with_amount(counter)
        .with_message(offer.counter_message().map(str::to_string));
        let event = OfferCountered::new(&offer, counter, offer.updated_at());
        self.outbound
            .dispatch(
                Outbound::new()
                    .event(OfferEvent::Countered(event))
                    .notify(notification),
            )
            .await;

        Ok(offer)
    }

    /// Withdraws an offer as its buyer.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated`, `NotAuthorized`, `NotFound`
    /// - `InvalidStateTransition` if the offer is terminal
    /// - `Timeout` / `Unavailable` on infrastructure failure
    pub async fn withdraw_offer(
        &self,
        caller: &Caller,
        offer_id: OfferId,
    ) -> NegotiationResult<Offer> {
        const OP: &str = "withdraw_offer";
        let buyer = caller.require_user()?;

        let offer = self
            .transition(
                OP,
                offer_id,
                |offer| require_buyer(offer, buyer, "only the buyer can withdraw this offer"),
                |offer, now| Ok(offer.withdraw(now)?),
            )
            .await?;

        tracing::info!(
            offer_id = %offer.id(),
            property_id = %offer.property_id(),
            "offer withdrawn"
        );

        let notification = Notification::new(
            offer.seller_id().clone(),
            NotificationKind::OfferWithdrawn,
            offer.id(),
            offer.property_id().clone(),
        );
        let event = OfferWithdrawn::new(&offer, offer.updated_at());
        self.outbound
            .dispatch(
                Outbound::new()
                    .event(OfferEvent::Withdrawn(event))
                    .notify(notification),
            )
            .await;

        Ok(offer)
    }

    /// Expires every active offer whose validity has passed.
    ///
    /// Returns the number of offers this call moved to `expired`.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` / `Unavailable` if the lapsed offers cannot be
    /// listed. Failures on individual offers are logged and skipped.
    pub async fn expire_stale_offers(&self) -> NegotiationResult<usize> {
        const OP: &str = "expire_stale_offers";
        let now = Timestamp::now();
        let lapsed = self.store(OP, self.offers.find_lapsed(now)).await?;

        let mut expired = 0;
        for offer in lapsed {
            let offer_id = offer.id();
            match self.expire_lapsed(OP, offer, now).await {
                Ok(offer) if offer.status() == OfferStatus::Expired => expired += 1,
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, offer_id = %offer_id, "offer expiry failed"),
            }
        }

        if expired > 0 {
            tracing::info!(expired, "expiry sweep completed");
        }
        Ok(expired)
    }

    // ========== Queries ==========

    /// Lists the caller's offers as buyer or seller, newest first.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated`, `Timeout`, `Unavailable`.
    pub async fn list_offers_for_actor(
        &self,
        caller: &Caller,
        role: ActorRole,
    ) -> NegotiationResult<Vec<Offer>> {
        const OP: &str = "list_offers_for_actor";
        let user = caller.require_user()?;

        let offers = match role {
            ActorRole::Buyer => self.store(OP, self.offers.find_by_buyer(user)).await?,
            ActorRole::Seller => self.store(OP, self.offers.find_by_seller(user)).await?,
        };
        self.resolve_lapsed(OP, offers).await
    }

    /// Lists every offer on a property the caller owns, newest first.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated`
    /// - `NotFound` if the property does not exist
    /// - `NotAuthorized` if the caller does not own it
    /// - `Timeout` / `Unavailable`
    pub async fn list_offers_for_property(
        &self,
        caller: &Caller,
        property_id: &PropertyId,
    ) -> NegotiationResult<Vec<Offer>> {
        const OP: &str = "list_offers_for_property";
        let user = caller.require_user()?;

        let property = self.lookup_property(OP, property_id).await?;
        if &property.owner_id != user {
            return Err(NegotiationError::not_authorized(
                "only the owner can list offers on this property",
            ));
        }

        let offers = self
            .store(OP, self.offers.find_by_property(property_id))
            .await?;
        self.resolve_lapsed(OP, offers).await
    }

    /// Returns one offer to its buyer or seller.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated`, `NotFound`, `NotAuthorized`, `Timeout`,
    /// `Unavailable`.
    pub async fn get_offer(&self, caller: &Caller, offer_id: OfferId) -> NegotiationResult<Offer> {
        const OP: &str = "get_offer";
        let user = caller.require_user()?;

        self.load_offer(OP, offer_id, Timestamp::now(), |offer| require_party(offer, user))
            .await
    }

    /// Returns true if the caller holds an active offer on the property.
    ///
    /// A lapsed offer is expired on the way and does not count. The answer
    /// is advisory; [`submit_offer`](Self::submit_offer) re-checks
    /// atomically.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated`, `Timeout`, `Unavailable`.
    pub async fn has_active_offer(
        &self,
        caller: &Caller,
        property_id: &PropertyId,
    ) -> NegotiationResult<bool> {
        const OP: &str = "has_active_offer";
        let buyer = caller.require_user()?;
        let now = Timestamp::now();

        match self
            .store(OP, self.offers.find_active(buyer, property_id))
            .await?
        {
            Some(offer) if offer.is_lapsed_at(&now) => {
                Ok(self.expire_lapsed(OP, offer, now).await?.is_active())
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    /// Returns the transaction created from an accepted offer.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated`, `NotAuthorized`, `NotFound` (offer missing or
    /// not accepted), `Timeout`, `Unavailable`.
    pub async fn get_transaction_for_offer(
        &self,
        caller: &Caller,
        offer_id: OfferId,
    ) -> NegotiationResult<Transaction> {
        const OP: &str = "get_transaction_for_offer";
        let user = caller.require_user()?;

        self.load_offer(OP, offer_id, Timestamp::now(), |offer| require_party(offer, user))
            .await?;

        self.store(OP, self.transactions.get_by_offer(&offer_id))
            .await?
            .ok_or_else(|| NegotiationError::not_found("Transaction", offer_id.to_string()))
    }

    // ========== Internals ==========

    async fn accept_with(
        &self,
        caller: &Caller,
        offer_id: OfferId,
        acceptance: Acceptance,
        response: Option<String>,
    ) -> NegotiationResult<AcceptedOffer> {
        let op = match acceptance {
            Acceptance::Direct => "accept_offer",
            Acceptance::Counter => "accept_counter_offer",
        };
        let user = caller.require_user()?;
        let attempts = self.config.max_commit_attempts.max(1);

        let authorize = |offer: &Offer| match acceptance {
            Acceptance::Direct => {
                require_seller(offer, user, "only the seller can accept this offer")
            }
            Acceptance::Counter => {
                require_buyer(offer, user, "only the buyer can accept a counter-offer")
            }
        };

        for attempt in 1..=attempts {
            let now = Timestamp::now();
            let current = self.load_offer(op, offer_id, now, &authorize).await?;

            let mut candidate = current.clone();
            candidate.accept(acceptance, response.clone(), now)?;

            let request = AcceptanceRequest {
                offer_id,
                expected_version: current.version(),
                acceptance,
                response: response.clone(),
                now,
            };
            match self
                .store_raw(op, self.offers.commit_acceptance(request))
                .await?
            {
                Ok(outcome) => return Ok(self.finish_acceptance(outcome, acceptance, now).await),
                Err(e) if e.is_version_conflict() && attempt < attempts => {
                    tracing::debug!(offer_id = %offer_id, attempt, "acceptance raced, retrying");
                }
                Err(e) => return Err(self.store_failure(op, e)),
            }
        }

        Err(NegotiationError::conflict(format!(
            "offer {offer_id} kept changing during acceptance"
        )))
    }

    async fn finish_acceptance(
        &self,
        outcome: AcceptanceOutcome,
        acceptance: Acceptance,
        now: Timestamp,
    ) -> AcceptedOffer {
        let AcceptanceOutcome {
            accepted,
            superseded,
            expired,
            transaction,
        } = outcome;
        let superseded_ids: Vec<OfferId> = superseded.iter().map(Offer::id).collect();

        tracing::info!(
            offer_id = %accepted.id(),
            property_id = %accepted.property_id(),
            transaction_id = %transaction.id(),
            agreed_price = %transaction.agreed_price(),
            superseded = superseded_ids.len(),
            "offer accepted"
        );

        let counterparty = match acceptance {
            Acceptance::Direct => accepted.buyer_id().clone(),
            Acceptance::Counter => accepted.seller_id().clone(),
        };
        let mut outbound = Outbound::new()
            .event(OfferEvent::Accepted(OfferAccepted::new(
                &accepted,
                transaction.id(),
                superseded_ids.clone(),
                now,
            )))
            .event(OfferEvent::TransactionCreated(TransactionCreated::new(
                &transaction,
            )))
            .notify(
                Notification::new(
                    counterparty,
                    NotificationKind::OfferAccepted,
                    accepted.id(),
                    accepted.property_id().clone(),
                )
                .with_amount(transaction.agreed_price())
                .with_transaction(transaction.id())
                .with_message(accepted.seller_response().map(str::to_string)),
            );
        for loser in &superseded {
            outbound = outbound
                .event(OfferEvent::Rejected(OfferRejected::new(
                    loser,
                    RejectionReason::Superseded,
                    now,
                )))
                .notify(
                    Notification::new(
                        loser.buyer_id().clone(),
                        NotificationKind::OfferRejected,
                        loser.id(),
                        loser.property_id().clone(),
                    )
                    .with_message(Some(SUPERSEDED_RESPONSE.to_string())),
                );
        }
        for lapsed in &expired {
            outbound = outbound.event(OfferEvent::Expired(OfferExpired::new(lapsed, now)));
        }
        self.outbound.dispatch(outbound).await;

        AcceptedOffer {
            offer: accepted,
            transaction,
            superseded: superseded_ids,
        }
    }

    /// Applies a single-offer transition with compare-and-swap and bounded
    /// retry on version conflicts.
    async fn transition<A, F>(
        &self,
        operation: &'static str,
        offer_id: OfferId,
        authorize: A,
        mut apply: F,
    ) -> NegotiationResult<Offer>
    where
        A: Fn(&Offer) -> NegotiationResult<()> + Send + Sync,
        F: FnMut(&mut Offer, Timestamp) -> NegotiationResult<()> + Send,
    {
        let attempts = self.config.max_commit_attempts.max(1);

        for attempt in 1..=attempts {
            let now = Timestamp::now();
            let current = self.load_offer(operation, offer_id, now, &authorize).await?;

            let mut next = current.clone();
            apply(&mut next, now)?;

            match self
                .store_raw(operation, self.offers.update(&next, current.version()))
                .await?
            {
                Ok(()) => return Ok(next),
                Err(e) if e.is_version_conflict() && attempt < attempts => {
                    tracing::debug!(
                        operation,
                        offer_id = %offer_id,
                        attempt,
                        "version conflict, retrying"
                    );
                }
                Err(e) => return Err(self.store_failure(operation, e)),
            }
        }

        Err(NegotiationError::conflict(format!(
            "offer {offer_id} kept changing"
        )))
    }

    /// Loads an offer and authorizes the caller against it, then expires it
    /// if its validity has lapsed. Unauthorized callers never trigger the
    /// expiry write.
    async fn load_offer<A>(
        &self,
        operation: &'static str,
        offer_id: OfferId,
        now: Timestamp,
        authorize: A,
    ) -> NegotiationResult<Offer>
    where
        A: Fn(&Offer) -> NegotiationResult<()>,
    {
        let offer = self
            .store(operation, self.offers.get(&offer_id))
            .await?
            .ok_or_else(|| NegotiationError::not_found("Offer", offer_id.to_string()))?;
        authorize(&offer)?;

        if offer.is_lapsed_at(&now) {
            return self.expire_lapsed(operation, offer, now).await;
        }
        Ok(offer)
    }

    async fn resolve_lapsed(
        &self,
        operation: &'static str,
        offers: Vec<Offer>,
    ) -> NegotiationResult<Vec<Offer>> {
        let now = Timestamp::now();
        let mut resolved = Vec::with_capacity(offers.len());
        for offer in offers {
            if offer.is_lapsed_at(&now) {
                resolved.push(self.expire_lapsed(operation, offer, now).await?);
            } else {
                resolved.push(offer);
            }
        }
        Ok(resolved)
    }

    /// Moves a lapsed offer to `expired`. If another writer got there
    /// first, returns whatever is now stored.
    async fn expire_lapsed(
        &self,
        operation: &'static str,
        offer: Offer,
        now: Timestamp,
    ) -> NegotiationResult<Offer> {
        let mut expired = offer.clone();
        expired.expire(now)?;

        match self
            .store_raw(operation, self.offers.update(&expired, offer.version()))
            .await?
        {
            Ok(()) => {
                tracing::info!(
                    offer_id = %expired.id(),
                    property_id = %expired.property_id(),
                    valid_until = %expired.valid_until(),
                    "offer expired"
                );
                let event = OfferEvent::Expired(OfferExpired::new(&expired, now));
                self.outbound.dispatch(Outbound::new().event(event)).await;
                Ok(expired)
            }
            Err(e) if e.is_version_conflict() => self
                .store(operation, self.offers.get(&offer.id()))
                .await?
                .ok_or_else(|| NegotiationError::not_found("Offer", offer.id().to_string())),
            Err(e) => Err(self.store_failure(operation, e)),
        }
    }

    async fn lookup_property(
        &self,
        operation: &'static str,
        property_id: &PropertyId,
    ) -> NegotiationResult<PropertySummary> {
        match timeout(
            self.config.store_timeout(),
            self.listings.get_property(property_id),
        )
        .await
        {
            Ok(Ok(Some(summary))) => Ok(summary),
            Ok(Ok(None)) => Err(NegotiationError::not_found(
                "Property",
                property_id.to_string(),
            )),
            Ok(Err(e)) => {
                tracing::error!(
                    operation,
                    error = %e,
                    property_id = %property_id,
                    "listing lookup failed"
                );
                Err(InfrastructureError::external_service("listings", e.to_string()).into())
            }
            Err(_) => {
                tracing::error!(operation, property_id = %property_id, "listing lookup timed out");
                Err(NegotiationError::Timeout(operation))
            }
        }
    }

    /// Runs a store call under the store timeout. Only a timeout is mapped;
    /// the store's own result is handed back for the caller to inspect.
    async fn store_raw<T, F>(
        &self,
        operation: &'static str,
        call: F,
    ) -> NegotiationResult<RepositoryResult<T>>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        timeout(self.config.store_timeout(), call).await.map_err(|_| {
            tracing::error!(operation, "store call timed out");
            NegotiationError::Timeout(operation)
        })
    }

    async fn store<T, F>(&self, operation: &'static str, call: F) -> NegotiationResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        self.store_raw(operation, call)
            .await?
            .map_err(|e| self.store_failure(operation, e))
    }

    fn insert_failure(&self, error: RepositoryError, offer: &Offer) -> NegotiationError {
        if error.is_settled() {
            tracing::debug!(
                property_id = %offer.property_id(),
                buyer_id = %offer.buyer_id(),
                "offer refused, property already has an accepted offer"
            );
            return NegotiationError::property_unavailable(offer.property_id());
        }
        if error.is_duplicate() {
            return NegotiationError::duplicate_active_offer(format!(
                "{}/{}",
                offer.buyer_id(),
                offer.property_id()
            ));
        }
        self.store_failure("submit_offer", error)
    }

    fn store_failure(&self, operation: &'static str, error: RepositoryError) -> NegotiationError {
        let error = NegotiationError::from(error);
        if error.kind() == ErrorKind::Unavailable {
            tracing::error!(operation, error = %error, "store call failed");
        }
        error
    }
}

fn require_seller(offer: &Offer, user: &UserId, reason: &str) -> NegotiationResult<()> {
    if offer.is_seller(user) {
        Ok(())
    } else {
        Err(NegotiationError::not_authorized(reason))
    }
}

fn require_buyer(offer: &Offer, user: &UserId, reason: &str) -> NegotiationResult<()> {
    if offer.is_buyer(user) {
        Ok(())
    } else {
        Err(NegotiationError::not_authorized(reason))
    }
}

fn require_party(offer: &Offer, user: &UserId) -> NegotiationResult<()> {
    if offer.is_party(user) {
        Ok(())
    } else {
        Err(NegotiationError::not_authorized(
            "only the buyer or the seller can view this offer",
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::application::ports::{PropertySummary, PublishError};
    use crate::application::ports::EventPublisher;
    use crate::domain::entities::OfferParts;
    use crate::infrastructure::events::RecordingEventPublisher;
    use crate::infrastructure::listings::InMemoryListingLookup;
    use crate::infrastructure::notifications::RecordingNotifier;
    use crate::infrastructure::persistence::in_memory::InMemoryNegotiationStore;
    use async_trait::async_trait;

    struct Harness {
        engine: NegotiationEngine,
        store: InMemoryNegotiationStore,
        listings: InMemoryListingLookup,
        notifier: RecordingNotifier,
        events: RecordingEventPublisher,
    }

    fn harness_with(config: EngineConfig) -> Harness {
        let store = InMemoryNegotiationStore::new();
        let listings = InMemoryListingLookup::new();
        listings.upsert(PropertySummary::available("prop-1", "seller"));
        listings.upsert(PropertySummary::available("prop-2", "seller").unavailable());
        let notifier = RecordingNotifier::new();
        let events = RecordingEventPublisher::new();
        let outbound = OutboundDispatcher::new(
            Arc::new(notifier.clone()),
            Arc::new(events.clone()),
            config.notify_timeout(),
        );
        let engine = NegotiationEngine::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(listings.clone()),
            outbound,
            config,
        );
        Harness {
            engine,
            store,
            listings,
            notifier,
            events,
        }
    }

    fn harness() -> Harness {
        harness_with(EngineConfig::default())
    }

    fn buyer(name: &str) -> Caller {
        Caller::user(name)
    }

    fn seller() -> Caller {
        Caller::user("seller")
    }

    fn bid(units: i64) -> SubmitOffer {
        SubmitOffer::new("prop-1", Decimal::from(units))
    }

    async fn lapsed_offer(store: &InMemoryNegotiationStore, buyer: &str) -> Offer {
        let created = Timestamp::now().add_days(-10);
        let offer = Offer::from_parts(OfferParts {
            id: OfferId::new_v4(),
            property_id: PropertyId::new("prop-1"),
            buyer_id: UserId::new(buyer),
            seller_id: UserId::new("seller"),
            amount: Amount::from_units(100).unwrap(),
            payment_terms: PaymentTerms::Cash,
            message: None,
            status: OfferStatus::Pending,
            counter_amount: None,
            counter_message: None,
            seller_response: None,
            valid_until: created.add_days(7),
            transaction_id: None,
            created_at: created,
            updated_at: created,
            responded_at: None,
            accepted_at: None,
            version: 1,
        });
        store.insert(&offer).await.unwrap();
        offer
    }

    mod submit {
        use super::*;

        #[tokio::test]
        async fn creates_pending_offer_and_notifies_seller() {
            let h = harness();
            let offer = h
                .engine
                .submit_offer(&buyer("b1"), bid(100).with_message("hi"))
                .await
                .unwrap();

            assert_eq!(offer.status(), OfferStatus::Pending);
            assert_eq!(offer.seller_id().as_str(), "seller");
            assert_eq!(
                offer.valid_until(),
                offer.created_at().add_days(DEFAULT_VALIDITY_DAYS)
            );

            let sent = h.notifier.notifications();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].recipient.as_str(), "seller");
            assert_eq!(sent[0].kind, NotificationKind::OfferReceived);
            assert_eq!(h.events.event_names(), vec!["OfferSubmitted"]);
        }

        #[tokio::test]
        async fn anonymous_caller_is_rejected() {
            let h = harness();
            let err = h
                .engine
                .submit_offer(&Caller::Anonymous, bid(100))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
        }

        #[tokio::test]
        async fn unknown_and_unavailable_properties() {
            let h = harness();
            let err = h
                .engine
                .submit_offer(&buyer("b1"), SubmitOffer::new("nope", Decimal::from(1)))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);

            let err = h
                .engine
                .submit_offer(&buyer("b1"), SubmitOffer::new("prop-2", Decimal::from(1)))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PropertyUnavailable);
        }

        #[tokio::test]
        async fn owner_cannot_bid() {
            let h = harness();
            let err = h.engine.submit_offer(&seller(), bid(100)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SelfDealing);
            assert!(h.store.is_empty().await);
        }

        #[tokio::test]
        async fn non_positive_amount() {
            let h = harness();
            for amount in [Decimal::ZERO, Decimal::from(-5)] {
                let err = h
                    .engine
                    .submit_offer(&buyer("b1"), SubmitOffer::new("prop-1", amount))
                    .await
                    .unwrap_err();
                assert_eq!(err.kind(), ErrorKind::InvalidAmount);
            }
        }

        #[tokio::test]
        async fn sub_cent_and_oversized_amounts_are_invalid() {
            let h = harness();
            for amount in [
                Decimal::new(1, 3),
                Decimal::new(100_005, 3),
                Decimal::from(1_000_000_000_000_000_000_i64),
            ] {
                let err = h
                    .engine
                    .submit_offer(&buyer("b1"), SubmitOffer::new("prop-1", amount))
                    .await
                    .unwrap_err();
                assert_eq!(err.kind(), ErrorKind::InvalidAmount);
            }
            assert!(h.store.is_empty().await);
        }

        #[tokio::test]
        async fn past_expiry_is_invalid_terms() {
            let h = harness();
            let err = h
                .engine
                .submit_offer(
                    &buyer("b1"),
                    bid(100).with_valid_until(Timestamp::now().add_secs(-60)),
                )
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTerms);
        }

        #[tokio::test]
        async fn duplicate_active_offer() {
            let h = harness();
            h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            let err = h
                .engine
                .submit_offer(&buyer("b1"), bid(110))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DuplicateActiveOffer);
            assert_eq!(h.store.len().await, 1);
        }

        #[tokio::test]
        async fn settled_property_takes_no_new_offers() {
            let h = harness();
            let first = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            h.engine.accept_offer(&seller(), first.id(), None).await.unwrap();

            let err = h
                .engine
                .submit_offer(&buyer("b3"), bid(150))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PropertyUnavailable);
            assert_eq!(h.store.len().await, 1);
            assert!(
                !h.engine
                    .has_active_offer(&buyer("b3"), &PropertyId::new("prop-1"))
                    .await
                    .unwrap()
            );
        }

        #[tokio::test]
        async fn lapsed_offer_does_not_block_resubmission() {
            let h = harness();
            let old = lapsed_offer(&h.store, "b1").await;

            let fresh = h.engine.submit_offer(&buyer("b1"), bid(120)).await.unwrap();
            assert_ne!(fresh.id(), old.id());

            let old = h.engine.get_offer(&buyer("b1"), old.id()).await.unwrap();
            assert_eq!(old.status(), OfferStatus::Expired);
        }
    }

    mod transitions {
        use super::*;

        #[tokio::test]
        async fn counter_then_second_counter_fails() {
            let h = harness();
            let offer = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();

            let countered = h
                .engine
                .counter_offer(&seller(), offer.id(), Decimal::from(120), Some("meet me".into()))
                .await
                .unwrap();
            assert_eq!(countered.status(), OfferStatus::Countered);
            assert_eq!(countered.counter_amount(), Some(Amount::from_units(120).unwrap()));

            let err = h
                .engine
                .counter_offer(&seller(), offer.id(), Decimal::from(130), None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);

            let stored = h.engine.get_offer(&seller(), offer.id()).await.unwrap();
            assert_eq!(stored.counter_amount(), Some(Amount::from_units(120).unwrap()));
        }

        #[tokio::test]
        async fn counter_requires_positive_amount() {
            let h = harness();
            let offer = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            let err = h
                .engine
                .counter_offer(&seller(), offer.id(), Decimal::ZERO, None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        }

        #[tokio::test]
        async fn only_the_seller_may_respond() {
            let h = harness();
            let offer = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();

            let err = h
                .engine
                .reject_offer(&buyer("b1"), offer.id(), None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotAuthorized);

            let err = h
                .engine
                .accept_offer(&buyer("b2"), offer.id(), None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotAuthorized);
        }

        #[tokio::test]
        async fn only_the_buyer_may_withdraw() {
            let h = harness();
            let offer = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            let err = h
                .engine
                .withdraw_offer(&seller(), offer.id())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotAuthorized);

            let withdrawn = h.engine.withdraw_offer(&buyer("b1"), offer.id()).await.unwrap();
            assert_eq!(withdrawn.status(), OfferStatus::Withdrawn);
            let last = h.notifier.notifications().pop().unwrap();
            assert_eq!(last.kind, NotificationKind::OfferWithdrawn);
            assert_eq!(last.recipient.as_str(), "seller");
        }

        #[tokio::test]
        async fn reject_records_response() {
            let h = harness();
            let offer = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            let rejected = h
                .engine
                .reject_offer(&seller(), offer.id(), Some("too low".into()))
                .await
                .unwrap();
            assert_eq!(rejected.status(), OfferStatus::Rejected);
            assert_eq!(rejected.seller_response(), Some("too low"));
            assert!(rejected.responded_at().is_some());
        }

        #[tokio::test]
        async fn terminal_offer_is_not_mutated() {
            let h = harness();
            let offer = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            let withdrawn = h.engine.withdraw_offer(&buyer("b1"), offer.id()).await.unwrap();

            let err = h
                .engine
                .reject_offer(&seller(), offer.id(), None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);

            let stored = h.engine.get_offer(&seller(), offer.id()).await.unwrap();
            assert_eq!(stored, withdrawn);
        }

        #[tokio::test]
        async fn missing_offer_is_not_found() {
            let h = harness();
            let err = h
                .engine
                .withdraw_offer(&buyer("b1"), OfferId::new_v4())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }

        #[tokio::test]
        async fn lapsed_offer_expires_before_transition() {
            let h = harness();
            let offer = lapsed_offer(&h.store, "b1").await;

            let err = h
                .engine
                .accept_offer(&seller(), offer.id(), None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
            assert!(h.events.event_names().contains(&"OfferExpired"));
        }
    }

    mod acceptance {
        use super::*;

        #[tokio::test]
        async fn seller_accept_supersedes_competitors() {
            let h = harness();
            let first = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            let second = h.engine.submit_offer(&buyer("b2"), bid(90)).await.unwrap();

            let accepted = h
                .engine
                .accept_offer(&seller(), first.id(), Some("deal".into()))
                .await
                .unwrap();
            assert_eq!(accepted.offer.status(), OfferStatus::Accepted);
            assert_eq!(accepted.offer.transaction_id(), Some(accepted.transaction.id()));
            assert_eq!(accepted.transaction.agreed_price(), Amount::from_units(100).unwrap());
            assert_eq!(accepted.superseded, vec![second.id()]);

            let loser = h.engine.get_offer(&buyer("b2"), second.id()).await.unwrap();
            assert_eq!(loser.status(), OfferStatus::Rejected);
            assert_eq!(loser.seller_response(), Some(SUPERSEDED_RESPONSE));

            let kinds: Vec<_> = h
                .notifier
                .notifications_for(&UserId::new("b2"))
                .into_iter()
                .map(|n| n.kind)
                .collect();
            assert_eq!(kinds, vec![NotificationKind::OfferRejected]);
        }

        #[tokio::test]
        async fn buyer_accepts_counter_at_counter_price() {
            let h = harness();
            let offer = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            h.engine
                .counter_offer(&seller(), offer.id(), Decimal::from(120), None)
                .await
                .unwrap();

            let accepted = h
                .engine
                .accept_counter_offer(&buyer("b1"), offer.id())
                .await
                .unwrap();
            assert_eq!(accepted.offer.amount(), Amount::from_units(120).unwrap());
            assert_eq!(accepted.transaction.agreed_price(), Amount::from_units(120).unwrap());

            let tx = h
                .engine
                .get_transaction_for_offer(&seller(), offer.id())
                .await
                .unwrap();
            assert_eq!(tx.id(), accepted.transaction.id());
        }

        #[tokio::test]
        async fn counter_accept_requires_counter() {
            let h = harness();
            let offer = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            let err = h
                .engine
                .accept_counter_offer(&buyer("b1"), offer.id())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
            assert_eq!(TransactionRepository::count(&h.store).await.unwrap(), 0);
        }

        #[tokio::test]
        async fn second_acceptance_on_property_fails() {
            let h = harness();
            let first = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            let second = h.engine.submit_offer(&buyer("b2"), bid(90)).await.unwrap();
            h.engine.accept_offer(&seller(), first.id(), None).await.unwrap();

            let err = h
                .engine
                .accept_offer(&seller(), second.id(), None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
            assert_eq!(TransactionRepository::count(&h.store).await.unwrap(), 1);
        }

        #[tokio::test]
        async fn lapsed_competitor_is_expired_not_superseded() {
            let h = harness();
            let first = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            let lapsed = lapsed_offer(&h.store, "b2").await;

            let accepted = h.engine.accept_offer(&seller(), first.id(), None).await.unwrap();
            assert!(accepted.superseded.is_empty());

            let stored = OfferRepository::get(&h.store, &lapsed.id())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.status(), OfferStatus::Expired);
            assert_eq!(stored.seller_response(), None);
            assert!(h.events.event_names().contains(&"OfferExpired"));
            assert!(h.notifier.notifications_for(&UserId::new("b2")).is_empty());
        }

        #[tokio::test]
        async fn transaction_lookup_before_acceptance_is_not_found() {
            let h = harness();
            let offer = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            let err = h
                .engine
                .get_transaction_for_offer(&buyer("b1"), offer.id())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }

    mod queries {
        use super::*;

        #[tokio::test]
        async fn list_by_role() {
            let h = harness();
            h.listings.upsert(PropertySummary::available("prop-3", "b2"));
            h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            h.engine
                .submit_offer(&buyer("b1"), SubmitOffer::new("prop-3", Decimal::from(5)))
                .await
                .unwrap();

            let made = h
                .engine
                .list_offers_for_actor(&buyer("b1"), ActorRole::Buyer)
                .await
                .unwrap();
            assert_eq!(made.len(), 2);
            assert!(made[0].created_at() >= made[1].created_at());

            let received = h
                .engine
                .list_offers_for_actor(&buyer("b2"), ActorRole::Seller)
                .await
                .unwrap();
            assert_eq!(received.len(), 1);
        }

        #[tokio::test]
        async fn property_listing_requires_owner() {
            let h = harness();
            h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();

            let offers = h
                .engine
                .list_offers_for_property(&seller(), &PropertyId::new("prop-1"))
                .await
                .unwrap();
            assert_eq!(offers.len(), 1);

            let err = h
                .engine
                .list_offers_for_property(&buyer("b1"), &PropertyId::new("prop-1"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotAuthorized);
        }

        #[tokio::test]
        async fn get_offer_requires_party() {
            let h = harness();
            let offer = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            let err = h.engine.get_offer(&buyer("b9"), offer.id()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotAuthorized);
        }

        #[tokio::test]
        async fn outsider_read_does_not_expire_lapsed_offer() {
            let h = harness();
            let lapsed = lapsed_offer(&h.store, "b1").await;

            let err = h.engine.get_offer(&buyer("b9"), lapsed.id()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotAuthorized);
            let err = h
                .engine
                .get_transaction_for_offer(&buyer("b9"), lapsed.id())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotAuthorized);
            let err = h
                .engine
                .reject_offer(&buyer("b9"), lapsed.id(), None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotAuthorized);

            let stored = OfferRepository::get(&h.store, &lapsed.id())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.status(), OfferStatus::Pending);
            assert!(h.events.is_empty());

            let seen = h.engine.get_offer(&buyer("b1"), lapsed.id()).await.unwrap();
            assert_eq!(seen.status(), OfferStatus::Expired);
        }

        #[tokio::test]
        async fn has_active_offer_tracks_lifecycle() {
            let h = harness();
            let property = PropertyId::new("prop-1");
            assert!(!h.engine.has_active_offer(&buyer("b1"), &property).await.unwrap());

            let offer = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            assert!(h.engine.has_active_offer(&buyer("b1"), &property).await.unwrap());

            h.engine.withdraw_offer(&buyer("b1"), offer.id()).await.unwrap();
            assert!(!h.engine.has_active_offer(&buyer("b1"), &property).await.unwrap());
        }

        #[tokio::test]
        async fn has_active_offer_ignores_lapsed() {
            let h = harness();
            lapsed_offer(&h.store, "b1").await;
            assert!(
                !h.engine
                    .has_active_offer(&buyer("b1"), &PropertyId::new("prop-1"))
                    .await
                    .unwrap()
            );
        }

        #[tokio::test]
        async fn sweep_expires_lapsed_offers() {
            let h = harness();
            lapsed_offer(&h.store, "b1").await;
            lapsed_offer(&h.store, "b2").await;
            h.engine.submit_offer(&buyer("b3"), bid(100)).await.unwrap();

            assert_eq!(h.engine.expire_stale_offers().await.unwrap(), 2);
            assert_eq!(h.engine.expire_stale_offers().await.unwrap(), 0);
        }
    }

    mod infrastructure {
        use super::*;

        #[derive(Debug)]
        struct FailingPublisher;

        #[async_trait]
        impl EventPublisher for FailingPublisher {
            async fn publish(&self, _event: &OfferEvent) -> Result<(), PublishError> {
                Err(PublishError::Transport("broker down".to_string()))
            }
        }

        #[tokio::test]
        async fn unavailable_store_maps_to_unavailable() {
            let h = harness();
            h.store.set_unavailable(true);
            let err = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unavailable);
            assert!(!err.user_message().contains("in-memory"));
        }

        #[tokio::test]
        async fn slow_store_times_out() {
            let h = harness_with(EngineConfig::default().with_store_timeout(20));
            h.store.set_latency(Duration::from_millis(200));
            let err = h.engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Timeout);
        }

        #[tokio::test]
        async fn publisher_failure_does_not_fail_operation() {
            let store = InMemoryNegotiationStore::new();
            let listings = InMemoryListingLookup::new();
            listings.upsert(PropertySummary::available("prop-1", "seller"));
            let outbound = OutboundDispatcher::new(
                Arc::new(RecordingNotifier::new()),
                Arc::new(FailingPublisher),
                Duration::from_millis(50),
            );
            let engine = NegotiationEngine::new(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                Arc::new(listings),
                outbound,
                EngineConfig::default(),
            );

            let offer = engine.submit_offer(&buyer("b1"), bid(100)).await.unwrap();
            assert_eq!(offer.status(), OfferStatus::Pending);
            assert_eq!(store.len().await, 1);
        }
    }

    mod config {
        use super::*;

        #[test]
        fn defaults() {
            let config = EngineConfig::default();
            assert_eq!(config.default_validity_days, 7);
            assert_eq!(config.store_timeout(), Duration::from_secs(5));
            assert!(config.expiry_sweep_interval_secs.is_none());
        }

        #[test]
        fn actor_role_parsing() {
            assert_eq!("Buyer".parse::<ActorRole>().unwrap(), ActorRole::Buyer);
            assert_eq!("seller".parse::<ActorRole>().unwrap(), ActorRole::Seller);
            assert!("agent".parse::<ActorRole>().is_err());
        }
    }
}
