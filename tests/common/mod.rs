//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use offer_negotiation::application::ports::{Caller, PropertySummary};
use offer_negotiation::application::services::{
    EngineConfig, NegotiationEngine, OutboundDispatcher, SubmitOffer,
};
use offer_negotiation::domain::entities::{Offer, OfferParts};
use offer_negotiation::domain::value_objects::{
    Amount, OfferId, OfferStatus, PaymentTerms, PropertyId, Timestamp, UserId,
};
use offer_negotiation::infrastructure::events::RecordingEventPublisher;
use offer_negotiation::infrastructure::listings::InMemoryListingLookup;
use offer_negotiation::infrastructure::notifications::RecordingNotifier;
use offer_negotiation::infrastructure::persistence::OfferRepository;
use offer_negotiation::infrastructure::persistence::in_memory::InMemoryNegotiationStore;
use rust_decimal::Decimal;
use std::sync::Arc;

pub const SELLER: &str = "seller-1";
pub const PROPERTY: &str = "prop-1";

pub struct TestContext {
    pub engine: Arc<NegotiationEngine>,
    pub store: InMemoryNegotiationStore,
    pub listings: InMemoryListingLookup,
    pub notifier: RecordingNotifier,
    pub events: RecordingEventPublisher,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = InMemoryNegotiationStore::new();
        let listings = InMemoryListingLookup::with_properties([
            PropertySummary::available(PROPERTY, SELLER),
            PropertySummary::available("prop-2", SELLER),
        ]);
        let notifier = RecordingNotifier::new();
        let events = RecordingEventPublisher::new();
        let outbound = OutboundDispatcher::new(
            Arc::new(notifier.clone()),
            Arc::new(events.clone()),
            config.notify_timeout(),
        );
        let engine = Arc::new(NegotiationEngine::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(listings.clone()),
            outbound,
            config,
        ));
        Self {
            engine,
            store,
            listings,
            notifier,
            events,
        }
    }

    /// Inserts an active offer whose validity lapsed a few days ago.
    pub async fn insert_lapsed_offer(&self, buyer: &str, property: &str) -> Offer {
        let created = Timestamp::now().add_days(-10);
        let offer = Offer::from_parts(OfferParts {
            id: OfferId::new_v4(),
            property_id: PropertyId::new(property),
            buyer_id: UserId::new(buyer),
            seller_id: UserId::new(SELLER),
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
        self.store.insert(&offer).await.unwrap();
        offer
    }
}

pub fn buyer(name: &str) -> Caller {
    Caller::user(name)
}

pub fn seller() -> Caller {
    Caller::user(SELLER)
}

pub fn bid(units: i64) -> SubmitOffer {
    SubmitOffer::new(PROPERTY, Decimal::from(units))
}

pub fn amount(units: i64) -> Amount {
    Amount::from_units(units).unwrap()
}
