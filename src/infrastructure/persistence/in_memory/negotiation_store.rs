//! # In-Memory Negotiation Store
//!
//! In-memory implementation of [`OfferRepository`] and
//! [`TransactionRepository`] sharing one state behind a single lock.
//!
//! Every write takes the write lock once and performs its checks and
//! mutations under it, so the atomic units the ports promise hold across
//! concurrent tasks and threads.

use crate::domain::entities::{Offer, Transaction};
use crate::domain::services::{AcceptanceOutcome, settle_acceptance};
use crate::domain::value_objects::{
    OfferId, OfferStatus, PropertyId, Timestamp, TransactionId, UserId,
};
use crate::infrastructure::persistence::traits::{
    AcceptanceRequest, OfferRepository, RepositoryError, RepositoryResult, TransactionRepository,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct StoreState {
    offers: HashMap<OfferId, Offer>,
    transactions: HashMap<TransactionId, Transaction>,
}

impl StoreState {
    fn on_property(&self, property_id: &PropertyId) -> impl Iterator<Item = &Offer> {
        self.offers
            .values()
            .filter(move |o| o.property_id() == property_id)
    }
}

/// In-memory Offer Store and Transaction Store.
///
/// Clones share the same state. Fault injection hooks
/// ([`set_unavailable`](Self::set_unavailable),
/// [`set_latency`](Self::set_latency)) let tests drive the engine's
/// unavailable and timeout paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNegotiationStore {
    state: Arc<RwLock<StoreState>>,
    unavailable: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
}

impl InMemoryNegotiationStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored offers.
    pub async fn len(&self) -> usize {
        self.state.read().await.offers.len()
    }

    /// Returns true if no offers are stored.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.offers.is_empty()
    }

    /// Clears all offers and transactions.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.offers.clear();
        state.transactions.clear();
    }

    /// Makes every subsequent call fail with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    async fn enter(&self) -> RepositoryResult<()> {
        let millis = self.latency_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::connection("in-memory store marked unavailable"));
        }
        Ok(())
    }
}

fn newest_first(mut offers: Vec<Offer>) -> Vec<Offer> {
    offers.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    offers
}

#[async_trait]
impl OfferRepository for InMemoryNegotiationStore {
    async fn insert(&self, offer: &Offer) -> RepositoryResult<()> {
        self.enter().await?;
        let mut state = self.state.write().await;

        if state.offers.contains_key(&offer.id()) {
            return Err(RepositoryError::duplicate("Offer", offer.id().to_string()));
        }
        if state
            .on_property(offer.property_id())
            .any(|o| o.status() == OfferStatus::Accepted)
        {
            return Err(RepositoryError::settled(offer.property_id().as_str()));
        }
        let has_active = state
            .on_property(offer.property_id())
            .any(|o| o.buyer_id() == offer.buyer_id() && o.is_active());
        if has_active {
            return Err(RepositoryError::duplicate(
                "Offer",
                format!("{}/{}", offer.buyer_id(), offer.property_id()),
            ));
        }

        state.offers.insert(offer.id(), offer.clone());
        Ok(())
    }

    async fn get(&self, id: &OfferId) -> RepositoryResult<Option<Offer>> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state.offers.get(id).cloned())
    }

    async fn update(&self, offer: &Offer, expected_version: u64) -> RepositoryResult<()> {
        self.enter().await?;
        let mut state = self.state.write().await;

        let stored = state
            .offers
            .get_mut(&offer.id())
            .ok_or_else(|| RepositoryError::not_found("Offer", offer.id().to_string()))?;
        if stored.version() != expected_version {
            return Err(RepositoryError::version_conflict(
                "Offer",
                offer.id().to_string(),
                expected_version,
                stored.version(),
            ));
        }

        *stored = offer.clone();
        Ok(())
    }

    async fn commit_acceptance(
        &self,
        request: AcceptanceRequest,
    ) -> RepositoryResult<AcceptanceOutcome> {
        self.enter().await?;
        let mut state = self.state.write().await;

        let target = state
            .offers
            .get(&request.offer_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("Offer", request.offer_id.to_string()))?;
        if target.version() != request.expected_version {
            return Err(RepositoryError::version_conflict(
                "Offer",
                request.offer_id.to_string(),
                request.expected_version,
                target.version(),
            ));
        }

        let others: Vec<Offer> = state
            .on_property(target.property_id())
            .filter(|o| o.id() != target.id())
            .cloned()
            .collect();

        let outcome = settle_acceptance(
            target,
            others,
            request.acceptance,
            request.response,
            request.now,
        )
        .map_err(|e| RepositoryError::conflict(e.to_string()))?;

        state
            .offers
            .insert(outcome.accepted.id(), outcome.accepted.clone());
        for offer in outcome.superseded.iter().chain(&outcome.expired) {
            state.offers.insert(offer.id(), offer.clone());
        }
        state
            .transactions
            .insert(outcome.transaction.id(), outcome.transaction.clone());

        Ok(outcome)
    }

    async fn find_active(
        &self,
        buyer_id: &UserId,
        property_id: &PropertyId,
    ) -> RepositoryResult<Option<Offer>> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state
            .on_property(property_id)
            .find(|o| o.buyer_id() == buyer_id && o.is_active())
            .cloned())
    }

    async fn find_by_buyer(&self, buyer_id: &UserId) -> RepositoryResult<Vec<Offer>> {
        self.enter().await?;
        let state = self.state.read().await;
        let offers = state
            .offers
            .values()
            .filter(|o| o.buyer_id() == buyer_id)
            .cloned()
            .collect();
        Ok(newest_first(offers))
    }

    async fn find_by_seller(&self, seller_id: &UserId) -> RepositoryResult<Vec<Offer>> {
        self.enter().await?;
        let state = self.state.read().await;
        let offers = state
            .offers
            .values()
            .filter(|o| o.seller_id() == seller_id)
            .cloned()
            .collect();
        Ok(newest_first(offers))
    }

    async fn find_by_property(&self, property_id: &PropertyId) -> RepositoryResult<Vec<Offer>> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(newest_first(state.on_property(property_id).cloned().collect()))
    }

    async fn find_lapsed(&self, now: Timestamp) -> RepositoryResult<Vec<Offer>> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state
            .offers
            .values()
            .filter(|o| o.is_lapsed_at(&now))
            .cloned()
            .collect())
    }

    async fn count(&self) -> RepositoryResult<u64> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state.offers.len() as u64)
    }
}

#[async_trait]
impl TransactionRepository for InMemoryNegotiationStore {
    async fn get(&self, id: &TransactionId) -> RepositoryResult<Option<Transaction>> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state.transactions.get(id).cloned())
    }

    async fn get_by_offer(&self, offer_id: &OfferId) -> RepositoryResult<Option<Transaction>> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state
            .transactions
            .values()
            .find(|t| t.offer_id() == *offer_id)
            .cloned())
    }

    async fn find_by_property(
        &self,
        property_id: &PropertyId,
    ) -> RepositoryResult<Vec<Transaction>> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state
            .transactions
            .values()
            .filter(|t| t.property_id() == property_id)
            .cloned()
            .collect())
    }

    async fn count(&self) -> RepositoryResult<u64> {
        self.enter().await?;
        let state = self.state.read().await;
        Ok(state.transactions.len() as u64)
    }
}
