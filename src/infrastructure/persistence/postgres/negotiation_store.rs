//! # PostgreSQL Negotiation Store
//!
//! PostgreSQL implementation of [`OfferRepository`] and
//! [`TransactionRepository`] using sqlx.
//!
//! Atomicity comes from the database: partial unique indexes enforce one
//! active offer per buyer and property and one accepted offer per property,
//! updates compare the stored version, and acceptance runs in a single SQL
//! transaction holding row locks on every offer for the property.
//!
//! Inserts and acceptances on the same property also serialize on a
//! transaction-scoped advisory lock keyed by the property id, so an offer
//! cannot slip in next to an acceptance that is still committing.

use crate::domain::entities::{Offer, OfferParts, Transaction, TransactionStatus};
use crate::domain::services::{AcceptanceOutcome, settle_acceptance};
use crate::domain::value_objects::{
    Amount, InvalidOfferStatusError, OfferId, OfferStatus, PaymentTerms, PropertyId, Timestamp,
    TransactionId, UserId,
};
use crate::infrastructure::persistence::traits::{
    AcceptanceRequest, OfferRepository, RepositoryError, RepositoryResult, TransactionRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const OFFER_COLUMNS: &str = "id, property_id, buyer_id, seller_id, amount, payment_terms, \
     message, status, counter_amount, counter_message, seller_response, valid_until, \
     transaction_id, created_at, updated_at, responded_at, accepted_at, version";

const TRANSACTION_COLUMNS: &str =
    "id, offer_id, property_id, buyer_id, seller_id, agreed_price, status, created_at";

const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL implementation of the negotiation stores.
///
/// # Examples
///
/// ```ignore
/// use sqlx::PgPool;
/// use offer_negotiation::infrastructure::persistence::postgres::PostgresNegotiationStore;
///
/// let pool = PgPool::connect("postgres://...").await?;
/// let store = PostgresNegotiationStore::new(pool);
/// store.migrate().await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresNegotiationStore {
    pool: PgPool,
}

impl PostgresNegotiationStore {
    /// Creates a new PostgreSQL store.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Query` if a migration fails.
    pub async fn migrate(&self) -> RepositoryResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::query(e.to_string()))
    }

    async fn fetch_offers(&self, filter: &str, value: &str) -> RepositoryResult<Vec<Offer>> {
        let sql = format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE {filter} = $1 ORDER BY created_at DESC"
        );
        let rows: Vec<OfferRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(OfferRow::try_into_offer).collect()
    }
}

fn map_sqlx_error(error: sqlx::Error) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            RepositoryError::duplicate("Offer", db.constraint().unwrap_or("unique").to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::connection(error.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            RepositoryError::serialization(error.to_string())
        }
        _ => RepositoryError::query(error.to_string()),
    }
}

/// Serializes writers on one property until the surrounding transaction ends.
async fn lock_property(conn: &mut PgConnection, property_id: &str) -> RepositoryResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(property_id)
        .execute(conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

fn to_i64(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

async fn insert_offer(conn: &mut PgConnection, offer: &Offer) -> RepositoryResult<()> {
    let payment_terms = serde_json::to_value(offer.payment_terms())
        .map_err(|e| RepositoryError::serialization(e.to_string()))?;

    sqlx::query(&format!(
        "INSERT INTO offers ({OFFER_COLUMNS}) VALUES \
         ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
    ))
    .bind(offer.id().as_uuid())
    .bind(offer.property_id().as_str())
    .bind(offer.buyer_id().as_str())
    .bind(offer.seller_id().as_str())
    .bind(Decimal::from(offer.amount()))
    .bind(payment_terms)
    .bind(offer.message())
    .bind(offer.status().as_str())
    .bind(offer.counter_amount().map(Decimal::from))
    .bind(offer.counter_message())
    .bind(offer.seller_response())
    .bind(DateTime::<Utc>::from(offer.valid_until()))
    .bind(offer.transaction_id().map(|id| id.as_uuid()))
    .bind(DateTime::<Utc>::from(offer.created_at()))
    .bind(DateTime::<Utc>::from(offer.updated_at()))
    .bind(offer.responded_at().map(DateTime::<Utc>::from))
    .bind(offer.accepted_at().map(DateTime::<Utc>::from))
    .bind(to_i64(offer.version()))
    .execute(conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

/// Writes the mutable columns of `offer` if the row is still at
/// `expected_version`. Returns the number of rows touched.
async fn update_offer(
    conn: &mut PgConnection,
    offer: &Offer,
    expected_version: u64,
) -> RepositoryResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE offers SET
            amount = $3, status = $4, counter_amount = $5, counter_message = $6,
            seller_response = $7, transaction_id = $8, updated_at = $9,
            responded_at = $10, accepted_at = $11, version = $12
        WHERE id = $1 AND version = $2
        "#,
    )
    .bind(offer.id().as_uuid())
    .bind(to_i64(expected_version))
    .bind(Decimal::from(offer.amount()))
    .bind(offer.status().as_str())
    .bind(offer.counter_amount().map(Decimal::from))
    .bind(offer.counter_message())
    .bind(offer.seller_response())
    .bind(offer.transaction_id().map(|id| id.as_uuid()))
    .bind(DateTime::<Utc>::from(offer.updated_at()))
    .bind(offer.responded_at().map(DateTime::<Utc>::from))
    .bind(offer.accepted_at().map(DateTime::<Utc>::from))
    .bind(to_i64(offer.version()))
    .execute(conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(result.rows_affected())
}

#[async_trait]
impl OfferRepository for PostgresNegotiationStore {
    async fn insert(&self, offer: &Offer) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        lock_property(&mut *tx, offer.property_id().as_str()).await?;

        let (settled,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM offers WHERE property_id = $1 AND status = 'accepted')",
        )
        .bind(offer.property_id().as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if settled {
            return Err(RepositoryError::settled(offer.property_id().as_str()));
        }

        insert_offer(&mut *tx, offer).await?;
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn get(&self, id: &OfferId) -> RepositoryResult<Option<Offer>> {
        let row: Option<OfferRow> =
            sqlx::query_as(&format!("SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(OfferRow::try_into_offer).transpose()
    }

    async fn update(&self, offer: &Offer, expected_version: u64) -> RepositoryResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        if update_offer(&mut *conn, offer, expected_version).await? == 1 {
            return Ok(());
        }

        let current: Option<(i64,)> = sqlx::query_as("SELECT version FROM offers WHERE id = $1")
            .bind(offer.id().as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        match current {
            Some((actual,)) => Err(RepositoryError::version_conflict(
                "Offer",
                offer.id().to_string(),
                expected_version,
                u64::try_from(actual).unwrap_or_default(),
            )),
            None => Err(RepositoryError::not_found("Offer", offer.id().to_string())),
        }
    }

    async fn commit_acceptance(
        &self,
        request: AcceptanceRequest,
    ) -> RepositoryResult<AcceptanceOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let property: Option<(String,)> =
            sqlx::query_as("SELECT property_id FROM offers WHERE id = $1")
                .bind(request.offer_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        let (property_id,) = property
            .ok_or_else(|| RepositoryError::not_found("Offer", request.offer_id.to_string()))?;
        lock_property(&mut *tx, &property_id).await?;

        // Lock every offer on the property in a stable order.
        let rows: Vec<OfferRow> = sqlx::query_as(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE property_id = $1 ORDER BY id FOR UPDATE"
        ))
        .bind(&property_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let mut target = None;
        let mut others = Vec::with_capacity(rows.len());
        for row in rows {
            let offer = row.try_into_offer()?;
            if offer.id() == request.offer_id {
                target = Some(offer);
            } else {
                others.push(offer);
            }
        }
        let target = target
            .ok_or_else(|| RepositoryError::not_found("Offer", request.offer_id.to_string()))?;
        if target.version() != request.expected_version {
            return Err(RepositoryError::version_conflict(
                "Offer",
                request.offer_id.to_string(),
                request.expected_version,
                target.version(),
            ));
        }

        let versions: Vec<(OfferId, u64)> = std::iter::once(&target)
            .chain(others.iter())
            .map(|o| (o.id(), o.version()))
            .collect();
        let outcome = settle_acceptance(
            target,
            others,
            request.acceptance,
            request.response,
            request.now,
        )
        .map_err(|e| RepositoryError::conflict(e.to_string()))?;

        let written = std::iter::once(&outcome.accepted)
            .chain(outcome.superseded.iter())
            .chain(outcome.expired.iter());
        for offer in written {
            let expected = versions
                .iter()
                .find(|(id, _)| *id == offer.id())
                .map_or(0, |(_, v)| *v);
            match update_offer(&mut *tx, offer, expected).await {
                Ok(1) => {}
                Ok(_) => {
                    return Err(RepositoryError::version_conflict(
                        "Offer",
                        offer.id().to_string(),
                        expected,
                        offer.version(),
                    ));
                }
                Err(e) if e.is_duplicate() => {
                    return Err(RepositoryError::conflict(
                        "property already has an accepted offer",
                    ));
                }
                Err(e) => return Err(e),
            }
        }

        let transaction = &outcome.transaction;
        sqlx::query(&format!(
            "INSERT INTO transactions ({TRANSACTION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(transaction.id().as_uuid())
        .bind(transaction.offer_id().as_uuid())
        .bind(transaction.property_id().as_str())
        .bind(transaction.buyer_id().as_str())
        .bind(transaction.seller_id().as_str())
        .bind(Decimal::from(transaction.agreed_price()))
        .bind(transaction.status().as_str())
        .bind(DateTime::<Utc>::from(transaction.created_at()))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(outcome)
    }

    async fn find_active(
        &self,
        buyer_id: &UserId,
        property_id: &PropertyId,
    ) -> RepositoryResult<Option<Offer>> {
        let row: Option<OfferRow> = sqlx::query_as(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers \
             WHERE buyer_id = $1 AND property_id = $2 AND status IN ('pending', 'countered')"
        ))
        .bind(buyer_id.as_str())
        .bind(property_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(OfferRow::try_into_offer).transpose()
    }

    async fn find_by_buyer(&self, buyer_id: &UserId) -> RepositoryResult<Vec<Offer>> {
        self.fetch_offers("buyer_id", buyer_id.as_str()).await
    }

    async fn find_by_seller(&self, seller_id: &UserId) -> RepositoryResult<Vec<Offer>> {
        self.fetch_offers("seller_id", seller_id.as_str()).await
    }

    async fn find_by_property(&self, property_id: &PropertyId) -> RepositoryResult<Vec<Offer>> {
        self.fetch_offers("property_id", property_id.as_str()).await
    }

    async fn find_lapsed(&self, now: Timestamp) -> RepositoryResult<Vec<Offer>> {
        let rows: Vec<OfferRow> = sqlx::query_as(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers \
             WHERE status IN ('pending', 'countered') AND valid_until < $1"
        ))
        .bind(DateTime::<Utc>::from(now))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(OfferRow::try_into_offer).collect()
    }

    async fn count(&self) -> RepositoryResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM offers")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count as u64)
    }
}

#[async_trait]
impl TransactionRepository for PostgresNegotiationStore {
    async fn get(&self, id: &TransactionId) -> RepositoryResult<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TransactionRow::try_into_transaction).transpose()
    }

    async fn get_by_offer(&self, offer_id: &OfferId) -> RepositoryResult<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE offer_id = $1"
        ))
        .bind(offer_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TransactionRow::try_into_transaction).transpose()
    }

    async fn find_by_property(
        &self,
        property_id: &PropertyId,
    ) -> RepositoryResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE property_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(property_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(TransactionRow::try_into_transaction)
            .collect()
    }

    async fn count(&self) -> RepositoryResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count as u64)
    }
}

/// Row type for offer queries.
#[derive(Debug, sqlx::FromRow)]
struct OfferRow {
    id: Uuid,
    property_id: String,
    buyer_id: String,
    seller_id: String,
    amount: Decimal,
    payment_terms: serde_json::Value,
    message: Option<String>,
    status: String,
    counter_amount: Option<Decimal>,
    counter_message: Option<String>,
    seller_response: Option<String>,
    valid_until: DateTime<Utc>,
    transaction_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
    accepted_at: Option<DateTime<Utc>>,
    version: i64,
}

impl OfferRow {
    fn try_into_offer(self) -> RepositoryResult<Offer> {
        let amount =
            Amount::new(self.amount).map_err(|e| RepositoryError::serialization(e.to_string()))?;
        let counter_amount = self
            .counter_amount
            .map(Amount::new)
            .transpose()
            .map_err(|e| RepositoryError::serialization(e.to_string()))?;
        let payment_terms: PaymentTerms = serde_json::from_value(self.payment_terms)
            .map_err(|e| RepositoryError::serialization(e.to_string()))?;
        let status: OfferStatus = self
            .status
            .parse()
            .map_err(|e: InvalidOfferStatusError| RepositoryError::serialization(e.to_string()))?;

        Ok(Offer::from_parts(OfferParts {
            id: OfferId::new(self.id),
            property_id: PropertyId::new(self.property_id),
            buyer_id: UserId::new(self.buyer_id),
            seller_id: UserId::new(self.seller_id),
            amount,
            payment_terms,
            message: self.message,
            status,
            counter_amount,
            counter_message: self.counter_message,
            seller_response: self.seller_response,
            valid_until: Timestamp::from(self.valid_until),
            transaction_id: self.transaction_id.map(TransactionId::new),
            created_at: Timestamp::from(self.created_at),
            updated_at: Timestamp::from(self.updated_at),
            responded_at: self.responded_at.map(Timestamp::from),
            accepted_at: self.accepted_at.map(Timestamp::from),
            version: u64::try_from(self.version)
                .map_err(|e| RepositoryError::serialization(e.to_string()))?,
        }))
    }
}

/// Row type for transaction queries.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    offer_id: Uuid,
    property_id: String,
    buyer_id: String,
    seller_id: String,
    agreed_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn try_into_transaction(self) -> RepositoryResult<Transaction> {
        let agreed_price = Amount::new(self.agreed_price)
            .map_err(|e| RepositoryError::serialization(e.to_string()))?;
        let status: TransactionStatus = self
            .status
            .parse()
            .map_err(RepositoryError::serialization)?;

        Ok(Transaction::from_parts(
            TransactionId::new(self.id),
            OfferId::new(self.offer_id),
            PropertyId::new(self.property_id),
            UserId::new(self.buyer_id),
            UserId::new(self.seller_id),
            agreed_price,
            status,
            Timestamp::from(self.created_at),
        ))
    }
}
