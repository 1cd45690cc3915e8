//! # REST Handlers
//!
//! Request handlers, DTOs and the response envelope.
//!
//! Every response body is
//! `{ "success": bool, "data"?: ..., "error"?: { "kind": ..., "message": ... } }`.

use crate::application::error::{ErrorKind, NegotiationError};
use crate::application::ports::{Caller, IdentityError, IdentityProvider};
use crate::application::services::{AcceptedOffer, ActorRole, NegotiationEngine, SubmitOffer};
use crate::domain::entities::{Offer, Transaction};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::{
    Amount, FinancingDetails, FinancingStatus, OfferId, OfferStatus, PaymentTerms, PropertyId,
    Timestamp, TransactionId, UserId,
};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// State
// ============================================================================

/// Shared state for the REST handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The negotiation engine.
    pub engine: Arc<NegotiationEngine>,
    /// Resolves bearer tokens into callers.
    pub identity: Arc<dyn IdentityProvider>,
    /// When the server started.
    pub started_at: Instant,
}

impl AppState {
    /// Creates the state.
    #[must_use]
    pub fn new(engine: Arc<NegotiationEngine>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            engine,
            identity,
            started_at: Instant::now(),
        }
    }
}

// ============================================================================
// Envelope and errors
// ============================================================================

/// Error kind used for request bodies or parameters that cannot be parsed.
pub const MALFORMED_REQUEST: &str = "MalformedRequest";

/// Error payload of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error kind.
    pub kind: String,
    /// Message safe to show to the caller.
    pub message: String,
}

/// Response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> ApiResponse<T> {
    /// Wraps a successful payload.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The engine refused or failed the operation.
    Negotiation(NegotiationError),
    /// A bearer token was presented but cannot be trusted.
    Identity(IdentityError),
    /// The request could not be parsed.
    Malformed(String),
}

impl From<NegotiationError> for ApiError {
    fn from(error: NegotiationError) -> Self {
        Self::Negotiation(error)
    }
}

impl From<IdentityError> for ApiError {
    fn from(error: IdentityError) -> Self {
        Self::Identity(error)
    }
}

/// Maps an error kind to its HTTP status.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotAuthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::NotAuthorized => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidAmount | ErrorKind::InvalidTerms | ErrorKind::SelfDealing => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::PropertyUnavailable
        | ErrorKind::DuplicateActiveOffer
        | ErrorKind::InvalidStateTransition => StatusCode::CONFLICT,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            Self::Negotiation(e) => (status_for(e.kind()), e.kind().to_string(), e.user_message()),
            Self::Identity(e) => {
                tracing::debug!(error = %e, "bearer token rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorKind::NotAuthenticated.to_string(),
                    "Invalid or expired credentials".to_string(),
                )
            }
            Self::Malformed(message) => (
                StatusCode::BAD_REQUEST,
                MALFORMED_REQUEST.to_string(),
                message.clone(),
            ),
        };

        let body: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some(ErrorBody { kind, message }),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::ok(data))))
}

fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(data))))
}

/// Parses a JSON body; an empty body yields `T::default()`.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_required_body(body)
}

fn parse_required_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Malformed(format!("invalid JSON body: {e}")))
}

/// Unparseable ids cannot name an existing offer.
fn parse_offer_id(raw: &str) -> Result<OfferId, ApiError> {
    raw.parse::<OfferId>()
        .map_err(|_| ApiError::from(NegotiationError::not_found("Offer", raw)))
}

// ============================================================================
// Caller extraction
// ============================================================================

/// The caller resolved from the `Authorization: Bearer` header.
///
/// A missing or non-bearer header yields [`Caller::Anonymous`]; operations
/// that need a user then fail with `NotAuthenticated`.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Caller);

impl FromRequestParts<Arc<AppState>> for CallerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts.headers.typed_get::<Authorization<Bearer>>();
        let token = bearer.as_ref().map(|auth| auth.token());
        let caller = state.identity.resolve(token).await?;
        Ok(Self(caller))
    }
}

// ============================================================================
// DTOs
// ============================================================================

/// Body of `POST /offers`.
///
/// Amounts stay raw decimals; range checks run after parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOfferRequest {
    /// The property to bid on.
    pub property_id: PropertyId,
    /// Offered amount.
    pub amount: Decimal,
    /// How the buyer intends to pay; cash when omitted.
    #[serde(default)]
    pub payment_terms: PaymentTermsRequest,
    /// Optional note to the seller.
    #[serde(default)]
    pub message: Option<String>,
    /// Optional expiry.
    #[serde(default)]
    pub valid_until: Option<Timestamp>,
}

impl TryFrom<SubmitOfferRequest> for SubmitOffer {
    type Error = DomainError;

    fn try_from(request: SubmitOfferRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            property_id: request.property_id,
            amount: request.amount,
            payment_terms: request.payment_terms.try_into()?,
            message: request.message,
            valid_until: request.valid_until,
        })
    }
}

/// Payment terms as sent by clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "payment_type", rename_all = "snake_case")]
pub enum PaymentTermsRequest {
    /// All-cash purchase.
    #[default]
    Cash,
    /// Fully financed purchase.
    Financed(FinancingRequest),
    /// Part cash, part financed.
    CashPlusFinanced(FinancingRequest),
}

impl TryFrom<PaymentTermsRequest> for PaymentTerms {
    type Error = DomainError;

    fn try_from(request: PaymentTermsRequest) -> Result<Self, Self::Error> {
        Ok(match request {
            PaymentTermsRequest::Cash => Self::Cash,
            PaymentTermsRequest::Financed(details) => Self::Financed(details.try_into()?),
            PaymentTermsRequest::CashPlusFinanced(details) => {
                Self::CashPlusFinanced(details.try_into()?)
            }
        })
    }
}

/// Financing details as sent by clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancingRequest {
    /// Where the buyer is in the financing process.
    #[serde(default)]
    pub financing_status: Option<FinancingStatus>,
    /// Amount the lender has pre-approved.
    #[serde(default)]
    pub pre_approval_amount: Option<Decimal>,
    /// Name of the lending institution.
    #[serde(default)]
    pub financing_institution: Option<String>,
}

impl TryFrom<FinancingRequest> for FinancingDetails {
    type Error = DomainError;

    fn try_from(request: FinancingRequest) -> Result<Self, Self::Error> {
        let pre_approval_amount = request
            .pre_approval_amount
            .map(|value| {
                Amount::new(value).map_err(|_| {
                    DomainError::invalid_terms(format!(
                        "pre-approval amount must be a positive amount in cents, got {value}"
                    ))
                })
            })
            .transpose()?;
        Ok(Self {
            financing_status: request.financing_status,
            pre_approval_amount,
            financing_institution: request.financing_institution,
        })
    }
}

/// Body of `POST /offers/{id}/accept` and `/reject`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RespondRequest {
    /// Optional note to the buyer.
    #[serde(default)]
    pub response: Option<String>,
}

/// Body of `POST /offers/{id}/counter`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterRequest {
    /// The seller's counter amount.
    pub counter_amount: Decimal,
    /// Optional note to the buyer.
    #[serde(default)]
    pub message: Option<String>,
}

/// Query of `GET /offers`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleQuery {
    /// `buyer` (default) or `seller`.
    pub role: Option<String>,
}

/// An offer as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferResponse {
    /// Offer ID.
    pub id: OfferId,
    /// Property ID.
    pub property_id: PropertyId,
    /// Buyer.
    pub buyer_id: UserId,
    /// Seller.
    pub seller_id: UserId,
    /// Current amount; the counter amount once a counter is accepted.
    pub amount: Amount,
    /// Payment terms.
    pub payment_terms: PaymentTerms,
    /// Buyer's note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Status.
    pub status: OfferStatus,
    /// Seller's counter amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_amount: Option<Amount>,
    /// Seller's counter note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_message: Option<String>,
    /// Seller's response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_response: Option<String>,
    /// Expiry.
    pub valid_until: Timestamp,
    /// Transaction created on acceptance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    /// Submission time.
    pub created_at: Timestamp,
    /// Last change.
    pub updated_at: Timestamp,
    /// First seller response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<Timestamp>,
    /// Acceptance time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<Timestamp>,
}

impl From<&Offer> for OfferResponse {
    fn from(offer: &Offer) -> Self {
        Self {
            id: offer.id(),
            property_id: offer.property_id().clone(),
            buyer_id: offer.buyer_id().clone(),
            seller_id: offer.seller_id().clone(),
            amount: offer.amount(),
            payment_terms: offer.payment_terms().clone(),
            message: offer.message().map(str::to_string),
            status: offer.status(),
            counter_amount: offer.counter_amount(),
            counter_message: offer.counter_message().map(str::to_string),
            seller_response: offer.seller_response().map(str::to_string),
            valid_until: offer.valid_until(),
            transaction_id: offer.transaction_id(),
            created_at: offer.created_at(),
            updated_at: offer.updated_at(),
            responded_at: offer.responded_at(),
            accepted_at: offer.accepted_at(),
        }
    }
}

/// A transaction as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: TransactionId,
    /// The accepted offer.
    pub offer_id: OfferId,
    /// Property ID.
    pub property_id: PropertyId,
    /// Buyer.
    pub buyer_id: UserId,
    /// Seller.
    pub seller_id: UserId,
    /// Final price.
    pub agreed_price: Amount,
    /// Status.
    pub status: String,
    /// Creation time.
    pub created_at: Timestamp,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id(),
            offer_id: tx.offer_id(),
            property_id: tx.property_id().clone(),
            buyer_id: tx.buyer_id().clone(),
            seller_id: tx.seller_id().clone(),
            agreed_price: tx.agreed_price(),
            status: tx.status().as_str().to_string(),
            created_at: tx.created_at(),
        }
    }
}

/// Result of an acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceResponse {
    /// The accepted offer.
    pub offer: OfferResponse,
    /// The created transaction.
    pub transaction: TransactionResponse,
    /// Competing offers rejected by this acceptance.
    pub superseded: Vec<OfferId>,
}

impl From<&AcceptedOffer> for AcceptanceResponse {
    fn from(accepted: &AcceptedOffer) -> Self {
        Self {
            offer: OfferResponse::from(&accepted.offer),
            transaction: TransactionResponse::from(&accepted.transaction),
            superseded: accepted.superseded.clone(),
        }
    }
}

/// Result of `GET /properties/{id}/offers/active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveOfferResponse {
    /// Whether the caller holds an active offer on the property.
    pub has_active_offer: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when the server answers.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since start.
    pub uptime_secs: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /api/v1/health`
#[allow(clippy::unused_async)]
pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// `POST /api/v1/offers`
pub async fn submit_offer(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    body: Bytes,
) -> ApiResult<OfferResponse> {
    let request: SubmitOfferRequest = parse_required_body(&body)?;
    let request = SubmitOffer::try_from(request).map_err(NegotiationError::from)?;
    let offer = state.engine.submit_offer(&caller, request).await?;
    created(OfferResponse::from(&offer))
}

/// `GET /api/v1/offers?role=buyer|seller`
pub async fn list_offers(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    Query(query): Query<RoleQuery>,
) -> ApiResult<Vec<OfferResponse>> {
    let role = match query.role.as_deref() {
        None => ActorRole::Buyer,
        Some(raw) => raw.parse::<ActorRole>().map_err(ApiError::Malformed)?,
    };
    let offers = state.engine.list_offers_for_actor(&caller, role).await?;
    ok(offers.iter().map(OfferResponse::from).collect())
}

/// `GET /api/v1/offers/{id}`
pub async fn get_offer(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<OfferResponse> {
    let offer_id = parse_offer_id(&id)?;
    let offer = state.engine.get_offer(&caller, offer_id).await?;
    ok(OfferResponse::from(&offer))
}

/// `POST /api/v1/offers/{id}/accept`
pub async fn accept_offer(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<AcceptanceResponse> {
    let offer_id = parse_offer_id(&id)?;
    let request: RespondRequest = parse_body(&body)?;
    let accepted = state
        .engine
        .accept_offer(&caller, offer_id, request.response)
        .await?;
    ok(AcceptanceResponse::from(&accepted))
}

/// `POST /api/v1/offers/{id}/accept-counter`
pub async fn accept_counter_offer(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<AcceptanceResponse> {
    let offer_id = parse_offer_id(&id)?;
    let accepted = state.engine.accept_counter_offer(&caller, offer_id).await?;
    ok(AcceptanceResponse::from(&accepted))
}

/// `POST /api/v1/offers/{id}/reject`
pub async fn reject_offer(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<OfferResponse> {
    let offer_id = parse_offer_id(&id)?;
    let request: RespondRequest = parse_body(&body)?;
    let offer = state
        .engine
        .reject_offer(&caller, offer_id, request.response)
        .await?;
    ok(OfferResponse::from(&offer))
}

/// `POST /api/v1/offers/{id}/counter`
pub async fn counter_offer(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<OfferResponse> {
    let offer_id = parse_offer_id(&id)?;
    let request: CounterRequest = parse_required_body(&body)?;
    let offer = state
        .engine
        .counter_offer(&caller, offer_id, request.counter_amount, request.message)
        .await?;
    ok(OfferResponse::from(&offer))
}

/// `POST /api/v1/offers/{id}/withdraw`
pub async fn withdraw_offer(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<OfferResponse> {
    let offer_id = parse_offer_id(&id)?;
    let offer = state.engine.withdraw_offer(&caller, offer_id).await?;
    ok(OfferResponse::from(&offer))
}

/// `GET /api/v1/offers/{id}/transaction`
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<TransactionResponse> {
    let offer_id = parse_offer_id(&id)?;
    let tx = state
        .engine
        .get_transaction_for_offer(&caller, offer_id)
        .await?;
    ok(TransactionResponse::from(&tx))
}

/// `GET /api/v1/properties/{id}/offers`
pub async fn list_property_offers(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<Vec<OfferResponse>> {
    let offers = state
        .engine
        .list_offers_for_property(&caller, &PropertyId::new(id))
        .await?;
    ok(offers.iter().map(OfferResponse::from).collect())
}

/// `GET /api/v1/properties/{id}/offers/active`
pub async fn has_active_offer(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<ActiveOfferResponse> {
    let has_active_offer = state
        .engine
        .has_active_offer(&caller, &PropertyId::new(id))
        .await?;
    ok(ActiveOfferResponse { has_active_offer })
}
