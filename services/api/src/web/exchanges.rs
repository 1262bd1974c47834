//! services/api/src/web/exchanges.rs
//!
//! The book-for-book exchange negotiation: proposing a trade, listing a
//! user's requests, and the owner's accept/reject response.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::types::{BookDto, UserSummaryDto};
use bookbarter_core::domain::{ExchangeRequest, ExchangeRequestView, NewExchangeRequest};
use bookbarter_core::ports::PortError;
use bookbarter_core::workflow::{validate_exchange_proposal, ExchangeDecision};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExchangeRequest {
    pub requested_book_id: Uuid,
    pub offered_book_id: Uuid,
    pub message: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RespondExchangeRequest {
    /// `"accepted"` or `"rejected"`.
    pub status: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequestDto {
    pub id: Uuid,
    pub requested_book_id: Uuid,
    pub offered_book_id: Uuid,
    pub requester_id: Uuid,
    pub owner_id: Uuid,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_book: Option<BookDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offered_book: Option<BookDto>,
    /// Resolved on received requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<UserSummaryDto>,
    /// Resolved on sent requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserSummaryDto>,
}

impl From<ExchangeRequest> for ExchangeRequestDto {
    fn from(request: ExchangeRequest) -> Self {
        Self {
            id: request.id,
            requested_book_id: request.requested_book_id,
            offered_book_id: request.offered_book_id,
            requester_id: request.requester_id,
            owner_id: request.owner_id,
            message: request.message,
            status: request.status.as_str().to_string(),
            created_at: request.created_at,
            requested_book: None,
            offered_book: None,
            requester: None,
            owner: None,
        }
    }
}

impl ExchangeRequestDto {
    /// Builds the populated form used in inbox listings. `received` decides
    /// whether the counterparty is presented as the requester or the owner.
    fn from_view(view: ExchangeRequestView, received: bool) -> Self {
        let counterparty = view.counterparty.map(UserSummaryDto::from);
        let mut dto = ExchangeRequestDto::from(view.request);
        dto.requested_book = view.requested_book.map(BookDto::from);
        dto.offered_book = view.offered_book.map(BookDto::from);
        if received {
            dto.requester = counterparty;
        } else {
            dto.owner = counterparty;
        }
        dto
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeMutationResponse {
    pub exchange_request: ExchangeRequestDto,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInboxResponse {
    pub received_requests: Vec<ExchangeRequestDto>,
    pub sent_requests: Vec<ExchangeRequestDto>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /exchange-requests - Propose a trade.
#[utoipa::path(
    post,
    path = "/exchange-requests",
    request_body = CreateExchangeRequest,
    responses(
        (status = 201, description = "Exchange request created successfully", body = ExchangeMutationResponse),
        (status = 400, description = "Requested book not eligible or self-exchange"),
        (status = 403, description = "Offered book not owned by requester"),
        (status = 404, description = "Either book missing")
    )
)]
pub async fn create_exchange_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateExchangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let requested = state
        .store
        .get_book(req.requested_book_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::NotFound("Requested book not found".to_string()),
            other => other.into(),
        })?;

    let offered = state
        .store
        .get_book(req.offered_book_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::NotFound("Offered book not found".to_string()),
            other => other.into(),
        })?;

    validate_exchange_proposal(&requested, &offered, auth.id)?;

    let request = state
        .store
        .create_exchange_request(NewExchangeRequest {
            requested_book_id: requested.id,
            offered_book_id: offered.id,
            requester_id: auth.id,
            owner_id: requested.seller_id,
            message: req.message.unwrap_or_default(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ExchangeMutationResponse {
            exchange_request: request.into(),
            message: "Exchange request created successfully".to_string(),
        }),
    ))
}

/// GET /exchange-requests/user - Sent and received requests.
#[utoipa::path(
    get,
    path = "/exchange-requests/user",
    responses((status = 200, description = "The user's exchange inbox", body = ExchangeInboxResponse))
)]
pub async fn list_user_exchange_requests_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let inbox = state.store.list_exchange_requests(auth.id).await?;

    Ok(Json(ExchangeInboxResponse {
        received_requests: inbox
            .received
            .into_iter()
            .map(|view| ExchangeRequestDto::from_view(view, true))
            .collect(),
        sent_requests: inbox
            .sent
            .into_iter()
            .map(|view| ExchangeRequestDto::from_view(view, false))
            .collect(),
    }))
}

/// PUT /exchange-requests/{id} - Accept or reject a pending request.
///
/// Only the owner of the requested book may respond, and only while the
/// request is still pending. Acceptance records the exchange transaction
/// and marks both books sold in a single atomic store operation; rejection
/// touches nothing but the request.
#[utoipa::path(
    put,
    path = "/exchange-requests/{id}",
    request_body = RespondExchangeRequest,
    responses(
        (status = 200, description = "Request accepted or rejected", body = ExchangeMutationResponse),
        (status = 400, description = "Invalid decision or request no longer pending"),
        (status = 403, description = "Not the request owner"),
        (status = 404, description = "Exchange request not found")
    )
)]
pub async fn respond_exchange_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<RespondExchangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let decision = ExchangeDecision::parse(&req.status)?;

    let request = state.store.get_exchange_request(id).await?;

    if request.owner_id != auth.id {
        return Err(ApiError::Forbidden(
            "Not authorized to respond to this request".to_string(),
        ));
    }

    // Fail fast on requests that were already resolved; the store applies
    // the same guard inside its transaction for the concurrent case.
    request.status.respond(decision)?;

    let (request, message) = match decision {
        ExchangeDecision::Accept => {
            let (request, _transaction) = state.store.accept_exchange(id).await?;
            (request, "Exchange request accepted")
        }
        ExchangeDecision::Reject => {
            let request = state.store.reject_exchange(id).await?;
            (request, "Exchange request rejected")
        }
    };

    Ok(Json(ExchangeMutationResponse {
        exchange_request: request.into(),
        message: message.to_string(),
    }))
}
