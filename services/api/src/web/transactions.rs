//! services/api/src/web/transactions.rs
//!
//! Purchase flow and the buyer's library: buying a book, listing
//! purchases, hiding a purchase, and the seller's customer report.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::types::{BookDto, MessageResponse, TransactionDto};
use bookbarter_core::domain::{NewTransaction, PaymentMethod, TransactionStatus};
use bookbarter_core::workflow::validate_purchase;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub book_id: Uuid,
    pub payment_method: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PurchaseResponse {
    pub transaction: TransactionDto,
    pub message: String,
}

/// One entry in the buyer's library. The book may be `null` when the
/// listing was hard-deleted before any purchase-preserving archival.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDto {
    pub id: Uuid,
    pub book: Option<BookDto>,
    pub price: f64,
    pub status: String,
    pub transaction_date: DateTime<Utc>,
    pub payment_method: String,
}

#[derive(Serialize, ToSchema)]
pub struct PurchasesResponse {
    pub purchases: Vec<PurchaseDto>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerTransactionDto {
    pub id: Uuid,
    pub book_id: Uuid,
    pub price: f64,
    pub transaction_date: DateTime<Utc>,
    pub status: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub transactions: Vec<CustomerTransactionDto>,
}

#[derive(Serialize, ToSchema)]
pub struct CustomersResponse {
    pub customers: Vec<CustomerDto>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /transactions/purchase - Buy a book.
///
/// Digital books are never taken off the market by a purchase: the
/// transaction is recorded as completed and the listing is left untouched,
/// so any number of buyers can purchase the same book.
#[utoipa::path(
    post,
    path = "/transactions/purchase",
    request_body = PurchaseRequest,
    responses(
        (status = 201, description = "Purchase completed successfully", body = PurchaseResponse),
        (status = 400, description = "Book not purchasable or self-purchase"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn purchase_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state.store.get_book(req.book_id).await?;

    validate_purchase(&book, auth.id)?;

    let payment_method = match req.payment_method {
        None => PaymentMethod::CreditCard,
        Some(raw) => raw
            .parse::<PaymentMethod>()
            .map_err(|_| ApiError::Validation("Invalid payment method".to_string()))?,
    };

    let transaction = state
        .store
        .create_transaction(NewTransaction {
            book_id: book.id,
            seller_id: book.seller_id,
            buyer_id: auth.id,
            price: book.price,
            is_exchange: false,
            exchange_book_id: None,
            status: TransactionStatus::Completed,
            payment_method,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            transaction: transaction.into(),
            message: "Purchase completed successfully".to_string(),
        }),
    ))
}

/// GET /transactions/user-purchases - The buyer's library.
#[utoipa::path(
    get,
    path = "/transactions/user-purchases",
    responses((status = 200, description = "Non-hidden purchases", body = PurchasesResponse))
)]
pub async fn user_purchases_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let purchases = state
        .store
        .list_purchases(auth.id)
        .await?
        .into_iter()
        .map(|purchase| PurchaseDto {
            id: purchase.transaction.id,
            book: purchase.book.map(BookDto::from),
            price: purchase.transaction.price,
            status: purchase.transaction.status.as_str().to_string(),
            transaction_date: purchase.transaction.transaction_date,
            payment_method: purchase.transaction.payment_method.as_str().to_string(),
        })
        .collect();

    Ok(Json(PurchasesResponse { purchases }))
}

/// DELETE /transactions/{id}/remove - Hide a purchase from the library.
///
/// The transaction row is never deleted; only the buyer-local visibility
/// flag is set.
#[utoipa::path(
    delete,
    path = "/transactions/{id}/remove",
    responses(
        (status = 200, description = "Hidden from library", body = MessageResponse),
        (status = 403, description = "Not the buyer"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn remove_from_library_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction = state.store.get_transaction(id).await?;

    if transaction.buyer_id != auth.id {
        return Err(ApiError::Forbidden(
            "Not authorized to remove this book".to_string(),
        ));
    }

    state.store.hide_from_library(id).await?;

    Ok(Json(MessageResponse::new(
        "Book removed from your library successfully",
    )))
}

/// GET /transactions/customers - The seller's customers, grouped per buyer.
#[utoipa::path(
    get,
    path = "/transactions/customers",
    responses(
        (status = 200, description = "Customers with their transactions", body = CustomersResponse),
        (status = 403, description = "Seller access required")
    )
)]
pub async fn customers_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_seller()?;

    let sales = state.store.list_sales(auth.id).await?;

    let mut customers: Vec<CustomerDto> = Vec::new();
    let mut index_by_buyer: HashMap<Uuid, usize> = HashMap::new();

    for sale in sales {
        let Some(buyer) = sale.buyer else {
            warn!("transaction {} has no resolvable buyer", sale.transaction.id);
            continue;
        };

        let index = *index_by_buyer.entry(buyer.id).or_insert_with(|| {
            customers.push(CustomerDto {
                id: buyer.id,
                name: buyer.name.clone(),
                email: buyer.email.clone(),
                transactions: Vec::new(),
            });
            customers.len() - 1
        });

        customers[index].transactions.push(CustomerTransactionDto {
            id: sale.transaction.id,
            book_id: sale.transaction.book_id,
            price: sale.transaction.price,
            transaction_date: sale.transaction.transaction_date,
            status: sale.transaction.status.as_str().to_string(),
        });
    }

    Ok(Json(CustomersResponse { customers }))
}
