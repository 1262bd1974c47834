//! services/api/src/web/admin.rs
//!
//! Administrative endpoints: user management and the global transaction
//! report.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::types::{BookDto, MessageResponse, TransactionDto, UserSummaryDto};
use bookbarter_core::domain::{Role, TransactionStatus, User};
use bookbarter_core::workflow::{plan_deletion, DeletionOutcome};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct UsersQuery {
    pub role: Option<String>,
}

/// A user row enriched with role-specific statistics.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_count: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct AdminUsersResponse {
    pub users: Vec<AdminUserDto>,
}

#[derive(Serialize, ToSchema)]
pub struct AdminTransactionDto {
    pub transaction: TransactionDto,
    pub book: Option<BookDto>,
    pub seller: Option<UserSummaryDto>,
    pub buyer: Option<UserSummaryDto>,
}

#[derive(Serialize, ToSchema)]
pub struct AdminTransactionsResponse {
    pub transactions: Vec<AdminTransactionDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateTransactionRequest {
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct TransactionMutationResponse {
    pub transaction: TransactionDto,
    pub message: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

async fn enrich_user(state: &AppState, user: User) -> Result<AdminUserDto, ApiError> {
    let mut dto = AdminUserDto {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role.as_str().to_string(),
        bio: user.bio,
        created_at: user.created_at,
        purchase_count: None,
        book_count: None,
        sales_count: None,
    };

    match user.role {
        Role::Buyer => {
            dto.purchase_count = Some(state.store.count_purchases(user.id).await?);
        }
        Role::Seller => {
            dto.book_count = Some(state.store.count_books_for_seller(user.id).await?);
            dto.sales_count = Some(state.store.count_sales(user.id).await?);
        }
        Role::Admin => {}
    }

    Ok(dto)
}

/// GET /admin/users - List users, optionally filtered by role.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "Users with statistics", body = AdminUsersResponse),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<UsersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;

    // An unrecognized role filter is ignored rather than rejected.
    let role = query.role.and_then(|raw| raw.parse::<Role>().ok());

    let users = state.store.list_users(role).await?;

    let mut enriched = Vec::with_capacity(users.len());
    for user in users {
        enriched.push(enrich_user(&state, user).await?);
    }

    Ok(Json(AdminUsersResponse { users: enriched }))
}

/// DELETE /admin/users/{user_id} - Delete an account.
///
/// A seller's listings go through the same delete-or-archive flow as a
/// direct book deletion, so customers of the departing seller keep their
/// libraries.
#[utoipa::path(
    delete,
    path = "/admin/users/{user_id}",
    responses(
        (status = 200, description = "User deleted successfully", body = MessageResponse),
        (status = 400, description = "Admin tried to delete their own account"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;

    if user_id == auth.id {
        return Err(ApiError::Validation(
            "Admin cannot delete their own account".to_string(),
        ));
    }

    let target = state.store.get_user(user_id).await?;

    if target.role == Role::Seller {
        for book in state.store.list_books_by_seller(user_id).await? {
            let transaction_count = state.store.count_transactions_for_book(book.id).await?;
            match plan_deletion(transaction_count) {
                DeletionOutcome::Archive => state.store.archive_book(book.id).await?,
                DeletionOutcome::HardDelete => {
                    state.store.delete_book(book.id).await?;
                    if let Err(e) = state.files.delete(&book.pdf_path).await {
                        warn!("failed to delete book file {}: {}", book.pdf_path, e);
                    }
                    if let Some(cover_path) = &book.cover_path {
                        if let Err(e) = state.files.delete(cover_path).await {
                            warn!("failed to delete cover image {}: {}", cover_path, e);
                        }
                    }
                }
            }
        }
    }

    state.store.delete_user(user_id).await?;

    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// GET /admin/transactions - Every transaction, fully resolved.
#[utoipa::path(
    get,
    path = "/admin/transactions",
    responses(
        (status = 200, description = "All transactions", body = AdminTransactionsResponse),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_transactions_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;

    let transactions = state
        .store
        .list_all_transactions()
        .await?
        .into_iter()
        .map(|view| AdminTransactionDto {
            transaction: view.transaction.into(),
            book: view.book.map(BookDto::from),
            seller: view.seller.map(UserSummaryDto::from),
            buyer: view.buyer.map(UserSummaryDto::from),
        })
        .collect();

    Ok(Json(AdminTransactionsResponse { transactions }))
}

/// PUT /admin/transactions/{id} - Advance a transaction's status.
///
/// Book rows are left untouched on purpose: a status change on a digital
/// purchase does not put the listing back on or off the market.
#[utoipa::path(
    put,
    path = "/admin/transactions/{id}",
    request_body = UpdateTransactionRequest,
    responses(
        (status = 200, description = "Transaction updated successfully", body = TransactionMutationResponse),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn update_transaction_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;

    let status = req
        .status
        .parse::<TransactionStatus>()
        .map_err(|_| ApiError::Validation("Invalid status".to_string()))?;

    let transaction = state.store.set_transaction_status(id, status).await?;

    Ok(Json(TransactionMutationResponse {
        transaction: transaction.into(),
        message: "Transaction updated successfully".to_string(),
    }))
}
