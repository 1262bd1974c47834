//! services/api/src/web/rest.rs
//!
//! The health probe and the master definition for the OpenAPI
//! specification.

use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{admin, auth, books, exchanges, messages, transactions};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::get_user_handler,
        auth::update_user_handler,
        books::create_book_handler,
        books::list_books_handler,
        books::get_book_handler,
        books::update_book_handler,
        books::delete_book_handler,
        transactions::purchase_handler,
        transactions::user_purchases_handler,
        transactions::remove_from_library_handler,
        transactions::customers_handler,
        exchanges::create_exchange_request_handler,
        exchanges::list_user_exchange_requests_handler,
        exchanges::respond_exchange_request_handler,
        admin::list_users_handler,
        admin::delete_user_handler,
        admin::list_transactions_handler,
        admin::update_transaction_handler,
        messages::send_message_handler,
        messages::list_messages_handler,
        messages::mark_message_read_handler,
        messages::delete_message_handler,
    ),
    components(schemas(
        HealthResponse,
        crate::web::types::MessageResponse,
        crate::web::types::UserDto,
        crate::web::types::UserSummaryDto,
        crate::web::types::BookDto,
        crate::web::types::TransactionDto,
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::UpdateUserRequest,
        auth::RegisterResponse,
        auth::LoginResponse,
        auth::UserResponse,
        auth::UserUpdateResponse,
        books::BookListQuery,
        books::UpdateBookRequest,
        books::BookResponse,
        books::BookMutationResponse,
        books::BooksResponse,
        books::DeleteBookResponse,
        transactions::PurchaseRequest,
        transactions::PurchaseResponse,
        transactions::PurchaseDto,
        transactions::PurchasesResponse,
        transactions::CustomerTransactionDto,
        transactions::CustomerDto,
        transactions::CustomersResponse,
        exchanges::CreateExchangeRequest,
        exchanges::RespondExchangeRequest,
        exchanges::ExchangeRequestDto,
        exchanges::ExchangeMutationResponse,
        exchanges::ExchangeInboxResponse,
        admin::UsersQuery,
        admin::AdminUserDto,
        admin::AdminUsersResponse,
        admin::AdminTransactionDto,
        admin::AdminTransactionsResponse,
        admin::UpdateTransactionRequest,
        admin::TransactionMutationResponse,
        messages::SendMessageRequest,
        messages::MessageBookDto,
        messages::MessageDto,
        messages::SendMessageResponse,
        messages::MessageInboxResponse,
        messages::SuccessResponse,
    )),
    tags(
        (name = "bookbarter API", description = "REST API for the digital book marketplace.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health Check
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// GET /health - Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "API connection successful".to_string(),
        timestamp: Utc::now(),
    })
}
