//! services/api/src/web/messages.rs
//!
//! Book-scoped messaging between users.

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
use crate::web::types::UserSummaryDto;
use bookbarter_core::domain::{Message, MessageView, NewMessage};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub book_id: Uuid,
    pub content: String,
}

/// The slice of a book shown alongside a message.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageBookDto {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub book_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserSummaryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<UserSummaryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<MessageBookDto>,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            book_id: message.book_id,
            content: message.content,
            is_read: message.is_read,
            created_at: message.created_at,
            sender: None,
            receiver: None,
            book: None,
        }
    }
}

impl From<MessageView> for MessageDto {
    fn from(view: MessageView) -> Self {
        let mut dto = MessageDto::from(view.message);
        dto.sender = view.sender.map(UserSummaryDto::from);
        dto.receiver = view.receiver.map(UserSummaryDto::from);
        dto.book = view.book.map(|book| MessageBookDto {
            id: book.id,
            title: book.title,
            cover_image: book.cover_path,
        });
        dto
    }
}

#[derive(Serialize, ToSchema)]
pub struct SendMessageResponse {
    pub message: MessageDto,
    pub success: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageInboxResponse {
    pub sent: Vec<MessageDto>,
    pub received: Vec<MessageDto>,
}

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /messages - Send a message about a book.
#[utoipa::path(
    post,
    path = "/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent successfully", body = SendMessageResponse),
        (status = 400, description = "Empty content"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation(
            "Message content is required".to_string(),
        ));
    }

    // The referenced book must exist, archived or not.
    state.store.get_book(req.book_id).await?;

    let view = state
        .store
        .create_message(NewMessage {
            sender_id: auth.id,
            receiver_id: req.receiver_id,
            book_id: req.book_id,
            content: req.content,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            message: view.into(),
            success: "Message sent successfully".to_string(),
        }),
    ))
}

/// GET /messages - The user's sent and received messages.
#[utoipa::path(
    get,
    path = "/messages",
    responses((status = 200, description = "The message inbox", body = MessageInboxResponse))
)]
pub async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let inbox = state.store.list_messages(auth.id).await?;

    Ok(Json(MessageInboxResponse {
        sent: inbox.sent.into_iter().map(MessageDto::from).collect(),
        received: inbox.received.into_iter().map(MessageDto::from).collect(),
    }))
}

/// PUT /messages/{id}/read - Mark a received message as read.
#[utoipa::path(
    put,
    path = "/messages/{id}/read",
    responses(
        (status = 200, description = "Message marked as read", body = SendMessageResponse),
        (status = 403, description = "Not the receiver"),
        (status = 404, description = "Message not found")
    )
)]
pub async fn mark_message_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.store.get_message(id).await?;

    if message.receiver_id != auth.id {
        return Err(ApiError::Forbidden("Not authorized".to_string()));
    }

    let updated = state.store.mark_message_read(id).await?;

    Ok(Json(SendMessageResponse {
        message: updated.into(),
        success: "Message marked as read".to_string(),
    }))
}

/// DELETE /messages/{id} - Delete a message (sender or receiver).
#[utoipa::path(
    delete,
    path = "/messages/{id}",
    responses(
        (status = 200, description = "Message deleted successfully", body = SuccessResponse),
        (status = 403, description = "Neither sender nor receiver"),
        (status = 404, description = "Message not found")
    )
)]
pub async fn delete_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.store.get_message(id).await?;

    if message.sender_id != auth.id && message.receiver_id != auth.id {
        return Err(ApiError::Forbidden("Not authorized".to_string()));
    }

    state.store.delete_message(id).await?;

    Ok(Json(SuccessResponse {
        success: "Message deleted successfully".to_string(),
    }))
}
