//! services/api/src/web/types.rs
//!
//! Shared REST payload types. The wire format is camelCase JSON; these
//! structs translate the pure domain types into it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use bookbarter_core::domain::{Book, ListedBook, Transaction, User, UserSummary};

/// The plain `{message}` acknowledgement body.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role.as_str().to_string(),
            bio: user.bio,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<UserSummary> for UserSummaryDto {
    fn from(summary: UserSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            email: summary.email,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDto {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    pub seller_id: Uuid,
    pub price: f64,
    pub is_exchange_only: bool,
    pub category: String,
    pub pdf_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub status: String,
    pub is_available_for_browse: bool,
    pub created_at: DateTime<Utc>,
    /// Present on listings where the seller was resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller: Option<UserSummaryDto>,
}

impl From<Book> for BookDto {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            description: book.description,
            seller_id: book.seller_id,
            price: book.price,
            is_exchange_only: book.is_exchange_only,
            category: book.category,
            pdf_url: book.pdf_path,
            cover_image: book.cover_path,
            status: book.status.as_str().to_string(),
            is_available_for_browse: book.available_for_browse,
            created_at: book.created_at,
            seller: None,
        }
    }
}

impl From<ListedBook> for BookDto {
    fn from(listed: ListedBook) -> Self {
        let mut dto = BookDto::from(listed.book);
        dto.seller = listed.seller.map(UserSummaryDto::from);
        dto
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: Uuid,
    pub book_id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub price: f64,
    pub is_exchange: bool,
    pub exchange_book_id: Option<Uuid>,
    pub status: String,
    pub payment_method: String,
    pub transaction_date: DateTime<Utc>,
    pub removed_from_library: bool,
}

impl From<Transaction> for TransactionDto {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            book_id: transaction.book_id,
            seller_id: transaction.seller_id,
            buyer_id: transaction.buyer_id,
            price: transaction.price,
            is_exchange: transaction.is_exchange,
            exchange_book_id: transaction.exchange_book_id,
            status: transaction.status.as_str().to_string(),
            payment_method: transaction.payment_method.as_str().to_string(),
            transaction_date: transaction.transaction_date,
            removed_from_library: transaction.removed_from_library,
        }
    }
}
