//! crates/bookbarter_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the marketplace core.
//! These traits form the boundary of the hexagonal architecture, allowing
//! the core to stay independent of the concrete database and file storage.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Book, BookFilter, BookUpdate, ExchangeInbox, ExchangeRequest, ListedBook, Message,
    MessageInbox, MessageView, NewBook, NewExchangeRequest, NewMessage, NewTransaction, NewUser,
    ProfileUpdate, Purchase, Role, Sale, Transaction, TransactionStatus, TransactionView, User,
    UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors of the backing store.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A guarded write observed a state it cannot transition from, e.g. a
    /// second response to an exchange request that is no longer pending.
    #[error("Conflicting update: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Marketplace Store Port
//=========================================================================================

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn get_user(&self, id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn update_user(&self, id: Uuid, update: ProfileUpdate) -> PortResult<User>;

    async fn list_users(&self, role: Option<Role>) -> PortResult<Vec<User>>;

    async fn delete_user(&self, id: Uuid) -> PortResult<()>;

    async fn count_purchases(&self, buyer_id: Uuid) -> PortResult<i64>;

    async fn count_books_for_seller(&self, seller_id: Uuid) -> PortResult<i64>;

    async fn count_sales(&self, seller_id: Uuid) -> PortResult<i64>;

    // --- Books ---
    async fn create_book(&self, book: NewBook) -> PortResult<Book>;

    async fn get_book(&self, id: Uuid) -> PortResult<Book>;

    async fn get_book_with_seller(&self, id: Uuid) -> PortResult<ListedBook>;

    async fn list_books(&self, filter: BookFilter) -> PortResult<Vec<ListedBook>>;

    async fn list_books_by_seller(&self, seller_id: Uuid) -> PortResult<Vec<Book>>;

    async fn update_book(&self, id: Uuid, update: BookUpdate) -> PortResult<Book>;

    /// Hard-deletes the row. Only valid when no transaction references the
    /// book; the handler decides via `workflow::plan_deletion`.
    async fn delete_book(&self, id: Uuid) -> PortResult<()>;

    /// Soft-delete: status `deleted`, hidden from browsing, row retained.
    async fn archive_book(&self, id: Uuid) -> PortResult<()>;

    async fn count_transactions_for_book(&self, book_id: Uuid) -> PortResult<i64>;

    // --- Transactions ---
    async fn create_transaction(&self, transaction: NewTransaction) -> PortResult<Transaction>;

    async fn get_transaction(&self, id: Uuid) -> PortResult<Transaction>;

    /// The buyer's library: non-hidden purchases, newest first.
    async fn list_purchases(&self, buyer_id: Uuid) -> PortResult<Vec<Purchase>>;

    /// Sets the buyer-local hide flag; the row itself is never deleted.
    async fn hide_from_library(&self, transaction_id: Uuid) -> PortResult<()>;

    async fn list_sales(&self, seller_id: Uuid) -> PortResult<Vec<Sale>>;

    async fn list_all_transactions(&self) -> PortResult<Vec<TransactionView>>;

    async fn set_transaction_status(
        &self,
        id: Uuid,
        status: TransactionStatus,
    ) -> PortResult<Transaction>;

    // --- Exchange Requests ---
    async fn create_exchange_request(
        &self,
        request: NewExchangeRequest,
    ) -> PortResult<ExchangeRequest>;

    async fn get_exchange_request(&self, id: Uuid) -> PortResult<ExchangeRequest>;

    async fn list_exchange_requests(&self, user_id: Uuid) -> PortResult<ExchangeInbox>;

    /// Atomically flips a pending request to `accepted`, records the
    /// exchange transaction, and marks both books `sold`. Fails with
    /// `Conflict` when the request is no longer pending, leaving every row
    /// untouched.
    async fn accept_exchange(&self, id: Uuid) -> PortResult<(ExchangeRequest, Transaction)>;

    /// Flips a pending request to `rejected`. Books are untouched. Fails
    /// with `Conflict` when the request is no longer pending.
    async fn reject_exchange(&self, id: Uuid) -> PortResult<ExchangeRequest>;

    // --- Messages ---
    async fn create_message(&self, message: NewMessage) -> PortResult<MessageView>;

    async fn get_message(&self, id: Uuid) -> PortResult<Message>;

    async fn list_messages(&self, user_id: Uuid) -> PortResult<MessageInbox>;

    async fn mark_message_read(&self, id: Uuid) -> PortResult<Message>;

    async fn delete_message(&self, id: Uuid) -> PortResult<()>;
}

//=========================================================================================
// File Store Port
//=========================================================================================

/// Storage for uploaded book content and cover images, addressed by the
/// relative path recorded on the book row.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn save(&self, relative_path: &str, bytes: &[u8]) -> PortResult<()>;

    /// Removing a file that is already gone is not an error.
    async fn delete(&self, relative_path: &str) -> PortResult<()>;
}
