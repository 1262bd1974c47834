//! crates/bookbarter_core/src/domain.rs
//!
//! Defines the pure, core data structures for the marketplace.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when a status string stored outside the domain (database,
/// request body) does not name a known variant.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognized {kind} value: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

//=========================================================================================
// Status Enums
//=========================================================================================

/// Account role. Sellers list books; buyers purchase and trade them; admins
/// can additionally manage users and transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Seller,
    Buyer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Seller => "seller",
            Role::Buyer => "buyer",
        }
    }

    /// Whether this role is allowed to list and manage books.
    pub fn can_sell(&self) -> bool {
        matches!(self, Role::Seller | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "seller" => Ok(Role::Seller),
            "buyer" => Ok(Role::Buyer),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing availability of a book.
///
/// `Deleted` is terminal: an archived book is never resurrected, it only
/// remains readable through the transactions that reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookStatus {
    Available,
    Sold,
    Reserved,
    Deleted,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Sold => "sold",
            BookStatus::Reserved => "reserved",
            BookStatus::Deleted => "deleted",
        }
    }
}

impl FromStr for BookStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(BookStatus::Available),
            "sold" => Ok(BookStatus::Sold),
            "reserved" => Ok(BookStatus::Reserved),
            "deleted" => Ok(BookStatus::Deleted),
            other => Err(ParseEnumError::new("book status", other)),
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            "rejected" => Ok(TransactionStatus::Rejected),
            other => Err(ParseEnumError::new("transaction status", other)),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a purchase was paid for. `Exchange` is reserved for transactions
/// created by an accepted exchange request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    Exchange,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Exchange => "exchange",
            PaymentMethod::Other => "other",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "paypal" => Ok(PaymentMethod::Paypal),
            "exchange" => Ok(PaymentMethod::Exchange),
            "other" => Ok(PaymentMethod::Other),
            other => Err(ParseEnumError::new("payment method", other)),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Negotiation state of an exchange request.
///
/// `Completed` is recognized when reading stored data, but the accept path
/// stops at `Accepted`; see the transition function in `workflow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl ExchangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeStatus::Pending => "pending",
            ExchangeStatus::Accepted => "accepted",
            ExchangeStatus::Rejected => "rejected",
            ExchangeStatus::Completed => "completed",
        }
    }
}

impl FromStr for ExchangeStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExchangeStatus::Pending),
            "accepted" => Ok(ExchangeStatus::Accepted),
            "rejected" => Ok(ExchangeStatus::Rejected),
            "completed" => Ok(ExchangeStatus::Completed),
            other => Err(ParseEnumError::new("exchange status", other)),
        }
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Entities
//=========================================================================================

// Represents a user - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// The public slice of a user embedded in listings, requests, and reports.
#[derive(Debug, Clone)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// A book listing.
#[derive(Debug, Clone)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    pub seller_id: Uuid,
    pub price: f64,
    pub is_exchange_only: bool,
    pub category: String,
    pub pdf_path: String,
    pub cover_path: Option<String>,
    pub status: BookStatus,
    pub available_for_browse: bool,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// A book can be requested in trade when it is exchange-only or listed
    /// at no price.
    pub fn is_exchange_eligible(&self) -> bool {
        self.is_exchange_only || self.price <= 0.0
    }
}

/// A completed purchase or exchange. Rows are never physically deleted;
/// `removed_from_library` only hides the row from the buyer's library view.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub book_id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub price: f64,
    pub is_exchange: bool,
    pub exchange_book_id: Option<Uuid>,
    pub status: TransactionStatus,
    pub payment_method: PaymentMethod,
    pub transaction_date: DateTime<Utc>,
    pub removed_from_library: bool,
}

/// A proposed book-for-book trade.
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    pub id: Uuid,
    pub requested_book_id: Uuid,
    pub offered_book_id: Uuid,
    pub requester_id: Uuid,
    pub owner_id: Uuid,
    pub message: String,
    pub status: ExchangeStatus,
    pub created_at: DateTime<Utc>,
}

/// A message between two users about a book.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub book_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Composite Views
//=========================================================================================

// The store returns these pre-joined views wherever the REST surface embeds
// related entities. Related rows may have been deleted out from under a
// reference, hence the Options.

#[derive(Debug, Clone)]
pub struct ListedBook {
    pub book: Book,
    pub seller: Option<UserSummary>,
}

/// One entry in a buyer's library.
#[derive(Debug, Clone)]
pub struct Purchase {
    pub transaction: Transaction,
    pub book: Option<Book>,
}

/// One sale from a seller's point of view.
#[derive(Debug, Clone)]
pub struct Sale {
    pub transaction: Transaction,
    pub buyer: Option<UserSummary>,
}

/// A transaction with every referenced entity resolved, for admin reports.
#[derive(Debug, Clone)]
pub struct TransactionView {
    pub transaction: Transaction,
    pub book: Option<Book>,
    pub seller: Option<UserSummary>,
    pub buyer: Option<UserSummary>,
}

/// An exchange request with both books and the counterparty resolved.
/// For received requests the counterparty is the requester; for sent
/// requests it is the owner.
#[derive(Debug, Clone)]
pub struct ExchangeRequestView {
    pub request: ExchangeRequest,
    pub requested_book: Option<Book>,
    pub offered_book: Option<Book>,
    pub counterparty: Option<UserSummary>,
}

/// Sent and received exchange requests for one user.
#[derive(Debug, Clone)]
pub struct ExchangeInbox {
    pub received: Vec<ExchangeRequestView>,
    pub sent: Vec<ExchangeRequestView>,
}

/// The slice of a book embedded in message listings.
#[derive(Debug, Clone)]
pub struct BookSummary {
    pub id: Uuid,
    pub title: String,
    pub cover_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MessageView {
    pub message: Message,
    pub sender: Option<UserSummary>,
    pub receiver: Option<UserSummary>,
    pub book: Option<BookSummary>,
}

#[derive(Debug, Clone)]
pub struct MessageInbox {
    pub sent: Vec<MessageView>,
    pub received: Vec<MessageView>,
}

//=========================================================================================
// Write Models
//=========================================================================================

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub seller_id: Uuid,
    pub price: f64,
    pub is_exchange_only: bool,
    pub category: String,
    pub pdf_path: String,
    pub cover_path: Option<String>,
}

/// Partial update of a listing; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub is_exchange_only: Option<bool>,
    pub category: Option<String>,
    pub status: Option<BookStatus>,
}

/// Browse filter for the public book listing.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub category: Option<String>,
    pub seller_id: Option<Uuid>,
    pub exchange_only: bool,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// When set, include `sold`/`reserved` listings as well. `deleted`
    /// books are never returned by a browse query.
    pub show_all: bool,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub book_id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub price: f64,
    pub is_exchange: bool,
    pub exchange_book_id: Option<Uuid>,
    pub status: TransactionStatus,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone)]
pub struct NewExchangeRequest {
    pub requested_book_id: Uuid,
    pub offered_book_id: Uuid,
    pub requester_id: Uuid,
    pub owner_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub book_id: Uuid,
    pub content: String,
}
