//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `MarketplaceStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Queries use the runtime API rather than the compile-time macros so the
//! workspace builds without a reachable database. Status columns are stored
//! as text and decoded through the domain enums' `FromStr` impls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use bookbarter_core::domain::{
    Book, BookFilter, BookSummary, BookUpdate, ExchangeInbox, ExchangeRequest,
    ExchangeRequestView, ListedBook, Message, MessageInbox, MessageView, NewBook,
    NewExchangeRequest, NewMessage, NewTransaction, NewUser, ProfileUpdate, Purchase, Role, Sale,
    Transaction, TransactionStatus, TransactionView, User, UserCredentials, UserSummary,
};
use bookbarter_core::ports::{MarketplaceStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `MarketplaceStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn bad_row<E: std::fmt::Display>(e: E) -> PortError {
    PortError::Unexpected(format!("corrupt row: {e}"))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == "23505")
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, name, email, role, bio, created_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    bio: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role.parse::<Role>().map_err(bad_row)?,
            bio: self.bio,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    password_hash: String,
}

impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            hashed_password: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct UserSummaryRecord {
    id: Uuid,
    name: String,
    email: String,
}

impl UserSummaryRecord {
    fn to_domain(self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name,
            email: self.email,
        }
    }
}

const BOOK_COLUMNS: &str = "id, title, author, description, seller_id, price, is_exchange_only, \
                            category, pdf_path, cover_path, status, available_for_browse, created_at";

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    title: String,
    author: String,
    description: String,
    seller_id: Uuid,
    price: f64,
    is_exchange_only: bool,
    category: String,
    pdf_path: String,
    cover_path: Option<String>,
    status: String,
    available_for_browse: bool,
    created_at: DateTime<Utc>,
}

impl BookRecord {
    fn to_domain(self) -> PortResult<Book> {
        Ok(Book {
            id: self.id,
            title: self.title,
            author: self.author,
            description: self.description,
            seller_id: self.seller_id,
            price: self.price,
            is_exchange_only: self.is_exchange_only,
            category: self.category,
            pdf_path: self.pdf_path,
            cover_path: self.cover_path,
            status: self.status.parse().map_err(bad_row)?,
            available_for_browse: self.available_for_browse,
            created_at: self.created_at,
        })
    }
}

const TRANSACTION_COLUMNS: &str = "id, book_id, seller_id, buyer_id, price, is_exchange, \
                                   exchange_book_id, status, payment_method, transaction_date, \
                                   removed_from_library";

#[derive(FromRow)]
struct TransactionRecord {
    id: Uuid,
    book_id: Uuid,
    seller_id: Uuid,
    buyer_id: Uuid,
    price: f64,
    is_exchange: bool,
    exchange_book_id: Option<Uuid>,
    status: String,
    payment_method: String,
    transaction_date: DateTime<Utc>,
    removed_from_library: bool,
}

impl TransactionRecord {
    fn to_domain(self) -> PortResult<Transaction> {
        Ok(Transaction {
            id: self.id,
            book_id: self.book_id,
            seller_id: self.seller_id,
            buyer_id: self.buyer_id,
            price: self.price,
            is_exchange: self.is_exchange,
            exchange_book_id: self.exchange_book_id,
            status: self.status.parse().map_err(bad_row)?,
            payment_method: self.payment_method.parse().map_err(bad_row)?,
            transaction_date: self.transaction_date,
            removed_from_library: self.removed_from_library,
        })
    }
}

const EXCHANGE_COLUMNS: &str = "id, requested_book_id, offered_book_id, requester_id, owner_id, \
                                message, status, created_at";

#[derive(FromRow)]
struct ExchangeRequestRecord {
    id: Uuid,
    requested_book_id: Uuid,
    offered_book_id: Uuid,
    requester_id: Uuid,
    owner_id: Uuid,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl ExchangeRequestRecord {
    fn to_domain(self) -> PortResult<ExchangeRequest> {
        Ok(ExchangeRequest {
            id: self.id,
            requested_book_id: self.requested_book_id,
            offered_book_id: self.offered_book_id,
            requester_id: self.requester_id,
            owner_id: self.owner_id,
            message: self.message,
            status: self.status.parse().map_err(bad_row)?,
            created_at: self.created_at,
        })
    }
}

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, book_id, content, is_read, created_at";

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    book_id: Uuid,
    content: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl MessageRecord {
    fn to_domain(self) -> Message {
        Message {
            id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            book_id: self.book_id,
            content: self.content,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// Lookup Helpers
//=========================================================================================

impl DbAdapter {
    /// Resolves a referenced book, tolerating rows deleted out from under
    /// old transactions.
    async fn fetch_book_opt(&self, id: Uuid) -> PortResult<Option<Book>> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        record.map(BookRecord::to_domain).transpose()
    }

    async fn fetch_user_summary(&self, id: Uuid) -> PortResult<Option<UserSummary>> {
        let record = sqlx::query_as::<_, UserSummaryRecord>(
            "SELECT id, name, email FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(record.map(UserSummaryRecord::to_domain))
    }

    async fn fetch_book_summary(&self, id: Uuid) -> PortResult<Option<BookSummary>> {
        #[derive(FromRow)]
        struct Row {
            id: Uuid,
            title: String,
            cover_path: Option<String>,
        }

        let record =
            sqlx::query_as::<_, Row>("SELECT id, title, cover_path FROM books WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(record.map(|r| BookSummary {
            id: r.id,
            title: r.title,
            cover_path: r.cover_path,
        }))
    }

    async fn exchange_view(
        &self,
        record: ExchangeRequestRecord,
        counterparty_id: Uuid,
    ) -> PortResult<ExchangeRequestView> {
        let request = record.to_domain()?;
        let requested_book = self.fetch_book_opt(request.requested_book_id).await?;
        let offered_book = self.fetch_book_opt(request.offered_book_id).await?;
        let counterparty = self.fetch_user_summary(counterparty_id).await?;
        Ok(ExchangeRequestView {
            request,
            requested_book,
            offered_book,
            counterparty,
        })
    }

    async fn message_view(&self, record: MessageRecord) -> PortResult<MessageView> {
        let message = record.to_domain();
        let sender = self.fetch_user_summary(message.sender_id).await?;
        let receiver = self.fetch_user_summary(message.receiver_id).await?;
        let book = self.fetch_book_summary(message.book_id).await?;
        Ok(MessageView {
            message,
            sender,
            receiver,
            book,
        })
    }
}

//=========================================================================================
// `MarketplaceStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl MarketplaceStore for DbAdapter {
    // --- Users ---

    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.email)
        .bind(user.hashed_password)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PortError::Conflict("A user with this email already exists".to_string())
            } else {
                db_err(e)
            }
        })?;

        record.to_domain()
    }

    async fn get_user(&self, id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;

        record.to_domain()
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;

        Ok(record.to_domain())
    }

    async fn update_user(&self, id: Uuid, update: ProfileUpdate) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), \
             bio = COALESCE($4, bio) WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.email)
        .bind(update.bio)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;

        record.to_domain()
    }

    async fn list_users(&self, role: Option<Role>) -> PortResult<Vec<User>> {
        let records = match role {
            Some(role) => {
                sqlx::query_as::<_, UserRecord>(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at DESC"
                ))
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, UserRecord>(&format!(
                    "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        records.into_iter().map(UserRecord::to_domain).collect()
    }

    async fn delete_user(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn count_purchases(&self, buyer_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE buyer_id = $1")
            .bind(buyer_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn count_books_for_seller(&self, seller_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books WHERE seller_id = $1")
            .bind(seller_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn count_sales(&self, seller_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE seller_id = $1")
            .bind(seller_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    // --- Books ---

    async fn create_book(&self, book: NewBook) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "INSERT INTO books (id, title, author, description, seller_id, price, \
             is_exchange_only, category, pdf_path, cover_path) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(book.title)
        .bind(book.author)
        .bind(book.description)
        .bind(book.seller_id)
        .bind(book.price)
        .bind(book.is_exchange_only)
        .bind(book.category)
        .bind(book.pdf_path)
        .bind(book.cover_path)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        record.to_domain()
    }

    async fn get_book(&self, id: Uuid) -> PortResult<Book> {
        self.fetch_book_opt(id)
            .await?
            .ok_or_else(|| PortError::NotFound("Book not found".to_string()))
    }

    async fn get_book_with_seller(&self, id: Uuid) -> PortResult<ListedBook> {
        let book = self.get_book(id).await?;
        let seller = self.fetch_user_summary(book.seller_id).await?;
        Ok(ListedBook { book, seller })
    }

    async fn list_books(&self, filter: BookFilter) -> PortResult<Vec<ListedBook>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books WHERE "));

        // Browse queries never surface archived listings; `show_all` only
        // widens the view to sold/reserved books.
        if filter.show_all {
            query.push("status <> 'deleted'");
        } else {
            query.push("status = 'available'");
        }

        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(seller_id) = filter.seller_id {
            query.push(" AND seller_id = ").push_bind(seller_id);
        }
        if filter.exchange_only {
            query.push(" AND is_exchange_only = TRUE");
        }
        if let Some(min_price) = filter.min_price {
            query.push(" AND price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            query.push(" AND price <= ").push_bind(max_price);
        }
        query.push(" ORDER BY created_at DESC");

        let records = query
            .build_query_as::<BookRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut listed = Vec::with_capacity(records.len());
        for record in records {
            let book = record.to_domain()?;
            let seller = self.fetch_user_summary(book.seller_id).await?;
            listed.push(ListedBook { book, seller });
        }
        Ok(listed)
    }

    async fn list_books_by_seller(&self, seller_id: Uuid) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE seller_id = $1 ORDER BY created_at DESC"
        ))
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        records.into_iter().map(BookRecord::to_domain).collect()
    }

    async fn update_book(&self, id: Uuid, update: BookUpdate) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "UPDATE books SET title = COALESCE($2, title), author = COALESCE($3, author), \
             description = COALESCE($4, description), price = COALESCE($5, price), \
             is_exchange_only = COALESCE($6, is_exchange_only), \
             category = COALESCE($7, category), status = COALESCE($8, status) \
             WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id)
        .bind(update.title)
        .bind(update.author)
        .bind(update.description)
        .bind(update.price)
        .bind(update.is_exchange_only)
        .bind(update.category)
        .bind(update.status.map(|s| s.as_str().to_string()))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| PortError::NotFound("Book not found".to_string()))?;

        record.to_domain()
    }

    async fn delete_book(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("Book not found".to_string()));
        }
        Ok(())
    }

    async fn archive_book(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE books SET status = 'deleted', available_for_browse = FALSE WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("Book not found".to_string()));
        }
        Ok(())
    }

    async fn count_transactions_for_book(&self, book_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE book_id = $1")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    // --- Transactions ---

    async fn create_transaction(&self, transaction: NewTransaction) -> PortResult<Transaction> {
        let record = sqlx::query_as::<_, TransactionRecord>(&format!(
            "INSERT INTO transactions (id, book_id, seller_id, buyer_id, price, is_exchange, \
             exchange_book_id, status, payment_method) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(transaction.book_id)
        .bind(transaction.seller_id)
        .bind(transaction.buyer_id)
        .bind(transaction.price)
        .bind(transaction.is_exchange)
        .bind(transaction.exchange_book_id)
        .bind(transaction.status.as_str())
        .bind(transaction.payment_method.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        record.to_domain()
    }

    async fn get_transaction(&self, id: Uuid) -> PortResult<Transaction> {
        let record = sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| PortError::NotFound("Transaction not found".to_string()))?;

        record.to_domain()
    }

    async fn list_purchases(&self, buyer_id: Uuid) -> PortResult<Vec<Purchase>> {
        let records = sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE buyer_id = $1 AND removed_from_library = FALSE \
             ORDER BY transaction_date DESC"
        ))
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut purchases = Vec::with_capacity(records.len());
        for record in records {
            let transaction = record.to_domain()?;
            // The book may have been archived or hard-deleted since the
            // purchase; the library entry survives regardless.
            let book = self.fetch_book_opt(transaction.book_id).await?;
            purchases.push(Purchase { transaction, book });
        }
        Ok(purchases)
    }

    async fn hide_from_library(&self, transaction_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE transactions SET removed_from_library = TRUE WHERE id = $1",
        )
        .bind(transaction_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("Transaction not found".to_string()));
        }
        Ok(())
    }

    async fn list_sales(&self, seller_id: Uuid) -> PortResult<Vec<Sale>> {
        let records = sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE seller_id = $1 \
             ORDER BY transaction_date DESC"
        ))
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut sales = Vec::with_capacity(records.len());
        for record in records {
            let transaction = record.to_domain()?;
            let buyer = self.fetch_user_summary(transaction.buyer_id).await?;
            sales.push(Sale { transaction, buyer });
        }
        Ok(sales)
    }

    async fn list_all_transactions(&self) -> PortResult<Vec<TransactionView>> {
        let records = sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY transaction_date DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut views = Vec::with_capacity(records.len());
        for record in records {
            let transaction = record.to_domain()?;
            let book = self.fetch_book_opt(transaction.book_id).await?;
            let seller = self.fetch_user_summary(transaction.seller_id).await?;
            let buyer = self.fetch_user_summary(transaction.buyer_id).await?;
            views.push(TransactionView {
                transaction,
                book,
                seller,
                buyer,
            });
        }
        Ok(views)
    }

    async fn set_transaction_status(
        &self,
        id: Uuid,
        status: TransactionStatus,
    ) -> PortResult<Transaction> {
        let record = sqlx::query_as::<_, TransactionRecord>(&format!(
            "UPDATE transactions SET status = $2 WHERE id = $1 RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| PortError::NotFound("Transaction not found".to_string()))?;

        record.to_domain()
    }

    // --- Exchange Requests ---

    async fn create_exchange_request(
        &self,
        request: NewExchangeRequest,
    ) -> PortResult<ExchangeRequest> {
        let record = sqlx::query_as::<_, ExchangeRequestRecord>(&format!(
            "INSERT INTO exchange_requests (id, requested_book_id, offered_book_id, \
             requester_id, owner_id, message) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {EXCHANGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(request.requested_book_id)
        .bind(request.offered_book_id)
        .bind(request.requester_id)
        .bind(request.owner_id)
        .bind(request.message)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        record.to_domain()
    }

    async fn get_exchange_request(&self, id: Uuid) -> PortResult<ExchangeRequest> {
        let record = sqlx::query_as::<_, ExchangeRequestRecord>(&format!(
            "SELECT {EXCHANGE_COLUMNS} FROM exchange_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| PortError::NotFound("Exchange request not found".to_string()))?;

        record.to_domain()
    }

    async fn list_exchange_requests(&self, user_id: Uuid) -> PortResult<ExchangeInbox> {
        let received_records = sqlx::query_as::<_, ExchangeRequestRecord>(&format!(
            "SELECT {EXCHANGE_COLUMNS} FROM exchange_requests WHERE owner_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let sent_records = sqlx::query_as::<_, ExchangeRequestRecord>(&format!(
            "SELECT {EXCHANGE_COLUMNS} FROM exchange_requests WHERE requester_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut received = Vec::with_capacity(received_records.len());
        for record in received_records {
            let counterparty_id = record.requester_id;
            received.push(self.exchange_view(record, counterparty_id).await?);
        }

        let mut sent = Vec::with_capacity(sent_records.len());
        for record in sent_records {
            let counterparty_id = record.owner_id;
            sent.push(self.exchange_view(record, counterparty_id).await?);
        }

        Ok(ExchangeInbox { received, sent })
    }

    async fn accept_exchange(&self, id: Uuid) -> PortResult<(ExchangeRequest, Transaction)> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Guarded transition: only a still-pending request can be accepted.
        // A concurrent response sees zero rows here and the whole
        // transaction rolls back, so the exchange can never be processed
        // twice.
        let updated = sqlx::query_as::<_, ExchangeRequestRecord>(&format!(
            "UPDATE exchange_requests SET status = 'accepted' \
             WHERE id = $1 AND status = 'pending' RETURNING {EXCHANGE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(record) = updated else {
            let current = sqlx::query_scalar::<_, String>(
                "SELECT status FROM exchange_requests WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;

            return Err(match current {
                None => PortError::NotFound("Exchange request not found".to_string()),
                Some(status) => PortError::Conflict(format!(
                    "Exchange request is no longer pending (currently {status})"
                )),
            });
        };
        let request = record.to_domain()?;

        let transaction_record = sqlx::query_as::<_, TransactionRecord>(&format!(
            "INSERT INTO transactions (id, book_id, seller_id, buyer_id, price, is_exchange, \
             exchange_book_id, status, payment_method) \
             VALUES ($1, $2, $3, $4, 0, TRUE, $5, 'completed', 'exchange') \
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(request.requested_book_id)
        .bind(request.owner_id)
        .bind(request.requester_id)
        .bind(request.offered_book_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let transaction = transaction_record.to_domain()?;

        // Both sides of the trade leave the market.
        sqlx::query("UPDATE books SET status = 'sold' WHERE id = $1 OR id = $2")
            .bind(request.requested_book_id)
            .bind(request.offered_book_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok((request, transaction))
    }

    async fn reject_exchange(&self, id: Uuid) -> PortResult<ExchangeRequest> {
        let updated = sqlx::query_as::<_, ExchangeRequestRecord>(&format!(
            "UPDATE exchange_requests SET status = 'rejected' \
             WHERE id = $1 AND status = 'pending' RETURNING {EXCHANGE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match updated {
            Some(record) => record.to_domain(),
            None => {
                let current = sqlx::query_scalar::<_, String>(
                    "SELECT status FROM exchange_requests WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

                Err(match current {
                    None => PortError::NotFound("Exchange request not found".to_string()),
                    Some(status) => PortError::Conflict(format!(
                        "Exchange request is no longer pending (currently {status})"
                    )),
                })
            }
        }
    }

    // --- Messages ---

    async fn create_message(&self, message: NewMessage) -> PortResult<MessageView> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "INSERT INTO messages (id, sender_id, receiver_id, book_id, content) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(message.book_id)
        .bind(message.content)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        self.message_view(record).await
    }

    async fn get_message(&self, id: Uuid) -> PortResult<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| PortError::NotFound("Message not found".to_string()))?;

        Ok(record.to_domain())
    }

    async fn list_messages(&self, user_id: Uuid) -> PortResult<MessageInbox> {
        let sent_records = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE sender_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let received_records = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE receiver_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut sent = Vec::with_capacity(sent_records.len());
        for record in sent_records {
            sent.push(self.message_view(record).await?);
        }
        let mut received = Vec::with_capacity(received_records.len());
        for record in received_records {
            received.push(self.message_view(record).await?);
        }

        Ok(MessageInbox { sent, received })
    }

    async fn mark_message_read(&self, id: Uuid) -> PortResult<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "UPDATE messages SET is_read = TRUE WHERE id = $1 RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| PortError::NotFound("Message not found".to_string()))?;

        Ok(record.to_domain())
    }

    async fn delete_message(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("Message not found".to_string()));
        }
        Ok(())
    }
}
