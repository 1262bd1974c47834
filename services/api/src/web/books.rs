//! services/api/src/web/books.rs
//!
//! Book catalog endpoints: listing creation with file upload, browsing,
//! updates, and the delete-or-archive flow.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::types::BookDto;
use bookbarter_core::domain::{BookFilter, BookStatus, BookUpdate, NewBook, Role};
use bookbarter_core::workflow::{plan_deletion, validate_listing, DeletionOutcome};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookListQuery {
    pub category: Option<String>,
    pub seller_id: Option<Uuid>,
    pub is_exchange_only: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub show_all: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub is_exchange_only: Option<bool>,
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct BookResponse {
    pub book: BookDto,
}

#[derive(Serialize, ToSchema)]
pub struct BookMutationResponse {
    pub book: BookDto,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct BooksResponse {
    pub books: Vec<BookDto>,
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBookResponse {
    pub message: String,
    /// `"deleted"` when the row was removed, `"archived"` when it was
    /// soft-deleted because buyers still hold it.
    pub status: String,
    pub book_id: Uuid,
}

//=========================================================================================
// Upload Form Parsing
//=========================================================================================

/// The fields collected from the multipart upload form.
#[derive(Default)]
struct BookForm {
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    category: Option<String>,
    price: Option<f64>,
    is_exchange_only: bool,
    pdf: Option<Bytes>,
    cover: Option<(String, Bytes)>,
}

impl BookForm {
    async fn parse(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = BookForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            ApiError::Validation(format!("Failed to read multipart data: {e}"))
        })? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                "title" => form.title = Some(read_text(field).await?),
                "author" => form.author = Some(read_text(field).await?),
                "description" => form.description = Some(read_text(field).await?),
                "category" => form.category = Some(read_text(field).await?),
                "price" => {
                    let raw = read_text(field).await?;
                    form.price = Some(raw.parse::<f64>().map_err(|_| {
                        ApiError::Validation(format!("Invalid price: '{raw}'"))
                    })?);
                }
                "isExchangeOnly" => {
                    form.is_exchange_only = read_text(field).await? == "true";
                }
                "pdf" => {
                    if field.content_type() != Some("application/pdf") {
                        return Err(ApiError::Validation(
                            "Only PDF files are allowed".to_string(),
                        ));
                    }
                    form.pdf = Some(read_bytes(field).await?);
                }
                "image" => {
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    if !content_type.starts_with("image/") {
                        return Err(ApiError::Validation(
                            "Only image files are allowed".to_string(),
                        ));
                    }
                    let extension = image_extension(&content_type);
                    form.cover = Some((extension, read_bytes(field).await?));
                }
                // Unknown fields are ignored rather than rejected.
                _ => {}
            }
        }

        Ok(form)
    }

    fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
        value.ok_or_else(|| ApiError::Validation(format!("{name} is required")))
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read multipart data: {e}")))
}

async fn read_bytes(field: axum::extract::multipart::Field<'_>) -> Result<Bytes, ApiError> {
    field
        .bytes()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read multipart data: {e}")))
}

/// Maps an image content type onto a file extension for the stored cover.
fn image_extension(content_type: &str) -> String {
    let subtype: String = content_type
        .strip_prefix("image/")
        .unwrap_or("png")
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if subtype.is_empty() {
        "png".to_string()
    } else {
        subtype
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /books - Upload a new book listing.
///
/// Accepts multipart/form-data: the listing fields, the book PDF, and an
/// optional cover image.
#[utoipa::path(
    post,
    path = "/books",
    request_body(content_type = "multipart/form-data", description = "Listing fields plus files"),
    responses(
        (status = 201, description = "Book added successfully", body = BookMutationResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Seller access required")
    )
)]
pub async fn create_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_seller()?;

    let form = BookForm::parse(multipart).await?;

    let title = BookForm::required(form.title, "title")?;
    let author = BookForm::required(form.author, "author")?;
    let description = BookForm::required(form.description, "description")?;
    let category = BookForm::required(form.category, "category")?;
    let pdf = form
        .pdf
        .ok_or_else(|| ApiError::Validation("A PDF file is required".to_string()))?;
    let price = form.price.unwrap_or(0.0);

    validate_listing(price, form.is_exchange_only)?;

    let pdf_path = format!("/uploads/books/{}.pdf", Uuid::new_v4());
    state.files.save(&pdf_path, &pdf).await?;

    let cover_path = match form.cover {
        Some((extension, bytes)) => {
            let path = format!("/uploads/images/{}.{}", Uuid::new_v4(), extension);
            state.files.save(&path, &bytes).await?;
            Some(path)
        }
        None => None,
    };

    let book = state
        .store
        .create_book(NewBook {
            title,
            author,
            description,
            seller_id: auth.id,
            price,
            is_exchange_only: form.is_exchange_only,
            category,
            pdf_path,
            cover_path,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookMutationResponse {
            book: book.into(),
            message: "Book added successfully".to_string(),
        }),
    ))
}

/// GET /books - Browse listings with optional filters.
#[utoipa::path(
    get,
    path = "/books",
    responses((status = 200, description = "Matching books", body = BooksResponse))
)]
pub async fn list_books_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = BookFilter {
        category: query.category,
        seller_id: query.seller_id,
        exchange_only: query.is_exchange_only.as_deref() == Some("true"),
        min_price: query.min_price,
        max_price: query.max_price,
        show_all: query.show_all.as_deref() == Some("true"),
    };

    let books: Vec<BookDto> = state
        .store
        .list_books(filter)
        .await?
        .into_iter()
        .map(BookDto::from)
        .collect();

    let count = books.len();
    Ok(Json(BooksResponse { books, count }))
}

/// GET /books/{id} - Fetch a single book.
#[utoipa::path(
    get,
    path = "/books/{id}",
    responses(
        (status = 200, description = "The book", body = BookResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let listed = state.store.get_book_with_seller(id).await?;
    Ok(Json(BookResponse { book: listed.into() }))
}

/// PUT /books/{id} - Update a listing (owner or admin).
#[utoipa::path(
    put,
    path = "/books/{id}",
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated successfully", body = BookMutationResponse),
        (status = 403, description = "Not the listing owner"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_seller()?;

    let book = state.store.get_book(id).await?;
    if auth.role != Role::Admin && auth.id != book.seller_id {
        return Err(ApiError::Forbidden(
            "Not authorized to update this book".to_string(),
        ));
    }

    let status = req
        .status
        .map(|raw| {
            raw.parse::<BookStatus>()
                .map_err(|_| ApiError::Validation("Invalid status".to_string()))
        })
        .transpose()?;

    // The listing invariant must hold for the values the row will end up
    // with, not just the ones being changed.
    let price = req.price.unwrap_or(book.price);
    let is_exchange_only = req.is_exchange_only.unwrap_or(book.is_exchange_only);
    validate_listing(price, is_exchange_only)?;

    let updated = state
        .store
        .update_book(
            id,
            BookUpdate {
                title: req.title,
                author: req.author,
                description: req.description,
                price: req.price,
                is_exchange_only: req.is_exchange_only,
                category: req.category,
                status,
            },
        )
        .await?;

    Ok(Json(BookMutationResponse {
        book: updated.into(),
        message: "Book updated successfully".to_string(),
    }))
}

/// DELETE /books/{id} - Delete or archive a listing.
///
/// A book nobody has bought is removed outright, files included. A book
/// referenced by transactions is archived instead so existing buyers keep
/// access through their library.
#[utoipa::path(
    delete,
    path = "/books/{id}",
    responses(
        (status = 200, description = "Book deleted or archived", body = DeleteBookResponse),
        (status = 403, description = "Not the listing owner"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_seller()?;

    let book = state.store.get_book(id).await?;
    if auth.role != Role::Admin && auth.id != book.seller_id {
        return Err(ApiError::Forbidden(
            "Not authorized to delete this book".to_string(),
        ));
    }

    let transaction_count = state.store.count_transactions_for_book(id).await?;

    match plan_deletion(transaction_count) {
        DeletionOutcome::Archive => {
            state.store.archive_book(id).await?;
            Ok(Json(DeleteBookResponse {
                message: "Book archived successfully".to_string(),
                status: "archived".to_string(),
                book_id: id,
            }))
        }
        DeletionOutcome::HardDelete => {
            state.store.delete_book(id).await?;

            // The row is gone; losing an orphaned file is not worth
            // failing the request over.
            if let Err(e) = state.files.delete(&book.pdf_path).await {
                warn!("failed to delete book file {}: {}", book.pdf_path, e);
            }
            if let Some(cover_path) = &book.cover_path {
                if let Err(e) = state.files.delete(cover_path).await {
                    warn!("failed to delete cover image {}: {}", cover_path, e);
                }
            }

            Ok(Json(DeleteBookResponse {
                message: "Book deleted successfully".to_string(),
                status: "deleted".to_string(),
                book_id: id,
            }))
        }
    }
}
