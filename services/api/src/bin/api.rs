//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, DiskFileStore},
    config::Config,
    error::ApiError,
    web::{
        admin::{
            delete_user_handler, list_transactions_handler, list_users_handler,
            update_transaction_handler,
        },
        auth::{
            get_user_handler, login_handler, logout_handler, register_handler,
            update_user_handler,
        },
        books::{
            create_book_handler, delete_book_handler, get_book_handler, list_books_handler,
            update_book_handler,
        },
        exchanges::{
            create_exchange_request_handler, list_user_exchange_requests_handler,
            respond_exchange_request_handler,
        },
        health_handler,
        messages::{
            delete_message_handler, list_messages_handler, mark_message_read_handler,
            send_message_handler,
        },
        require_auth,
        state::AppState,
        transactions::{
            customers_handler, purchase_handler, remove_from_library_handler,
            user_purchases_handler,
        },
        ApiDoc,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use bookbarter_core::ports::{FileStore, MarketplaceStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = DbAdapter::new(db_pool);
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Adapters & Shared State ---
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let store: Arc<dyn MarketplaceStore> = Arc::new(db_adapter);
    let files: Arc<dyn FileStore> = Arc::new(DiskFileStore::new(config.upload_dir.clone()));

    let app_state = Arc::new(AppState {
        store,
        files,
        config: config.clone(),
    });

    // --- 4. CORS ---
    let userid_header = HeaderName::from_static("userid");
    let cors = match &config.client_url {
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CLIENT_URL: {e}")))?;
            CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT, userid_header])
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/health", get(health_handler))
        .route("/books", get(list_books_handler))
        .route("/books/{id}", get(get_book_handler));

    // Protected routes (userid header required)
    let protected_routes = Router::new()
        .route("/users/{id}", get(get_user_handler).put(update_user_handler))
        .route("/books", post(create_book_handler))
        .route(
            "/books/{id}",
            put(update_book_handler).delete(delete_book_handler),
        )
        .route("/transactions/purchase", post(purchase_handler))
        .route("/transactions/user-purchases", get(user_purchases_handler))
        .route("/transactions/customers", get(customers_handler))
        .route("/transactions/{id}/remove", delete(remove_from_library_handler))
        .route("/exchange-requests", post(create_exchange_request_handler))
        .route(
            "/exchange-requests/user",
            get(list_user_exchange_requests_handler),
        )
        .route("/exchange-requests/{id}", put(respond_exchange_request_handler))
        .route("/admin/users", get(list_users_handler))
        .route("/admin/users/{user_id}", delete(delete_user_handler))
        .route("/admin/transactions", get(list_transactions_handler))
        .route("/admin/transactions/{id}", put(update_transaction_handler))
        .route(
            "/messages",
            post(send_message_handler).get(list_messages_handler),
        )
        .route("/messages/{id}/read", put(mark_message_read_handler))
        .route("/messages/{id}", delete(delete_message_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes with static file serving for uploads.
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
