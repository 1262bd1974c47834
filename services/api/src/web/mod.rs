pub mod admin;
pub mod auth;
pub mod books;
pub mod exchanges;
pub mod messages;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod transactions;
pub mod types;

// Re-export the pieces the binary needs to assemble the router.
pub use middleware::require_auth;
pub use rest::{health_handler, ApiDoc};
