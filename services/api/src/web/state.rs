//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use bookbarter_core::ports::{FileStore, MarketplaceStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketplaceStore>,
    pub files: Arc<dyn FileStore>,
    pub config: Arc<Config>,
}
