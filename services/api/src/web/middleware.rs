//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.
//!
//! Clients authenticate with a `userid` header. The middleware resolves it
//! against the store exactly once per request and hands the verified
//! identity to handlers through request extensions, so no handler ever
//! reads ambient auth state itself.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use bookbarter_core::domain::Role;
use bookbarter_core::ports::PortError;

/// The verified identity of the requesting user, inserted into request
/// extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Guard for endpoints that manage listings.
    pub fn require_seller(&self) -> Result<(), ApiError> {
        if self.role.can_sell() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Seller access required".to_string()))
        }
    }

    /// Guard for administrative endpoints.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }
}

/// Middleware that validates the `userid` header and loads the user.
///
/// If valid, inserts an `AuthUser` into request extensions for handlers to
/// use. If missing or unknown, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id_str = req
        .headers()
        .get("userid")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let user_id = Uuid::parse_str(user_id_str)
        .map_err(|_| ApiError::Unauthorized("Invalid userid header".to_string()))?;

    let user = state.store.get_user(user_id).await.map_err(|e| match e {
        PortError::NotFound(_) => ApiError::Unauthorized("User not found".to_string()),
        other => other.into(),
    })?;

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    });

    Ok(next.run(req).await)
}
