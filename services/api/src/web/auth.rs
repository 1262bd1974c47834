//! services/api/src/web/auth.rs
//!
//! Account endpoints: registration, login, logout, and profile access.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::types::{MessageResponse, UserDto};
use bookbarter_core::domain::{NewUser, ProfileUpdate, Role};
use bookbarter_core::ports::PortError;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

#[derive(serde::Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserDto,
    pub msg: String,
}

#[derive(serde::Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserDto,
    pub message: String,
}

#[derive(serde::Serialize, ToSchema)]
pub struct UserResponse {
    pub user: UserDto,
}

#[derive(serde::Serialize, ToSchema)]
pub struct UserUpdateResponse {
    pub user: UserDto,
    pub message: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /register - Create a new user account
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Invalid role or duplicate email"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = req
        .role
        .parse::<Role>()
        .map_err(|_| ApiError::Validation("Invalid role".to_string()))?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })?
        .to_string();

    let user = state
        .store
        .create_user(NewUser {
            name: req.name,
            email: req.email,
            hashed_password: password_hash,
            role,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: user.into(),
            msg: "User registered successfully.".to_string(),
        }),
    ))
}

/// POST /login - Login with existing account
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Unknown user"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = state
        .store
        .get_user_by_email(&req.email)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::Validation("User not found.".to_string()),
            other => other.into(),
        })?;

    let parsed_hash = PasswordHash::new(&credentials.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(ApiError::Unauthorized("Authentication failed".to_string()));
    }

    let user = state.store.get_user(credentials.user_id).await?;

    Ok(Json(LoginResponse {
        user: user.into(),
        message: "Login successful.".to_string(),
    }))
}

/// POST /logout
///
/// Identity lives in the `userid` header, so there is no server-side
/// session to tear down; the endpoint exists for client symmetry.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 200, description = "Logout successful", body = MessageResponse))
)]
pub async fn logout_handler() -> Json<MessageResponse> {
    Json(MessageResponse::new("Logged out successfully"))
}

/// GET /users/{id} - Fetch a user profile
#[utoipa::path(
    get,
    path = "/users/{id}",
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.store.get_user(id).await?;
    Ok(Json(UserResponse { user: user.into() }))
}

/// PUT /users/{id} - Update a profile (self or admin)
#[utoipa::path(
    put,
    path = "/users/{id}",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserUpdateResponse),
        (status = 403, description = "Not the profile owner"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if auth.role != Role::Admin && auth.id != id {
        return Err(ApiError::Forbidden(
            "Not authorized to update this user".to_string(),
        ));
    }

    let user = state
        .store
        .update_user(
            id,
            ProfileUpdate {
                name: req.name,
                email: req.email,
                bio: req.bio,
            },
        )
        .await?;

    Ok(Json(UserUpdateResponse {
        user: user.into(),
        message: "User updated successfully".to_string(),
    }))
}
