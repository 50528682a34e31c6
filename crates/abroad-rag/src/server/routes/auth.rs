//! Signup and login endpoints

use axum::{extract::State, Json};

use crate::auth::{hash_password, verify_password};
use crate::error::{Error, Result};
use crate::server::extract::JsonBody;
use crate::server::state::AppState;
use crate::types::{AuthResponse, CredentialsRequest};

/// POST /api/auth/signup - Register a new account
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CredentialsRequest>,
) -> Result<Json<AuthResponse>> {
    let (email, password) = request.require()?;

    if state.db().find_user_by_email(&email)?.is_some() {
        return Err(Error::Conflict("User already exists".to_string()));
    }

    let hash = hash_password(password, state.config().auth.bcrypt_cost).await?;
    // The unique index still guards against a concurrent signup
    let user = state.db().create_user(&email, &hash)?;
    let token = state.tokens().issue(user.id, &user.email)?;

    tracing::info!("Registered user {}", user.id);

    Ok(Json(AuthResponse {
        message: "Signup successful".to_string(),
        token,
        user: user.summary(),
    }))
}

/// POST /api/auth/login - Exchange credentials for a token
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CredentialsRequest>,
) -> Result<Json<AuthResponse>> {
    let (email, password) = request.require()?;

    let Some(user) = state.db().find_user_by_email(&email)? else {
        return Err(Error::unauthorized("Invalid credentials"));
    };

    if !verify_password(password, user.password_hash.clone()).await? {
        tracing::info!("Rejected login for user {}", user.id);
        return Err(Error::unauthorized("Invalid credentials"));
    }

    let token = state.tokens().issue(user.id, &user.email)?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: user.summary(),
    }))
}
