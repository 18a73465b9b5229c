//! Signup, login and current-user handlers.
//!
//! Registration flow:
//! 1. Validate email format and password length
//! 2. Check for an existing account with the same email
//! 3. Hash the password with bcrypt (DEFAULT_COST)
//! 4. Create the user and issue a 30-day JWT

use axum::{extract::State, Json};
use bcrypt::{hash, verify, DEFAULT_COST};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::sessions::create_token;
use crate::auth::users::{create_user, get_user_by_email, get_user_by_id};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::models::user::UserProfile;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if !email.contains('@') {
        return Err(ApiError::validation("Invalid email format"));
    }
    if password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

/// `POST /auth/signup`
pub async fn signup(
    State(pool): State<PgPool>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    tracing::info!("signup request for email {}", request.email);

    if request.name.trim().is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    validate_credentials(&request.email, &request.password)?;

    let email = request.email.trim().to_lowercase();
    if get_user_by_email(&pool, &email).await?.is_some() {
        return Err(ApiError::conflict("User with this email already exists"));
    }

    let password_hash = hash(&request.password, DEFAULT_COST)
        .map_err(|e| ApiError::internal(format!("password hashing failed: {e}")))?;

    let user = create_user(&pool, request.name.trim(), &email, &password_hash).await?;

    let token = create_token(user.id, user.email.clone())
        .map_err(|e| ApiError::internal(format!("token generation failed: {e}")))?;

    tracing::info!("user {} registered", user.id);
    Ok(Json(AuthResponse {
        token,
        user: user.profile(),
    }))
}

/// `POST /auth/login`
pub async fn login(
    State(pool): State<PgPool>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = request.email.trim().to_lowercase();

    // Same rejection for unknown email and wrong password: no account probing.
    let user = get_user_by_email(&pool, &email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let matches = verify(&request.password, &user.password_hash)
        .map_err(|e| ApiError::internal(format!("password verification failed: {e}")))?;
    if !matches {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let token = create_token(user.id, user.email.clone())
        .map_err(|e| ApiError::internal(format!("token generation failed: {e}")))?;

    tracing::info!("user {} logged in", user.id);
    Ok(Json(AuthResponse {
        token,
        user: user.profile(),
    }))
}

/// `GET /auth/me`
pub async fn get_me(
    State(pool): State<PgPool>,
    AuthUser(auth): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let user = get_user_by_id(&pool, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user.profile()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_email_without_at_sign() {
        assert!(validate_credentials("not-an-email", "longenough").is_err());
    }

    #[test]
    fn rejects_short_password() {
        assert!(validate_credentials("a@b.com", "short").is_err());
    }

    #[test]
    fn accepts_valid_credentials() {
        assert!(validate_credentials("a@b.com", "longenough").is_ok());
    }
}
