//! Session-based registration, login, and logout.
//!
//! Passwords are stored as `salt$sha256(salt || password)` with a random
//! per-user salt; sessions are opaque v4 uuid tokens with a fixed TTL,
//! delivered in an HttpOnly cookie.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use validator::Validate;

use super::{session_token, AppState, SESSION_COOKIE};
use crate::error::{validate_input, AppError};

const SESSION_TTL_HOURS: i64 = 24;

#[derive(Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 3, max = 150, message = "username must be 3-150 characters"))]
    pub username: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "passwords do not match"))]
    pub password_confirm: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    validate_input(&form)?;

    let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(&form.username)
        .fetch_optional(&state.pool)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict(format!(
            "username '{}' is already taken",
            form.username
        )));
    }

    let user: UserRow = sqlx::query_as(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) \
         RETURNING id, username, email",
    )
    .bind(&form.username)
    .bind(&form.email)
    .bind(hash_password(&form.password))
    .fetch_one(&state.pool)
    .await?;

    log::info!("account created for '{}'", user.username);
    Ok((
        StatusCode::CREATED,
        Json(UserView {
            id: user.id,
            username: user.username,
            email: user.email,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> Result<Response, AppError> {
    let user: Option<(i64, String, String)> =
        sqlx::query_as("SELECT id, username, password_hash FROM users WHERE username = $1")
            .bind(&form.username)
            .fetch_optional(&state.pool)
            .await?;

    // Same rejection whether the username or the password was wrong.
    let (id, username, password_hash) = user.ok_or(AppError::Unauthorized)?;
    if !verify_password(&password_hash, &form.password) {
        return Err(AppError::Unauthorized);
    }

    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now().naive_utc() + Duration::hours(SESSION_TTL_HOURS);
    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(&token)
        .bind(id)
        .bind(expires_at)
        .execute(&state.pool)
        .await?;

    log::info!("'{}' signed in", username);
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "id": id, "username": username })),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(&token)
            .execute(&state.pool)
            .await?;
    }
    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    Ok(([(header::SET_COOKIE, cookie)], StatusCode::NO_CONTENT).into_response())
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
}

fn hash_password(password: &str) -> String {
    let salt = hex::encode(rand::random::<[u8; 16]>());
    let digest = salted_digest(&salt, password);
    format!("{salt}${digest}")
}

fn verify_password(stored: &str, password: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, digest)) => salted_digest(salt, password) == digest,
        None => false,
    }
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let stored = hash_password("correct horse battery staple");
        assert!(verify_password(&stored, "correct horse battery staple"));
        assert!(!verify_password(&stored, "wrong password"));
    }

    #[test]
    fn salts_are_unique_per_hash() {
        let a = hash_password("same password");
        let b = hash_password("same password");
        assert_ne!(a, b);
        assert!(verify_password(&a, "same password"));
        assert!(verify_password(&b, "same password"));
    }

    #[test]
    fn malformed_stored_hash_rejected() {
        assert!(!verify_password("no-separator-here", "anything"));
    }
}
