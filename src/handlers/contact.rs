use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use super::{AppState, AuthUser};
use crate::db::models::ContactSubmission;
use crate::error::{validate_input, AppError};

#[derive(Deserialize, Validate)]
pub struct ContactForm {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
}

/// Public endpoint; the only unauthenticated write in the application.
pub async fn submit(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<(StatusCode, Json<ContactSubmission>), AppError> {
    validate_input(&form)?;

    let submission = sqlx::query_as::<_, ContactSubmission>(
        "INSERT INTO contact_submissions (name, email, message) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&form.name)
    .bind(&form.email)
    .bind(&form.message)
    .fetch_one(&state.pool)
    .await?;

    log::info!("contact message received from {}", submission.email);
    Ok((StatusCode::CREATED, Json(submission)))
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<ContactSubmission>>, AppError> {
    let submissions = sqlx::query_as::<_, ContactSubmission>(
        "SELECT * FROM contact_submissions ORDER BY created_at DESC",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(submissions))
}

pub async fn remove(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = sqlx::query("DELETE FROM contact_submissions WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("contact submission"));
    }
    Ok(StatusCode::NO_CONTENT)
}
