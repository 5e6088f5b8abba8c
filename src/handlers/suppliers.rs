use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AppState, AuthUser};
use crate::db::models::Supplier;
use crate::error::{validate_input, AppError};

#[derive(sqlx::FromRow, Serialize)]
pub struct SupplierView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub supplier: Supplier,
    pub medicine_count: i64,
}

#[derive(Deserialize, Default)]
pub struct SupplierFilter {
    pub q: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct SupplierForm {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    pub phone: Option<String>,
    #[validate(email(message = "invalid email address"))]
    pub email: Option<String>,
    pub address: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(filter): Query<SupplierFilter>,
) -> Result<Json<Vec<SupplierView>>, AppError> {
    let q = filter.q.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let suppliers = sqlx::query_as::<_, SupplierView>(
        "SELECT s.*, \
                (SELECT COUNT(*) FROM medicines m WHERE m.supplier_id = s.id) AS medicine_count \
         FROM suppliers s \
         WHERE ($1 IS NULL \
                OR LOWER(s.name) LIKE '%' || LOWER($1) || '%' \
                OR LOWER(IFNULL(s.email, '')) LIKE '%' || LOWER($1) || '%') \
         ORDER BY s.name",
    )
    .bind(q)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(suppliers))
}

pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(form): Json<SupplierForm>,
) -> Result<(StatusCode, Json<Supplier>), AppError> {
    validate_input(&form)?;

    let supplier = sqlx::query_as::<_, Supplier>(
        "INSERT INTO suppliers (name, phone, email, address) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&form.name)
    .bind(&form.phone)
    .bind(&form.email)
    .bind(&form.address)
    .fetch_one(&state.pool)
    .await?;

    log::info!("supplier '{}' added", supplier.name);
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(form): Json<SupplierForm>,
) -> Result<Json<Supplier>, AppError> {
    validate_input(&form)?;

    let supplier = sqlx::query_as::<_, Supplier>(
        "UPDATE suppliers SET name = $1, phone = $2, email = $3, address = $4 \
         WHERE id = $5 RETURNING *",
    )
    .bind(&form.name)
    .bind(&form.phone)
    .bind(&form.email)
    .bind(&form.address)
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound("supplier"))?;

    log::info!("supplier '{}' updated", supplier.name);
    Ok(Json(supplier))
}

pub async fn remove(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    // Dependent medicines and purchases keep their rows; the reference is
    // nulled by the schema (ON DELETE SET NULL).
    let name: Option<String> =
        sqlx::query_scalar("DELETE FROM suppliers WHERE id = $1 RETURNING name")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;

    match name {
        Some(name) => {
            log::info!("supplier '{}' removed", name);
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(AppError::NotFound("supplier")),
    }
}
