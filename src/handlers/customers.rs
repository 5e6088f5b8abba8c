use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AppState, AuthUser};
use crate::db::models::Customer;
use crate::error::{validate_input, AppError};

#[derive(sqlx::FromRow, Serialize)]
pub struct CustomerView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub customer: Customer,
    pub sale_count: i64,
}

#[derive(Deserialize, Default)]
pub struct CustomerFilter {
    pub q: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct CustomerForm {
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
    Query(filter): Query<CustomerFilter>,
) -> Result<Json<Vec<CustomerView>>, AppError> {
    let q = filter.q.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let customers = sqlx::query_as::<_, CustomerView>(
        "SELECT c.*, \
                (SELECT COUNT(*) FROM sales sa WHERE sa.customer_id = c.id) AS sale_count \
         FROM customers c \
         WHERE ($1 IS NULL \
                OR LOWER(c.name) LIKE '%' || LOWER($1) || '%' \
                OR LOWER(IFNULL(c.email, '')) LIKE '%' || LOWER($1) || '%' \
                OR IFNULL(c.phone, '') LIKE '%' || $1 || '%') \
         ORDER BY c.name",
    )
    .bind(q)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(customers))
}

pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(form): Json<CustomerForm>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    validate_input(&form)?;

    let customer = sqlx::query_as::<_, Customer>(
        "INSERT INTO customers (name, phone, email, address) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&form.name)
    .bind(&form.phone)
    .bind(&form.email)
    .bind(&form.address)
    .fetch_one(&state.pool)
    .await?;

    log::info!("customer '{}' added", customer.name);
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(form): Json<CustomerForm>,
) -> Result<Json<Customer>, AppError> {
    validate_input(&form)?;

    let customer = sqlx::query_as::<_, Customer>(
        "UPDATE customers SET name = $1, phone = $2, email = $3, address = $4 \
         WHERE id = $5 RETURNING *",
    )
    .bind(&form.name)
    .bind(&form.phone)
    .bind(&form.email)
    .bind(&form.address)
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound("customer"))?;

    log::info!("customer '{}' updated", customer.name);
    Ok(Json(customer))
}

pub async fn remove(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    // Sales referencing this customer keep their rows with a nulled reference.
    let name: Option<String> =
        sqlx::query_scalar("DELETE FROM customers WHERE id = $1 RETURNING name")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;

    match name {
        Some(name) => {
            log::info!("customer '{}' removed", name);
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(AppError::NotFound("customer")),
    }
}
