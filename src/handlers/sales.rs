//! Sale CRUD. Stock effects are delegated to the stock ledger, which rejects
//! a sale exceeding the medicine's current stock with a single conditional
//! decrement.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AppState, AuthUser};
use crate::db::models::Sale;
use crate::error::{validate_input, AppError};
use crate::ledger::{self, NewSale, SaleChanges};

#[derive(sqlx::FromRow, Serialize)]
pub struct SaleView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub sale: Sale,
    pub medicine_name: String,
    pub customer_name: Option<String>,
}

#[derive(Serialize)]
pub struct SaleList {
    pub sales: Vec<SaleView>,
    pub total: f64,
}

#[derive(Deserialize, Validate)]
pub struct SaleForm {
    pub medicine_id: i64,
    pub customer_id: Option<i64>,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: i64,
    #[validate(range(min = 0.0, message = "total price cannot be negative"))]
    pub total_price: f64,
    pub sale_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct SaleUpdateForm {
    pub customer_id: Option<i64>,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: i64,
    #[validate(range(min = 0.0, message = "total price cannot be negative"))]
    pub total_price: f64,
    pub sale_date: NaiveDate,
    pub notes: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<SaleList>, AppError> {
    let sales = sqlx::query_as::<_, SaleView>(
        "SELECT sa.*, m.name AS medicine_name, c.name AS customer_name \
         FROM sales sa \
         JOIN medicines m ON m.id = sa.medicine_id \
         LEFT JOIN customers c ON c.id = sa.customer_id \
         ORDER BY sa.sale_date DESC, sa.created DESC",
    )
    .fetch_all(&state.pool)
    .await?;

    let total: Option<f64> = sqlx::query_scalar("SELECT SUM(total_price) FROM sales")
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(SaleList {
        sales,
        total: total.unwrap_or(0.0),
    }))
}

pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(form): Json<SaleForm>,
) -> Result<(StatusCode, Json<Sale>), AppError> {
    validate_input(&form)?;
    check_customer(&state, form.customer_id).await?;

    let sale = ledger::record_sale(
        &state.pool,
        NewSale {
            medicine_id: form.medicine_id,
            customer_id: form.customer_id,
            quantity: form.quantity,
            total_price: form.total_price,
            sale_date: form.sale_date.unwrap_or_else(|| Utc::now().date_naive()),
            notes: form.notes,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(form): Json<SaleUpdateForm>,
) -> Result<Json<Sale>, AppError> {
    validate_input(&form)?;
    check_customer(&state, form.customer_id).await?;

    let sale = ledger::amend_sale(
        &state.pool,
        id,
        SaleChanges {
            customer_id: form.customer_id,
            quantity: form.quantity,
            total_price: form.total_price,
            sale_date: form.sale_date,
            notes: form.notes,
        },
    )
    .await?;

    Ok(Json(sale))
}

pub async fn remove(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    ledger::remove_sale(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_customer(state: &AppState, customer_id: Option<i64>) -> Result<(), AppError> {
    if let Some(customer_id) = customer_id {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&state.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("customer"));
        }
    }
    Ok(())
}
