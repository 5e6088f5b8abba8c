//! Purchase CRUD. Stock effects are delegated to the stock ledger; nothing
//! here writes `medicines.stock` directly.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AppState, AuthUser};
use crate::db::models::Purchase;
use crate::error::{validate_input, AppError};
use crate::ledger::{self, NewPurchase, PurchaseChanges};

#[derive(sqlx::FromRow, Serialize)]
pub struct PurchaseView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub purchase: Purchase,
    pub medicine_name: String,
    pub supplier_name: Option<String>,
}

#[derive(Serialize)]
pub struct PurchaseList {
    pub purchases: Vec<PurchaseView>,
    pub total: f64,
}

#[derive(Deserialize, Validate)]
pub struct PurchaseForm {
    pub medicine_id: i64,
    pub supplier_id: Option<i64>,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: i64,
    #[validate(range(min = 0.0, message = "total price cannot be negative"))]
    pub total_price: f64,
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct PurchaseUpdateForm {
    pub supplier_id: Option<i64>,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: i64,
    #[validate(range(min = 0.0, message = "total price cannot be negative"))]
    pub total_price: f64,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<PurchaseList>, AppError> {
    let purchases = sqlx::query_as::<_, PurchaseView>(
        "SELECT p.*, m.name AS medicine_name, s.name AS supplier_name \
         FROM purchases p \
         JOIN medicines m ON m.id = p.medicine_id \
         LEFT JOIN suppliers s ON s.id = p.supplier_id \
         ORDER BY p.purchase_date DESC, p.created DESC",
    )
    .fetch_all(&state.pool)
    .await?;

    let total: Option<f64> = sqlx::query_scalar("SELECT SUM(total_price) FROM purchases")
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(PurchaseList {
        purchases,
        total: total.unwrap_or(0.0),
    }))
}

pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(form): Json<PurchaseForm>,
) -> Result<(StatusCode, Json<Purchase>), AppError> {
    validate_input(&form)?;
    check_supplier(&state, form.supplier_id).await?;

    let purchase = ledger::record_purchase(
        &state.pool,
        NewPurchase {
            medicine_id: form.medicine_id,
            supplier_id: form.supplier_id,
            quantity: form.quantity,
            total_price: form.total_price,
            purchase_date: form.purchase_date.unwrap_or_else(|| Utc::now().date_naive()),
            notes: form.notes,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(purchase)))
}

pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(form): Json<PurchaseUpdateForm>,
) -> Result<Json<Purchase>, AppError> {
    validate_input(&form)?;
    check_supplier(&state, form.supplier_id).await?;

    let purchase = ledger::amend_purchase(
        &state.pool,
        id,
        PurchaseChanges {
            supplier_id: form.supplier_id,
            quantity: form.quantity,
            total_price: form.total_price,
            purchase_date: form.purchase_date,
            notes: form.notes,
        },
    )
    .await?;

    Ok(Json(purchase))
}

pub async fn remove(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    ledger::remove_purchase(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_supplier(state: &AppState, supplier_id: Option<i64>) -> Result<(), AppError> {
    if let Some(supplier_id) = supplier_id {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM suppliers WHERE id = $1")
            .bind(supplier_id)
            .fetch_optional(&state.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("supplier"));
        }
    }
    Ok(())
}
