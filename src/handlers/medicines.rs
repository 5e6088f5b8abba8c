use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AppState, AuthUser};
use crate::db::models::{Medicine, StockStatus, CATEGORIES, LOW_STOCK_THRESHOLD};
use crate::error::{validate_input, AppError};
use crate::utils::format_date;

#[derive(sqlx::FromRow)]
pub struct MedicineRow {
    #[sqlx(flatten)]
    medicine: Medicine,
    supplier_name: Option<String>,
}

/// A medicine as served to clients: the stored row plus its derived stock
/// status and expiry flag.
#[derive(Serialize)]
pub struct MedicineView {
    #[serde(flatten)]
    pub medicine: Medicine,
    pub supplier_name: Option<String>,
    pub status: StockStatus,
    pub expired: bool,
}

impl From<MedicineRow> for MedicineView {
    fn from(row: MedicineRow) -> Self {
        let status = row.medicine.stock_status();
        let expired = row.medicine.is_expired();
        MedicineView {
            medicine: row.medicine,
            supplier_name: row.supplier_name,
            status,
            expired,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct MedicineFilter {
    pub q: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct MedicineForm {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    pub category: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: i64,
    #[validate(range(min = 0.0, message = "price cannot be negative"))]
    pub price: f64,
    pub expiry_date: NaiveDate,
    pub supplier_id: Option<i64>,
}

/// Same as [`MedicineForm`] minus `stock`: after creation only the stock
/// ledger mutates a medicine's stock.
#[derive(Deserialize, Validate)]
pub struct MedicineUpdateForm {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    pub category: String,
    #[validate(range(min = 0.0, message = "price cannot be negative"))]
    pub price: f64,
    pub expiry_date: NaiveDate,
    pub supplier_id: Option<i64>,
}

#[derive(Serialize)]
pub struct MedicineDetail {
    #[serde(flatten)]
    pub medicine: MedicineView,
    pub recent_purchases: Vec<PurchaseHistoryRow>,
    pub recent_sales: Vec<SaleHistoryRow>,
}

#[derive(sqlx::FromRow, Serialize)]
pub struct PurchaseHistoryRow {
    pub id: i64,
    pub supplier_name: Option<String>,
    pub quantity: i64,
    pub total_price: f64,
    pub purchase_date: NaiveDate,
}

#[derive(sqlx::FromRow, Serialize)]
pub struct SaleHistoryRow {
    pub id: i64,
    pub customer_name: Option<String>,
    pub quantity: i64,
    pub total_price: f64,
    pub sale_date: NaiveDate,
}

#[derive(Serialize)]
pub struct CategoryView {
    pub slug: &'static str,
    pub label: &'static str,
}

const SELECT_VIEW: &str = "SELECT m.*, s.name AS supplier_name \
                           FROM medicines m LEFT JOIN suppliers s ON s.id = m.supplier_id";

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(filter): Query<MedicineFilter>,
) -> Result<Json<Vec<MedicineView>>, AppError> {
    let q = filter.q.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let category = filter.category.as_deref().filter(|s| !s.is_empty());
    let status = filter.status.as_deref().filter(|s| !s.is_empty());

    let rows = sqlx::query_as::<_, MedicineRow>(
        "SELECT m.*, s.name AS supplier_name \
         FROM medicines m LEFT JOIN suppliers s ON s.id = m.supplier_id \
         WHERE ($1 IS NULL \
                OR LOWER(m.name) LIKE '%' || LOWER($1) || '%' \
                OR LOWER(m.category) LIKE '%' || LOWER($1) || '%') \
           AND ($2 IS NULL OR m.category = $2) \
           AND ($3 IS NULL \
                OR ($3 = 'expired' AND m.expiry_date < $4) \
                OR ($3 = 'low' AND m.stock > 0 AND m.stock <= $5) \
                OR ($3 = 'out' AND m.stock = 0)) \
         ORDER BY m.name",
    )
    .bind(q)
    .bind(category)
    .bind(status)
    .bind(Utc::now().date_naive())
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(rows.into_iter().map(MedicineView::from).collect()))
}

pub async fn detail(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MedicineDetail>, AppError> {
    let medicine = fetch_view(&state, id).await?;

    let recent_purchases = sqlx::query_as::<_, PurchaseHistoryRow>(
        "SELECT p.id, s.name AS supplier_name, p.quantity, p.total_price, p.purchase_date \
         FROM purchases p LEFT JOIN suppliers s ON s.id = p.supplier_id \
         WHERE p.medicine_id = $1 ORDER BY p.purchase_date DESC, p.created DESC LIMIT 10",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    let recent_sales = sqlx::query_as::<_, SaleHistoryRow>(
        "SELECT sa.id, c.name AS customer_name, sa.quantity, sa.total_price, sa.sale_date \
         FROM sales sa LEFT JOIN customers c ON c.id = sa.customer_id \
         WHERE sa.medicine_id = $1 ORDER BY sa.sale_date DESC, sa.created DESC LIMIT 10",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(MedicineDetail {
        medicine,
        recent_purchases,
        recent_sales,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(form): Json<MedicineForm>,
) -> Result<(StatusCode, Json<MedicineView>), AppError> {
    validate_input(&form)?;
    check_category(&form.category)?;
    check_supplier(&state, form.supplier_id).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO medicines (name, category, stock, price, expiry_date, supplier_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(&form.name)
    .bind(&form.category)
    .bind(form.stock)
    .bind(form.price)
    .bind(form.expiry_date)
    .bind(form.supplier_id)
    .fetch_one(&state.pool)
    .await?;

    log::info!(
        "'{}' added to inventory (expires {})",
        form.name,
        format_date(form.expiry_date)
    );
    Ok((StatusCode::CREATED, Json(fetch_view(&state, id).await?)))
}

pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(form): Json<MedicineUpdateForm>,
) -> Result<Json<MedicineView>, AppError> {
    validate_input(&form)?;
    check_category(&form.category)?;
    check_supplier(&state, form.supplier_id).await?;

    let updated = sqlx::query(
        "UPDATE medicines SET name = $1, category = $2, price = $3, expiry_date = $4, \
         supplier_id = $5, updated = CURRENT_TIMESTAMP WHERE id = $6",
    )
    .bind(&form.name)
    .bind(&form.category)
    .bind(form.price)
    .bind(form.expiry_date)
    .bind(form.supplier_id)
    .bind(id)
    .execute(&state.pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("medicine"));
    }

    log::info!("'{}' updated", form.name);
    Ok(Json(fetch_view(&state, id).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    // Purchase/sale history goes with the medicine (ON DELETE CASCADE).
    let name: Option<String> = sqlx::query_scalar("DELETE FROM medicines WHERE id = $1 RETURNING name")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;

    match name {
        Some(name) => {
            log::info!("'{}' removed from inventory", name);
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(AppError::NotFound("medicine")),
    }
}

pub async fn categories(_user: AuthUser) -> Json<Vec<CategoryView>> {
    let mut all: Vec<CategoryView> = CATEGORIES
        .entries()
        .map(|(slug, label)| CategoryView { slug, label })
        .collect();
    all.sort_by_key(|c| c.slug);
    Json(all)
}

async fn fetch_view(state: &AppState, id: i64) -> Result<MedicineView, AppError> {
    let row = sqlx::query_as::<_, MedicineRow>(&format!("{SELECT_VIEW} WHERE m.id = $1"))
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound("medicine"))?;
    Ok(row.into())
}

fn check_category(category: &str) -> Result<(), AppError> {
    if CATEGORIES.contains_key(category) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "unknown category '{category}'"
        )))
    }
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
