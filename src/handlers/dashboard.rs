//! Dashboard summary: stock alerts, expiry alerts, recent activity, totals.

use axum::extract::State;
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use super::{AppState, AuthUser};
use crate::db::models::{Medicine, LOW_STOCK_THRESHOLD};
use crate::error::AppError;
use crate::utils::days_until;

/// Medicines expiring within this many days count as "expiring soon".
const EXPIRY_WINDOW_DAYS: i64 = 30;

const RECENT_LIMIT: i64 = 6;

#[derive(Serialize)]
pub struct DashboardSummary {
    pub total_medicines: i64,
    pub total_suppliers: i64,
    pub total_customers: i64,
    pub total_sales: i64,
    pub low_stock: Vec<Medicine>,
    pub out_of_stock: Vec<Medicine>,
    pub expired: Vec<Medicine>,
    pub expiring_soon: Vec<ExpiringMedicine>,
    pub recent_sales: Vec<RecentSale>,
    pub recent_purchases: Vec<RecentPurchase>,
    pub revenue_total: f64,
    pub purchase_total: f64,
}

#[derive(Serialize)]
pub struct ExpiringMedicine {
    #[serde(flatten)]
    pub medicine: Medicine,
    pub days_left: i64,
}

#[derive(sqlx::FromRow, Serialize)]
pub struct RecentSale {
    pub id: i64,
    pub medicine_name: String,
    pub customer_name: Option<String>,
    pub quantity: i64,
    pub total_price: f64,
    pub sale_date: NaiveDate,
}

#[derive(sqlx::FromRow, Serialize)]
pub struct RecentPurchase {
    pub id: i64,
    pub medicine_name: String,
    pub supplier_name: Option<String>,
    pub quantity: i64,
    pub total_price: f64,
    pub purchase_date: NaiveDate,
}

pub async fn summary(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<DashboardSummary>, AppError> {
    let pool = &state.pool;
    let today = Utc::now().date_naive();

    let total_medicines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines")
        .fetch_one(pool)
        .await?;
    let total_suppliers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
        .fetch_one(pool)
        .await?;
    let total_customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
        .fetch_one(pool)
        .await?;
    let total_sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
        .fetch_one(pool)
        .await?;

    let low_stock = sqlx::query_as::<_, Medicine>(
        "SELECT * FROM medicines WHERE stock > 0 AND stock <= $1 ORDER BY stock, name",
    )
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_all(pool)
    .await?;

    let out_of_stock =
        sqlx::query_as::<_, Medicine>("SELECT * FROM medicines WHERE stock = 0 ORDER BY name")
            .fetch_all(pool)
            .await?;

    let expired = sqlx::query_as::<_, Medicine>(
        "SELECT * FROM medicines WHERE expiry_date < $1 ORDER BY expiry_date",
    )
    .bind(today)
    .fetch_all(pool)
    .await?;

    let expiring_soon = sqlx::query_as::<_, Medicine>(
        "SELECT * FROM medicines WHERE expiry_date >= $1 AND expiry_date <= $2 \
         ORDER BY expiry_date",
    )
    .bind(today)
    .bind(today + Duration::days(EXPIRY_WINDOW_DAYS))
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|medicine| ExpiringMedicine {
        days_left: days_until(medicine.expiry_date),
        medicine,
    })
    .collect();

    let recent_sales = sqlx::query_as::<_, RecentSale>(
        "SELECT sa.id, m.name AS medicine_name, c.name AS customer_name, \
                sa.quantity, sa.total_price, sa.sale_date \
         FROM sales sa \
         JOIN medicines m ON m.id = sa.medicine_id \
         LEFT JOIN customers c ON c.id = sa.customer_id \
         ORDER BY sa.created DESC LIMIT $1",
    )
    .bind(RECENT_LIMIT)
    .fetch_all(pool)
    .await?;

    let recent_purchases = sqlx::query_as::<_, RecentPurchase>(
        "SELECT p.id, m.name AS medicine_name, s.name AS supplier_name, \
                p.quantity, p.total_price, p.purchase_date \
         FROM purchases p \
         JOIN medicines m ON m.id = p.medicine_id \
         LEFT JOIN suppliers s ON s.id = p.supplier_id \
         ORDER BY p.created DESC LIMIT $1",
    )
    .bind(RECENT_LIMIT)
    .fetch_all(pool)
    .await?;

    let revenue_total: Option<f64> = sqlx::query_scalar("SELECT SUM(total_price) FROM sales")
        .fetch_one(pool)
        .await?;
    let purchase_total: Option<f64> = sqlx::query_scalar("SELECT SUM(total_price) FROM purchases")
        .fetch_one(pool)
        .await?;

    Ok(Json(DashboardSummary {
        total_medicines,
        total_suppliers,
        total_customers,
        total_sales,
        low_stock,
        out_of_stock,
        expired,
        expiring_soon,
        recent_sales,
        recent_purchases,
        revenue_total: revenue_total.unwrap_or(0.0),
        purchase_total: purchase_total.unwrap_or(0.0),
    }))
}
