//! Stock ledger: keeps `medicines.stock` consistent with the purchase and
//! sale history.
//!
//! Every mutation of a purchase or sale record goes through one of the
//! functions below; nothing else in the application writes `stock` after a
//! medicine has been created. Each function runs inside a single transaction
//! and applies its stock delta as a relative SQL update
//! (`stock = stock + ?`), never a read-modify-write of a previously fetched
//! value, so concurrent submissions against the same medicine cannot lose
//! updates.
//!
//! Sale creation uses a conditional decrement
//! (`... WHERE id = ? AND stock >= ?`): the availability check and the
//! decrement are one atomic statement, so an undersized stock can never be
//! oversold through a race between check and write.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::models::{Purchase, Sale};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("medicine {0} not found")]
    MedicineNotFound(i64),
    #[error("record {0} not found")]
    RecordNotFound(i64),
    #[error("insufficient stock: requested {requested}, only {available} available")]
    InsufficientStock { requested: i64, available: i64 },
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// A purchase to record. `quantity` must already be validated as positive.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub medicine_id: i64,
    pub supplier_id: Option<i64>,
    pub quantity: i64,
    pub total_price: f64,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
}

/// Replacement values for an existing purchase. The referenced medicine is
/// immutable; editing re-points deltas, not rows.
#[derive(Debug, Clone)]
pub struct PurchaseChanges {
    pub supplier_id: Option<i64>,
    pub quantity: i64,
    pub total_price: f64,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub medicine_id: i64,
    pub customer_id: Option<i64>,
    pub quantity: i64,
    pub total_price: f64,
    pub sale_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SaleChanges {
    pub customer_id: Option<i64>,
    pub quantity: i64,
    pub total_price: f64,
    pub sale_date: NaiveDate,
    pub notes: Option<String>,
}

/// Records a purchase and increases the medicine's stock by its quantity.
pub async fn record_purchase(pool: &SqlitePool, new: NewPurchase) -> Result<Purchase, LedgerError> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE medicines SET stock = stock + $1, updated = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(new.quantity)
    .bind(new.medicine_id)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(LedgerError::MedicineNotFound(new.medicine_id));
    }

    let purchase = sqlx::query_as::<_, Purchase>(
        "INSERT INTO purchases (medicine_id, supplier_id, quantity, total_price, purchase_date, notes) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(new.medicine_id)
    .bind(new.supplier_id)
    .bind(new.quantity)
    .bind(new.total_price)
    .bind(new.purchase_date)
    .bind(new.notes)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    log::info!(
        "purchase #{} recorded: {} units of medicine {}",
        purchase.id,
        purchase.quantity,
        purchase.medicine_id
    );
    Ok(purchase)
}

/// Rewrites a purchase and shifts the medicine's stock by the quantity
/// difference (new minus old).
pub async fn amend_purchase(
    pool: &SqlitePool,
    id: i64,
    changes: PurchaseChanges,
) -> Result<Purchase, LedgerError> {
    let mut tx = pool.begin().await?;

    let old_quantity: i64 = sqlx::query_scalar("SELECT quantity FROM purchases WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LedgerError::RecordNotFound(id))?;

    let purchase = sqlx::query_as::<_, Purchase>(
        "UPDATE purchases SET supplier_id = $1, quantity = $2, total_price = $3, \
         purchase_date = $4, notes = $5 WHERE id = $6 RETURNING *",
    )
    .bind(changes.supplier_id)
    .bind(changes.quantity)
    .bind(changes.total_price)
    .bind(changes.purchase_date)
    .bind(changes.notes)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    let diff = changes.quantity - old_quantity;
    if diff != 0 {
        sqlx::query(
            "UPDATE medicines SET stock = stock + $1, updated = CURRENT_TIMESTAMP WHERE id = $2",
        )
        .bind(diff)
        .bind(purchase.medicine_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(purchase)
}

/// Deletes a purchase and reverses its stock contribution exactly.
pub async fn remove_purchase(pool: &SqlitePool, id: i64) -> Result<(), LedgerError> {
    let mut tx = pool.begin().await?;

    let deleted: (i64, i64) =
        sqlx::query_as("DELETE FROM purchases WHERE id = $1 RETURNING medicine_id, quantity")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::RecordNotFound(id))?;

    sqlx::query(
        "UPDATE medicines SET stock = stock - $1, updated = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(deleted.1)
    .bind(deleted.0)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    log::info!("purchase #{} removed, stock adjusted", id);
    Ok(())
}

/// Records a sale, decreasing the medicine's stock by its quantity.
///
/// The decrement only applies when enough stock is on hand; otherwise the
/// whole operation fails with [`LedgerError::InsufficientStock`] and nothing
/// is committed.
pub async fn record_sale(pool: &SqlitePool, new: NewSale) -> Result<Sale, LedgerError> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE medicines SET stock = stock - $1, updated = CURRENT_TIMESTAMP \
         WHERE id = $2 AND stock >= $1",
    )
    .bind(new.quantity)
    .bind(new.medicine_id)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM medicines WHERE id = $1")
            .bind(new.medicine_id)
            .fetch_optional(&mut *tx)
            .await?;
        return Err(match available {
            Some(available) => LedgerError::InsufficientStock {
                requested: new.quantity,
                available,
            },
            None => LedgerError::MedicineNotFound(new.medicine_id),
        });
    }

    let sale = sqlx::query_as::<_, Sale>(
        "INSERT INTO sales (medicine_id, customer_id, quantity, total_price, sale_date, notes) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(new.medicine_id)
    .bind(new.customer_id)
    .bind(new.quantity)
    .bind(new.total_price)
    .bind(new.sale_date)
    .bind(new.notes)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    log::info!(
        "sale #{} recorded: {} units of medicine {}",
        sale.id,
        sale.quantity,
        sale.medicine_id
    );
    Ok(sale)
}

/// Rewrites a sale and shifts the medicine's stock by minus the quantity
/// difference. A deepened decrement is guarded the same way as sale creation.
pub async fn amend_sale(
    pool: &SqlitePool,
    id: i64,
    changes: SaleChanges,
) -> Result<Sale, LedgerError> {
    let mut tx = pool.begin().await?;

    let old_quantity: i64 = sqlx::query_scalar("SELECT quantity FROM sales WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LedgerError::RecordNotFound(id))?;

    let sale = sqlx::query_as::<_, Sale>(
        "UPDATE sales SET customer_id = $1, quantity = $2, total_price = $3, \
         sale_date = $4, notes = $5 WHERE id = $6 RETURNING *",
    )
    .bind(changes.customer_id)
    .bind(changes.quantity)
    .bind(changes.total_price)
    .bind(changes.sale_date)
    .bind(changes.notes)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    let diff = changes.quantity - old_quantity;
    if diff > 0 {
        let updated = sqlx::query(
            "UPDATE medicines SET stock = stock - $1, updated = CURRENT_TIMESTAMP \
             WHERE id = $2 AND stock >= $1",
        )
        .bind(diff)
        .bind(sale.medicine_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            let available: i64 = sqlx::query_scalar("SELECT stock FROM medicines WHERE id = $1")
                .bind(sale.medicine_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(LedgerError::InsufficientStock {
                requested: diff,
                available,
            });
        }
    } else if diff < 0 {
        sqlx::query(
            "UPDATE medicines SET stock = stock + $1, updated = CURRENT_TIMESTAMP WHERE id = $2",
        )
        .bind(-diff)
        .bind(sale.medicine_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(sale)
}

/// Deletes a sale and restores its quantity to the medicine's stock.
pub async fn remove_sale(pool: &SqlitePool, id: i64) -> Result<(), LedgerError> {
    let mut tx = pool.begin().await?;

    let deleted: (i64, i64) =
        sqlx::query_as("DELETE FROM sales WHERE id = $1 RETURNING medicine_id, quantity")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::RecordNotFound(id))?;

    sqlx::query(
        "UPDATE medicines SET stock = stock + $1, updated = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(deleted.1)
    .bind(deleted.0)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    log::info!("sale #{} removed, stock restored", id);
    Ok(())
}
