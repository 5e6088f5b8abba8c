use chrono::{NaiveDate, NaiveDateTime, Utc};
use phf::phf_map;
use serde::{Deserialize, Serialize};

/// A medicine's stock is "low" at or below this many units (but above zero).
pub const LOW_STOCK_THRESHOLD: i64 = 20;

/// Known medicine categories, slug -> display label.
pub static CATEGORIES: phf::Map<&'static str, &'static str> = phf_map! {
    "antibiotic" => "Antibiotic",
    "analgesic" => "Analgesic / Pain Relief",
    "antiviral" => "Antiviral",
    "antifungal" => "Antifungal",
    "antiseptic" => "Antiseptic",
    "vitamin" => "Vitamin / Supplement",
    "cardiovascular" => "Cardiovascular",
    "dermatology" => "Dermatology",
    "gastro" => "Gastrointestinal",
    "respiratory" => "Respiratory",
    "diabetes" => "Diabetes / Endocrine",
    "other" => "Other",
};

/// Derived stock classification; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Out,
    Low,
    Ok,
}

impl StockStatus {
    pub fn for_quantity(stock: i64) -> Self {
        if stock == 0 {
            StockStatus::Out
        } else if stock <= LOW_STOCK_THRESHOLD {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created: NaiveDateTime,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub stock: i64,
    pub price: f64,
    pub expiry_date: NaiveDate,
    pub supplier_id: Option<i64>,
    pub created: NaiveDateTime,
    pub updated: NaiveDateTime,
}

impl Medicine {
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::for_quantity(self.stock)
    }

    pub fn is_expired(&self) -> bool {
        self.expiry_date < Utc::now().date_naive()
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created: NaiveDateTime,
}

/// Stock-increasing transaction from a supplier.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Purchase {
    pub id: i64,
    pub medicine_id: i64,
    pub supplier_id: Option<i64>,
    pub quantity: i64,
    pub total_price: f64,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
    pub created: NaiveDateTime,
}

/// Stock-decreasing transaction to a customer.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Sale {
    pub id: i64,
    pub medicine_id: i64,
    pub customer_id: Option<i64>,
    pub quantity: i64,
    pub total_price: f64,
    pub sale_date: NaiveDate,
    pub notes: Option<String>,
    pub created: NaiveDateTime,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct ContactSubmission {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_status_boundaries() {
        assert_eq!(StockStatus::for_quantity(0), StockStatus::Out);
        assert_eq!(StockStatus::for_quantity(1), StockStatus::Low);
        assert_eq!(StockStatus::for_quantity(15), StockStatus::Low);
        assert_eq!(StockStatus::for_quantity(20), StockStatus::Low);
        assert_eq!(StockStatus::for_quantity(21), StockStatus::Ok);
    }

    #[test]
    fn category_table_has_fallback() {
        assert!(CATEGORIES.contains_key("other"));
        assert_eq!(CATEGORIES["antibiotic"], "Antibiotic");
    }
}
