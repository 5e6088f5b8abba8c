//! Populates a fresh database with demo data. Purchases and sales are
//! recorded through the stock ledger so the stored stock always reconciles
//! with the seeded history.

use chrono::{Duration, NaiveDate, Utc};
use sqlx::SqlitePool;

use pharmaflow::db;
use pharmaflow::ledger::{self, NewPurchase, NewSale};

struct SeedParty {
    name: &'static str,
    phone: &'static str,
    email: &'static str,
    address: &'static str,
}

struct SeedMedicine {
    name: &'static str,
    category: &'static str,
    price: f64,
    // Days from today; negative means already expired.
    expires_in: i64,
    supplier: usize,
}

// (medicine index, quantity, total price, days ago)
struct SeedPurchase(usize, i64, f64, i64);
struct SeedSale(usize, i64, f64, i64, usize);

fn suppliers() -> Vec<SeedParty> {
    vec![
        SeedParty {
            name: "MediSource Wholesale",
            phone: "+1 555 010 2200",
            email: "orders@medisource.example",
            address: "14 Harbor Road, Boston, USA",
        },
        SeedParty {
            name: "Global Pharma Supply",
            phone: "+1 555 010 7311",
            email: "sales@globalpharma.example",
            address: "3 Commerce Park, Chicago, USA",
        },
        SeedParty {
            name: "Wellness Distributors",
            phone: "+1 555 010 9044",
            email: "contact@wellnessdist.example",
            address: "92 Station Street, Denver, USA",
        },
    ]
}

fn customers() -> Vec<SeedParty> {
    vec![
        SeedParty {
            name: "Alice Romero",
            phone: "+1 555 384 1123",
            email: "alice.romero@email.example",
            address: "8 Maple Avenue",
        },
        SeedParty {
            name: "Daniel Okafor",
            phone: "+1 555 384 6677",
            email: "d.okafor@email.example",
            address: "120 Birch Lane",
        },
        SeedParty {
            name: "Mina Haddad",
            phone: "+1 555 384 9010",
            email: "mina.haddad@email.example",
            address: "45 Cedar Court",
        },
    ]
}

fn medicines() -> Vec<SeedMedicine> {
    vec![
        SeedMedicine { name: "Aspirin 100mg", category: "analgesic", price: 4.50, expires_in: 320, supplier: 0 },
        SeedMedicine { name: "Amoxicillin 500mg", category: "antibiotic", price: 12.80, expires_in: 150, supplier: 0 },
        SeedMedicine { name: "Lisinopril 10mg", category: "cardiovascular", price: 9.25, expires_in: 400, supplier: 1 },
        SeedMedicine { name: "Levothyroxine 50mcg", category: "diabetes", price: 11.40, expires_in: 25, supplier: 1 },
        SeedMedicine { name: "Metformin 850mg", category: "diabetes", price: 7.90, expires_in: 270, supplier: 1 },
        SeedMedicine { name: "Omeprazole 20mg", category: "gastro", price: 8.60, expires_in: -14, supplier: 2 },
        SeedMedicine { name: "Albuterol Inhaler", category: "respiratory", price: 24.00, expires_in: 500, supplier: 2 },
        SeedMedicine { name: "Vitamin D3 1000IU", category: "vitamin", price: 6.30, expires_in: 600, supplier: 2 },
    ]
}

fn purchases() -> Vec<SeedPurchase> {
    vec![
        SeedPurchase(0, 200, 540.00, 40),
        SeedPurchase(1, 120, 980.00, 35),
        SeedPurchase(2, 80, 470.00, 30),
        SeedPurchase(3, 60, 430.00, 28),
        SeedPurchase(4, 150, 760.00, 21),
        SeedPurchase(5, 90, 500.00, 20),
        SeedPurchase(6, 40, 640.00, 14),
        SeedPurchase(7, 30, 120.00, 10),
    ]
}

fn sales() -> Vec<SeedSale> {
    vec![
        SeedSale(0, 30, 160.00, 12, 0),
        SeedSale(1, 105, 1420.00, 9, 1),
        SeedSale(2, 70, 680.00, 7, 2),
        SeedSale(4, 40, 340.00, 5, 0),
        SeedSale(6, 12, 310.00, 3, 1),
        SeedSale(7, 30, 200.00, 1, 2),
    ]
}

async fn seed_database(pool: &SqlitePool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        log::warn!("database already contains {existing} medicines, skipping seed");
        return Ok(());
    }

    let today = Utc::now().date_naive();

    let mut supplier_ids = Vec::new();
    for supplier in suppliers() {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO suppliers (name, phone, email, address) VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(supplier.name)
        .bind(supplier.phone)
        .bind(supplier.email)
        .bind(supplier.address)
        .fetch_one(pool)
        .await?;
        supplier_ids.push(id);
    }

    let mut customer_ids = Vec::new();
    for customer in customers() {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO customers (name, phone, email, address) VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(customer.name)
        .bind(customer.phone)
        .bind(customer.email)
        .bind(customer.address)
        .fetch_one(pool)
        .await?;
        customer_ids.push(id);
    }

    // Medicines start at zero stock; the ledger builds it up below.
    let mut medicine_ids = Vec::new();
    let mut medicine_suppliers = Vec::new();
    for medicine in medicines() {
        let expiry: NaiveDate = today + Duration::days(medicine.expires_in);
        let supplier_id = supplier_ids[medicine.supplier];
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO medicines (name, category, stock, price, expiry_date, supplier_id) \
             VALUES ($1, $2, 0, $3, $4, $5) RETURNING id",
        )
        .bind(medicine.name)
        .bind(medicine.category)
        .bind(medicine.price)
        .bind(expiry)
        .bind(supplier_id)
        .fetch_one(pool)
        .await?;
        medicine_ids.push(id);
        medicine_suppliers.push(supplier_id);
    }

    for SeedPurchase(medicine, quantity, total_price, days_ago) in purchases() {
        ledger::record_purchase(
            pool,
            NewPurchase {
                medicine_id: medicine_ids[medicine],
                supplier_id: Some(medicine_suppliers[medicine]),
                quantity,
                total_price,
                purchase_date: today - Duration::days(days_ago),
                notes: None,
            },
        )
        .await?;
    }

    for SeedSale(medicine, quantity, total_price, days_ago, customer) in sales() {
        ledger::record_sale(
            pool,
            NewSale {
                medicine_id: medicine_ids[medicine],
                customer_id: Some(customer_ids[customer]),
                quantity,
                total_price,
                sale_date: today - Duration::days(days_ago),
                notes: None,
            },
        )
        .await?;
    }

    log::info!(
        "seeded {} suppliers, {} customers, {} medicines",
        supplier_ids.len(),
        customer_ids.len(),
        medicine_ids.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    dotenvy::dotenv().ok();
    let pool = db::init_db(&std::env::var("DATABASE_URL")?).await?;
    seed_database(&pool).await?;
    Ok(())
}
