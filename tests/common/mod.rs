//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use shopvault::{EncryptionStatus, Record, Store, StoreConfig, Table};
use tempfile::TempDir;

/// A store rooted in a fresh temporary directory. Keep the `TempDir` alive
/// for as long as the store is used.
pub fn temp_store(status: EncryptionStatus) -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::with_status(StoreConfig::new(dir.path()), status).unwrap();
    store.ensure_open().unwrap();
    (dir, store)
}

pub fn supplier(company: &str) -> Record {
    Record::new()
        .with("company_name", company)
        .with("telephone_num", "02890123456")
}

pub fn product(name: &str, supplier_id: i64) -> Record {
    Record::new()
        .with("name", name)
        .with("description", "Graphite frame, 300g, it's light")
        .with("category", "Rackets")
        .with("current_stock", 12)
        .with("average_rating", 0.0)
        .with("order_cost", 40.0)
        .with("sale_price", 89.99)
        .with("total_sold", 0)
        .with("image_file", "racket.png")
        .with("supplier_id", supplier_id)
}

pub fn customer(username: &str) -> Record {
    Record::new()
        .with("username", username)
        .with("password", "s3cret!")
        .with("name", "Ada")
        .with("surname", "O'Hara")
        .with("email_address", format!("{}@example.com", username))
}

pub fn rating(score: i64, customer_id: i64, product_id: i64) -> Record {
    Record::new()
        .with("score", score)
        .with("date", "01/05/2024")
        .with("customer_id", customer_id)
        .with("product_id", product_id)
}

/// Insert a supplier and return its id.
pub fn add_supplier(store: &Store, company: &str) -> i64 {
    store.add(Table::Supplier, &supplier(company)).unwrap()
}
