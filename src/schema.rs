//! The schema catalog.
//!
//! Every table is known at compile time. The first field of each table is
//! its auto-incrementing primary key, never supplied by callers. Field order
//! is fixed and used positionally when rows are decoded back into records.

use std::fmt;
use std::str::FromStr;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::ShopvaultError;

/// One column: name and its SQL type/constraint clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub constraint: &'static str,
}

/// A local field referencing a field of another table. Updates and deletes
/// of the referenced row cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub field: &'static str,
    pub references: Table,
    pub referenced_field: &'static str,
}

/// Static description of one table.
#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
    pub foreign_keys: &'static [ForeignKey],
}

impl TableSchema {
    /// The primary key field.
    pub fn primary_key(&self) -> &'static str {
        self.fields[0].name
    }

    /// Every field except the primary key, in schema order.
    pub fn non_key_fields(&self) -> impl Iterator<Item = &'static str> {
        self.fields[1..].iter().map(|f| f.name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(|f| f.name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Error for `field` not being part of this table.
    pub(crate) fn unknown(&self, field: &str) -> ShopvaultError {
        ShopvaultError::UnknownField {
            table: self.name.to_string(),
            field: field.to_string(),
        }
    }

    /// The `CREATE TABLE IF NOT EXISTS` statement for this table.
    pub fn create_statement(&self) -> String {
        let mut columns: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{} {}", f.name, f.constraint))
            .collect();
        for fk in self.foreign_keys {
            columns.push(format!(
                "FOREIGN KEY({}) REFERENCES {}({}) ON UPDATE CASCADE ON DELETE CASCADE",
                fk.field,
                fk.references.name(),
                fk.referenced_field
            ));
        }
        format!("CREATE TABLE IF NOT EXISTS {}({})", self.name, columns.join(", "))
    }
}

/// The tables of the storefront schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Customer,
    Staff,
    PaymentCard,
    Orders,
    Supplier,
    Product,
    OrderProduct,
    Ratings,
}

impl Table {
    /// Every table, parents before children, the order tables are created in.
    pub const ALL: [Table; 8] = [
        Table::Customer,
        Table::Staff,
        Table::PaymentCard,
        Table::Orders,
        Table::Supplier,
        Table::Product,
        Table::OrderProduct,
        Table::Ratings,
    ];

    pub fn schema(self) -> &'static TableSchema {
        match self {
            Self::Customer => &CUSTOMER,
            Self::Staff => &STAFF,
            Self::PaymentCard => &PAYMENT_CARD,
            Self::Orders => &ORDERS,
            Self::Supplier => &SUPPLIER,
            Self::Product => &PRODUCT,
            Self::OrderProduct => &ORDER_PRODUCT,
            Self::Ratings => &RATINGS,
        }
    }

    /// The table's name in the store.
    pub fn name(self) -> &'static str {
        self.schema().name
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = ShopvaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ShopvaultError::UnknownTable(s.to_string()))
    }
}

const fn field(name: &'static str, constraint: &'static str) -> FieldDef {
    FieldDef { name, constraint }
}

const fn fk(field: &'static str, references: Table, referenced_field: &'static str) -> ForeignKey {
    ForeignKey {
        field,
        references,
        referenced_field,
    }
}

static CUSTOMER: TableSchema = TableSchema {
    name: "Customer",
    fields: &[
        field("customer_id", "INTEGER PRIMARY KEY"),
        field("username", "char(20) NOT NULL"),
        field("password", "char(20) NOT NULL"),
        field("name", "char(20) NOT NULL"),
        field("surname", "char(20) NOT NULL"),
        field("email_address", "char(74) NOT NULL"),
    ],
    foreign_keys: &[],
};

static STAFF: TableSchema = TableSchema {
    name: "Staff",
    fields: &[
        field("staff_id", "INTEGER PRIMARY KEY"),
        field("username", "char(20) NOT NULL"),
        field("password", "char(20) NOT NULL"),
        field("name", "char(20) NOT NULL"),
        field("surname", "char(20) NOT NULL"),
        field("address", "char(50) NOT NULL"),
        field("postcode", "char(8) NOT NULL"),
        field("weekly_hours", "INTEGER NOT NULL"),
        field("email_address", "char(74) NOT NULL"),
        field("access_level", "char(10) NOT NULL"),
    ],
    foreign_keys: &[],
};

static PAYMENT_CARD: TableSchema = TableSchema {
    name: "Payment_Card",
    fields: &[
        field("payment_card_id", "INTEGER PRIMARY KEY"),
        field("card_number", "char(19) NOT NULL"),
        field("cvc", "char(3) NOT NULL"),
        field("expiry_date", "char(5) NOT NULL"),
        field("cardholder_name", "char(20) NOT NULL"),
        field("billing_address", "char(50) NOT NULL"),
        field("billing_postcode", "char(8) NOT NULL"),
        field("customer_id", "INTEGER NOT NULL"),
    ],
    foreign_keys: &[fk("customer_id", Table::Customer, "customer_id")],
};

static ORDERS: TableSchema = TableSchema {
    name: "Orders",
    fields: &[
        field("order_id", "INTEGER PRIMARY KEY"),
        field("date", "char(10) NOT NULL"),
        field("delivery_address", "char(50) NOT NULL"),
        field("delivery_postcode", "char(50) NOT NULL"),
        field("delivery_cost", "REAL NOT NULL"),
        field("total_cost", "REAL NOT NULL"),
        field("delivery_status", "char(15) NOT NULL"),
        field("customer_id", "INTEGER NOT NULL"),
        field("payment_card_id", "INTEGER NOT NULL"),
    ],
    foreign_keys: &[
        fk("customer_id", Table::Customer, "customer_id"),
        fk("payment_card_id", Table::PaymentCard, "payment_card_id"),
    ],
};

static SUPPLIER: TableSchema = TableSchema {
    name: "Supplier",
    fields: &[
        field("supplier_id", "INTEGER PRIMARY KEY"),
        field("company_name", "char(20) NOT NULL"),
        field("telephone_num", "char(11) NOT NULL"),
    ],
    foreign_keys: &[],
};

static PRODUCT: TableSchema = TableSchema {
    name: "Product",
    fields: &[
        field("product_id", "INTEGER PRIMARY KEY"),
        field("name", "CHAR(20) NOT NULL"),
        field("description", "TEXT NOT NULL"),
        field("category", "TEXT NOT NULL"),
        field("current_stock", "INTEGER NOT NULL"),
        field("average_rating", "REAL NOT NULL"),
        field("order_cost", "REAL NOT NULL"),
        field("sale_price", "REAL NOT NULL"),
        field("total_sold", "INTEGER NOT NULL"),
        field("image_file", "TEXT NOT NULL"),
        field("supplier_id", "INTEGER NOT NULL"),
    ],
    foreign_keys: &[fk("supplier_id", Table::Supplier, "supplier_id")],
};

static ORDER_PRODUCT: TableSchema = TableSchema {
    name: "Order_Product",
    fields: &[
        field("order_product_id", "INTEGER PRIMARY KEY"),
        field("quantity", "INTEGER NOT NULL"),
        field("order_id", "INTEGER NOT NULL"),
        field("product_id", "INTEGER NOT NULL"),
    ],
    foreign_keys: &[
        fk("order_id", Table::Orders, "order_id"),
        fk("product_id", Table::Product, "product_id"),
    ],
};

static RATINGS: TableSchema = TableSchema {
    name: "Ratings",
    fields: &[
        field("rating_id", "INTEGER PRIMARY KEY"),
        field("score", "INTEGER NOT NULL"),
        field("date", "char(10) NOT NULL"),
        field("customer_id", "INTEGER NOT NULL"),
        field("product_id", "INTEGER NOT NULL"),
    ],
    foreign_keys: &[
        fk("customer_id", Table::Customer, "customer_id"),
        fk("product_id", Table::Product, "product_id"),
    ],
};

/// Ensure `table` exists. Safe to call repeatedly.
pub fn create_table(conn: &Connection, table: Table) -> Result<(), ShopvaultError> {
    let statement = table.schema().create_statement();
    tracing::debug!(table = %table, "{}", statement);
    conn.execute(&statement, [])?;
    Ok(())
}

/// Ensure every catalog table exists.
pub fn create_all(conn: &Connection) -> Result<(), ShopvaultError> {
    for table in Table::ALL {
        create_table(conn, table)?;
    }
    Ok(())
}
