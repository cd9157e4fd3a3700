//! # shopvault
//!
//! Encryption-aware record access for a small storefront SQLite schema.
//!
//! Records are added, searched, joined, updated and deleted through a
//! generic layer that builds its statements from a static schema catalog.
//! Text fields are run through a keyed substitution cipher on every write
//! and read, as decided per field by the field policy. A missing store file
//! is recovered transparently from the most recent dated backup, or rebuilt
//! with a default administrator when there is none.
//!
//! ## Public API
//!
//! Most callers only need [`Store`], [`Table`], [`Record`], [`Selection`],
//! [`Link`] and [`Predicate`]. The connection-level functions in
//! [`access`], [`lifecycle`] and [`bulk`] are exposed for callers that
//! manage their own connections and transactions.

pub mod access;
pub mod audit;
pub mod backup;
pub mod bulk;
pub mod cipher;
pub mod config;
pub mod error;
pub mod keys;
pub mod lifecycle;
pub mod policy;
pub mod predicate;
pub mod schema;
pub mod store;
pub mod value;

pub use access::{Link, Selection};
pub use config::StoreConfig;
pub use error::ShopvaultError;
pub use keys::CipherKey;
pub use lifecycle::Recovery;
pub use policy::{EncryptionStatus, FieldCodec, FieldPolicy, Override};
pub use predicate::{Comparison, Predicate};
pub use schema::Table;
pub use store::{Role, Store};
pub use value::{FieldValue, Record};
