//! Error types for shopvault.
//!
//! Every variant is a distinct failure mode of the record access layer or
//! the store lifecycle. Not-found conditions are not errors: a search that
//! matches nothing returns an empty sequence.

use std::path::PathBuf;

use thiserror::Error;

/// The single error type for all shopvault operations.
#[derive(Debug, Error)]
pub enum ShopvaultError {
    /// A configuration source (encryption status file, config file) is
    /// malformed. Fatal at startup; the operator must correct it.
    #[error("configuration error: {0}")]
    Config(String),

    /// The cipher key is empty or contains characters outside the printable
    /// range.
    #[error("invalid cipher key")]
    InvalidKey,

    /// A value handed to the cipher contains a character outside the
    /// printable range (32..=126).
    #[error("unsupported character {0:?} for cipher")]
    UnsupportedCharacter(char),

    /// The named table is not part of the schema catalog.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// A field name does not exist in the table(s) the operation touches.
    #[error("unknown field {field} for {table}")]
    UnknownField { table: String, field: String },

    /// `add` was called without a value for a required non-key field.
    #[error("missing value for {table}.{field}")]
    MissingField { table: String, field: String },

    /// A write tried to supply or rewrite a primary key.
    #[error("{table}.{field} is the primary key and cannot be written")]
    ImmutableField { table: String, field: String },

    /// An ordering comparison (`<`, `<=`, `>`, `>=`) on a field whose stored
    /// values are enciphered. Ciphertext order is not plaintext order.
    #[error("{field} is enciphered and cannot be compared with {op}")]
    UnorderedField { field: String, op: &'static str },

    /// An update carried no field values.
    #[error("update of {0} has no field values")]
    EmptyUpdate(String),

    /// A join chain link does not share its field with the previous table.
    #[error("invalid join: {0}")]
    InvalidJoin(String),

    /// The store engine rejected a statement. Foreign-key violations land
    /// here and are never retried.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system failure the lifecycle could not work around.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A copied store file does not match its source byte-for-byte.
    #[error("copy does not match source: {}", .0.display())]
    BackupMismatch(PathBuf),

    /// Serialisation of configuration or audit records failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
