//! Bulk re-encoding of the whole store.
//!
//! Moves stored data from one encryption state to the other:
//! 1. Read each row as stored (no decoding)
//! 2. Encode or decode every eligible field with the override forced
//! 3. Write the row back by primary key
//!
//! The pass runs while the stored state and the encryption status disagree,
//! which is why it cannot follow the status and forces the transform
//! instead. Callers are responsible for running a pass only against data in
//! the opposite state: encrypting already enciphered data enciphers it twice.

use rusqlite::Connection;

use crate::access::{self, Selection};
use crate::audit::Direction;
use crate::error::ShopvaultError;
use crate::keys::CipherKey;
use crate::policy::{EncryptionStatus, FieldCodec, FieldPolicy, Override};
use crate::predicate::Predicate;
use crate::schema::Table;
use crate::value::{FieldValue, Record};

/// Re-encode every eligible field of every row through `conn`. Returns the
/// number of rows rewritten.
///
/// Does not manage a transaction; pass a transaction to make the pass
/// atomic.
pub fn transform_rows(
    conn: &Connection,
    key: &CipherKey,
    direction: Direction,
) -> Result<usize, ShopvaultError> {
    // Reads and writes go through untouched; only the forced transform below
    // changes values.
    let codec = FieldCodec::new(FieldPolicy::new(EncryptionStatus::Disabled), key);
    let policy = codec.policy();
    let mut rewritten = 0;

    for table in Table::ALL {
        let primary_key = table.schema().primary_key();
        let rows = access::select(conn, &codec, table, &Selection::All, &Predicate::All)?;

        for row in rows {
            let id = row.get(primary_key).cloned().unwrap_or(FieldValue::Null);
            let mut changes = Record::new();
            for (field, value) in row.iter() {
                if !policy.should_transform(field, Override::Force) {
                    continue;
                }
                let value = match direction {
                    Direction::Encrypt => codec.encode(field, value, Override::Force)?,
                    Direction::Decrypt => codec.decode(field, value.clone(), Override::Force)?,
                };
                changes.insert(field, value);
            }
            if changes.is_empty() {
                continue;
            }
            access::update(
                conn,
                &codec,
                table,
                &changes,
                &Predicate::eq(primary_key, id),
                Override::FollowStatus,
            )?;
            rewritten += 1;
        }
        tracing::debug!(table = %table, "table re-encoded");
    }

    tracing::info!(?direction, rows = rewritten, "bulk re-encoding complete");
    Ok(rewritten)
}

/// Encipher every eligible field of every row, atomically.
pub fn encrypt_all(conn: &mut Connection, key: &CipherKey) -> Result<usize, ShopvaultError> {
    run(conn, key, Direction::Encrypt)
}

/// Decipher every eligible field of every row, atomically.
pub fn decrypt_all(conn: &mut Connection, key: &CipherKey) -> Result<usize, ShopvaultError> {
    run(conn, key, Direction::Decrypt)
}

fn run(conn: &mut Connection, key: &CipherKey, direction: Direction) -> Result<usize, ShopvaultError> {
    let tx = conn.transaction()?;
    let rows = transform_rows(&tx, key, direction)?;
    tx.commit()?;
    Ok(rows)
}
