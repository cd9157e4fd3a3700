//! Store lifecycle.
//!
//! Opening a store never fails because its file is missing or unusable:
//!
//! ```text
//! Present ------------------------------------------> Open
//! Missing --(backup exists)--> Restored ------------> Open
//! Missing --(no backups)-----> Recreated (admin) ---> Open
//! Corrupt --(moved aside)----> Missing ...
//! ```
//!
//! A present file is unusable when SQLite does not recognise it or when a
//! catalog table is absent (an empty file, for instance). It is renamed to
//! `<store>.<ext>.corrupt` and recovery proceeds as for a missing file.
//!
//! Both recovery paths build the new file beside the store and rename it
//! into place once complete, so an interrupted recovery leaves no
//! half-written store behind.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, ErrorCode};

use crate::access;
use crate::backup;
use crate::config::StoreConfig;
use crate::error::ShopvaultError;
use crate::policy::FieldCodec;
use crate::schema::{self, Table};
use crate::value::Record;

/// How the store file came to be there when it was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// The file already existed.
    Present,
    /// The file was copied from this backup.
    Restored { backup: PathBuf },
    /// The file was built from the catalog with the default administrator.
    Recreated,
    /// The file was unusable, was moved to `corrupt`, and was then replaced
    /// as `recovery` describes.
    Replaced {
        corrupt: PathBuf,
        recovery: Box<Recovery>,
    },
}

/// The administrator account every recreated store starts with.
pub fn default_admin() -> Record {
    Record::new()
        .with("username", "management")
        .with("password", "Tt123")
        .with("name", "Calum")
        .with("surname", "Fitzpatrick")
        .with("address", "30 Egg Fields")
        .with("postcode", "BT65 7YD")
        .with("weekly_hours", 30)
        .with("email_address", "turtletennisgear@gmail.com")
        .with("access_level", "Management")
}

/// Connect to an existing (or about to be created) store file with
/// foreign-key enforcement on.
pub fn connect(path: &Path) -> Result<Connection, ShopvaultError> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON")?;
    Ok(conn)
}

/// Open the configured store, recovering it first if the file is missing
/// or unusable.
///
/// `codec` is used only if the default administrator has to be written.
pub fn open(
    config: &StoreConfig,
    codec: &FieldCodec<'_>,
) -> Result<(Connection, Recovery), ShopvaultError> {
    let path = config.store_path();
    if !path.exists() {
        let recovery = recover(config, codec)?;
        return Ok((connect(&path)?, recovery));
    }

    let problem = match connect(&path) {
        Ok(conn) => match missing_table(&conn) {
            Ok(None) => return Ok((conn, Recovery::Present)),
            Ok(Some(table)) => format!("table {} is missing", table),
            Err(e) if is_corruption(&e) => e.to_string(),
            Err(e) => return Err(e.into()),
        },
        Err(ShopvaultError::Database(e)) if is_corruption(&e) => e.to_string(),
        Err(e) => return Err(e),
    };

    let corrupt = corrupt_path(config);
    tracing::warn!(store = %path.display(), corrupt = %corrupt.display(), %problem, "store file unusable; moving it aside");
    fs::rename(&path, &corrupt)?;
    let recovery = recover(config, codec)?;
    Ok((
        connect(&path)?,
        Recovery::Replaced {
            corrupt,
            recovery: Box::new(recovery),
        },
    ))
}

/// The first catalog table the store lacks, if any.
fn missing_table(conn: &Connection) -> rusqlite::Result<Option<Table>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Table::ALL
        .into_iter()
        .find(|table| !names.iter().any(|name| name == table.name())))
}

fn is_corruption(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
    )
}

fn corrupt_path(config: &StoreConfig) -> PathBuf {
    config
        .store_path()
        .with_extension(format!("{}.corrupt", config.extension))
}

fn partial_path(config: &StoreConfig) -> PathBuf {
    config
        .store_path()
        .with_extension(format!("{}.partial", config.extension))
}

/// Put a store file in place: the most recent backup if there is one,
/// otherwise a freshly built store.
pub fn recover(config: &StoreConfig, codec: &FieldCodec<'_>) -> Result<Recovery, ShopvaultError> {
    let target = config.store_path();
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = partial_path(config);
    if partial.exists() {
        fs::remove_file(&partial)?;
    }

    let recovery = match backup::most_recent(config)? {
        Some(entry) => {
            backup::restore(&entry.path, &partial)?;
            Recovery::Restored { backup: entry.path }
        }
        None => {
            build_fresh(&partial, codec)?;
            tracing::info!(store = %target.display(), "no backups found; store recreated with default administrator");
            Recovery::Recreated
        }
    };

    fs::rename(&partial, &target)?;
    Ok(recovery)
}

/// Create every catalog table and the default administrator in one
/// transaction.
fn build_fresh(path: &Path, codec: &FieldCodec<'_>) -> Result<(), ShopvaultError> {
    let mut conn = connect(path)?;
    let tx = conn.transaction()?;
    schema::create_all(&tx)?;
    access::insert(&tx, codec, Table::Staff, &default_admin())?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::CipherKey;
    use crate::policy::FieldPolicy;

    #[test]
    fn default_admin_fills_staff() {
        assert!(access::validate_new_record(Table::Staff, &default_admin()).is_ok());
    }

    #[test]
    fn present_store_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        let key = CipherKey::default();
        let codec = FieldCodec::new(FieldPolicy::default(), &key);

        let (_, first) = open(&config, &codec).unwrap();
        assert_eq!(first, Recovery::Recreated);
        let (_, second) = open(&config, &codec).unwrap();
        assert_eq!(second, Recovery::Present);
        assert!(!partial_path(&config).exists());
    }

    #[test]
    fn unusable_store_is_moved_aside_and_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        let key = CipherKey::default();
        let codec = FieldCodec::new(FieldPolicy::default(), &key);

        for contents in [&b"this is not a database, just some text"[..], &b""[..]] {
            fs::write(config.store_path(), contents).unwrap();

            let (conn, recovery) = open(&config, &codec).unwrap();
            assert_eq!(
                recovery,
                Recovery::Replaced {
                    corrupt: corrupt_path(&config),
                    recovery: Box::new(Recovery::Recreated),
                }
            );
            assert_eq!(missing_table(&conn).unwrap(), None);
            assert_eq!(fs::read(corrupt_path(&config)).unwrap(), contents);
            drop(conn);
            fs::remove_file(config.store_path()).unwrap();
        }
    }
}
