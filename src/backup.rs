//! The backup set.
//!
//! Backups are dated copies of the store file named
//! `<name>_backup_<DD-MM-YY>.<ext>`. They are only read to recover a missing
//! store, and only written by the once-a-day backup. Every copy is checked
//! against its source with a SHA-256 digest.
//!
//! This is the only module that imports `ring`.

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ring::digest::{self, Digest};

use crate::config::StoreConfig;
use crate::error::ShopvaultError;

/// Date format embedded in backup file names.
pub const DATE_FORMAT: &str = "%d-%m-%y";

/// A backup file and the date in its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub date: NaiveDate,
}

/// File name of the backup of `name` taken on `date`.
pub fn file_name(name: &str, extension: &str, date: NaiveDate) -> String {
    format!("{}_backup_{}.{}", name, date.format(DATE_FORMAT), extension)
}

/// Date embedded in `file_name`, if it is a backup of `name`.
pub fn parse_date(name: &str, extension: &str, file_name: &str) -> Option<NaiveDate> {
    let date = file_name
        .strip_prefix(name)?
        .strip_prefix("_backup_")?
        .strip_suffix(extension)?
        .strip_suffix('.')?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// Every backup of the configured store, oldest first. A missing backup
/// directory is an empty set.
pub fn list(config: &StoreConfig) -> Result<Vec<BackupEntry>, ShopvaultError> {
    let dir = config.backup_dir();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut backups = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let parsed = file_name
            .to_str()
            .and_then(|f| parse_date(&config.name, &config.extension, f));
        match parsed {
            Some(date) => backups.push(BackupEntry {
                path: entry.path(),
                date,
            }),
            None => {
                tracing::warn!(file = ?file_name, dir = %dir.display(), "skipping file not named as a backup");
            }
        }
    }
    backups.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
    Ok(backups)
}

/// The backup with the latest embedded date.
pub fn most_recent(config: &StoreConfig) -> Result<Option<BackupEntry>, ShopvaultError> {
    Ok(list(config)?.pop())
}

/// Copy the live store into the backup set under `date`. An existing backup
/// for the same date is replaced.
pub fn create_backup(config: &StoreConfig, date: NaiveDate) -> Result<PathBuf, ShopvaultError> {
    let dir = config.backup_dir();
    fs::create_dir_all(&dir)?;
    let target = dir.join(file_name(&config.name, &config.extension, date));
    copy_verified(&config.store_path(), &target)?;
    tracing::info!(backup = %target.display(), "backup created");
    Ok(target)
}

/// Take today's backup unless one already exists. Returns the new backup,
/// or `None` when there was nothing to do (already backed up, or no store
/// file yet).
pub fn ensure_daily_backup(
    config: &StoreConfig,
    today: NaiveDate,
) -> Result<Option<PathBuf>, ShopvaultError> {
    if !config.store_path().exists() {
        return Ok(None);
    }
    match most_recent(config)? {
        Some(latest) if latest.date == today => Ok(None),
        _ => create_backup(config, today).map(Some),
    }
}

/// Restore `backup` as `target`, byte-for-byte.
pub fn restore(backup: &Path, target: &Path) -> Result<(), ShopvaultError> {
    copy_verified(backup, target)?;
    tracing::info!(backup = %backup.display(), store = %target.display(), "store restored from backup");
    Ok(())
}

/// SHA-256 of a file's contents.
pub fn file_digest(path: &Path) -> Result<Digest, ShopvaultError> {
    let mut file = File::open(path)?;
    let mut context = digest::Context::new(&digest::SHA256);
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        context.update(&buf[..n]);
    }
    Ok(context.finish())
}

/// Copy `source` to `target` and check the copy. A copy that does not match
/// is removed.
fn copy_verified(source: &Path, target: &Path) -> Result<(), ShopvaultError> {
    fs::copy(source, target)?;
    let expected = file_digest(source)?;
    let actual = file_digest(target)?;
    if expected.as_ref() != actual.as_ref() {
        let _ = fs::remove_file(target);
        return Err(ShopvaultError::BackupMismatch(target.to_path_buf()));
    }
    Ok(())
}
