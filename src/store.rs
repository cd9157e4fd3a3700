//! The store facade.
//!
//! `Store` carries everything a caller would otherwise have to thread by
//! hand: configuration, cipher key, field policy and the audit log. Record
//! operations open their own connection, run one statement, and release the
//! connection before returning; there is no pooling and no locking beyond
//! what SQLite itself does.

use std::path::PathBuf;

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::access::{self, Link, Selection};
use crate::audit::{AuditEvent, AuditLog, AuditRecord, AuditSink, Direction};
use crate::backup;
use crate::bulk;
use crate::cipher;
use crate::config::StoreConfig;
use crate::error::ShopvaultError;
use crate::keys::CipherKey;
use crate::lifecycle::{self, Recovery};
use crate::policy::{EncryptionStatus, FieldCodec, FieldPolicy, Override};
use crate::predicate::Predicate;
use crate::schema::Table;
use crate::value::{FieldValue, Record};

/// Which account table a login matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Staff,
}

/// An encryption-aware handle on one store file.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    key: CipherKey,
    policy: FieldPolicy,
    audit: AuditLog,
}

impl Store {
    /// Build a store handle from `config`, reading the encryption status
    /// file. Does not touch the store file.
    pub fn new(config: StoreConfig) -> Result<Self, ShopvaultError> {
        let status = EncryptionStatus::load(&config.encryption_status_path())?;
        Self::with_status(config, status)
    }

    /// Build a store handle with an explicit encryption status.
    pub fn with_status(config: StoreConfig, status: EncryptionStatus) -> Result<Self, ShopvaultError> {
        let key = CipherKey::new(&config.cipher_key)?;
        Ok(Self {
            config,
            key,
            policy: FieldPolicy::new(status),
            audit: AuditLog::new(),
        })
    }

    /// [`Store::new`] followed by [`Store::ensure_open`].
    pub fn open(config: StoreConfig) -> Result<Self, ShopvaultError> {
        let mut store = Self::new(config)?;
        store.ensure_open()?;
        Ok(store)
    }

    /// Make sure the store file exists and is usable, recovering it if
    /// needed. Recovery is audited.
    pub fn ensure_open(&mut self) -> Result<Recovery, ShopvaultError> {
        let (_, recovery) = lifecycle::open(&self.config, &self.codec())?;
        self.audit_recovery(&recovery);
        Ok(recovery)
    }

    fn audit_recovery(&mut self, recovery: &Recovery) {
        match recovery {
            Recovery::Present => {}
            Recovery::Restored { backup } => self.record(AuditEvent::StoreRestored {
                backup: backup.clone(),
            }),
            Recovery::Recreated => self.record(AuditEvent::StoreRecreated),
            Recovery::Replaced { corrupt, recovery } => {
                self.record(AuditEvent::StoreQuarantined {
                    corrupt: corrupt.clone(),
                });
                self.audit_recovery(recovery);
            }
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn status(&self) -> EncryptionStatus {
        self.policy.status()
    }

    /// The codec record operations run values through.
    pub fn codec(&self) -> FieldCodec<'_> {
        FieldCodec::new(self.policy, &self.key)
    }

    /// A codec that leaves values as stored.
    fn raw_codec(&self) -> FieldCodec<'_> {
        FieldCodec::new(FieldPolicy::new(EncryptionStatus::Disabled), &self.key)
    }

    fn connection(&self) -> Result<Connection, ShopvaultError> {
        let (conn, recovery) = lifecycle::open(&self.config, &self.codec())?;
        if recovery != Recovery::Present {
            tracing::warn!(store = %self.config.store_path().display(), ?recovery, "store file was missing and has been recovered");
        }
        Ok(conn)
    }

    /// Add a record to `table`. `values` must hold exactly the table's
    /// non-key fields. Returns the assigned primary key.
    pub fn add(&self, table: Table, values: &Record) -> Result<i64, ShopvaultError> {
        // Reject bad input before any file is touched.
        access::validate_new_record(table, values)?;
        let conn = self.connection()?;
        access::insert(&conn, &self.codec(), table, values)
    }

    /// Records of `table` matching `predicate`.
    pub fn search(
        &self,
        table: Table,
        selection: &Selection,
        predicate: &Predicate,
    ) -> Result<Vec<Record>, ShopvaultError> {
        let conn = self.connection()?;
        access::select(&conn, &self.codec(), table, selection, predicate)
    }

    /// Records of the inner-join chain starting at `table`.
    pub fn search_joined(
        &self,
        table: Table,
        links: &[Link],
        selection: &Selection,
        predicate: &Predicate,
    ) -> Result<Vec<Record>, ShopvaultError> {
        let conn = self.connection()?;
        access::select_joined(&conn, &self.codec(), table, links, selection, predicate)
    }

    /// Set `values` on every row of `table` matching `predicate`. Returns
    /// the number of rows changed.
    pub fn update(
        &self,
        table: Table,
        values: &Record,
        predicate: &Predicate,
    ) -> Result<usize, ShopvaultError> {
        self.update_with(table, values, predicate, Override::FollowStatus)
    }

    /// [`Store::update`] with an explicit transform override.
    pub fn update_with(
        &self,
        table: Table,
        values: &Record,
        predicate: &Predicate,
        mode: Override,
    ) -> Result<usize, ShopvaultError> {
        let conn = self.connection()?;
        access::update(&conn, &self.codec(), table, values, predicate, mode)
    }

    /// Delete every row of `table` matching `predicate`; dependents cascade.
    pub fn delete(&self, table: Table, predicate: &Predicate) -> Result<usize, ShopvaultError> {
        let conn = self.connection()?;
        access::delete(&conn, &self.codec(), table, predicate)
    }

    /// Encipher every eligible stored field. Does not change the status.
    pub fn encrypt_all(&mut self) -> Result<usize, ShopvaultError> {
        self.bulk(Direction::Encrypt)
    }

    /// Decipher every eligible stored field. Does not change the status.
    pub fn decrypt_all(&mut self) -> Result<usize, ShopvaultError> {
        self.bulk(Direction::Decrypt)
    }

    fn bulk(&mut self, direction: Direction) -> Result<usize, ShopvaultError> {
        let mut conn = self.connection()?;
        let rows = match direction {
            Direction::Encrypt => bulk::encrypt_all(&mut conn, &self.key)?,
            Direction::Decrypt => bulk::decrypt_all(&mut conn, &self.key)?,
        };
        self.record(AuditEvent::BulkTransform { direction, rows });
        Ok(rows)
    }

    /// Switch encryption on or off: re-encode the stored data, persist the
    /// status file, then switch the policy. A no-op when the status is
    /// already `status`. Returns the number of rows rewritten.
    pub fn set_encryption(&mut self, status: EncryptionStatus) -> Result<usize, ShopvaultError> {
        let previous = self.policy.status();
        if status == previous {
            return Ok(0);
        }
        let direction = if status.is_enabled() {
            Direction::Encrypt
        } else {
            Direction::Decrypt
        };
        let path = self.config.encryption_status_path();

        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let rows = bulk::transform_rows(&tx, &self.key, direction)?;
        status.persist(&path)?;
        if let Err(e) = tx.commit() {
            if let Err(restore) = previous.persist(&path) {
                tracing::error!(error = %restore, path = %path.display(), "encryption status file could not be restored");
            }
            return Err(e.into());
        }

        self.policy = FieldPolicy::new(status);
        self.record(AuditEvent::BulkTransform { direction, rows });
        Ok(rows)
    }

    /// Bring the stored data in line with the encryption status.
    ///
    /// Looks at the administrator's stored username: plain while encryption
    /// is enabled means the data needs enciphering, enciphered while
    /// disabled means it needs deciphering. Anything else is left alone.
    /// Returns the pass that ran, if any.
    pub fn reconcile(&mut self) -> Result<Option<Direction>, ShopvaultError> {
        let conn = self.connection()?;
        let admin = access::select(
            &conn,
            &self.raw_codec(),
            Table::Staff,
            &Selection::fields(["username"]),
            &Predicate::eq("staff_id", 1),
        )?;
        drop(conn);

        let stored = match admin.first().and_then(|r| r.get("username")).and_then(FieldValue::as_text) {
            Some(stored) => stored.to_string(),
            None => return Ok(None),
        };
        let plain = self.config.admin_username.as_str();
        let enciphered = cipher::encode(plain, &self.key)?;

        let direction = match self.policy.status() {
            EncryptionStatus::Enabled if stored == plain && stored != enciphered => Direction::Encrypt,
            EncryptionStatus::Disabled if stored == enciphered && stored != plain => Direction::Decrypt,
            _ => return Ok(None),
        };
        tracing::info!(?direction, "stored data disagrees with encryption status");
        self.bulk(direction)?;
        Ok(Some(direction))
    }

    /// Take the day's backup unless one exists already.
    pub fn backup(&mut self, today: NaiveDate) -> Result<Option<PathBuf>, ShopvaultError> {
        let created = backup::ensure_daily_backup(&self.config, today)?;
        if let Some(path) = &created {
            self.record(AuditEvent::BackupCreated {
                backup: path.clone(),
            });
        }
        Ok(created)
    }

    /// Find the account matching `username` and `password`, customers
    /// first.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<(Role, Record)>, ShopvaultError> {
        let credentials = Predicate::eq("username", username).and(Predicate::eq("password", password));
        for (role, table) in [(Role::Customer, Table::Customer), (Role::Staff, Table::Staff)] {
            let mut found = self.search(table, &Selection::All, &credentials)?;
            if !found.is_empty() {
                return Ok(Some((role, found.swap_remove(0))));
            }
        }
        Ok(None)
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Forward every future audit record to `sink` as well.
    pub fn add_audit_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.audit.add_forward_sink(sink);
    }

    fn record(&mut self, event: AuditEvent) {
        self.audit
            .append(AuditRecord::now(self.config.name.clone(), event));
    }
}
