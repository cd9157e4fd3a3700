//! Administrative audit log.
//!
//! Records every event that changes the store behind the callers' backs:
//! quarantined store files, restores, recreations, backups and bulk
//! re-encoding passes. The log is append-only. Supports pluggable sinks for
//! forwarding records to files or other stores.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sink that receives audit records.
pub trait AuditSink: Send {
    /// Append a record. Called for every administrative event.
    fn append(&mut self, record: AuditRecord);
}

/// Direction of a bulk re-encoding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// The store file was missing and was restored from a backup.
    StoreRestored { backup: PathBuf },
    /// The store file was unusable and was renamed to `corrupt`. Followed
    /// by the event for whatever replaced it.
    StoreQuarantined { corrupt: PathBuf },
    /// The store file was missing, no backup existed, and a fresh store
    /// with the default administrator was built.
    StoreRecreated,
    BackupCreated { backup: PathBuf },
    /// Every eligible field of every row was re-encoded.
    BulkTransform { direction: Direction, rows: usize },
}

/// A permanent record of an administrative event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// The store the event touched.
    pub store: String,
    #[serde(flatten)]
    pub event: AuditEvent,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn now(store: impl Into<String>, event: AuditEvent) -> Self {
        Self {
            store: store.into(),
            event,
            timestamp: Utc::now(),
        }
    }
}

/// An append-only log of administrative events.
#[derive(Default)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
    forward_sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("records", &self.records)
            .field("forward_sinks", &self.forward_sinks.len())
            .finish()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink to receive a copy of every record.
    pub fn add_forward_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.forward_sinks.push(sink);
    }

    /// Append a new record to the log and forward to any attached sinks.
    pub fn append(&mut self, record: AuditRecord) {
        for sink in self.forward_sinks.iter_mut() {
            sink.append(record.clone());
        }
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditRecord> {
        self.records.iter()
    }
}

/// Writes audit records as JSON lines (one per record) to a file.
/// Creates the file if it doesn't exist; appends if it does.
pub struct FileAuditSink {
    file: std::fs::File,
}

impl FileAuditSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&mut self, record: AuditRecord) {
        match serde_json::to_string(&record) {
            Ok(line) => {
                if let Err(e) = writeln!(self.file, "{line}").and_then(|_| self.file.flush()) {
                    tracing::warn!(error = %e, "audit record not written");
                }
            }
            Err(e) => tracing::warn!(error = %e, "audit record not serialized"),
        }
    }
}
