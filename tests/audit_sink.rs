//! Tests for the pluggable AuditSink / forward sink functionality.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use shopvault::audit::{AuditEvent, AuditRecord, AuditSink, Direction, FileAuditSink};
use shopvault::{EncryptionStatus, Store, StoreConfig};

/// A test sink that collects records into a shared Vec.
struct SharedVecSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl SharedVecSink {
    fn new(records: Arc<Mutex<Vec<AuditRecord>>>) -> Self {
        Self { records }
    }
}

impl AuditSink for SharedVecSink {
    fn append(&mut self, record: AuditRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[test]
fn test_forward_sink_receives_records() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path()).with_name("tennis");
    let mut store = Store::with_status(config, EncryptionStatus::Disabled).unwrap();

    let records = Arc::new(Mutex::new(Vec::new()));
    store.add_audit_sink(Box::new(SharedVecSink::new(Arc::clone(&records))));

    store.ensure_open().unwrap();
    let backup = store
        .backup(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
        .unwrap()
        .unwrap();
    store.set_encryption(EncryptionStatus::Enabled).unwrap();

    // Primary log has every record
    assert_eq!(store.audit_log().len(), 3);

    // Forward sink received the same records, in order
    let collected = records.lock().unwrap();
    let events: Vec<&AuditEvent> = collected.iter().map(|r| &r.event).collect();
    assert_eq!(
        events,
        [
            &AuditEvent::StoreRecreated,
            &AuditEvent::BackupCreated { backup },
            &AuditEvent::BulkTransform {
                direction: Direction::Encrypt,
                rows: 1,
            },
        ]
    );
    assert!(collected.iter().all(|r| r.store == "tennis"));
}

#[test]
fn test_file_sink_writes_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("audit.jsonl");
    let mut store =
        Store::with_status(StoreConfig::new(dir.path()), EncryptionStatus::Enabled).unwrap();
    store.add_audit_sink(Box::new(FileAuditSink::new(&log_path).unwrap()));

    store.ensure_open().unwrap();
    store.decrypt_all().unwrap();

    let text = std::fs::read_to_string(&log_path).unwrap();
    let parsed: Vec<AuditRecord> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].event, AuditEvent::StoreRecreated);
    assert_eq!(
        parsed[1].event,
        AuditEvent::BulkTransform {
            direction: Direction::Decrypt,
            rows: 1,
        }
    );
}
