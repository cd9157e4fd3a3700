//! Store configuration.
//!
//! Everything the lifecycle needs to find the store, its backups, and the
//! encryption status file. Loadable from a JSON file; every field except
//! `root` has a default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ShopvaultError;
use crate::keys;

fn default_name() -> String {
    "ecommerce".to_string()
}

fn default_extension() -> String {
    "db".to_string()
}

fn default_cipher_key() -> String {
    keys::DEFAULT_KEY.to_string()
}

fn default_admin_username() -> String {
    "management".to_string()
}

/// Where the store lives and how it is keyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store name; the file is `<root>/<name>.<extension>`.
    #[serde(default = "default_name")]
    pub name: String,
    /// Directory holding the store file.
    pub root: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Defaults to `<root>/backups`.
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
    /// Defaults to `<root>/encryption_status.txt`.
    #[serde(default)]
    pub encryption_status_file: Option<PathBuf>,
    #[serde(default = "default_cipher_key")]
    pub cipher_key: String,
    /// Username of the administrator (staff_id 1) in plain form. Used to
    /// tell whether the stored data is enciphered.
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
}

impl StoreConfig {
    /// Defaults rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            name: default_name(),
            root: root.into(),
            extension: default_extension(),
            backup_dir: None,
            encryption_status_file: None,
            cipher_key: default_cipher_key(),
            admin_username: default_admin_username(),
        }
    }

    /// Load a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, ShopvaultError> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            ShopvaultError::Config(format!("{}: {}", path.display(), e))
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    pub fn with_cipher_key(mut self, key: impl Into<String>) -> Self {
        self.cipher_key = key.into();
        self
    }

    /// Path of the live store file.
    pub fn store_path(&self) -> PathBuf {
        self.root.join(format!("{}.{}", self.name, self.extension))
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| self.root.join("backups"))
    }

    pub fn encryption_status_path(&self) -> PathBuf {
        self.encryption_status_file
            .clone()
            .unwrap_or_else(|| self.root.join("encryption_status.txt"))
    }
}
