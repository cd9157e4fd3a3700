//! Field policy and the field codec.
//!
//! The policy decides, per field name, whether a value is run through the
//! cipher on its way into and out of the store. Identifiers, dates and
//! numeric measures are never transformed. Everything else is transformed
//! while encryption is enabled, or unconditionally when a bulk
//! administrative pass forces it.
//!
//! The encryption status is an explicit value carried by the policy, not
//! process state read behind the caller's back.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cipher;
use crate::error::ShopvaultError;
use crate::keys::CipherKey;
use crate::value::FieldValue;

/// Fields whose values are stored as-is whatever the encryption status.
pub const NEVER_TRANSFORMED: &[&str] = &[
    "customer_id",
    "staff_id",
    "weekly_hours",
    "payment_card_id",
    "order_id",
    "date",
    "delivery_cost",
    "total_cost",
    "supplier_id",
    "current_stock",
    "average_rating",
    "order_cost",
    "sale_price",
    "total_sold",
    "product_id",
    "order_product_id",
    "quantity",
    "rating_id",
    "score",
];

/// Whether stored text fields are enciphered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionStatus {
    Enabled,
    #[default]
    Disabled,
}

impl EncryptionStatus {
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }

    /// Parse the contents of the status file.
    ///
    /// The first character decides: `'1'` enables, anything else disables.
    /// An empty first line is malformed.
    pub fn parse(contents: &str) -> Result<Self, ShopvaultError> {
        match contents.lines().next().and_then(|line| line.chars().next()) {
            Some('1') => Ok(Self::Enabled),
            Some(_) => Ok(Self::Disabled),
            None => Err(ShopvaultError::Config(
                "encryption status file is empty; it must start with 1 (enabled) or 0 (disabled)"
                    .to_string(),
            )),
        }
    }

    /// Load the status file. A missing file means disabled.
    pub fn load(path: &Path) -> Result<Self, ShopvaultError> {
        match fs::read(path) {
            Ok(bytes) => {
                let contents = String::from_utf8(bytes).map_err(|_| {
                    ShopvaultError::Config(format!(
                        "encryption status file {} is not valid text",
                        path.display()
                    ))
                })?;
                Self::parse(&contents)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "encryption status file missing; encryption disabled");
                Ok(Self::Disabled)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the status file.
    pub fn persist(self, path: &Path) -> Result<(), ShopvaultError> {
        let flag = if self.is_enabled() { "1\n" } else { "0\n" };
        fs::write(path, flag)?;
        Ok(())
    }
}

/// Whether a transform follows the encryption status or is forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Override {
    #[default]
    FollowStatus,
    /// Used by bulk passes, which run while the stored state and the status
    /// disagree.
    Force,
}

/// Per-field transform decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldPolicy {
    status: EncryptionStatus,
}

impl FieldPolicy {
    pub fn new(status: EncryptionStatus) -> Self {
        Self { status }
    }

    pub fn status(&self) -> EncryptionStatus {
        self.status
    }

    /// Whether `field` is transformed under `mode`.
    ///
    /// Qualified names (`Table.field`) are judged by their field part.
    pub fn should_transform(&self, field: &str, mode: Override) -> bool {
        let bare = field.rsplit('.').next().unwrap_or(field);
        if NEVER_TRANSFORMED.contains(&bare) {
            return false;
        }
        match mode {
            Override::Force => true,
            Override::FollowStatus => self.status.is_enabled(),
        }
    }
}

/// Applies the policy and the cipher to values crossing the store boundary.
#[derive(Debug, Clone, Copy)]
pub struct FieldCodec<'a> {
    policy: FieldPolicy,
    key: &'a CipherKey,
}

impl<'a> FieldCodec<'a> {
    pub fn new(policy: FieldPolicy, key: &'a CipherKey) -> Self {
        Self { policy, key }
    }

    pub fn policy(&self) -> FieldPolicy {
        self.policy
    }

    /// Prepare a value for writing to `field`.
    ///
    /// Non-text values on transformed fields are enciphered in their text
    /// form. Nulls pass through.
    pub fn encode(&self, field: &str, value: &FieldValue, mode: Override) -> Result<FieldValue, ShopvaultError> {
        if !self.policy.should_transform(field, mode) {
            return Ok(value.clone());
        }
        match value.to_text() {
            Some(text) => Ok(FieldValue::Text(cipher::encode(&text, self.key)?)),
            None => Ok(FieldValue::Null),
        }
    }

    /// Recover the caller-facing value of `field` from what the store holds.
    ///
    /// Only text is deciphered; anything else was never enciphered.
    pub fn decode(&self, field: &str, value: FieldValue, mode: Override) -> Result<FieldValue, ShopvaultError> {
        if !self.policy.should_transform(field, mode) {
            return Ok(value);
        }
        match value {
            FieldValue::Text(text) => Ok(FieldValue::Text(cipher::decode(&text, self.key)?)),
            other => Ok(other),
        }
    }
}
