//! Cipher key ownership.
//!
//! The key is the only secret the substitution cipher depends on. It is held
//! in a type that is opaque, non-cloneable and zeroised on drop, and its raw
//! bytes never leave the crate.

use zeroize::Zeroize;

use crate::cipher;
use crate::error::ShopvaultError;

/// Key text used when the configuration does not supply one.
pub const DEFAULT_KEY: &str = "pepsi_max";

/// A keyed-substitution cipher key.
///
/// - Not `Clone`. A store owns exactly one.
/// - Zeroised on drop, and only on drop.
/// - Every byte is a printable symbol, checked at construction.
pub struct CipherKey {
    bytes: Vec<u8>,
}

impl CipherKey {
    /// Build a key from its text form.
    ///
    /// Rejects an empty key and any character outside 32..=126.
    pub fn new(text: &str) -> Result<Self, ShopvaultError> {
        if text.is_empty() || !text.chars().all(cipher::is_printable) {
            return Err(ShopvaultError::InvalidKey);
        }
        Ok(Self {
            bytes: text.as_bytes().to_vec(),
        })
    }

    /// Borrow the key bytes for encode/decode.
    ///
    /// `pub(crate)`: raw bytes never leave the crate.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for CipherKey {
    fn default() -> Self {
        Self {
            bytes: DEFAULT_KEY.as_bytes().to_vec(),
        }
    }
}

impl Drop for CipherKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_unprintable_keys() {
        assert!(matches!(CipherKey::new(""), Err(ShopvaultError::InvalidKey)));
        assert!(matches!(CipherKey::new("tab\there"), Err(ShopvaultError::InvalidKey)));
        assert!(matches!(CipherKey::new("caf\u{e9}"), Err(ShopvaultError::InvalidKey)));
    }

    #[test]
    fn debug_does_not_print_key_material() {
        let key = CipherKey::new("pepsi_max").unwrap();
        let shown = format!("{:?}", key);
        assert!(!shown.contains("pepsi"));
        assert_eq!(CipherKey::default().as_bytes(), b"pepsi_max");
    }

    #[test]
    fn cipher_refuses_an_empty_key() {
        let empty = CipherKey { bytes: Vec::new() };
        assert!(matches!(cipher::encode("Wilson", &empty), Err(ShopvaultError::InvalidKey)));
        assert!(matches!(cipher::decode("Wilson", &empty), Err(ShopvaultError::InvalidKey)));
    }
}
