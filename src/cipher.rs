//! Keyed substitution over the printable symbol range.
//!
//! The cipher is a tabula recta over the 95 printable symbols (32..=126):
//! row `i` of the table is the base sequence rotated left by `i`. A symbol is
//! encoded by looking up the row of the plaintext symbol and the column of
//! the current key symbol; the key cycles over the input.
//!
//! This is a deterministic, reversible transform. It is not meant to resist
//! an attacker and nothing in the crate treats it as if it were.
//!
//! Values reach the store as statement parameters, so the cipher never has
//! to escape quote characters: it is a pure bijection on the symbol range.

use crate::error::ShopvaultError;
use crate::keys::CipherKey;

/// First printable symbol.
pub const FIRST_SYMBOL: u8 = 32;

/// Last printable symbol.
pub const LAST_SYMBOL: u8 = 126;

/// Number of symbols in the range, and the side of the table.
pub const SYMBOL_COUNT: usize = (LAST_SYMBOL - FIRST_SYMBOL) as usize + 1;

/// The square substitution table.
pub struct CipherTable {
    rows: [[u8; SYMBOL_COUNT]; SYMBOL_COUNT],
}

impl CipherTable {
    /// Build the table: `rows[i] = base[i..] + base[..i]`.
    pub const fn build() -> Self {
        let mut rows = [[0u8; SYMBOL_COUNT]; SYMBOL_COUNT];
        let mut i = 0;
        while i < SYMBOL_COUNT {
            let mut j = 0;
            while j < SYMBOL_COUNT {
                rows[i][j] = FIRST_SYMBOL + ((i + j) % SYMBOL_COUNT) as u8;
                j += 1;
            }
            i += 1;
        }
        Self { rows }
    }

    /// Symbol at `row`, `column`.
    pub fn get(&self, row: usize, column: usize) -> u8 {
        self.rows[row][column]
    }

    /// Find the row whose entry in `column` is `symbol`.
    fn row_of(&self, column: usize, symbol: u8) -> Option<usize> {
        self.rows.iter().position(|row| row[column] == symbol)
    }
}

/// The one table used by the crate. Derived from the symbol range only.
pub static TABLE: CipherTable = CipherTable::build();

/// Whether `c` falls in the printable range the cipher accepts.
pub fn is_printable(c: char) -> bool {
    (FIRST_SYMBOL as u32..=LAST_SYMBOL as u32).contains(&(c as u32))
}

fn offset(c: char) -> Result<usize, ShopvaultError> {
    if is_printable(c) {
        Ok(c as usize - FIRST_SYMBOL as usize)
    } else {
        Err(ShopvaultError::UnsupportedCharacter(c))
    }
}

// An empty key would cycle to nothing and swallow the input.
fn key_symbols(key: &CipherKey) -> Result<&[u8], ShopvaultError> {
    match key.as_bytes() {
        [] => Err(ShopvaultError::InvalidKey),
        bytes => Ok(bytes),
    }
}

/// Encode `text` under `key`.
pub fn encode(text: &str, key: &CipherKey) -> Result<String, ShopvaultError> {
    let key = key_symbols(key)?;
    let mut output = String::with_capacity(text.len());

    for (c, k) in text.chars().zip(key.iter().cycle()) {
        let row = offset(c)?;
        let column = (k - FIRST_SYMBOL) as usize;
        output.push(TABLE.get(row, column) as char);
    }

    Ok(output)
}

/// Decode `text` under `key`. Inverse of [`encode`] for the same key.
pub fn decode(text: &str, key: &CipherKey) -> Result<String, ShopvaultError> {
    let key = key_symbols(key)?;
    let mut output = String::with_capacity(text.len());

    for (c, k) in text.chars().zip(key.iter().cycle()) {
        // Range check first so a non-printable symbol is reported as such.
        offset(c)?;
        let column = (k - FIRST_SYMBOL) as usize;
        let row = TABLE
            .row_of(column, c as u8)
            .ok_or(ShopvaultError::UnsupportedCharacter(c))?;
        // Column 0 of a row is the symbol the row was built from.
        output.push(TABLE.get(row, 0) as char);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_printable() -> String {
        (FIRST_SYMBOL..=LAST_SYMBOL).map(char::from).collect()
    }

    #[test]
    fn table_rows_are_rotations_of_the_base() {
        assert_eq!(TABLE.get(0, 0), b' ');
        assert_eq!(TABLE.get(0, SYMBOL_COUNT - 1), b'~');
        assert_eq!(TABLE.get(1, 0), b'!');
        assert_eq!(TABLE.get(1, SYMBOL_COUNT - 1), b' ');
        assert_eq!(TABLE.get(94, 1), b' ');
    }

    #[test]
    fn known_vector() {
        let key = CipherKey::default();
        // 'm' (77) under 'p' (80) lands on 32 + (157 % 95) = '^'.
        let encoded = encode("management", &key).unwrap();
        assert!(encoded.starts_with('^'));
        assert_eq!(decode(&encoded, &key).unwrap(), "management");
    }

    #[test]
    fn roundtrip_every_symbol_under_several_keys() {
        let text = all_printable();
        for k in ["pepsi_max", "a", "~~~", " ", "K3y With Spaces!"] {
            let key = CipherKey::new(k).unwrap();
            let encoded = encode(&text, &key).unwrap();
            assert_eq!(encoded.len(), text.len());
            assert!(encoded.chars().all(is_printable));
            assert_eq!(decode(&encoded, &key).unwrap(), text);
        }
    }

    #[test]
    fn apostrophes_are_not_escaped() {
        let key = CipherKey::new("a").unwrap();
        // Find the symbol that encodes to an apostrophe under 'a'.
        let plain = (FIRST_SYMBOL..=LAST_SYMBOL)
            .map(char::from)
            .find(|c| encode(&c.to_string(), &key).unwrap() == "'")
            .unwrap();
        assert_eq!(encode(&plain.to_string(), &key).unwrap(), "'");
        assert_eq!(decode("'", &key).unwrap(), plain.to_string());
    }

    #[test]
    fn empty_text_is_empty() {
        let key = CipherKey::default();
        assert_eq!(encode("", &key).unwrap(), "");
        assert_eq!(decode("", &key).unwrap(), "");
    }

    #[test]
    fn rejects_characters_outside_the_range() {
        let key = CipherKey::default();
        assert!(matches!(
            encode("line\nbreak", &key),
            Err(ShopvaultError::UnsupportedCharacter('\n'))
        ));
        assert!(matches!(
            decode("\u{e9}", &key),
            Err(ShopvaultError::UnsupportedCharacter('\u{e9}'))
        ));
    }
}
