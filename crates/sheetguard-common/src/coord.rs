//! A1-style cell coordinates.
//!
//! `CellCoord` is a 1-based (row, column) pair with the same limits as Excel:
//! 1,048,576 rows × 16,384 columns. Anchors (`$`) are accepted while parsing
//! but not retained; the analysis never needs to distinguish `$A$1` from `A1`.

use std::borrow::Cow;
use std::fmt;

pub const MAX_ROW: u32 = 1_048_576;
pub const MAX_COL: u32 = 16_384;

/// Errors produced while parsing an A1 address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum A1ParseError {
    Empty,
    MissingColumn(String),
    MissingRow(String),
    TrailingInput(String),
    RowOutOfRange(u64),
    ColOutOfRange(String),
}

impl fmt::Display for A1ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            A1ParseError::Empty => write!(f, "empty cell address"),
            A1ParseError::MissingColumn(s) => write!(f, "missing column letters in `{s}`"),
            A1ParseError::MissingRow(s) => write!(f, "missing row number in `{s}`"),
            A1ParseError::TrailingInput(s) => write!(f, "unexpected trailing input in `{s}`"),
            A1ParseError::RowOutOfRange(row) => write!(f, "row {row} is outside 1..={MAX_ROW}"),
            A1ParseError::ColOutOfRange(col) => {
                write!(f, "column `{col}` is outside A..=XFD")
            }
        }
    }
}

impl std::error::Error for A1ParseError {}

/// 1-based cell position.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse `A1`, `$A$1`, `a1` and friends.
    pub fn parse(addr: &str) -> Result<Self, A1ParseError> {
        let s = addr.trim();
        if s.is_empty() {
            return Err(A1ParseError::Empty);
        }
        let bytes = s.as_bytes();
        let mut i = 0;
        if bytes[i] == b'$' {
            i += 1;
        }
        let col_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        if i == col_start {
            return Err(A1ParseError::MissingColumn(s.to_string()));
        }
        let letters = s[col_start..i].to_ascii_uppercase();
        if i < bytes.len() && bytes[i] == b'$' {
            i += 1;
        }
        let row_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == row_start {
            return Err(A1ParseError::MissingRow(s.to_string()));
        }
        if i != bytes.len() {
            return Err(A1ParseError::TrailingInput(s.to_string()));
        }
        let row: u64 = s[row_start..i]
            .parse()
            .map_err(|_| A1ParseError::RowOutOfRange(u64::MAX))?;
        if row == 0 || row > MAX_ROW as u64 {
            return Err(A1ParseError::RowOutOfRange(row));
        }
        let col = letters_to_column(&letters)
            .filter(|c| *c <= MAX_COL)
            .ok_or_else(|| A1ParseError::ColOutOfRange(letters.clone()))?;
        Ok(Self::new(row as u32, col))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row)
    }
}

/// 1-based column index to letters (`1 -> A`, `27 -> AA`). Zero renders as empty.
pub fn column_to_letters(col: u32) -> String {
    let mut buf = Vec::new();
    let mut col = col;
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        buf.push(b'A' + rem);
        col = (col - 1) / 26;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Uppercase column letters to a 1-based index (`A -> 1`, `AA -> 27`).
pub fn letters_to_column(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in s.bytes() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?;
        col = col.checked_add((ch - b'A') as u32 + 1)?;
    }
    Some(col)
}

/// Remove `$` anchors from an address, borrowing when there is nothing to strip.
pub fn strip_anchors(addr: &str) -> Cow<'_, str> {
    if addr.contains('$') {
        Cow::Owned(addr.replace('$', ""))
    } else {
        Cow::Borrowed(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letter_roundtrip() {
        assert_eq!(column_to_letters(1), "A");
        assert_eq!(column_to_letters(26), "Z");
        assert_eq!(column_to_letters(27), "AA");
        assert_eq!(column_to_letters(16_384), "XFD");
        assert_eq!(letters_to_column("XFD"), Some(16_384));
        assert_eq!(letters_to_column("AB"), Some(28));
        assert!(letters_to_column("a1").is_none());
    }

    #[test]
    fn parse_handles_anchors_and_case() {
        assert_eq!(CellCoord::parse("A1"), Ok(CellCoord::new(1, 1)));
        assert_eq!(CellCoord::parse("$C$12"), Ok(CellCoord::new(12, 3)));
        assert_eq!(CellCoord::parse("ab7"), Ok(CellCoord::new(7, 28)));
        assert_eq!(CellCoord::new(7, 28).to_string(), "AB7");
    }

    #[test]
    fn parse_rejects_non_cells() {
        assert!(matches!(CellCoord::parse(""), Err(A1ParseError::Empty)));
        assert!(matches!(
            CellCoord::parse("12"),
            Err(A1ParseError::MissingColumn(_))
        ));
        assert!(matches!(
            CellCoord::parse("A"),
            Err(A1ParseError::MissingRow(_))
        ));
        assert!(matches!(
            CellCoord::parse("A1:B2"),
            Err(A1ParseError::TrailingInput(_))
        ));
        assert!(matches!(
            CellCoord::parse("A0"),
            Err(A1ParseError::RowOutOfRange(0))
        ));
        assert!(matches!(
            CellCoord::parse("XFE1"),
            Err(A1ParseError::ColOutOfRange(_))
        ));
    }

    #[test]
    fn strip_anchors_borrows_clean_input() {
        assert!(matches!(strip_anchors("A1"), Cow::Borrowed("A1")));
        assert_eq!(strip_anchors("$A$1:$B2"), "A1:B2");
    }
}
