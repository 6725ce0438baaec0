//! Column-name codec and cell-reference parsing.
//!
//! Column names are a bijection between non-negative integers and strings
//! of upper-case letters using a base-26 scheme with no zero digit — `A` is
//! 0, `Z` is 25, `AA` is 26, `AAA` is 702. This is the Excel-sheet-column
//! problem, not the LeetCode one: the numbering starts differently.

use crate::error::WorkbookError;

/// Converts a column letter name (`"A"`, `"AAA"`, ...) to a zero-based
/// column index.
pub fn column_letter_to_number(s: &str) -> Result<u32, WorkbookError> {
    if s.is_empty() || s.len() > 7 || !s.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(WorkbookError::BadColumnName(s.to_string()));
    }
    let mut n: i64 = 0;
    for b in s.bytes() {
        n = n * 26 + (b - b'A' + 1) as i64;
    }
    Ok((n - 1) as u32)
}

/// Converts a zero-based column index to its letter name.
pub fn column_number_to_letter(mut n: i64) -> String {
    let mut s = Vec::new();
    loop {
        s.push(b'A' + (n % 26) as u8);
        n = n / 26 - 1;
        if n < 0 {
            break;
        }
    }
    s.reverse();
    String::from_utf8(s).expect("ASCII letters only")
}

/// Parses a single-cell reference in either `A1` or `R1C1` form into a
/// zero-based `(row, column)` pair. The workbook always stores cells in
/// `A1` form, but some producers emit `R1C1` when that display option was
/// selected, so both are accepted on read.
pub fn parse_cell_reference(address: &str) -> Result<(u32, u32), WorkbookError> {
    let upper = address.to_ascii_uppercase();

    if let Some((letters, digits)) = split_a1(&upper) {
        let row: u32 = digits.parse().map_err(|_| WorkbookError::BadCellReference(address.to_string()))?;
        let col = column_letter_to_number(letters)?;
        if row == 0 {
            return Err(WorkbookError::BadCellReference(address.to_string()));
        }
        return Ok((row - 1, col));
    }

    if let Some((r, c)) = parse_r1c1(&upper) {
        if r == 0 || c == 0 {
            return Err(WorkbookError::BadCellReference(address.to_string()));
        }
        return Ok((r - 1, c - 1));
    }

    Err(WorkbookError::BadCellReference(address.to_string()))
}

fn split_a1(s: &str) -> Option<(&str, &str)> {
    let split_at = s.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = s.split_at(split_at);
    if letters.is_empty() || digits.is_empty() {
        return None;
    }
    if !letters.bytes().all(|b| b.is_ascii_uppercase()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((letters, digits))
}

fn parse_r1c1(s: &str) -> Option<(u32, u32)> {
    let rest = s.strip_prefix('R')?;
    let c_pos = rest.find('C')?;
    let (row_digits, rest) = rest.split_at(c_pos);
    let col_digits = &rest[1..];
    if row_digits.is_empty() || col_digits.is_empty() {
        return None;
    }
    let row: u32 = row_digits.parse().ok()?;
    let col: u32 = col_digits.parse().ok()?;
    Some((row, col))
}

/// Renders a zero-based `(row, column)` pair as an `A1`-form reference, the
/// only form the writer ever emits.
pub fn cell_reference(row: u32, column: u32) -> String {
    format!("{}{}", column_number_to_letter(column as i64), row + 1)
}
