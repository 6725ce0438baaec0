// SPDX-License-Identifier: MIT OR Apache-2.0
//! An Office-compatible workbook reader and writer.
//!
//! This is the on-disk format the document store builds its tables on:
//! each table is a worksheet, each row a record, and a handful of
//! conventions (a fixed number-format tag for byte sequences, date-time
//! values counted in days since 1899-12-30, `#N/A` as the absent sentinel
//! and every other error cell (`#NUM!`, `#DIV/0!`, ...) decoding to NaN)
//! carry the extra type information a spreadsheet format doesn't have
//! natively.
#![deny(unsafe_code)]

pub mod column;
pub mod error;
pub mod reader;
pub mod style;
pub mod value;
pub mod writer;

pub use column::{cell_reference, column_letter_to_number, column_number_to_letter, parse_cell_reference};
pub use error::WorkbookError;
pub use reader::{read, read_path};
pub use style::Style;
pub use value::{bytes_to_hex, hex_to_bytes, CellValue, EPOCH_DAYS_OFFSET};
pub use writer::{write, write_path, write_styled, CellGrid, Styler};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_sheets() -> Vec<(String, CellGrid)> {
        let mut grid = CellGrid::new();
        grid.insert((0, 0), CellValue::Str("name".to_string()));
        grid.insert((0, 1), CellValue::Int(42));
        grid.insert((1, 0), CellValue::Float(3.5));
        grid.insert((1, 1), CellValue::Bool(true));
        grid.insert((2, 0), CellValue::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]));
        grid.insert((2, 1), CellValue::DateTime(45000.25));
        grid.insert((3, 0), CellValue::Absent);
        grid.insert((3, 1), CellValue::Float(f64::NAN));
        grid.insert((4, 0), CellValue::Float(f64::INFINITY));
        vec![("Sheet1".to_string(), grid)]
    }

    #[test]
    fn a_written_workbook_reads_back_the_same_values() {
        let mut buf = Cursor::new(Vec::new());
        write(&mut buf, &sample_sheets()).expect("write");

        buf.set_position(0);
        let read_back = read(buf).expect("read");

        assert_eq!(read_back.len(), 1);
        let (name, grid) = &read_back[0];
        assert_eq!(name, "Sheet1");
        assert_eq!(grid.get(&(0, 0)), Some(&CellValue::Str("name".to_string())));
        assert_eq!(grid.get(&(0, 1)), Some(&CellValue::Int(42)));
        assert_eq!(grid.get(&(1, 0)), Some(&CellValue::Float(3.5)));
        assert_eq!(grid.get(&(1, 1)), Some(&CellValue::Bool(true)));
        assert_eq!(grid.get(&(2, 0)), Some(&CellValue::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF])));
        assert_eq!(grid.get(&(2, 1)), Some(&CellValue::DateTime(45000.25)));
        assert_eq!(grid.get(&(3, 0)), Some(&CellValue::Absent));
        assert!(matches!(grid.get(&(3, 1)), Some(CellValue::Float(f)) if f.is_nan()));
        // Every error sentinel other than #N/A reads back as NaN, so the
        // infinity written here round-trips as NaN, not infinity.
        assert!(matches!(grid.get(&(4, 0)), Some(CellValue::Float(f)) if f.is_nan()));
    }

    #[test]
    fn multiple_sheets_round_trip_in_order() {
        let mut a = CellGrid::new();
        a.insert((0, 0), CellValue::Int(1));
        let mut b = CellGrid::new();
        b.insert((0, 0), CellValue::Int(2));
        let sheets = vec![("First".to_string(), a), ("Second".to_string(), b)];

        let mut buf = Cursor::new(Vec::new());
        write(&mut buf, &sheets).expect("write");
        buf.set_position(0);
        let read_back = read(buf).expect("read");

        assert_eq!(read_back[0].0, "First");
        assert_eq!(read_back[1].0, "Second");
    }

    #[test]
    fn a_styler_override_takes_precedence_over_the_default_number_format() {
        let mut grid = CellGrid::new();
        grid.insert((0, 0), CellValue::Float(45000.0));
        let sheets = vec![("Sheet1".to_string(), grid)];

        let mut buf = Cursor::new(Vec::new());
        let mut styler = |style: &mut Style, _sheet: &str, _row: i64, _col: i64, _value: &CellValue| {
            style.number_format = Some(style::DATE_TIME_FORMAT_CODE.to_string());
        };
        write_styled(&mut buf, &sheets, Some(&mut styler)).expect("write");

        buf.set_position(0);
        let read_back = read(buf).expect("read");
        assert_eq!(read_back[0].1.get(&(0, 0)), Some(&CellValue::DateTime(45000.0)));
    }

    #[test]
    fn a_column_wide_default_applies_to_cells_that_leave_the_format_unset() {
        let mut grid = CellGrid::new();
        grid.insert((0, 1), CellValue::Float(45000.0));
        grid.insert((1, 1), CellValue::Float(45001.0));
        let sheets = vec![("Sheet1".to_string(), grid)];

        let mut buf = Cursor::new(Vec::new());
        let mut styler = |style: &mut Style, _sheet: &str, row: i64, col: i64, _value: &CellValue| {
            if row == -1 && col == 1 {
                style.number_format = Some(style::DATE_TIME_FORMAT_CODE.to_string());
            }
        };
        write_styled(&mut buf, &sheets, Some(&mut styler)).expect("write");

        buf.set_position(0);
        let read_back = read(buf).expect("read");
        assert_eq!(read_back[0].1.get(&(0, 1)), Some(&CellValue::DateTime(45000.0)));
        assert_eq!(read_back[0].1.get(&(1, 1)), Some(&CellValue::DateTime(45001.0)));
    }
}
