//! The per-record-type contract a table needs: a fixed field list, a
//! timestamp pair maintained automatically, and field access by name for
//! the generic worksheet codec.
//!
//! Field writes go through [`crate::Table::set_field`], not a method on
//! `Record` itself: a record has no back-pointer to the table that owns
//! it, so there's nothing on the record to mark dirty.

use kzm_workbook::CellValue;

use crate::error::DocstoreError;

/// A declaration of a fixed ordered list of named fields, implemented by
/// hand per record type (there is no attribute reflection in Rust to lean
/// on, unlike the dynamically typed original this is modelled on).
pub trait Record: Sized {
    /// The table name this record type is stored under.
    const TABLE_NAME: &'static str;

    /// Field names, in the order they appear as worksheet columns after
    /// the key column.
    fn field_names() -> &'static [&'static str];

    /// Builds a fresh record with both timestamps set to `now`.
    fn with_timestamps(now: f64) -> Self;

    fn created_at(&self) -> f64;
    fn updated_at(&self) -> f64;
    fn set_updated_at(&mut self, now: f64);

    /// Reads a field by name for serialisation.
    fn get_field(&self, name: &str) -> CellValue;

    /// Writes a field by name; implementations should error on a name not
    /// in [`Record::field_names`]. Must not touch the timestamps — the
    /// table does that around this call.
    fn set_field(&mut self, name: &str, value: CellValue) -> Result<(), DocstoreError>;
}

/// A table's key type: whatever a worksheet's first column decodes to and
/// encodes from.
pub trait CellKey: Ord + Clone {
    fn to_cell(&self) -> CellValue;
    fn from_cell(value: &CellValue) -> Option<Self>;
}

impl CellKey for String {
    fn to_cell(&self) -> CellValue {
        CellValue::Str(self.clone())
    }
    fn from_cell(value: &CellValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl CellKey for i64 {
    fn to_cell(&self) -> CellValue {
        CellValue::Int(*self)
    }
    fn from_cell(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Int(i) => Some(*i),
            CellValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }
}
