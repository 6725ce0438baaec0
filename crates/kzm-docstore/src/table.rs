//! The in-memory table: an ordered key -> record map with a dirty flag,
//! and the worksheet encoding each table uses to cross the workbook
//! boundary.

use std::any::Any;
use std::collections::BTreeMap;

use kzm_workbook::{CellGrid, CellValue};

use crate::error::DocstoreError;
use crate::record::{CellKey, Record};

fn now_unix() -> f64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

/// An ordered table of records of one type, keyed by `K`. Every insertion,
/// removal, or field write sets [`Table::is_dirty`].
pub struct Table<K: CellKey, R: Record> {
    rows: BTreeMap<K, R>,
    dirty: bool,
}

impl<K: CellKey, R: Record> Default for Table<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: CellKey, R: Record> Table<K, R> {
    pub fn new() -> Self {
        Self { rows: BTreeMap::new(), dirty: false }
    }

    /// Inserts or replaces a record under `key`.
    pub fn insert(&mut self, key: K, record: R) {
        self.rows.insert(key, record);
        self.dirty = true;
    }

    pub fn remove(&mut self, key: &K) -> Option<R> {
        let removed = self.rows.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn get(&self, key: &K) -> Option<&R> {
        self.rows.get(key)
    }

    /// Writes one field of the record under `key`, bumps its `updated_at`,
    /// and marks the table dirty. This is the table method the per-class
    /// dirty flag on the original record type is replaced by: records
    /// carry no back-pointer, so mutation is a table operation.
    pub fn set_field(&mut self, key: &K, field: &str, value: CellValue) -> Result<(), DocstoreError> {
        let now = now_unix();
        let record = self.rows.get_mut(key).ok_or(DocstoreError::NoSuchRecord(R::TABLE_NAME))?;
        record.set_field(field, value)?;
        record.set_updated_at(now);
        self.dirty = true;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &R)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// Type-erased table operations, so a [`crate::Database`] can hold tables
/// of different key/record types in one collection.
pub trait TableIo: Any {
    fn name(&self) -> &'static str;
    fn is_dirty(&self) -> bool;
    fn mark_clean(&mut self);
    fn load(&mut self, grid: Option<&CellGrid>) -> Result<(), DocstoreError>;
    fn save(&self) -> CellGrid;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<K: CellKey + 'static, R: Record + 'static> TableIo for Table<K, R> {
    fn name(&self) -> &'static str {
        R::TABLE_NAME
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn load(&mut self, grid: Option<&CellGrid>) -> Result<(), DocstoreError> {
        self.rows.clear();
        if let Some(grid) = grid {
            let fields = R::field_names();
            for row in 1u32.. {
                let Some(key_cell) = grid.get(&(row, 0)) else { break };
                let key = K::from_cell(key_cell).ok_or(DocstoreError::BadKey(R::TABLE_NAME))?;

                // created_at/updated_at live only in memory; a reload has no
                // persisted timestamp to recover, so both start at now.
                let mut record = R::with_timestamps(now_unix());
                for (j, field) in fields.iter().enumerate() {
                    let column = j as u32 + 1;
                    let value = grid.get(&(row, column)).cloned().unwrap_or(CellValue::Absent);
                    record.set_field(field, value)?;
                }
                self.rows.insert(key, record);
            }
        }
        self.dirty = false;
        Ok(())
    }

    fn save(&self) -> CellGrid {
        let fields = R::field_names();
        let mut grid = CellGrid::new();

        grid.insert((0, 0), CellValue::Str(String::new()));
        for (j, field) in fields.iter().enumerate() {
            grid.insert((0, j as u32 + 1), CellValue::Str((*field).to_string()));
        }

        for (i, (key, record)) in self.rows.iter().enumerate() {
            let row = i as u32 + 1;
            grid.insert((row, 0), key.to_cell());
            for (j, field) in fields.iter().enumerate() {
                grid.insert((row, j as u32 + 1), record.get_field(field));
            }
        }
        grid
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Note {
        created_at: f64,
        updated_at: f64,
        text: String,
    }

    impl Record for Note {
        const TABLE_NAME: &'static str = "Note";

        fn field_names() -> &'static [&'static str] {
            &["text"]
        }

        fn with_timestamps(now: f64) -> Self {
            Note { created_at: now, updated_at: now, text: String::new() }
        }

        fn created_at(&self) -> f64 {
            self.created_at
        }
        fn updated_at(&self) -> f64 {
            self.updated_at
        }
        fn set_updated_at(&mut self, now: f64) {
            self.updated_at = now;
        }

        fn get_field(&self, name: &str) -> CellValue {
            match name {
                "text" => CellValue::Str(self.text.clone()),
                _ => CellValue::Absent,
            }
        }

        fn set_field(&mut self, name: &str, value: CellValue) -> Result<(), DocstoreError> {
            match name {
                "text" => {
                    self.text = value.as_str().unwrap_or_default().to_string();
                    Ok(())
                }
                _ => Err(DocstoreError::UnknownField { table: Self::TABLE_NAME, field: name.to_string() }),
            }
        }
    }

    #[test]
    fn insert_and_field_write_mark_the_table_dirty() {
        let mut table: Table<String, Note> = Table::new();
        assert!(!table.is_dirty());

        table.insert("a".to_string(), Note::with_timestamps(1.0));
        assert!(table.is_dirty());
        table.mark_clean();

        table.set_field(&"a".to_string(), "text", CellValue::Str("hi".to_string())).unwrap();
        assert!(table.is_dirty());
        assert_eq!(table.get(&"a".to_string()).unwrap().text, "hi");
        assert!(table.get(&"a".to_string()).unwrap().updated_at >= 1.0);
    }

    #[test]
    fn save_then_load_round_trips_fields_but_not_timestamps() {
        let mut table: Table<String, Note> = Table::new();
        let mut note = Note::with_timestamps(100.0);
        note.text = "hello".to_string();
        table.insert("k".to_string(), note);

        let grid = TableIo::save(&table);
        assert_eq!(grid.get(&(0, 0)), Some(&CellValue::Str(String::new())));
        assert_eq!(grid.get(&(0, 1)), Some(&CellValue::Str("text".to_string())));
        assert_eq!(grid.get(&(1, 1)), Some(&CellValue::Str("hello".to_string())));

        let mut loaded: Table<String, Note> = Table::new();
        TableIo::load(&mut loaded, Some(&grid)).unwrap();

        // created_at/updated_at never reach the sheet, so a reload can only
        // start them fresh rather than recover the original 100.0.
        let record = loaded.get(&"k".to_string()).unwrap();
        assert_eq!(record.text, "hello");
        assert_ne!(record.created_at, 100.0);
        assert!(!loaded.is_dirty());
    }

    #[test]
    fn loading_without_a_sheet_yields_an_empty_clean_table() {
        let mut table: Table<String, Note> = Table::new();
        table.insert("x".to_string(), Note::with_timestamps(1.0));
        TableIo::load(&mut table, None).unwrap();
        assert!(table.is_empty());
        assert!(!table.is_dirty());
    }
}
