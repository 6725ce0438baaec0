//! A workbook-backed collection of tables, loaded and saved together.

use std::collections::HashMap;
use std::path::PathBuf;

use kzm_workbook::CellGrid;

use crate::error::DocstoreError;
use crate::record::{CellKey, Record};
use crate::table::{Table, TableIo};

/// Ties a fixed set of tables to one workbook file on disk.
///
/// Tables are registered once at startup with [`Database::register`];
/// after that, callers reach them back out with the same `(K, R)` pair via
/// [`Database::table`]/[`Database::table_mut`]. `R::TABLE_NAME` is the
/// worksheet name and doubles as the registry key, so each record type may
/// only be registered once.
pub struct Database {
    path: PathBuf,
    tables: Vec<Box<dyn TableIo>>,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), tables: Vec::new() }
    }

    /// Registers an empty table for record type `R`. Call [`Database::reload`]
    /// afterwards to populate every registered table from disk.
    pub fn register<K: CellKey + 'static, R: Record + 'static>(&mut self) -> &mut Self {
        self.tables.push(Box::new(Table::<K, R>::new()));
        self
    }

    pub fn table<K: CellKey + 'static, R: Record + 'static>(&self) -> Result<&Table<K, R>, DocstoreError> {
        let erased = self.tables.iter().find(|t| t.name() == R::TABLE_NAME).ok_or(DocstoreError::UnknownTable(R::TABLE_NAME.to_string()))?;
        erased.as_any().downcast_ref().ok_or(DocstoreError::WrongTableType(R::TABLE_NAME))
    }

    pub fn table_mut<K: CellKey + 'static, R: Record + 'static>(&mut self) -> Result<&mut Table<K, R>, DocstoreError> {
        let erased =
            self.tables.iter_mut().find(|t| t.name() == R::TABLE_NAME).ok_or(DocstoreError::UnknownTable(R::TABLE_NAME.to_string()))?;
        let name = erased.name();
        erased.as_any_mut().downcast_mut().ok_or(DocstoreError::WrongTableType(name))
    }

    /// Reloads every registered table from the workbook file, replacing
    /// its contents and clearing its dirty flag. A missing file is treated
    /// as an empty workbook, not an error.
    pub fn reload(&mut self) -> Result<(), DocstoreError> {
        let sheets = match kzm_workbook::read_path(&self.path) {
            Ok(sheets) => sheets,
            Err(kzm_workbook::WorkbookError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let by_name: HashMap<&str, &CellGrid> = sheets.iter().map(|(name, grid)| (name.as_str(), grid)).collect();

        for table in &mut self.tables {
            let grid = by_name.get(table.name()).copied();
            table.load(grid)?;
        }
        Ok(())
    }

    /// `true` if any registered table has unsaved changes.
    pub fn dirty(&self) -> bool {
        self.tables.iter().any(|t| t.is_dirty())
    }

    /// Writes every registered table to the workbook file and clears all
    /// dirty flags. Save frequency is the caller's decision, not this
    /// store's — the pipeline host saves once per inbound event.
    pub fn save(&mut self) -> Result<(), DocstoreError> {
        let sheets: Vec<(String, CellGrid)> = self.tables.iter().map(|t| (t.name().to_string(), t.save())).collect();
        kzm_workbook::write_path(&self.path, &sheets)?;
        for table in &mut self.tables {
            table.mark_clean();
        }
        Ok(())
    }
}
