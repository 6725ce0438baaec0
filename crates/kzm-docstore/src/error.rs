//! Errors surfaced by the document store.

/// A structural error loading, saving, or field-accessing a table.
#[derive(Debug, thiserror::Error)]
pub enum DocstoreError {
    #[error(transparent)]
    Workbook(#[from] kzm_workbook::WorkbookError),

    #[error("unknown field {field:?} on table {table}")]
    UnknownField { table: &'static str, field: String },

    #[error("field {field:?} on table {table} could not be coerced from {found:?}")]
    BadFieldValue { table: &'static str, field: &'static str, found: kzm_workbook::CellValue },

    #[error("the key column in table {0} could not be decoded")]
    BadKey(&'static str),

    #[error("no table registered under the name {0}")]
    UnknownTable(String),

    #[error("no record under that key in table {0}")]
    NoSuchRecord(&'static str),

    #[error("table {0} is registered under a different row/key type than requested")]
    WrongTableType(&'static str),
}
