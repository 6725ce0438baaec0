//! Errors surfaced by the workbook reader and writer.

use std::path::PathBuf;

/// A structural error reading or writing a workbook. Fatal to the
/// operation in progress; see the document store's `reload`/`save` for how
/// callers turn this into a fatal load error or a reported plugin error.
#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("failed to open workbook at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a valid zip package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed XML in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("missing required workbook part: {0}")]
    MissingPart(String),

    #[error("malformed column name: {0}")]
    BadColumnName(String),

    #[error("malformed cell reference: {0}")]
    BadCellReference(String),

    #[error("cells written out of order: row {row}, column {column} is not after the previous cell")]
    OutOfOrder { row: u32, column: u32 },
}
