// SPDX-License-Identifier: MIT OR Apache-2.0
//! An ORM over one workbook file: typed, ordered tables that track their
//! own dirty flag, loaded and saved together by a [`Database`].
#![deny(unsafe_code)]

pub mod database;
pub mod error;
pub mod record;
pub mod table;

pub use database::Database;
pub use error::DocstoreError;
pub use record::{CellKey, Record};
pub use table::{Table, TableIo};
