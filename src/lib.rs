//! # Row cursor
//!
//! Typed, forward only access to the result sets of an ODBC statement, one row at a time. Field
//! values are fetched with `SQLGetData` and decoded only once they are requested. Column metadata
//! is described lazily as well, and a descriptive schema, including key information from the
//! catalog functions of the data source, is available on demand.
//!
//! The cursor talks to the data source exclusively through [`handles::StatementHandle`]. Enable
//! the `odbc` feature for an implementation on top of native ODBC statement handles.

mod catalog;
mod conversion;
mod cursor;
mod decoder;
mod error;
mod options;
mod schema;
mod value;

pub mod handles;

pub use self::{
    catalog::{Column, ColumnCatalog},
    conversion::Decimal,
    cursor::{CursorState, RowCursor},
    decoder::{DecodeStrategy, ValueDecoder},
    error::Error,
    handles::{ColumnDescription, DataType, Nullable},
    options::{CursorOptions, DEFAULT_CHUNK_SIZE},
    schema::{KeyDiscovery, SchemaDescriptor, SchemaProjector, SchemaRow},
    value::{FromValue, Value},
};
// Reexports
/// Reexports `odbc-sys` as sys to enable applications to always use the same version as this crate.
#[cfg(feature = "odbc")]
pub use odbc_sys as sys;
/// Reexports `chrono`, so applications can name the timestamp type of [`Value::Timestamp`].
pub use chrono;
