//! The seam between the cursor and the data source.
//!
//! Everything the cursor knows about the outside world passes through [`StatementHandle`]. Two
//! decisions are already baked into this module:
//!
//! * Treat warnings by logging them with `log`.
//! * Column numbers are 1-based, like they are in the ODBC C API. The bookmark column `0` is never
//!   requested.

mod column_description;
mod data_type;
mod diagnostics;
mod indicator;
mod sql_result;
mod statement;

#[cfg(feature = "odbc")]
mod as_handle;
#[cfg(feature = "odbc")]
mod odbc_statement;

pub use self::{
    column_description::{ColumnDescription, Nullable},
    data_type::{DataType, SqlDataType},
    diagnostics::{DiagnosticResult, Diagnostics, Record, State, log_diagnostics},
    indicator::{Indicator, NO_TOTAL, NULL_DATA},
    sql_result::SqlResult,
    statement::{CType, ColumnField, StatementHandle, TimestampStruct},
};

#[cfg(feature = "odbc")]
pub use self::{as_handle::AsHandle, odbc_statement::OdbcStatement};
