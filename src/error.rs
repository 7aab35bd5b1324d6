use thiserror::Error as ThisError;

use crate::{
    cursor::CursorState,
    handles::{Diagnostics, Record as DiagnosticRecord, SqlResult, log_diagnostics},
};

#[derive(Debug, ThisError)]
/// Error type of this crate. Errors reported by the data source carry the name of the failing
/// function and its first diagnostic record.
pub enum Error {
    /// The data source returned an error, but neither the driver manager nor the driver left a
    /// diagnostic record specifying what exactly went wrong.
    #[error(
        "No Diagnostics available. The ODBC function call to {function} returned an error. Sadly \
        neither the ODBC driver manager, nor the driver were polite enough to leave a diagnostic \
        record specifying what exactly went wrong."
    )]
    NoDiagnostics {
        /// ODBC API call which returned error without producing a diagnostic record.
        function: &'static str,
    },
    /// A function returned `SQL_NO_DATA` in a situation there it is not allowed to.
    #[error("The data source reported SQL_NO_DATA for a call which must always return data.")]
    UnexpectedNoData,
    /// SQL Error had been returned by a low level ODBC function call. A Diagnostic record is
    /// obtained and associated with this error.
    #[error("ODBC emitted an error calling '{function}':\n{record}")]
    Diagnostics {
        /// Diagnostic record returned by the ODBC driver manager
        record: DiagnosticRecord,
        /// ODBC API call which produced the diagnostic record
        function: &'static str,
    },
    /// Describing a column, or querying one of its attributes failed.
    #[error("Failed to retrieve metadata of column {column}. Error calling '{function}':\n{record}")]
    Metadata {
        /// Zero based index of the column.
        column: usize,
        record: DiagnosticRecord,
        function: &'static str,
    },
    /// The data source described a column with the type code `SQL_UNKNOWN_TYPE`.
    #[error("The data source reported an invalid type code for column {column}.")]
    InvalidTypeCode { column: usize },
    /// Reading or converting the value of a field failed.
    #[error("Failed to read value of column {column}. Error calling '{function}':\n{record}")]
    Decode {
        /// Zero based index of the column.
        column: usize,
        record: DiagnosticRecord,
        function: &'static str,
    },
    /// `SQLGetData` returned `SQL_SUCCESS_WITH_INFO`, yet the diagnostic did not indicate a right
    /// truncated value. We do not know whether the value would be complete.
    #[error(
        "Unexpected warning reading column {column}. Partial success has only been expected to \
        signal right truncation. Diagnostic:\n{record}"
    )]
    UnexpectedInfo {
        column: usize,
        record: DiagnosticRecord,
    },
    /// `SQLGetData` drains a field, so its value can not be fetched again within the same row. This
    /// is the case after a failed decode, or after the field has been streamed with
    /// [`crate::RowCursor::read_bytes`].
    #[error(
        "The value of column {column} has already been consumed from the data source and can not \
        be read again for this row."
    )]
    FieldConsumed { column: usize },
    /// Decimal text returned by the data source can not be parsed.
    #[error("Column {column} holds '{text}', which is not a valid decimal.")]
    InvalidDecimal { column: usize, text: String },
    /// Timestamp returned by the data source is not a valid point in the gregorian calendar.
    #[error(
        "Column {column} holds an invalid timestamp: {year:04}-{month:02}-{day:02} \
        {hour:02}:{minute:02}:{second:02}."
    )]
    InvalidTimestamp {
        column: usize,
        year: i16,
        month: u16,
        day: u16,
        hour: u16,
        minute: u16,
        second: u16,
    },
    /// An operation has been attempted in a state of the cursor which does not allow for it. E.g.
    /// reading a value, without the cursor being positioned on a row.
    #[error("'{operation}' is not allowed in the current state of the cursor: {state:?}.")]
    InvalidState {
        operation: &'static str,
        state: CursorState,
    },
    /// Column index is not within `[0, num_cols)`.
    #[error("Column index {ordinal} is out of range. The result set has {num_cols} columns.")]
    OutOfRange { ordinal: usize, num_cols: usize },
    /// No column with the requested name.
    #[error("There is no column named '{name}' in the result set.")]
    NotFound { name: String },
    /// The value of a field can not be represented by the type requested.
    #[error("Column {ordinal} holds a value of type {actual}, which can not be read as {expected}.")]
    TypeMismatch {
        ordinal: usize,
        expected: &'static str,
        actual: &'static str,
    },
}

impl Error {
    /// `true` for errors raised while describing columns or querying column attributes.
    pub fn is_metadata(&self) -> bool {
        matches!(self, Error::Metadata { .. } | Error::InvalidTypeCode { .. })
    }

    /// `true` for errors raised while reading or converting field values.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::Decode { .. }
                | Error::UnexpectedInfo { .. }
                | Error::FieldConsumed { .. }
                | Error::InvalidDecimal { .. }
                | Error::InvalidTimestamp { .. }
        )
    }

    /// `true` if the data source reported a connection exception (SQLSTATE class `08`). These are
    /// never swallowed by best effort operations.
    pub fn is_connection_exception(&self) -> bool {
        match self {
            Error::Diagnostics { record, .. }
            | Error::Metadata { record, .. }
            | Error::Decode { record, .. } => record.state.is_connection_exception(),
            _ => false,
        }
    }

    /// Allows for mapping the error variant from the "catch all" diagnostic to a more specific one
    /// offering the oppertunity to provide context in the error message.
    fn provide_context_for_diagnostic<F>(self, f: F) -> Self
    where
        F: FnOnce(DiagnosticRecord, &'static str) -> Error,
    {
        if let Error::Diagnostics { record, function } = self {
            f(record, function)
        } else {
            self
        }
    }
}

/// Convinience for easily providing more context to errors without an additional call to `map_err`
pub(crate) trait ExtendResult {
    fn provide_context_for_diagnostic<F>(self, f: F) -> Self
    where
        F: FnOnce(DiagnosticRecord, &'static str) -> Error;
}

impl<T> ExtendResult for Result<T, Error> {
    fn provide_context_for_diagnostic<F>(self, f: F) -> Self
    where
        F: FnOnce(DiagnosticRecord, &'static str) -> Error,
    {
        self.map_err(|error| error.provide_context_for_diagnostic(f))
    }
}

impl SqlResult<()> {
    /// Use this instead of [`Self::into_result`] if you expect [`SqlResult::NoData`] to be a
    /// valid value. [`SqlResult::NoData`] is mapped to `Ok(false)`, all other success values are
    /// `Ok(true)`.
    pub fn into_result_bool(self, handle: &(impl Diagnostics + ?Sized)) -> Result<bool, Error> {
        self.on_success(|| true).into_result_with(handle, Some(false))
    }
}

// Define that here rather than in `sql_result` mod to keep the `handles` module entirely agnostic
// about the top level `Error` type.
impl<T> SqlResult<T> {
    /// [`Self::Success`] and [`Self::SuccessWithInfo`] are mapped to Ok. In case of
    /// [`Self::SuccessWithInfo`] any diagnostics are logged. [`Self::Error`] is mapped to error.
    /// [`Self::NoData`] is not expected and reported as an error without diagnostics.
    pub fn into_result(self, handle: &(impl Diagnostics + ?Sized)) -> Result<T, Error> {
        self.into_result_with(handle, None)
    }

    /// Most flexible way of converting an `SqlResult` to an idiomatic `Result`.
    ///
    /// # Parameters
    ///
    /// * `handle`: This handle is used to extract diagnostics in case `self` is
    ///   [`SqlResult::SuccessWithInfo`] or [`SqlResult::Error`].
    /// * `no_data`: Controls the behaviour for [`SqlResult::NoData`]. `None` indicates that the
    ///   result is never expected to be [`SqlResult::NoData`]. `Some(value)` would cause
    ///   [`SqlResult::NoData`] to be mapped to `Ok(value)`.
    pub fn into_result_with(
        self,
        handle: &(impl Diagnostics + ?Sized),
        no_data: Option<T>,
    ) -> Result<T, Error> {
        match self {
            // The function has been executed successfully. Holds result.
            SqlResult::Success(value) => Ok(value),
            // The function has been executed successfully. There have been warnings. Holds result.
            SqlResult::SuccessWithInfo(value) => {
                log_diagnostics(handle);
                Ok(value)
            }
            SqlResult::Error { function } => {
                let mut record = DiagnosticRecord::with_capacity(512);
                if record.fill_from(handle, 1) {
                    log_diagnostics(handle);
                    Err(Error::Diagnostics { record, function })
                } else {
                    Err(Error::NoDiagnostics { function })
                }
            }
            SqlResult::NoData => no_data.ok_or(Error::UnexpectedNoData),
        }
    }
}
