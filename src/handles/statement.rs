use crate::Error;

use super::{
    column_description::ColumnDescription, diagnostics::Diagnostics, indicator::Indicator,
    sql_result::SqlResult,
};

/// C data type a column value is converted into by the data source then fetched with
/// [`StatementHandle::get_data`]. Mirrors the `SQL_C_*` type identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CType {
    /// Zero terminated narrow text. `SQL_C_CHAR`
    Char,
    /// Zero terminated UTF-16 text. `SQL_C_WCHAR`
    WChar,
    /// Raw bytes. `SQL_C_BINARY`
    Binary,
    /// One byte, `0` or `1`. `SQL_C_BIT`
    Bit,
    /// `i8`. `SQL_C_STINYINT`
    STinyInt,
    /// `i16`. `SQL_C_SSHORT`
    SShort,
    /// `i32`. `SQL_C_SLONG`
    SLong,
    /// `i64`. `SQL_C_SBIGINT`
    SBigInt,
    /// `f32`. `SQL_C_FLOAT`
    Float,
    /// `f64`. `SQL_C_DOUBLE`
    Double,
    /// [`TimestampStruct`]. `SQL_C_TYPE_TIMESTAMP`
    TypeTimestamp,
}

impl CType {
    /// Number of bytes written by the data source for fixed sized types. `None` for the variadic
    /// types.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            CType::Char | CType::WChar | CType::Binary => None,
            CType::Bit | CType::STinyInt => Some(1),
            CType::SShort => Some(2),
            CType::SLong | CType::Float => Some(4),
            CType::SBigInt | CType::Double => Some(8),
            CType::TypeTimestamp => Some(TimestampStruct::SIZE),
        }
    }

    /// Number of bytes used for the terminating zero appended by the data source.
    pub fn terminating_zero(self) -> usize {
        match self {
            CType::Char => 1,
            CType::WChar => 2,
            _ => 0,
        }
    }
}

/// Column attributes which can be queried with [`StatementHandle::numeric_col_attribute`] and
/// [`StatementHandle::string_col_attribute`]. Mirrors the `SQL_DESC_*` field identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnField {
    /// Numeric. `SQL_DESC_PRECISION`
    Precision,
    /// Numeric. `SQL_DESC_SCALE`
    Scale,
    /// Numeric. `SQL_DESC_NULLABLE`. One of `SQL_NO_NULLS`, `SQL_NULLABLE`,
    /// `SQL_NULLABLE_UNKNOWN`.
    Nullable,
    /// Numeric. `SQL_DESC_AUTO_UNIQUE_VALUE`. `SQL_TRUE` if the column is auto-incrementing.
    AutoUniqueValue,
    /// Numeric. `SQL_DESC_UPDATABLE`. One of `SQL_ATTR_READONLY`, `SQL_ATTR_WRITE`,
    /// `SQL_ATTR_READWRITE_UNKNOWN`.
    Updatable,
    /// String. `SQL_DESC_TABLE_NAME`
    TableName,
    /// String. `SQL_DESC_SCHEMA_NAME`
    SchemaName,
    /// String. `SQL_DESC_CATALOG_NAME`
    CatalogName,
    /// String. `SQL_DESC_BASE_COLUMN_NAME`
    BaseColumnName,
}

/// Memory layout of `SQL_TIMESTAMP_STRUCT`, which is what the data source writes for
/// [`CType::TypeTimestamp`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TimestampStruct {
    pub year: i16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    /// Fractional seconds in nanoseconds.
    pub fraction: u32,
}

impl TimestampStruct {
    /// Size in bytes of the C representation, including padding.
    pub const SIZE: usize = 16;

    /// Reads the struct from the bytes written by the data source (native endianess, C layout).
    ///
    /// # Panics
    ///
    /// If `bytes` is shorter than [`Self::SIZE`].
    pub fn from_ne_bytes(bytes: &[u8]) -> Self {
        let u16_at = |offset: usize| u16::from_ne_bytes([bytes[offset], bytes[offset + 1]]);
        TimestampStruct {
            year: i16::from_ne_bytes([bytes[0], bytes[1]]),
            month: u16_at(2),
            day: u16_at(4),
            hour: u16_at(6),
            minute: u16_at(8),
            second: u16_at(10),
            fraction: u32::from_ne_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        }
    }

    /// Inverse of [`Self::from_ne_bytes`]. Used by statement implementations which do not get the
    /// struct from a C API.
    pub fn to_ne_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0; Self::SIZE];
        bytes[0..2].copy_from_slice(&self.year.to_ne_bytes());
        bytes[2..4].copy_from_slice(&self.month.to_ne_bytes());
        bytes[4..6].copy_from_slice(&self.day.to_ne_bytes());
        bytes[6..8].copy_from_slice(&self.hour.to_ne_bytes());
        bytes[8..10].copy_from_slice(&self.minute.to_ne_bytes());
        bytes[10..12].copy_from_slice(&self.second.to_ne_bytes());
        bytes[12..16].copy_from_slice(&self.fraction.to_ne_bytes());
        bytes
    }
}

/// The capability a [`crate::RowCursor`] needs from the statement layer: a statement which has
/// been executed and is now in cursor state.
///
/// Implementations are expected to forward each call to the data source as is. The cursor never
/// deallocates the statement. It only ever closes the cursor on it (and the connection, if asked
/// to).
///
/// Column numbers start at `1`.
pub trait StatementHandle: Diagnostics {
    /// Temporary statement returned by the catalog functions. It is released then dropped.
    type Catalog: StatementHandle;

    /// Number of columns in the current result set. `SQLNumResultCols`
    fn num_result_cols(&mut self) -> SqlResult<i16>;

    /// Raw column metadata. `SQLDescribeCol`
    fn describe_col(&mut self, column_number: u16) -> SqlResult<ColumnDescription>;

    /// Advances to the next row of the current result set. [`SqlResult::NoData`] signals the end
    /// of the result set. `SQLFetch`
    fn fetch(&mut self) -> SqlResult<()>;

    /// Fetches (the next part of) the value of a column in the current row, converted to
    /// `target_type`, into `buf`. `SQLGetData`
    ///
    /// For text and binary types repeated calls return consecutive chunks of the value. A chunk
    /// which did not fit completely returns [`SqlResult::SuccessWithInfo`] with a diagnostic of
    /// state [`super::State::STRING_DATA_RIGHT_TRUNCATION`]. Once the value has been drained
    /// [`SqlResult::NoData`] is returned.
    fn get_data(
        &mut self,
        column_number: u16,
        target_type: CType,
        buf: &mut [u8],
    ) -> SqlResult<Indicator>;

    /// Numeric attribute of a column. `SQLColAttribute`
    fn numeric_col_attribute(&mut self, column_number: u16, field: ColumnField) -> SqlResult<isize>;

    /// String attribute of a column. `SQLColAttribute`
    fn string_col_attribute(
        &mut self,
        column_number: u16,
        field: ColumnField,
    ) -> SqlResult<String>;

    /// Moves to the next result set. [`SqlResult::NoData`] if there is none. `SQLMoreResults`
    fn more_results(&mut self) -> SqlResult<()>;

    /// Executes the catalog function listing the columns making up the primary key of the given
    /// table on a new, temporary statement. Column 4 of the result is `COLUMN_NAME`.
    /// `SQLPrimaryKeys`
    fn primary_keys(
        &mut self,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> Result<Self::Catalog, Error>;

    /// Executes the catalog function listing the indices of the given table on a new, temporary
    /// statement. Of interest are column 4 `NON_UNIQUE`, 6 `INDEX_NAME`, 7 `TYPE` and 9
    /// `COLUMN_NAME`. `SQLStatistics`
    fn statistics(
        &mut self,
        catalog: &str,
        schema: &str,
        table: &str,
        unique_only: bool,
    ) -> Result<Self::Catalog, Error>;

    /// Closes the cursor and discards pending results, leaving the statement allocated (and
    /// prepared, if it has been). `SQLFreeStmt` with `SQL_CLOSE`
    fn close_cursor(&mut self) -> SqlResult<()>;

    /// Closes the connection the statement has been allocated on. `SQLDisconnect`
    fn close_connection(&mut self) -> SqlResult<()>;
}
