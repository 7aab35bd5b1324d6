use std::ptr::{null, null_mut};

use log::warn;
use odbc_sys::{
    CDataType, Desc, FreeStmtOption, HDbc, HStmt, Handle, HandleType, Len, Pointer,
    SQLAllocHandle, SQLColAttribute, SQLDescribeCol, SQLDisconnect, SQLFetch, SQLFreeHandle,
    SQLFreeStmt, SQLGetData, SQLMoreResults, SQLNumResultCols, SmallInt, SqlReturn, ULen,
    USmallInt,
};

use crate::Error;

use super::{
    as_handle::AsHandle,
    column_description::{ColumnDescription, Nullable},
    data_type::SqlDataType,
    indicator::Indicator,
    sql_result::SqlResult,
    statement::{CType, ColumnField, StatementHandle},
};

// Narrow catalog functions used to discover the keys of base tables.
unsafe extern "system" {
    fn SQLPrimaryKeys(
        statement_handle: HStmt,
        catalog_name: *const u8,
        catalog_name_length: SmallInt,
        schema_name: *const u8,
        schema_name_length: SmallInt,
        table_name: *const u8,
        table_name_length: SmallInt,
    ) -> SqlReturn;

    fn SQLStatistics(
        statement_handle: HStmt,
        catalog_name: *const u8,
        catalog_name_length: SmallInt,
        schema_name: *const u8,
        schema_name_length: SmallInt,
        table_name: *const u8,
        table_name_length: SmallInt,
        unique: USmallInt,
        reserved: USmallInt,
    ) -> SqlReturn;
}

/// `SQL_INDEX_UNIQUE`
const INDEX_UNIQUE: USmallInt = 0;
/// `SQL_INDEX_ALL`
const INDEX_ALL: USmallInt = 1;
/// `SQL_QUICK`. Do not force the driver to compute `CARDINALITY` and `PAGES`.
const QUICK: USmallInt = 0;

/// Table, schema or catalog name passed to a catalog function. Empty names are passed as NULL,
/// which the data source interprets as "any".
struct NameArg {
    ptr: *const u8,
    len: SmallInt,
}

impl NameArg {
    fn new(name: &str) -> Self {
        if name.is_empty() {
            Self { ptr: null(), len: 0 }
        } else {
            Self {
                ptr: name.as_ptr(),
                len: SmallInt::try_from(name.len()).unwrap_or(SmallInt::MAX),
            }
        }
    }
}

/// Pointer and capacity of a narrow output buffer whose length is passed as `SQLSMALLINT`. NULL
/// for empty buffers. Capacities beyond `i16::MAX` are capped.
pub(super) fn small_out_buf(buf: &mut [u8]) -> (*mut u8, SmallInt) {
    if buf.is_empty() {
        (null_mut(), 0)
    } else {
        (
            buf.as_mut_ptr(),
            SmallInt::try_from(buf.len()).unwrap_or(SmallInt::MAX),
        )
    }
}

trait ExtSqlReturn {
    fn into_sql_result(self, function: &'static str) -> SqlResult<()>;
}

impl ExtSqlReturn for SqlReturn {
    fn into_sql_result(self, function: &'static str) -> SqlResult<()> {
        match self {
            SqlReturn::SUCCESS => SqlResult::Success(()),
            SqlReturn::SUCCESS_WITH_INFO => SqlResult::SuccessWithInfo(()),
            SqlReturn::NO_DATA => SqlResult::NoData,
            // `SQL_ERROR`, but also `SQL_INVALID_HANDLE`, `SQL_STILL_EXECUTING` or `SQL_NEED_DATA`
            // which a statement in cursor state in synchronous mode must never return.
            _ => SqlResult::Error { function },
        }
    }
}

/// Connection handle, only used to extract diagnostics in case allocating a statement fails.
struct ConnectionRef(HDbc);

unsafe impl AsHandle for ConnectionRef {
    fn as_handle(&self) -> Handle {
        self.0 as Handle
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Dbc
    }
}

/// Implements [`StatementHandle`] on top of a native ODBC statement handle.
///
/// A statement passed into [`OdbcStatement::new`] is borrowed from the application and is never
/// freed by this type. Statements created for catalog functions ([`Self::primary_keys`],
/// [`Self::statistics`]) are owned and freed then dropped.
pub struct OdbcStatement {
    handle: HStmt,
    connection: HDbc,
    owned: bool,
}

unsafe impl AsHandle for OdbcStatement {
    fn as_handle(&self) -> Handle {
        self.handle as Handle
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Stmt
    }
}

impl Drop for OdbcStatement {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        unsafe {
            SQLFreeStmt(self.handle, FreeStmtOption::Close);
            match SQLFreeHandle(HandleType::Stmt, self.handle as Handle) {
                SqlReturn::SUCCESS => (),
                other => warn!("Unexpected return value of SQLFreeHandle: {other:?}"),
            }
        }
    }
}

impl OdbcStatement {
    /// # Safety
    ///
    /// * `handle` must be a valid (successfully allocated) statement handle in cursor state, i.e.
    ///   a query producing a result set has been executed on it.
    /// * `connection` must be the valid connection handle `handle` has been allocated on.
    /// * Both handles must outlive the returned instance.
    pub unsafe fn new(connection: HDbc, handle: HStmt) -> Self {
        Self {
            handle,
            connection,
            owned: false,
        }
    }

    /// The raw statement handle.
    pub fn as_sys(&self) -> HStmt {
        self.handle
    }

    fn allocate_catalog_statement(&self) -> Result<OdbcStatement, Error> {
        let mut out: Handle = null_mut();
        let connection = ConnectionRef(self.connection);
        unsafe { SQLAllocHandle(HandleType::Stmt, self.connection as Handle, &mut out) }
            .into_sql_result("SQLAllocHandle")
            .into_result(&connection)?;
        Ok(OdbcStatement {
            handle: out as HStmt,
            connection: self.connection,
            owned: true,
        })
    }
}

fn c_data_type(target_type: CType) -> CDataType {
    match target_type {
        CType::Char => CDataType::Char,
        CType::WChar => CDataType::WChar,
        CType::Binary => CDataType::Binary,
        CType::Bit => CDataType::Bit,
        CType::STinyInt => CDataType::STinyInt,
        CType::SShort => CDataType::SShort,
        CType::SLong => CDataType::SLong,
        CType::SBigInt => CDataType::SBigInt,
        CType::Float => CDataType::Float,
        CType::Double => CDataType::Double,
        CType::TypeTimestamp => CDataType::TypeTimestamp,
    }
}

fn desc(field: ColumnField) -> Desc {
    match field {
        ColumnField::Precision => Desc::Precision,
        ColumnField::Scale => Desc::Scale,
        ColumnField::Nullable => Desc::Nullable,
        ColumnField::AutoUniqueValue => Desc::AutoUniqueValue,
        ColumnField::Updatable => Desc::Updatable,
        ColumnField::TableName => Desc::TableName,
        ColumnField::SchemaName => Desc::SchemaName,
        ColumnField::CatalogName => Desc::CatalogName,
        ColumnField::BaseColumnName => Desc::BaseColumnName,
    }
}

impl StatementHandle for OdbcStatement {
    type Catalog = OdbcStatement;

    fn num_result_cols(&mut self) -> SqlResult<i16> {
        let mut out: SmallInt = 0;
        unsafe { SQLNumResultCols(self.handle, &mut out) }
            .into_sql_result("SQLNumResultCols")
            .map(|()| out)
    }

    fn describe_col(&mut self, column_number: u16) -> SqlResult<ColumnDescription> {
        let mut name: Vec<u8> = vec![0; 256];
        loop {
            let mut name_length: SmallInt = 0;
            let mut data_type = odbc_sys::SqlDataType::UNKNOWN_TYPE;
            let mut column_size: ULen = 0;
            let mut decimal_digits: SmallInt = 0;
            let mut nullable = odbc_sys::Nullable::UNKNOWN;
            let (name_ptr, name_capacity) = small_out_buf(&mut name);
            let result = unsafe {
                SQLDescribeCol(
                    self.handle,
                    column_number,
                    name_ptr,
                    name_capacity,
                    &mut name_length,
                    &mut data_type,
                    &mut column_size,
                    &mut decimal_digits,
                    &mut nullable,
                )
            }
            .into_sql_result("SQLDescribeCol");
            if result.is_err() {
                return SqlResult::Error {
                    function: "SQLDescribeCol",
                };
            }
            let name_length = usize::try_from(name_length).unwrap_or(0);
            if name_length + 1 > name.len() {
                // Buffer is to small to hold name, retry with larger buffer
                name.resize(name_length + 1, 0);
                continue;
            }
            name.truncate(name_length);
            let description = ColumnDescription {
                name: String::from_utf8_lossy(&name).into_owned(),
                data_type: SqlDataType(data_type.0),
                column_size,
                decimal_digits,
                nullable: match nullable {
                    odbc_sys::Nullable::NO_NULLS => Nullable::NoNulls,
                    odbc_sys::Nullable::NULLABLE => Nullable::Nullable,
                    _ => Nullable::Unknown,
                },
            };
            return result.map(|()| description);
        }
    }

    fn fetch(&mut self) -> SqlResult<()> {
        unsafe { SQLFetch(self.handle) }.into_sql_result("SQLFetch")
    }

    fn get_data(
        &mut self,
        column_number: u16,
        target_type: CType,
        buf: &mut [u8],
    ) -> SqlResult<Indicator> {
        let mut indicator: Len = 0;
        // An empty buffer only queries the length of the remaining data.
        let buf_ptr = if buf.is_empty() {
            null_mut()
        } else {
            buf.as_mut_ptr() as Pointer
        };
        unsafe {
            SQLGetData(
                self.handle,
                column_number,
                c_data_type(target_type),
                buf_ptr,
                Len::try_from(buf.len()).unwrap_or(Len::MAX),
                &mut indicator,
            )
        }
        .into_sql_result("SQLGetData")
        .map(|()| Indicator::from_isize(indicator))
    }

    fn numeric_col_attribute(&mut self, column_number: u16, field: ColumnField) -> SqlResult<isize> {
        let mut out: Len = 0;
        unsafe {
            SQLColAttribute(
                self.handle,
                column_number,
                desc(field),
                null_mut(),
                0,
                null_mut(),
                &mut out,
            )
        }
        .into_sql_result("SQLColAttribute")
        .map(|()| out)
    }

    fn string_col_attribute(
        &mut self,
        column_number: u16,
        field: ColumnField,
    ) -> SqlResult<String> {
        let mut buf: Vec<u8> = vec![0; 256];
        loop {
            // String length in bytes. Terminating zero is excluded.
            let mut string_length: SmallInt = 0;
            let (buf_ptr, capacity) = small_out_buf(&mut buf);
            let result = unsafe {
                SQLColAttribute(
                    self.handle,
                    column_number,
                    desc(field),
                    buf_ptr as Pointer,
                    capacity,
                    &mut string_length,
                    null_mut(),
                )
            }
            .into_sql_result("SQLColAttribute");
            if result.is_err() {
                return SqlResult::Error {
                    function: "SQLColAttribute",
                };
            }
            let string_length = usize::try_from(string_length).unwrap_or(0);
            if string_length + 1 > buf.len() {
                buf.resize(string_length + 1, 0);
                continue;
            }
            buf.truncate(string_length);
            let text = String::from_utf8_lossy(&buf).into_owned();
            return result.map(|()| text);
        }
    }

    fn more_results(&mut self) -> SqlResult<()> {
        unsafe { SQLMoreResults(self.handle) }.into_sql_result("SQLMoreResults")
    }

    fn primary_keys(
        &mut self,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> Result<OdbcStatement, Error> {
        let stmt = self.allocate_catalog_statement()?;
        let catalog = NameArg::new(catalog);
        let schema = NameArg::new(schema);
        let table = NameArg::new(table);
        unsafe {
            SQLPrimaryKeys(
                stmt.handle,
                catalog.ptr,
                catalog.len,
                schema.ptr,
                schema.len,
                table.ptr,
                table.len,
            )
        }
        .into_sql_result("SQLPrimaryKeys")
        .into_result(&stmt)?;
        Ok(stmt)
    }

    fn statistics(
        &mut self,
        catalog: &str,
        schema: &str,
        table: &str,
        unique_only: bool,
    ) -> Result<OdbcStatement, Error> {
        let stmt = self.allocate_catalog_statement()?;
        let unique = if unique_only { INDEX_UNIQUE } else { INDEX_ALL };
        let catalog = NameArg::new(catalog);
        let schema = NameArg::new(schema);
        let table = NameArg::new(table);
        unsafe {
            SQLStatistics(
                stmt.handle,
                catalog.ptr,
                catalog.len,
                schema.ptr,
                schema.len,
                table.ptr,
                table.len,
                unique,
                QUICK,
            )
        }
        .into_sql_result("SQLStatistics")
        .into_result(&stmt)?;
        Ok(stmt)
    }

    fn close_cursor(&mut self) -> SqlResult<()> {
        unsafe { SQLFreeStmt(self.handle, FreeStmtOption::Close) }.into_sql_result("SQLFreeStmt")
    }

    fn close_connection(&mut self) -> SqlResult<()> {
        unsafe { SQLDisconnect(self.connection) }.into_sql_result("SQLDisconnect")
    }
}
