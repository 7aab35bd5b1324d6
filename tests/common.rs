//! Scripted stand-in for an executed ODBC statement. Behaves like a well mannered driver: text is
//! delivered in chunks with right truncation reported as SQLSTATE `01004`, fields which have been
//! drained report `SQL_NO_DATA`.
#![allow(dead_code)]

use std::{cell::Cell, collections::HashMap, rc::Rc};

use odbc_row_cursor::{
    Error, Nullable,
    handles::{
        CType, ColumnDescription, ColumnField, DiagnosticResult, Diagnostics, Indicator,
        SqlDataType, SqlResult, State, StatementHandle, TimestampStruct,
    },
};

/// Content of a single field.
#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    Null,
    Int(i64),
    Float(f64),
    /// Narrow text, delivered as UTF-8. Delivered as UTF-16 if fetched as wide text.
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(TimestampStruct),
}

/// Set environment to something like `RUST_LOG=odbc_row_cursor=debug cargo test` to see the log
/// output of the cursor.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn text(s: &str) -> Field {
    Field::Text(s.to_owned())
}

/// Declared metadata and attributes of a column.
#[derive(Clone, Debug)]
pub struct FakeColumn {
    pub name: String,
    pub data_type: SqlDataType,
    pub column_size: usize,
    pub decimal_digits: i16,
    pub nullable: Nullable,
    pub table: String,
    pub schema: String,
    pub catalog: String,
    pub base_column_name: String,
    pub auto_unique_value: isize,
    /// `SQL_ATTR_READONLY` (0), `SQL_ATTR_WRITE` (1), or `SQL_ATTR_READWRITE_UNKNOWN` (2)
    pub updatable: isize,
}

impl FakeColumn {
    /// Column of an expression, i.e. without base table.
    pub fn new(name: &str, data_type: SqlDataType, column_size: usize) -> Self {
        Self {
            name: name.to_owned(),
            data_type,
            column_size,
            decimal_digits: 0,
            nullable: Nullable::Nullable,
            table: String::new(),
            schema: String::new(),
            catalog: String::new(),
            base_column_name: name.to_owned(),
            auto_unique_value: 0,
            updatable: 2,
        }
    }

    pub fn of_table(mut self, table: &str) -> Self {
        self.table = table.to_owned();
        self.schema = "dbo".to_owned();
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = Nullable::NoNulls;
        self
    }

    pub fn decimal_digits(mut self, decimal_digits: i16) -> Self {
        self.decimal_digits = decimal_digits;
        self
    }
}

/// One result set of a statement.
#[derive(Clone, Debug, Default)]
pub struct ResultSet {
    pub columns: Vec<FakeColumn>,
    pub rows: Vec<Vec<Field>>,
}

impl ResultSet {
    pub fn new(columns: Vec<FakeColumn>, rows: Vec<Vec<Field>>) -> Self {
        Self { columns, rows }
    }

    /// Result set of a catalog function. Only the shape matters, so all columns are `VARCHAR`.
    pub fn catalog(num_cols: usize, rows: Vec<Vec<Field>>) -> Self {
        let columns = (0..num_cols)
            .map(|i| FakeColumn::new(&format!("COL{i}"), SqlDataType::VARCHAR, 128))
            .collect();
        Self { columns, rows }
    }
}

/// Answer of a catalog function.
#[derive(Clone, Debug)]
pub enum CatalogScript {
    /// The catalog function fails with the given state.
    Fail(State),
    Rows(ResultSet),
}

/// Counts calls to the statement, shared with the test, since the cursor owns the statement.
#[derive(Debug, Default)]
pub struct Counters {
    pub fetch: Cell<usize>,
    pub describe_col: Cell<usize>,
    pub get_data: Cell<usize>,
    pub numeric_col_attribute: Cell<usize>,
    pub string_col_attribute: Cell<usize>,
    pub more_results: Cell<usize>,
    pub primary_keys: Cell<usize>,
    pub statistics: Cell<usize>,
    pub close_cursor: Cell<usize>,
    pub close_connection: Cell<usize>,
    /// Number of catalog statements dropped.
    pub released: Cell<usize>,
}

fn inc(counter: &Cell<usize>) {
    counter.set(counter.get() + 1)
}

pub struct FakeStatement {
    result_sets: Vec<ResultSet>,
    current: usize,
    /// Index of the row the statement is positioned on.
    row: Option<usize>,
    /// Bytes already delivered per column (one based) of the current row.
    delivered: HashMap<u16, usize>,
    diagnostics: Vec<(State, String)>,
    pub counters: Rc<Counters>,
    /// Fetching the row with this index fails.
    pub fail_fetch_at: Option<usize>,
    /// `SQLGetData` reports this warning, rather than right truncation.
    pub get_data_warning: Option<State>,
    pub primary_keys: CatalogScript,
    pub statistics: CatalogScript,
    /// Set for statements returned by catalog functions.
    is_catalog: bool,
}

impl FakeStatement {
    pub fn new(result_sets: Vec<ResultSet>) -> Self {
        Self {
            result_sets,
            current: 0,
            row: None,
            delivered: HashMap::new(),
            diagnostics: Vec::new(),
            counters: Rc::new(Counters::default()),
            fail_fetch_at: None,
            get_data_warning: None,
            primary_keys: CatalogScript::Rows(ResultSet::catalog(6, Vec::new())),
            statistics: CatalogScript::Rows(ResultSet::catalog(13, Vec::new())),
            is_catalog: false,
        }
    }

    pub fn single(columns: Vec<FakeColumn>, rows: Vec<Vec<Field>>) -> Self {
        Self::new(vec![ResultSet::new(columns, rows)])
    }

    fn result_set(&self) -> &ResultSet {
        &self.result_sets[self.current]
    }

    fn fail<T>(&mut self, state: State, message: &str, function: &'static str) -> SqlResult<T> {
        self.diagnostics.push((state, message.to_owned()));
        SqlResult::Error { function }
    }

    fn catalog_statement(
        &mut self,
        script: CatalogScript,
        function: &'static str,
    ) -> Result<FakeStatement, Error> {
        match script {
            CatalogScript::Fail(state) => {
                let result: SqlResult<FakeStatement> =
                    self.fail(state, "Catalog function failed.", function);
                result.into_result(&*self)
            }
            CatalogScript::Rows(result_set) => {
                let mut statement = FakeStatement::new(vec![result_set]);
                statement.counters = self.counters.clone();
                statement.is_catalog = true;
                Ok(statement)
            }
        }
    }

    fn get_variadic(
        &mut self,
        column_number: u16,
        payload: Vec<u8>,
        terminator: usize,
        buf: &mut [u8],
    ) -> SqlResult<Indicator> {
        let offset = self.delivered.get(&column_number).copied();
        if offset == Some(payload.len()) {
            return SqlResult::NoData;
        }
        let offset = offset.unwrap_or(0);
        let remaining = payload.len() - offset;
        let capacity = buf.len().saturating_sub(terminator);
        let n = remaining.min(capacity);
        buf[..n].copy_from_slice(&payload[offset..offset + n]);
        for byte in buf[n..].iter_mut().take(terminator) {
            *byte = 0;
        }
        self.delivered.insert(column_number, offset + n);
        if let Some(state) = self.get_data_warning {
            self.diagnostics.push((state, "Warning.".to_owned()));
            return SqlResult::SuccessWithInfo(Indicator::Length(remaining));
        }
        if remaining > capacity {
            self.diagnostics.push((
                State::STRING_DATA_RIGHT_TRUNCATION,
                "String data, right truncated.".to_owned(),
            ));
            SqlResult::SuccessWithInfo(Indicator::Length(remaining))
        } else {
            SqlResult::Success(Indicator::Length(remaining))
        }
    }
}

impl Drop for FakeStatement {
    fn drop(&mut self) {
        if self.is_catalog {
            inc(&self.counters.released);
        }
    }
}

impl Diagnostics for FakeStatement {
    fn diagnostic_record(
        &self,
        rec_number: i16,
        message_text: &mut [u8],
    ) -> Option<DiagnosticResult> {
        let (state, text) = self.diagnostics.get(usize::try_from(rec_number - 1).ok()?)?;
        let len = text.len().min(message_text.len());
        message_text[..len].copy_from_slice(&text.as_bytes()[..len]);
        Some(DiagnosticResult {
            state: *state,
            native_error: 0,
            text_length: text.len() as i16,
        })
    }
}

impl StatementHandle for FakeStatement {
    type Catalog = FakeStatement;

    fn num_result_cols(&mut self) -> SqlResult<i16> {
        self.diagnostics.clear();
        SqlResult::Success(self.result_set().columns.len() as i16)
    }

    fn describe_col(&mut self, column_number: u16) -> SqlResult<ColumnDescription> {
        self.diagnostics.clear();
        inc(&self.counters.describe_col);
        let Some(column) = self
            .result_set()
            .columns
            .get(column_number as usize - 1)
            .cloned()
        else {
            return self.fail(
                State::INVALID_DESCRIPTOR_INDEX,
                "Invalid descriptor index.",
                "SQLDescribeCol",
            );
        };
        SqlResult::Success(ColumnDescription {
            name: column.name,
            data_type: column.data_type,
            column_size: column.column_size,
            decimal_digits: column.decimal_digits,
            nullable: column.nullable,
        })
    }

    fn fetch(&mut self) -> SqlResult<()> {
        self.diagnostics.clear();
        inc(&self.counters.fetch);
        let next = self.row.map_or(0, |row| row + 1);
        if self.fail_fetch_at == Some(next) {
            return self.fail(
                State::COMMUNICATION_LINK_FAILURE,
                "Communication link failure.",
                "SQLFetch",
            );
        }
        self.delivered.clear();
        if next < self.result_set().rows.len() {
            self.row = Some(next);
            SqlResult::Success(())
        } else {
            self.row = Some(self.result_set().rows.len());
            SqlResult::NoData
        }
    }

    fn get_data(
        &mut self,
        column_number: u16,
        target_type: CType,
        buf: &mut [u8],
    ) -> SqlResult<Indicator> {
        self.diagnostics.clear();
        inc(&self.counters.get_data);
        let field = self
            .row
            .and_then(|row| self.result_set().rows.get(row))
            .and_then(|row| row.get(column_number as usize - 1))
            .cloned();
        let Some(field) = field else {
            return self.fail(
                State::INVALID_DESCRIPTOR_INDEX,
                "Invalid descriptor index.",
                "SQLGetData",
            );
        };
        match (field, target_type) {
            (Field::Null, _) => SqlResult::Success(Indicator::Null),
            (Field::Int(i), CType::Bit) => write(buf, &[u8::from(i != 0)]),
            (Field::Int(i), CType::STinyInt) => write(buf, &(i as i8).to_ne_bytes()),
            (Field::Int(i), CType::SShort) => write(buf, &(i as i16).to_ne_bytes()),
            (Field::Int(i), CType::SLong) => write(buf, &(i as i32).to_ne_bytes()),
            (Field::Int(i), CType::SBigInt) => write(buf, &i.to_ne_bytes()),
            (Field::Float(x), CType::Float) => write(buf, &(x as f32).to_ne_bytes()),
            (Field::Float(x), CType::Double) => write(buf, &x.to_ne_bytes()),
            (Field::Timestamp(ts), CType::TypeTimestamp) => write(buf, &ts.to_ne_bytes()),
            (Field::Text(text), CType::Char) => {
                self.get_variadic(column_number, text.into_bytes(), 1, buf)
            }
            (Field::Text(text), CType::WChar) => {
                let payload = text.encode_utf16().flat_map(u16::to_ne_bytes).collect();
                self.get_variadic(column_number, payload, 2, buf)
            }
            (Field::Int(i), CType::Char) => {
                self.get_variadic(column_number, i.to_string().into_bytes(), 1, buf)
            }
            (Field::Bytes(bytes), CType::Binary) => self.get_variadic(column_number, bytes, 0, buf),
            (field, c_type) => panic!("Fake can not convert {field:?} into {c_type:?}"),
        }
    }

    fn numeric_col_attribute(&mut self, column_number: u16, field: ColumnField) -> SqlResult<isize> {
        self.diagnostics.clear();
        inc(&self.counters.numeric_col_attribute);
        let column = &self.result_set().columns[column_number as usize - 1];
        let value = match field {
            ColumnField::Precision => column.column_size as isize,
            ColumnField::Scale => column.decimal_digits as isize,
            ColumnField::Nullable => match column.nullable {
                Nullable::NoNulls => 0,
                Nullable::Nullable => 1,
                Nullable::Unknown => 2,
            },
            ColumnField::AutoUniqueValue => column.auto_unique_value,
            ColumnField::Updatable => column.updatable,
            other => panic!("{other:?} is not a numeric attribute"),
        };
        SqlResult::Success(value)
    }

    fn string_col_attribute(
        &mut self,
        column_number: u16,
        field: ColumnField,
    ) -> SqlResult<String> {
        self.diagnostics.clear();
        inc(&self.counters.string_col_attribute);
        let column = &self.result_set().columns[column_number as usize - 1];
        let value = match field {
            ColumnField::TableName => column.table.clone(),
            ColumnField::SchemaName => column.schema.clone(),
            ColumnField::CatalogName => column.catalog.clone(),
            ColumnField::BaseColumnName => column.base_column_name.clone(),
            other => panic!("{other:?} is not a string attribute"),
        };
        SqlResult::Success(value)
    }

    fn more_results(&mut self) -> SqlResult<()> {
        self.diagnostics.clear();
        inc(&self.counters.more_results);
        if self.current + 1 < self.result_sets.len() {
            self.current += 1;
            self.row = None;
            self.delivered.clear();
            SqlResult::Success(())
        } else {
            SqlResult::NoData
        }
    }

    fn primary_keys(
        &mut self,
        _catalog: &str,
        _schema: &str,
        _table: &str,
    ) -> Result<FakeStatement, Error> {
        self.diagnostics.clear();
        inc(&self.counters.primary_keys);
        let script = self.primary_keys.clone();
        self.catalog_statement(script, "SQLPrimaryKeys")
    }

    fn statistics(
        &mut self,
        _catalog: &str,
        _schema: &str,
        _table: &str,
        unique_only: bool,
    ) -> Result<FakeStatement, Error> {
        assert!(unique_only);
        self.diagnostics.clear();
        inc(&self.counters.statistics);
        let script = self.statistics.clone();
        self.catalog_statement(script, "SQLStatistics")
    }

    fn close_cursor(&mut self) -> SqlResult<()> {
        self.diagnostics.clear();
        inc(&self.counters.close_cursor);
        SqlResult::Success(())
    }

    fn close_connection(&mut self) -> SqlResult<()> {
        self.diagnostics.clear();
        inc(&self.counters.close_connection);
        SqlResult::Success(())
    }
}

fn write(buf: &mut [u8], bytes: &[u8]) -> SqlResult<Indicator> {
    buf[..bytes.len()].copy_from_slice(bytes);
    SqlResult::Success(Indicator::Length(bytes.len()))
}
