use log::{debug, warn};

use crate::{
    Error,
    catalog::{Column, ColumnCatalog},
    decoder::ValueDecoder,
    handles::{Indicator, StatementHandle},
    options::CursorOptions,
    schema::{SchemaDescriptor, SchemaProjector},
    value::{FromValue, Value},
};

/// Lifecycle of a [`RowCursor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorState {
    /// The current result set may have more rows.
    Open,
    /// All rows of the current result set have been consumed, or fetching failed. Another result
    /// set may still follow.
    Exhausted,
    /// The cursor has been closed. Terminal.
    Closed,
}

/// How far a field of the current row has been fetched from the data source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldState {
    Unread,
    /// Decoded and held in the cache.
    Cached,
    /// Partially fetched with [`RowCursor::read_bytes`].
    Streaming,
    /// Fetched, but no value is cached. Either decoding failed or streaming did.
    Drained,
}

/// Forward only cursor over the result sets of an executed statement.
///
/// Rows are fetched one at a time with [`Self::advance`]. Field values are decoded lazily on first
/// access and cached until the cursor advances, so accessing the same field twice does not
/// require another round trip to the data source. Column metadata is resolved lazily as well and
/// cached for the lifetime of the result set.
///
/// ```no_run
/// # fn example<S: odbc_row_cursor::handles::StatementHandle>(statement: S)
/// # -> Result<(), odbc_row_cursor::Error> {
/// use odbc_row_cursor::RowCursor;
///
/// let mut cursor = RowCursor::new(statement)?;
/// while cursor.advance()? {
///     let id: Option<i64> = cursor.get(0)?;
///     let name = cursor.value_by_name("name")?;
///     println!("{id:?}: {name}");
/// }
/// cursor.close()?;
/// # Ok(())
/// # }
/// ```
pub struct RowCursor<S: StatementHandle> {
    statement: S,
    catalog: ColumnCatalog,
    decoder: ValueDecoder,
    projector: SchemaProjector,
    options: CursorOptions,
    state: CursorState,
    /// Zero based index of the current row within the result set. `-1` if not positioned on a row.
    row: i64,
    generation: u64,
    /// Values of the current row, indexed by ordinal. Only meaningful for cached fields.
    values: Vec<Value>,
    fields: Vec<FieldState>,
}

impl<S: StatementHandle> RowCursor<S> {
    /// Creates a cursor over the result set of `statement` with default options.
    pub fn new(statement: S) -> Result<Self, Error> {
        Self::with_options(statement, CursorOptions::default())
    }

    /// Creates a cursor over the result set of `statement`. `statement` must have been executed
    /// already.
    pub fn with_options(mut statement: S, options: CursorOptions) -> Result<Self, Error> {
        let num_cols = num_result_cols(&mut statement)?;
        let decoder = ValueDecoder::new(options.chunk_size());
        Ok(Self {
            statement,
            catalog: ColumnCatalog::new(num_cols),
            decoder,
            projector: SchemaProjector::new(decoder),
            options,
            state: CursorState::Open,
            row: -1,
            generation: 0,
            values: vec![Value::Null; num_cols],
            fields: vec![FieldState::Unread; num_cols],
        })
    }

    /// Moves to the next row of the current result set. `false` if there are no more rows. Any
    /// values cached for the previous row are discarded.
    ///
    /// An exhausted cursor stays exhausted, without asking the data source again. If fetching
    /// fails the error is returned and the cursor is exhausted.
    pub fn advance(&mut self) -> Result<bool, Error> {
        match self.state {
            CursorState::Closed => return Err(self.invalid_state("advance")),
            CursorState::Exhausted => return Ok(false),
            CursorState::Open => (),
        }
        self.fields.fill(FieldState::Unread);
        // Statements without a result set do not have a cursor to fetch from.
        if self.catalog.num_cols() == 0 {
            self.exhaust();
            return Ok(false);
        }
        match self.statement.fetch().into_result_bool(&self.statement) {
            Ok(true) => {
                self.row += 1;
                Ok(true)
            }
            Ok(false) => {
                debug!("Cursor consumed all {} rows of result set.", self.row + 1);
                self.exhaust();
                Ok(false)
            }
            Err(error) => {
                self.exhaust();
                Err(error)
            }
        }
    }

    /// Value of the field at `ordinal` in the current row. Decoded on first access, later accesses
    /// are answered from the cache.
    ///
    /// If decoding fails, the field has still been consumed. Accessing it again within the same
    /// row fails with [`Error::FieldConsumed`], as does accessing a field streamed with
    /// [`Self::read_bytes`].
    pub fn value_at(&mut self, ordinal: usize) -> Result<&Value, Error> {
        self.ensure_on_row("value_at")?;
        self.ensure_in_range(ordinal)?;
        match self.fields[ordinal] {
            FieldState::Cached => (),
            FieldState::Streaming | FieldState::Drained => {
                return Err(Error::FieldConsumed { column: ordinal });
            }
            FieldState::Unread => {
                let column = self.catalog.describe(&mut self.statement, ordinal)?;
                self.fields[ordinal] = FieldState::Drained;
                self.values[ordinal] = self.decoder.decode(&mut self.statement, column)?;
                self.fields[ordinal] = FieldState::Cached;
            }
        }
        Ok(&self.values[ordinal])
    }

    /// Streams the field at `ordinal` of the current row as bytes, without decoding or caching it.
    /// Each call copies the next chunk into `buf` and returns the number of bytes written. `0`
    /// signals the field is drained. `None` for `NULL`. An empty `buf` fetches nothing, see
    /// [`Self::field_length`].
    ///
    /// Text is delivered in the character encoding of the data source. Once streaming started,
    /// the field can no longer be accessed with [`Self::value_at`], and a field already accessed
    /// that way can not be streamed.
    pub fn read_bytes(&mut self, ordinal: usize, buf: &mut [u8]) -> Result<Option<usize>, Error> {
        if buf.is_empty() {
            return Ok(self.field_length(ordinal)?.map(|_| 0));
        }
        self.ensure_on_row("read_bytes")?;
        self.ensure_in_range(ordinal)?;
        match self.fields[ordinal] {
            FieldState::Cached | FieldState::Drained => {
                return Err(Error::FieldConsumed { column: ordinal });
            }
            FieldState::Unread | FieldState::Streaming => (),
        }
        self.fields[ordinal] = FieldState::Drained;
        let written = self.decoder.read_chunk(&mut self.statement, ordinal, buf)?;
        self.fields[ordinal] = FieldState::Streaming;
        Ok(written)
    }

    /// Length in bytes of the field at `ordinal` of the current row, or of the part not streamed
    /// yet with [`Self::read_bytes`]. Nothing is fetched. `None` for `NULL`.
    /// [`Indicator::NoTotal`] if the data source can not tell.
    pub fn field_length(&mut self, ordinal: usize) -> Result<Option<Indicator>, Error> {
        self.ensure_on_row("field_length")?;
        self.ensure_in_range(ordinal)?;
        match self.fields[ordinal] {
            FieldState::Cached | FieldState::Drained => {
                Err(Error::FieldConsumed { column: ordinal })
            }
            FieldState::Unread | FieldState::Streaming => self
                .decoder
                .remaining_length(&mut self.statement, ordinal),
        }
    }

    /// Value of the field named `name` in the current row. See [`ColumnCatalog::index_of`] for how
    /// names are matched.
    pub fn value_by_name(&mut self, name: &str) -> Result<&Value, Error> {
        self.ensure_on_row("value_by_name")?;
        let ordinal = self.catalog.index_of(&mut self.statement, name)?;
        self.value_at(ordinal)
    }

    /// Typed access to the field at `ordinal` in the current row. `None` for `NULL`.
    pub fn get<T: FromValue>(&mut self, ordinal: usize) -> Result<Option<T>, Error> {
        let value = self.value_at(ordinal)?;
        T::convert(value, ordinal)
    }

    /// `true` if the field at `ordinal` in the current row is `NULL`.
    pub fn is_null(&mut self, ordinal: usize) -> Result<bool, Error> {
        Ok(self.value_at(ordinal)?.is_null())
    }

    /// Copies the values of the current row into `values`, starting with the first column. Returns
    /// the number of values copied, which is the smaller of `values.len()` and the number of
    /// columns. Slots beyond the number of columns are set to `None`.
    pub fn values(&mut self, values: &mut [Option<Value>]) -> Result<usize, Error> {
        self.ensure_on_row("values")?;
        let filled = values.len().min(self.catalog.num_cols());
        for (ordinal, slot) in values.iter_mut().enumerate() {
            *slot = if ordinal < filled {
                Some(self.value_at(ordinal)?.clone())
            } else {
                None
            };
        }
        Ok(filled)
    }

    /// Moves to the next result set of the statement. `false` if there is none, in which case the
    /// cursor is left untouched.
    ///
    /// On success all column metadata and the schema of the previous result set are discarded and
    /// the cursor is positioned before the first row of the new one.
    pub fn advance_result_set(&mut self) -> Result<bool, Error> {
        self.ensure_open("advance_result_set")?;
        if !self
            .statement
            .more_results()
            .into_result_bool(&self.statement)?
        {
            return Ok(false);
        }
        let num_cols = num_result_cols(&mut self.statement)?;
        self.catalog.reset(num_cols);
        self.values.clear();
        self.values.resize(num_cols, Value::Null);
        self.fields.clear();
        self.fields.resize(num_cols, FieldState::Unread);
        self.generation += 1;
        self.row = -1;
        self.state = CursorState::Open;
        debug!(
            "Cursor moved to result set {} with {num_cols} columns.",
            self.generation
        );
        Ok(true)
    }

    /// Number of columns in the current result set.
    pub fn num_cols(&self) -> Result<usize, Error> {
        self.ensure_open("num_cols")?;
        Ok(self.catalog.num_cols())
    }

    /// Metadata of the column at `ordinal`.
    pub fn column(&mut self, ordinal: usize) -> Result<&Column, Error> {
        self.ensure_open("column")?;
        self.catalog.describe(&mut self.statement, ordinal)
    }

    /// Name of the column at `ordinal`, as reported by the data source.
    pub fn name(&mut self, ordinal: usize) -> Result<&str, Error> {
        Ok(&self.column(ordinal)?.name)
    }

    /// SQL name of the declared type of the column at `ordinal`, e.g. `VARCHAR`.
    pub fn data_type_name(&mut self, ordinal: usize) -> Result<String, Error> {
        Ok(self.column(ordinal)?.data_type.to_string())
    }

    /// Ordinal of the column named `name`.
    pub fn ordinal(&mut self, name: &str) -> Result<usize, Error> {
        self.ensure_open("ordinal")?;
        self.catalog.index_of(&mut self.statement, name)
    }

    /// Descriptive schema of the current result set. Computed on first access and cached until the
    /// cursor moves to another result set.
    pub fn schema(&mut self) -> Result<&SchemaDescriptor, Error> {
        self.ensure_open("schema")?;
        let generation = self.generation;
        let projector = self.projector;
        let statement = &mut self.statement;
        self.catalog
            .schema_or_try_insert_with(generation, |catalog| {
                projector.project(statement, catalog, generation)
            })
    }

    /// Closes the cursor on the statement, and the connection, if the cursor has been configured
    /// to do so. Closing an already closed cursor does nothing.
    pub fn close(&mut self) -> Result<(), Error> {
        if self.state == CursorState::Closed {
            return Ok(());
        }
        debug!("Closing cursor after result set {}.", self.generation);
        self.state = CursorState::Closed;
        self.row = -1;
        self.fields.fill(FieldState::Unread);
        let cursor = self.statement.close_cursor().into_result(&self.statement);
        let connection = if self.options.close_connection() {
            self.statement
                .close_connection()
                .into_result(&self.statement)
        } else {
            Ok(())
        };
        cursor.and(connection)
    }

    /// Zero based index of the current row within the current result set. `-1` if the cursor is
    /// not positioned on a row.
    pub fn current_row_index(&self) -> i64 {
        self.row
    }

    /// Incremented each time the cursor moves to the next result set. Starts with `0`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current position in the lifecycle of the cursor.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// `true` once [`Self::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }

    /// Number of rows changed by the statement, as passed in with [`CursorOptions`]. `-1` if
    /// unknown.
    pub fn records_affected(&self) -> isize {
        self.options.records_affected()
    }

    /// The statement the cursor fetches from.
    pub fn statement(&self) -> &S {
        &self.statement
    }

    fn exhaust(&mut self) {
        self.row = -1;
        self.state = CursorState::Exhausted;
    }

    fn invalid_state(&self, operation: &'static str) -> Error {
        Error::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn ensure_open(&self, operation: &'static str) -> Result<(), Error> {
        if self.state == CursorState::Closed {
            Err(self.invalid_state(operation))
        } else {
            Ok(())
        }
    }

    fn ensure_in_range(&self, ordinal: usize) -> Result<(), Error> {
        let num_cols = self.catalog.num_cols();
        if ordinal < num_cols {
            Ok(())
        } else {
            Err(Error::OutOfRange { ordinal, num_cols })
        }
    }

    fn ensure_on_row(&self, operation: &'static str) -> Result<(), Error> {
        if self.state != CursorState::Open || self.row < 0 {
            Err(self.invalid_state(operation))
        } else {
            Ok(())
        }
    }
}

impl<S: StatementHandle> Drop for RowCursor<S> {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        debug!("Cursor dropped without being closed.");
        if let Err(error) = self.close() {
            warn!("Error closing cursor: {error}");
        }
    }
}

fn num_result_cols(statement: &mut impl StatementHandle) -> Result<usize, Error> {
    let num_cols = statement.num_result_cols().into_result(&*statement)?;
    Ok(usize::try_from(num_cols).unwrap_or(0))
}
