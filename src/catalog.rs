use crate::{
    Error,
    error::ExtendResult,
    handles::{DataType, Nullable, Record, SqlDataType, StatementHandle},
    schema::SchemaDescriptor,
};

/// Metadata of a single column of the current result set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    /// Zero based position of the column in the result set.
    pub ordinal: usize,
    /// Name of the column as reported by the data source. May be empty.
    pub name: String,
    /// Declared SQL type.
    pub data_type: DataType,
    /// Column size as reported by the data source. Maximum length in characters for text, bytes
    /// for binary data, and precision for numeric types.
    pub column_size: usize,
    /// Whether the column may contain `NULL`.
    pub nullable: Nullable,
}

impl Column {
    /// Maximum length of variable sized types. `None` for fixed sized types.
    pub fn max_length(&self) -> Option<usize> {
        self.data_type.max_length()
    }

    pub fn precision(&self) -> usize {
        self.data_type.precision()
    }

    pub fn scale(&self) -> i16 {
        self.data_type.scale()
    }
}

/// Lazily resolves and caches the column metadata of the current result set.
///
/// Each column is described at most once. The catalog also holds the schema of the result set
/// once it has been computed, so both are discarded together on [`ColumnCatalog::reset`].
#[derive(Debug, Default)]
pub struct ColumnCatalog {
    columns: Vec<Option<Column>>,
    schema: Option<SchemaDescriptor>,
}

impl ColumnCatalog {
    /// Empty catalog for a result set with `num_cols` columns.
    pub fn new(num_cols: usize) -> Self {
        Self {
            columns: vec![None; num_cols],
            schema: None,
        }
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// Metadata of the column at `ordinal`. The first call for an ordinal asks the statement to
    /// describe the column, subsequent calls are answered from the cache.
    pub fn describe(
        &mut self,
        statement: &mut impl StatementHandle,
        ordinal: usize,
    ) -> Result<&Column, Error> {
        let num_cols = self.num_cols();
        let slot = self
            .columns
            .get_mut(ordinal)
            .ok_or(Error::OutOfRange { ordinal, num_cols })?;
        let column = match slot.take() {
            Some(column) => column,
            None => describe_column(statement, ordinal)?,
        };
        Ok(slot.insert(column))
    }

    /// Ordinal of the column named `name`. An exact match is preferred, then the first column whose
    /// name matches ignoring case.
    pub fn index_of(
        &mut self,
        statement: &mut impl StatementHandle,
        name: &str,
    ) -> Result<usize, Error> {
        let lowercase = name.to_lowercase();
        let mut case_insensitive_match = None;
        for ordinal in 0..self.num_cols() {
            let column = self.describe(statement, ordinal)?;
            if column.name == name {
                return Ok(ordinal);
            }
            if case_insensitive_match.is_none() && column.name.to_lowercase() == lowercase {
                case_insensitive_match = Some(ordinal);
            }
        }
        case_insensitive_match.ok_or_else(|| Error::NotFound {
            name: name.to_owned(),
        })
    }

    /// Discards all cached columns and the schema. To be called when the statement moves to
    /// another result set.
    pub fn reset(&mut self, num_cols: usize) {
        self.columns.clear();
        self.columns.resize(num_cols, None);
        self.schema = None;
    }

    /// An already described column. `None` if the column at `ordinal` has not been described yet
    /// or does not exist.
    pub fn column_mut(&mut self, ordinal: usize) -> Option<&mut Column> {
        self.columns.get_mut(ordinal).and_then(Option::as_mut)
    }

    /// The cached schema of result set `generation`, or the one computed by `project`, if there is
    /// none yet.
    pub(crate) fn schema_or_try_insert_with(
        &mut self,
        generation: u64,
        project: impl FnOnce(&mut Self) -> Result<SchemaDescriptor, Error>,
    ) -> Result<&SchemaDescriptor, Error> {
        let schema = match self.schema.take() {
            Some(schema) if schema.generation() == generation => schema,
            _ => project(self)?,
        };
        Ok(self.schema.insert(schema))
    }
}

/// Maps the "catch all" diagnostic error to a metadata error of the column at `ordinal`.
pub(crate) fn metadata_error(ordinal: usize) -> impl FnOnce(Record, &'static str) -> Error {
    move |record, function| Error::Metadata {
        column: ordinal,
        record,
        function,
    }
}

fn describe_column(statement: &mut impl StatementHandle, ordinal: usize) -> Result<Column, Error> {
    let description = statement
        .describe_col(column_number(ordinal))
        .into_result(&*statement)
        .provide_context_for_diagnostic(metadata_error(ordinal))?;
    if description.data_type == SqlDataType::UNKNOWN_TYPE {
        return Err(Error::InvalidTypeCode { column: ordinal });
    }
    Ok(Column {
        ordinal,
        data_type: DataType::new(
            description.data_type,
            description.column_size,
            description.decimal_digits,
        ),
        column_size: description.column_size,
        name: description.name,
        nullable: description.nullable,
    })
}

/// ODBC column number (one based) of a zero based ordinal. Result sets can not have more than
/// `i16::MAX` columns, so this never overflows for a valid ordinal.
pub(crate) fn column_number(ordinal: usize) -> u16 {
    (ordinal + 1) as u16
}
