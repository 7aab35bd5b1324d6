use log::debug;

use crate::{
    Error,
    catalog::{ColumnCatalog, column_number, metadata_error},
    decoder::ValueDecoder,
    error::ExtendResult,
    handles::{ColumnField, DataType, Nullable, StatementHandle},
};

/// `SQL_NO_NULLS`
const NO_NULLS: isize = 0;
/// `SQL_TRUE`
const TRUE: isize = 1;
/// `SQL_ATTR_READONLY`
const ATTR_READONLY: isize = 0;
/// `SQL_FALSE` in the `NON_UNIQUE` column of `SQLStatistics`.
const UNIQUE_INDEX: i16 = 0;
/// `SQL_TABLE_STAT` in the `TYPE` column of `SQLStatistics`. Such rows describe the table itself,
/// rather than an index.
const TABLE_STAT: i16 = 0;

// Zero based ordinals of the columns of interest in the result of the catalog functions.
const PRIMARY_KEYS_COLUMN_NAME: usize = 3;
const STATISTICS_NON_UNIQUE: usize = 3;
const STATISTICS_INDEX_NAME: usize = 5;
const STATISTICS_TYPE: usize = 6;
const STATISTICS_COLUMN_NAME: usize = 8;

/// Describes one column of a result set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaRow {
    pub column_name: String,
    pub column_ordinal: usize,
    /// Maximum length of character and binary types, in characters or bytes. `0` for fixed size
    /// types, and for variable sized ones without a declared limit.
    pub column_size: usize,
    pub numeric_precision: isize,
    pub numeric_scale: isize,
    /// `true` if the column alone is known to identify a row.
    pub is_unique: bool,
    /// `Some(true)` if the column is part of the key of its base table, `Some(false)` if it is
    /// known not to be. `None` if the key of the base table could not be determined.
    pub is_key: Option<bool>,
    pub base_catalog_name: String,
    pub base_column_name: String,
    pub base_schema_name: String,
    /// Empty if the column is not directly taken from a table.
    pub base_table_name: String,
    pub data_type: DataType,
    pub allow_db_null: bool,
    /// SQL type code reported by the data source.
    pub provider_type: i16,
    /// `true` if the column name differs from the name of the column in the base table.
    pub is_aliased: bool,
    /// `true` if the column is computed rather than taken from a table.
    pub is_expression: bool,
    pub is_identity: bool,
    pub is_auto_increment: bool,
    pub is_row_version: bool,
    pub is_hidden: bool,
    /// `true` for the `LONG` text and binary types.
    pub is_long: bool,
    pub is_read_only: bool,
}

/// Descriptive schema of a result set. One row per column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaDescriptor {
    generation: u64,
    rows: Vec<SchemaRow>,
}

impl SchemaDescriptor {
    /// The result set generation this schema has been computed for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rows(&self) -> &[SchemaRow] {
        &self.rows
    }

    pub fn row(&self, ordinal: usize) -> Option<&SchemaRow> {
        self.rows.get(ordinal)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of the search for the key of a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyDiscovery {
    /// Names of the columns forming the primary key, or a unique index without nullable columns.
    Known(Vec<String>),
    /// Neither a primary key nor a suitable unique index could be found.
    Unknown,
}

impl KeyDiscovery {
    fn contains(&self, column_name: &str) -> bool {
        match self {
            KeyDiscovery::Known(names) => names.iter().any(|name| same_name(name, column_name)),
            KeyDiscovery::Unknown => false,
        }
    }
}

/// Catalog, schema and name of a base table.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TableRef<'a> {
    catalog: &'a str,
    schema: &'a str,
    table: &'a str,
}

/// Derives the [`SchemaDescriptor`] of a result set from column metadata, enriched with key
/// information obtained from the catalog functions of the data source.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchemaProjector {
    decoder: ValueDecoder,
}

impl SchemaProjector {
    /// `decoder` is used to read the result sets of the catalog functions.
    pub fn new(decoder: ValueDecoder) -> Self {
        Self { decoder }
    }

    /// Computes the schema of the current result set of `statement`.
    ///
    /// Columns of base tables whose key is discovered are patched in `catalog` to not be
    /// nullable. Failing to discover the key of a table is not an error, unless the data source
    /// reports a connection exception.
    pub fn project<S: StatementHandle>(
        &self,
        statement: &mut S,
        catalog: &mut ColumnCatalog,
        generation: u64,
    ) -> Result<SchemaDescriptor, Error> {
        let mut rows = Vec::with_capacity(catalog.num_cols());
        for ordinal in 0..catalog.num_cols() {
            let row = self.describe_row(statement, catalog, ordinal)?;
            rows.push(row);
        }

        // Group columns by base table, in order of first appearance.
        let mut tables: Vec<(TableRef<'_>, Vec<usize>)> = Vec::new();
        for (ordinal, row) in rows.iter().enumerate() {
            if row.base_table_name.is_empty() {
                continue;
            }
            let table = TableRef {
                catalog: &row.base_catalog_name,
                schema: &row.base_schema_name,
                table: &row.base_table_name,
            };
            match tables.iter_mut().find(|(t, _)| *t == table) {
                Some((_, ordinals)) => ordinals.push(ordinal),
                None => tables.push((table, vec![ordinal])),
            }
        }

        let mut discoveries = Vec::with_capacity(tables.len());
        for (table, ordinals) in &tables {
            let nullable_columns: Vec<&str> = ordinals
                .iter()
                .map(|&ordinal| &rows[ordinal])
                .filter(|row| row.allow_db_null)
                .map(base_column_name)
                .collect();
            let key = self.discover_key(statement, table, &nullable_columns)?;
            discoveries.push((ordinals.clone(), key));
        }

        for (ordinals, key) in discoveries {
            if key == KeyDiscovery::Unknown {
                continue;
            }
            for ordinal in ordinals {
                let row = &mut rows[ordinal];
                if key.contains(base_column_name(row)) {
                    row.is_key = Some(true);
                    row.is_unique = true;
                    row.allow_db_null = false;
                    if let Some(column) = catalog.column_mut(ordinal) {
                        column.nullable = Nullable::NoNulls;
                    }
                } else {
                    row.is_key = Some(false);
                }
            }
        }

        Ok(SchemaDescriptor { generation, rows })
    }

    fn describe_row<S: StatementHandle>(
        &self,
        statement: &mut S,
        catalog: &mut ColumnCatalog,
        ordinal: usize,
    ) -> Result<SchemaRow, Error> {
        let column = catalog.describe(statement, ordinal)?.clone();
        let mut numeric = |field: ColumnField| {
            statement
                .numeric_col_attribute(column_number(ordinal), field)
                .into_result(&*statement)
                .provide_context_for_diagnostic(metadata_error(ordinal))
        };
        let numeric_precision = numeric(ColumnField::Precision)?;
        let numeric_scale = numeric(ColumnField::Scale)?;
        let nullable = numeric(ColumnField::Nullable)?;
        let auto_unique_value = numeric(ColumnField::AutoUniqueValue)?;
        let updatable = numeric(ColumnField::Updatable)?;

        let mut string = |field: ColumnField| {
            statement
                .string_col_attribute(column_number(ordinal), field)
                .into_result(&*statement)
                .provide_context_for_diagnostic(metadata_error(ordinal))
        };
        let base_table_name = string(ColumnField::TableName)?;
        let base_schema_name = string(ColumnField::SchemaName)?;
        let base_catalog_name = string(ColumnField::CatalogName)?;
        let base_column_name = string(ColumnField::BaseColumnName)?;

        let is_expression = base_table_name.is_empty();
        Ok(SchemaRow {
            is_aliased: base_column_name != column.name,
            is_read_only: is_expression || updatable == ATTR_READONLY,
            column_ordinal: ordinal,
            column_size: column.data_type.max_length().unwrap_or(0),
            numeric_precision,
            numeric_scale,
            is_unique: false,
            is_key: None,
            base_catalog_name,
            base_column_name,
            base_schema_name,
            base_table_name,
            provider_type: column.data_type.data_type().0,
            is_long: column.data_type.is_long(),
            data_type: column.data_type,
            allow_db_null: nullable != NO_NULLS,
            is_expression,
            is_identity: false,
            is_auto_increment: auto_unique_value == TRUE,
            is_row_version: false,
            is_hidden: false,
            column_name: column.name,
        })
    }

    /// Columns of the primary key of `table`, or failing that, of its first unique index with no
    /// column in `nullable_columns`.
    fn discover_key<S: StatementHandle>(
        &self,
        statement: &mut S,
        table: &TableRef<'_>,
        nullable_columns: &[&str],
    ) -> Result<KeyDiscovery, Error> {
        match self.primary_key_columns(statement, table) {
            Ok(names) if !names.is_empty() => return Ok(KeyDiscovery::Known(names)),
            Ok(_) => debug!("No primary key reported for {table:?}."),
            Err(error) if error.is_connection_exception() => return Err(error),
            Err(error) => debug!("Failed to list primary key of {table:?}: {error}"),
        }
        match self.unique_index_columns(statement, table, nullable_columns) {
            Ok(Some(names)) => Ok(KeyDiscovery::Known(names)),
            Ok(None) => {
                debug!("No unique index without nullable columns found for {table:?}.");
                Ok(KeyDiscovery::Unknown)
            }
            Err(error) if error.is_connection_exception() => Err(error),
            Err(error) => {
                debug!("Failed to list unique indices of {table:?}: {error}");
                Ok(KeyDiscovery::Unknown)
            }
        }
    }

    fn primary_key_columns<S: StatementHandle>(
        &self,
        statement: &mut S,
        table: &TableRef<'_>,
    ) -> Result<Vec<String>, Error> {
        let mut keys = statement.primary_keys(table.catalog, table.schema, table.table)?;
        let mut names = Vec::new();
        while keys.fetch().into_result_bool(&keys)? {
            if let Some(name) = self.decoder.read_text(&mut keys, PRIMARY_KEYS_COLUMN_NAME)? {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn unique_index_columns<S: StatementHandle>(
        &self,
        statement: &mut S,
        table: &TableRef<'_>,
        nullable_columns: &[&str],
    ) -> Result<Option<Vec<String>>, Error> {
        let mut stats = statement.statistics(table.catalog, table.schema, table.table, true)?;
        // Index name and columns, in order of first appearance.
        let mut indices: Vec<(String, Vec<String>)> = Vec::new();
        while stats.fetch().into_result_bool(&stats)? {
            // Fields must be fetched in ascending order of their columns.
            let non_unique = self.decoder.read_i16(&mut stats, STATISTICS_NON_UNIQUE)?;
            let index_name = self.decoder.read_text(&mut stats, STATISTICS_INDEX_NAME)?;
            let index_type = self.decoder.read_i16(&mut stats, STATISTICS_TYPE)?;
            let column_name = self.decoder.read_text(&mut stats, STATISTICS_COLUMN_NAME)?;
            if index_type == Some(TABLE_STAT) || non_unique != Some(UNIQUE_INDEX) {
                continue;
            }
            let (Some(index_name), Some(column_name)) = (index_name, column_name) else {
                continue;
            };
            match indices.iter_mut().find(|(name, _)| *name == index_name) {
                Some((_, columns)) => columns.push(column_name),
                None => indices.push((index_name, vec![column_name])),
            }
        }
        Ok(indices
            .into_iter()
            .find(|(_, columns)| {
                columns.iter().all(|column| {
                    !nullable_columns
                        .iter()
                        .any(|nullable| same_name(nullable, column))
                })
            })
            .map(|(_, columns)| columns))
    }
}

/// Name of the column in its base table. Falls back to the name in the result set if the data
/// source does not report it.
fn base_column_name(row: &SchemaRow) -> &str {
    if row.base_column_name.is_empty() {
        &row.column_name
    } else {
        &row.base_column_name
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}
