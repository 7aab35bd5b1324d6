mod common;

use common::{CatalogScript, FakeColumn, FakeStatement, Field, ResultSet, init_logging, text};
use odbc_row_cursor::{
    DataType, Nullable, RowCursor,
    handles::{SqlDataType, State},
};

/// `SQLSTATE` for a catalog function the driver does not support.
const OPTIONAL_FEATURE_NOT_IMPLEMENTED: State = State(*b"HYC00");

/// Columns `id`, `code` and `note` of table `orders`, followed by the computed column `total`.
fn orders() -> FakeStatement {
    FakeStatement::single(
        vec![
            FakeColumn::new("id", SqlDataType::INTEGER, 10)
                .of_table("orders")
                .not_null(),
            FakeColumn::new("code", SqlDataType::VARCHAR, 10)
                .of_table("orders")
                .not_null(),
            FakeColumn::new("note", SqlDataType::VARCHAR, 100).of_table("orders"),
            FakeColumn::new("total", SqlDataType::INTEGER, 10),
        ],
        vec![vec![Field::Int(1), text("A"), Field::Null, Field::Int(42)]],
    )
}

/// Row of a `SQLStatistics` result set. `None` for the row describing the table itself.
fn statistics_row(index: Option<(&str, i64, &str)>) -> Vec<Field> {
    let (non_unique, index_name, index_type, column_name) = match index {
        Some((name, non_unique, column)) => (Field::Int(non_unique), text(name), 3, text(column)),
        None => (Field::Null, Field::Null, 0, Field::Null),
    };
    vec![
        Field::Null,
        text("dbo"),
        text("orders"),
        non_unique,
        Field::Null,
        index_name,
        Field::Int(index_type),
        Field::Int(1),
        column_name,
        Field::Null,
        Field::Null,
        Field::Null,
        Field::Null,
    ]
}

fn primary_key_rows(columns: &[&str]) -> CatalogScript {
    let rows = columns
        .iter()
        .map(|&column| vec![Field::Null, text("dbo"), text("orders"), text(column)])
        .collect();
    CatalogScript::Rows(ResultSet::catalog(6, rows))
}

#[test]
fn key_from_primary_key() {
    init_logging();
    let mut statement = orders();
    statement.primary_keys = primary_key_rows(&["ID"]);
    let mut cursor = RowCursor::new(statement).unwrap();

    let schema = cursor.schema().unwrap().clone();

    let is_key: Vec<_> = schema.rows().iter().map(|row| row.is_key).collect();
    assert_eq!(vec![Some(true), Some(false), Some(false), None], is_key);
    let id = schema.row(0).unwrap();
    assert!(id.is_unique);
    assert!(!id.allow_db_null);
    let counters = &cursor.statement().counters;
    assert_eq!(0, counters.statistics.get());
    assert_eq!(1, counters.released.get());
}

#[test]
fn key_column_is_patched_to_not_nullable() {
    init_logging();
    let mut statement = FakeStatement::single(
        vec![FakeColumn::new("id", SqlDataType::INTEGER, 10).of_table("orders")],
        vec![],
    );
    statement.primary_keys = primary_key_rows(&["id"]);
    let mut cursor = RowCursor::new(statement).unwrap();
    assert_eq!(Nullable::Nullable, cursor.column(0).unwrap().nullable);

    let allow_db_null = cursor.schema().unwrap().row(0).unwrap().allow_db_null;

    assert!(!allow_db_null);
    assert_eq!(Nullable::NoNulls, cursor.column(0).unwrap().nullable);
}

/// No primary key is reported, so the first unique index without nullable columns is used.
/// Rows of the same index need not be adjacent.
#[test]
fn key_from_unique_index() -> anyhow::Result<()> {
    init_logging();
    let mut statement = orders();
    statement.statistics = CatalogScript::Rows(ResultSet::catalog(
        13,
        vec![
            statistics_row(None),
            statistics_row(Some(("ix_note", 0, "note"))),
            statistics_row(Some(("ix_code_id", 0, "code"))),
            statistics_row(Some(("ix_by_id", 1, "id"))),
            statistics_row(Some(("ix_code_id", 0, "id"))),
        ],
    ));
    let mut cursor = RowCursor::new(statement)?;

    let schema = cursor.schema()?.clone();

    let is_key: Vec<_> = schema.rows().iter().map(|row| row.is_key).collect();
    assert_eq!(vec![Some(true), Some(true), Some(false), None], is_key);
    let is_unique: Vec<_> = schema.rows().iter().map(|row| row.is_unique).collect();
    assert_eq!(vec![true, true, false, false], is_unique);
    let column_size: Vec<_> = schema.rows().iter().map(|row| row.column_size).collect();
    assert_eq!(vec![0, 10, 100, 0], column_size);
    let counters = &cursor.statement().counters;
    assert_eq!(1, counters.primary_keys.get());
    assert_eq!(1, counters.statistics.get());
    // Both temporary statements have been released
    assert_eq!(2, counters.released.get());
    Ok(())
}

#[test]
fn unique_index_with_nullable_column_is_no_key() {
    init_logging();
    let mut statement = orders();
    statement.statistics = CatalogScript::Rows(ResultSet::catalog(
        13,
        vec![
            statistics_row(Some(("ix_code_note", 0, "code"))),
            statistics_row(Some(("ix_code_note", 0, "note"))),
        ],
    ));
    let mut cursor = RowCursor::new(statement).unwrap();

    let schema = cursor.schema().unwrap().clone();

    assert!(schema.rows().iter().all(|row| row.is_key.is_none()));
}

#[test]
fn failing_catalog_functions_leave_key_unknown() {
    init_logging();
    let mut statement = orders();
    statement.primary_keys = CatalogScript::Fail(OPTIONAL_FEATURE_NOT_IMPLEMENTED);
    statement.statistics = CatalogScript::Fail(OPTIONAL_FEATURE_NOT_IMPLEMENTED);
    let mut cursor = RowCursor::new(statement).unwrap();

    let schema = cursor.schema().unwrap().clone();

    assert!(schema.rows().iter().all(|row| row.is_key.is_none()));
    assert!(schema.rows().iter().all(|row| !row.is_unique));
    assert_eq!(1, cursor.statement().counters.statistics.get());
}

#[test]
fn connection_exception_is_not_swallowed() {
    init_logging();
    let mut statement = orders();
    statement.primary_keys = CatalogScript::Fail(State::COMMUNICATION_LINK_FAILURE);
    let mut cursor = RowCursor::new(statement).unwrap();

    let error = cursor.schema().unwrap_err();

    assert!(error.is_connection_exception());
    assert_eq!(0, cursor.statement().counters.statistics.get());
}

#[test]
fn derived_column_properties() {
    init_logging();
    let mut aliased = FakeColumn::new("customer", SqlDataType::EXT_LONG_VARCHAR, 0).of_table("c");
    aliased.base_column_name = "name".to_owned();
    aliased.updatable = 1;
    let mut counter = FakeColumn::new("n", SqlDataType::EXT_BIG_INT, 19).of_table("c");
    counter.auto_unique_value = 1;
    counter.updatable = 0;
    let statement = FakeStatement::single(
        vec![
            aliased,
            counter,
            FakeColumn::new("total", SqlDataType::INTEGER, 10),
        ],
        vec![],
    );
    let mut cursor = RowCursor::new(statement).unwrap();

    let schema = cursor.schema().unwrap().clone();

    let customer = schema.row(0).unwrap();
    assert_eq!("customer", customer.column_name);
    assert_eq!("name", customer.base_column_name);
    assert_eq!("c", customer.base_table_name);
    assert_eq!("dbo", customer.base_schema_name);
    assert!(customer.is_aliased);
    assert!(customer.is_long);
    assert!(!customer.is_read_only);
    assert!(!customer.is_expression);
    assert_eq!(DataType::LongVarchar { length: 0 }, customer.data_type);
    assert_eq!(SqlDataType::EXT_LONG_VARCHAR.0, customer.provider_type);
    assert_eq!(0, customer.column_size);

    let n = schema.row(1).unwrap();
    assert_eq!(1, n.column_ordinal);
    // Only the length of variable sized types is reported
    assert_eq!(0, n.column_size);
    assert!(n.is_auto_increment);
    assert!(n.is_read_only);
    assert!(!n.is_aliased);
    assert!(!n.is_identity);
    assert!(!n.is_row_version);
    assert!(!n.is_hidden);

    let total = schema.row(2).unwrap();
    assert!(total.is_expression);
    assert!(total.is_read_only);
    assert!(total.allow_db_null);
    assert_eq!(None, total.is_key);
}

#[test]
fn schema_is_computed_once_per_result_set() -> anyhow::Result<()> {
    init_logging();
    let statement = FakeStatement::new(vec![
        ResultSet::new(
            vec![FakeColumn::new("a", SqlDataType::INTEGER, 10)],
            vec![],
        ),
        ResultSet::new(
            vec![
                FakeColumn::new("b", SqlDataType::INTEGER, 10),
                FakeColumn::new("c", SqlDataType::INTEGER, 10),
            ],
            vec![],
        ),
    ]);
    let mut cursor = RowCursor::new(statement)?;

    assert_eq!(0, cursor.schema()?.generation());
    let attribute_calls = cursor.statement().counters.numeric_col_attribute.get();
    cursor.schema()?;
    assert_eq!(
        attribute_calls,
        cursor.statement().counters.numeric_col_attribute.get()
    );

    assert!(cursor.advance_result_set()?);
    let schema = cursor.schema()?;

    assert_eq!(1, schema.generation());
    assert_eq!(2, schema.len());
    assert_eq!("c", schema.row(1).unwrap().column_name);
    Ok(())
}
