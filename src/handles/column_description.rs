use super::data_type::SqlDataType;

/// Indication of whether a column is nullable or not.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum Nullable {
    #[default]
    Unknown,
    Nullable,
    NoNulls,
}

impl Nullable {
    /// Interprets the `SQL_NO_NULLS` (`0`), `SQL_NULLABLE` (`1`) and `SQL_NULLABLE_UNKNOWN` (`2`)
    /// codes used by `SQLDescribeCol` and `SQLColAttribute`.
    pub fn from_code(code: isize) -> Self {
        match code {
            0 => Nullable::NoNulls,
            1 => Nullable::Nullable,
            _ => Nullable::Unknown,
        }
    }

    /// `true` if the column is `Nullable` or it is not know whether the column is nullable. `false`
    /// if and only if the column is `NoNulls`.
    pub fn could_be_nullable(self) -> bool {
        match self {
            Nullable::Nullable | Nullable::Unknown => true,
            Nullable::NoNulls => false,
        }
    }
}

/// Describes the type and attributes of a column, as reported by the data source. This is the
/// raw answer to `SQLDescribeCol`.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ColumnDescription {
    /// Column name. May be empty if unavailable.
    pub name: String,
    /// Type code of the column
    pub data_type: SqlDataType,
    /// Column size. Maximum length for variable sized types, precision for numeric types.
    pub column_size: usize,
    /// Scale of numeric types, or fractional seconds precision of time types.
    pub decimal_digits: i16,
    /// Indicates whether the column is nullable or not.
    pub nullable: Nullable,
}
