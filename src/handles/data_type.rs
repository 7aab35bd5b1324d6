use std::fmt;

/// SQL type code as reported by the data source, e.g. by `SQLDescribeCol`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct SqlDataType(pub i16);

impl SqlDataType {
    pub const UNKNOWN_TYPE: SqlDataType = SqlDataType(0);
    pub const CHAR: SqlDataType = SqlDataType(1);
    pub const NUMERIC: SqlDataType = SqlDataType(2);
    pub const DECIMAL: SqlDataType = SqlDataType(3);
    pub const INTEGER: SqlDataType = SqlDataType(4);
    pub const SMALLINT: SqlDataType = SqlDataType(5);
    pub const FLOAT: SqlDataType = SqlDataType(6);
    pub const REAL: SqlDataType = SqlDataType(7);
    pub const DOUBLE: SqlDataType = SqlDataType(8);
    /// Type code of the `SQL_DATETIME` family in ODBC 2.x. Verbose type of date, time and
    /// timestamp.
    pub const DATETIME: SqlDataType = SqlDataType(9);
    pub const VARCHAR: SqlDataType = SqlDataType(12);
    pub const DATE: SqlDataType = SqlDataType(91);
    pub const TIME: SqlDataType = SqlDataType(92);
    pub const TIMESTAMP: SqlDataType = SqlDataType(93);
    pub const EXT_LONG_VARCHAR: SqlDataType = SqlDataType(-1);
    pub const EXT_BINARY: SqlDataType = SqlDataType(-2);
    pub const EXT_VAR_BINARY: SqlDataType = SqlDataType(-3);
    pub const EXT_LONG_VAR_BINARY: SqlDataType = SqlDataType(-4);
    pub const EXT_BIG_INT: SqlDataType = SqlDataType(-5);
    pub const EXT_TINY_INT: SqlDataType = SqlDataType(-6);
    pub const EXT_BIT: SqlDataType = SqlDataType(-7);
    pub const EXT_W_CHAR: SqlDataType = SqlDataType(-8);
    pub const EXT_W_VARCHAR: SqlDataType = SqlDataType(-9);
    pub const EXT_W_LONG_VARCHAR: SqlDataType = SqlDataType(-10);
    pub const EXT_GUID: SqlDataType = SqlDataType(-11);
}

/// Enumeration over the SQL Data Types the cursor knows how to decode. Types outside of this list
/// end up in [`DataType::Other`] and are read as text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    /// The type is not known.
    Unknown,
    /// `Char(n)`. Character string of fixed length.
    Char {
        /// Column size in characters (excluding terminating zero).
        length: usize,
    },
    /// `NChar(n)`. Character string of fixed length, UTF-16 encoded.
    WChar { length: usize },
    /// `Varchar(n)`. Variable length character string.
    Varchar {
        /// Maximum length of the character string (excluding terminating zero). `0` if the driver
        /// does not know an upper bound.
        length: usize,
    },
    /// `NVarchar(n)`. Variable length character string, UTF-16 encoded.
    WVarchar { length: usize },
    /// `TEXT`. Variable length character data. Maximum length is data source dependent.
    LongVarchar { length: usize },
    /// `NTEXT`. Variable length character data, UTF-16 encoded.
    WLongVarchar { length: usize },
    /// `Numeric(p,s)`. Signed, exact, numeric value with a precision p and scale s.
    Numeric {
        /// Total number of digits.
        precision: usize,
        /// Number of decimal digits.
        scale: i16,
    },
    /// `Decimal(p,s)`. Signed, exact, numeric value with a precision of at least p and scale s.
    Decimal { precision: usize, scale: i16 },
    /// `TINYINT`. Exact numeric value with precision 3 and scale 0.
    TinyInt,
    /// `Smallint`. 16 Bit Integer
    SmallInt,
    /// `Integer`. 32 Bit Integer
    Integer,
    /// `BIGINT`. 64 Bit Integer
    BigInt,
    /// `BIT`. Single bit binary data.
    Bit,
    /// `Real`. Signed, approximate, numeric value with a binary precision 24.
    Real,
    /// `Float(p)`. Signed, approximate, numeric value with a binary precision of at least p.
    Float { precision: usize },
    /// `Double Precision`. Signed, approximate, numeric value with a binary precision 53.
    Double,
    /// `Date`. Year, month, and day fields.
    Date,
    /// `Time`. Hour, minute, and second fields. Precision p indicates the seconds precision.
    Time { precision: i16 },
    /// `Timestamp`. Year, month, day, hour, minute, and second fields.
    Timestamp { precision: i16 },
    /// `BINARY(n)`. Binary data of fixed length.
    Binary { length: usize },
    /// `VARBINARY(n)`. Variable length binary data.
    Varbinary { length: usize },
    /// `IMAGE`, `BLOB`. Variable length binary data. Maximum length is data source dependent.
    LongVarbinary { length: usize },
    /// The driver returned a type, but it is not among the other types of this enumeration.
    Other {
        data_type: SqlDataType,
        column_size: usize,
        decimal_digits: i16,
    },
}

impl DataType {
    /// Interprets the raw type information reported by the data source.
    pub fn new(data_type: SqlDataType, column_size: usize, decimal_digits: i16) -> Self {
        match data_type {
            SqlDataType::UNKNOWN_TYPE => DataType::Unknown,
            SqlDataType::CHAR => DataType::Char {
                length: column_size,
            },
            SqlDataType::EXT_W_CHAR => DataType::WChar {
                length: column_size,
            },
            SqlDataType::VARCHAR => DataType::Varchar {
                length: column_size,
            },
            SqlDataType::EXT_W_VARCHAR => DataType::WVarchar {
                length: column_size,
            },
            SqlDataType::EXT_LONG_VARCHAR => DataType::LongVarchar {
                length: column_size,
            },
            SqlDataType::EXT_W_LONG_VARCHAR => DataType::WLongVarchar {
                length: column_size,
            },
            SqlDataType::NUMERIC => DataType::Numeric {
                precision: column_size,
                scale: decimal_digits,
            },
            SqlDataType::DECIMAL => DataType::Decimal {
                precision: column_size,
                scale: decimal_digits,
            },
            SqlDataType::EXT_TINY_INT => DataType::TinyInt,
            SqlDataType::SMALLINT => DataType::SmallInt,
            SqlDataType::INTEGER => DataType::Integer,
            SqlDataType::EXT_BIG_INT => DataType::BigInt,
            SqlDataType::EXT_BIT => DataType::Bit,
            SqlDataType::REAL => DataType::Real,
            SqlDataType::FLOAT => DataType::Float {
                precision: column_size,
            },
            SqlDataType::DOUBLE => DataType::Double,
            SqlDataType::DATE => DataType::Date,
            SqlDataType::TIME => DataType::Time {
                precision: decimal_digits,
            },
            SqlDataType::TIMESTAMP | SqlDataType::DATETIME => DataType::Timestamp {
                precision: decimal_digits,
            },
            SqlDataType::EXT_BINARY => DataType::Binary {
                length: column_size,
            },
            SqlDataType::EXT_VAR_BINARY => DataType::Varbinary {
                length: column_size,
            },
            SqlDataType::EXT_LONG_VAR_BINARY => DataType::LongVarbinary {
                length: column_size,
            },
            other => DataType::Other {
                data_type: other,
                column_size,
                decimal_digits,
            },
        }
    }

    /// The associated type code.
    pub fn data_type(&self) -> SqlDataType {
        match self {
            DataType::Unknown => SqlDataType::UNKNOWN_TYPE,
            DataType::Char { .. } => SqlDataType::CHAR,
            DataType::WChar { .. } => SqlDataType::EXT_W_CHAR,
            DataType::Varchar { .. } => SqlDataType::VARCHAR,
            DataType::WVarchar { .. } => SqlDataType::EXT_W_VARCHAR,
            DataType::LongVarchar { .. } => SqlDataType::EXT_LONG_VARCHAR,
            DataType::WLongVarchar { .. } => SqlDataType::EXT_W_LONG_VARCHAR,
            DataType::Numeric { .. } => SqlDataType::NUMERIC,
            DataType::Decimal { .. } => SqlDataType::DECIMAL,
            DataType::TinyInt => SqlDataType::EXT_TINY_INT,
            DataType::SmallInt => SqlDataType::SMALLINT,
            DataType::Integer => SqlDataType::INTEGER,
            DataType::BigInt => SqlDataType::EXT_BIG_INT,
            DataType::Bit => SqlDataType::EXT_BIT,
            DataType::Real => SqlDataType::REAL,
            DataType::Float { .. } => SqlDataType::FLOAT,
            DataType::Double => SqlDataType::DOUBLE,
            DataType::Date => SqlDataType::DATE,
            DataType::Time { .. } => SqlDataType::TIME,
            DataType::Timestamp { .. } => SqlDataType::TIMESTAMP,
            DataType::Binary { .. } => SqlDataType::EXT_BINARY,
            DataType::Varbinary { .. } => SqlDataType::EXT_VAR_BINARY,
            DataType::LongVarbinary { .. } => SqlDataType::EXT_LONG_VAR_BINARY,
            DataType::Other { data_type, .. } => *data_type,
        }
    }

    /// Maximum length of elements of variable sized types in characters (text) or bytes
    /// (binary). `None` for fixed sized types. `Some(0)` if the driver did not report an upper
    /// bound.
    pub fn max_length(&self) -> Option<usize> {
        match self {
            DataType::Char { length }
            | DataType::WChar { length }
            | DataType::Varchar { length }
            | DataType::WVarchar { length }
            | DataType::LongVarchar { length }
            | DataType::WLongVarchar { length }
            | DataType::Binary { length }
            | DataType::Varbinary { length }
            | DataType::LongVarbinary { length } => Some(*length),
            DataType::Other { column_size, .. } => Some(*column_size),
            _ => None,
        }
    }

    /// `true` for the types which may hold values too large to be described by their declared
    /// size, i.e. the `LONG` variants.
    pub fn is_long(&self) -> bool {
        matches!(
            self,
            DataType::LongVarchar { .. }
                | DataType::WLongVarchar { .. }
                | DataType::LongVarbinary { .. }
        )
    }

    /// Precision of numeric types. `0` for everything else.
    pub fn precision(&self) -> usize {
        match self {
            DataType::Numeric { precision, .. } | DataType::Decimal { precision, .. } => *precision,
            DataType::Float { precision } => *precision,
            DataType::TinyInt => 3,
            DataType::SmallInt => 5,
            DataType::Integer => 10,
            DataType::BigInt => 19,
            DataType::Real => 7,
            DataType::Double => 15,
            _ => 0,
        }
    }

    /// Number of digits after the decimal point for exact numeric types, or of the fractional
    /// seconds for time types. `0` for everything else.
    pub fn scale(&self) -> i16 {
        match self {
            DataType::Numeric { scale, .. } | DataType::Decimal { scale, .. } => *scale,
            DataType::Time { precision } | DataType::Timestamp { precision } => *precision,
            DataType::Other { decimal_digits, .. } => *decimal_digits,
            _ => 0,
        }
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::Unknown
    }
}

impl fmt::Display for DataType {
    /// SQL name of the type, e.g. `VARCHAR`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Unknown => f.write_str("UNKNOWN"),
            DataType::Char { .. } => f.write_str("CHAR"),
            DataType::WChar { .. } => f.write_str("NCHAR"),
            DataType::Varchar { .. } => f.write_str("VARCHAR"),
            DataType::WVarchar { .. } => f.write_str("NVARCHAR"),
            DataType::LongVarchar { .. } => f.write_str("TEXT"),
            DataType::WLongVarchar { .. } => f.write_str("NTEXT"),
            DataType::Numeric { .. } => f.write_str("NUMERIC"),
            DataType::Decimal { .. } => f.write_str("DECIMAL"),
            DataType::TinyInt => f.write_str("TINYINT"),
            DataType::SmallInt => f.write_str("SMALLINT"),
            DataType::Integer => f.write_str("INTEGER"),
            DataType::BigInt => f.write_str("BIGINT"),
            DataType::Bit => f.write_str("BIT"),
            DataType::Real => f.write_str("REAL"),
            DataType::Float { .. } => f.write_str("FLOAT"),
            DataType::Double => f.write_str("DOUBLE"),
            DataType::Date => f.write_str("DATE"),
            DataType::Time { .. } => f.write_str("TIME"),
            DataType::Timestamp { .. } => f.write_str("TIMESTAMP"),
            DataType::Binary { .. } => f.write_str("BINARY"),
            DataType::Varbinary { .. } => f.write_str("VARBINARY"),
            DataType::LongVarbinary { .. } => f.write_str("IMAGE"),
            DataType::Other { data_type, .. } => write!(f, "OTHER({})", data_type.0),
        }
    }
}
