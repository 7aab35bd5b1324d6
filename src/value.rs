use std::fmt;

use chrono::NaiveDateTime;

use crate::{Error, conversion::Decimal};

/// A single field of a row, decoded from the representation fetched from the data source.
///
/// Narrow and wide text end up both as UTF-8 [`Value::Text`]. `NULL` is represented explicitly by
/// [`Value::Null`] rather than by an `Option`, so it can be cached just like any other value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Text(String),
    Binary(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// `true` if the field is `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Binary(_) => "binary",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(text) = self {
            Some(text)
        } else {
            None
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        if let Value::Binary(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Any of the integer variants, widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(i) => Some(i.into()),
            Value::I16(i) => Some(i.into()),
            Value::I32(i) => Some(i.into()),
            Value::I64(i) => Some(i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::I8(i) => write!(f, "{i}"),
            Value::I16(i) => write!(f, "{i}"),
            Value::I32(i) => write!(f, "{i}"),
            Value::I64(i) => write!(f, "{i}"),
            Value::F32(x) => write!(f, "{x}"),
            Value::F64(x) => write!(f, "{x}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(text) => f.write_str(text),
            Value::Binary(bytes) => {
                for byte in bytes {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

/// Types a non-`NULL` [`Value`] can be converted into by [`crate::RowCursor::get`].
///
/// Conversions never lose information, with the exception of `String`, which accepts the text
/// representation of any value, and `f64` which accepts decimals.
pub trait FromValue: Sized {
    /// Used in error messages.
    const TYPE_NAME: &'static str;

    /// `None` if the value can not be represented as `Self`. Never called with [`Value::Null`].
    fn from_value(value: &Value) -> Option<Self>;

    /// Converts `value`, reporting a [`Error::TypeMismatch`] for the field at `ordinal` if it
    /// does not fit. `NULL` is mapped to `None`.
    fn convert(value: &Value, ordinal: usize) -> Result<Option<Self>, Error> {
        if value.is_null() {
            return Ok(None);
        }
        Self::from_value(value)
            .map(Some)
            .ok_or_else(|| Error::TypeMismatch {
                ordinal,
                expected: Self::TYPE_NAME,
                actual: value.type_name(),
            })
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i8 {
    const TYPE_NAME: &'static str = "i8";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::I8(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for i16 {
    const TYPE_NAME: &'static str = "i16";

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::I8(i) => Some(i.into()),
            Value::I16(i) => Some(i),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::I8(i) => Some(i.into()),
            Value::I16(i) => Some(i.into()),
            Value::I32(i) => Some(i),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::F32(x) => Some(*x),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::F32(x) => Some((*x).into()),
            Value::F64(x) => Some(*x),
            Value::Decimal(d) => Some(d.to_f64()),
            _ => None,
        }
    }
}

impl FromValue for Decimal {
    const TYPE_NAME: &'static str = "decimal";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Decimal(d) => Some(*d),
            other => other.as_i64().map(|i| Decimal::new(i.into(), 0)),
        }
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "text";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl FromValue for Vec<u8> {
    const TYPE_NAME: &'static str = "binary";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Binary(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }
}

impl FromValue for NaiveDateTime {
    const TYPE_NAME: &'static str = "timestamp";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{Error, conversion::Decimal};

    use super::{FromValue, Value};

    #[test]
    fn integers_widen() {
        assert_eq!(Some(5i64), i64::convert(&Value::I16(5), 0).unwrap());
        assert_eq!(Some(-3i32), i32::convert(&Value::I8(-3), 0).unwrap());
    }

    #[test]
    fn null_is_none() {
        assert_eq!(None, i32::convert(&Value::Null, 0).unwrap());
    }

    #[test]
    fn narrowing_is_a_type_mismatch() {
        let result = i16::convert(&Value::I64(1), 3);
        assert!(matches!(
            result,
            Err(Error::TypeMismatch {
                ordinal: 3,
                expected: "i16",
                actual: "i64"
            })
        ));
    }

    #[test]
    fn everything_is_text() {
        let ts = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(
            "2020-01-02 03:04:05",
            String::convert(&Value::Timestamp(ts), 0).unwrap().unwrap()
        );
        assert_eq!(
            "0102FF",
            String::convert(&Value::Binary(vec![1, 2, 255]), 0)
                .unwrap()
                .unwrap()
        );
        assert_eq!(
            "1.50",
            String::convert(&Value::Decimal(Decimal::new(150, 2)), 0)
                .unwrap()
                .unwrap()
        );
    }
}
