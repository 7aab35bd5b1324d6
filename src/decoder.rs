use std::cmp::min;

use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use widestring::U16Str;

use crate::{
    Error,
    catalog::{Column, column_number},
    conversion::Decimal,
    error::ExtendResult,
    handles::{
        CType, DataType, Indicator, Record, SqlResult, State, StatementHandle, TimestampStruct,
        log_diagnostics,
    },
    options::DEFAULT_CHUNK_SIZE,
    value::Value,
};

/// Size of the buffer decimals are fetched into as text. Large enough for 38 digits, sign and
/// radix character.
const DECIMAL_TEXT_SIZE: usize = 50;

/// Size of the buffer values of types unknown to the decoder are fetched into as text.
const FALLBACK_TEXT_SIZE: usize = 255;

/// How a value of a given declared type is fetched from the data source and turned into a
/// [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// A single call to `SQLGetData` into a buffer of the exact size of the C type.
    Fixed(CType),
    /// Text of bounded length, parsed into a [`Decimal`].
    Decimal { scale: i16 },
    /// Narrow text of arbitrary length, fetched in chunks.
    NarrowText { max_len: usize },
    /// UTF-16 text of arbitrary length, fetched in chunks.
    WideText { max_len: usize },
    /// Bytes of arbitrary length, fetched in chunks.
    Binary { max_len: usize },
    /// `SQL_TIMESTAMP_STRUCT`, converted into a [`NaiveDateTime`].
    Timestamp,
    /// Best effort single read into a bounded text buffer. Longer values are truncated.
    FallbackText,
}

impl DecodeStrategy {
    /// Strategy used to decode values of the declared type.
    pub fn for_data_type(data_type: &DataType) -> Self {
        match *data_type {
            DataType::Bit => DecodeStrategy::Fixed(CType::Bit),
            DataType::TinyInt => DecodeStrategy::Fixed(CType::STinyInt),
            DataType::SmallInt => DecodeStrategy::Fixed(CType::SShort),
            DataType::Integer => DecodeStrategy::Fixed(CType::SLong),
            DataType::BigInt => DecodeStrategy::Fixed(CType::SBigInt),
            DataType::Real => DecodeStrategy::Fixed(CType::Float),
            DataType::Float { .. } | DataType::Double => DecodeStrategy::Fixed(CType::Double),
            DataType::Numeric { scale, .. } | DataType::Decimal { scale, .. } => {
                DecodeStrategy::Decimal { scale }
            }
            DataType::Char { length }
            | DataType::Varchar { length }
            | DataType::LongVarchar { length } => DecodeStrategy::NarrowText { max_len: length },
            DataType::WChar { length }
            | DataType::WVarchar { length }
            | DataType::WLongVarchar { length } => DecodeStrategy::WideText { max_len: length },
            DataType::Binary { length }
            | DataType::Varbinary { length }
            | DataType::LongVarbinary { length } => DecodeStrategy::Binary { max_len: length },
            DataType::Date | DataType::Time { .. } | DataType::Timestamp { .. } => {
                DecodeStrategy::Timestamp
            }
            DataType::Unknown | DataType::Other { .. } => DecodeStrategy::FallbackText,
        }
    }
}

/// Fetches field values of the current row and converts them into [`Value`]s.
#[derive(Clone, Copy, Debug)]
pub struct ValueDecoder {
    chunk_size: usize,
}

impl Default for ValueDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ValueDecoder {
    /// `chunk_size` is the maximum number of characters (or bytes for binary data) fetched with
    /// a single call to `SQLGetData`.
    ///
    /// # Panics
    ///
    /// If `chunk_size` is smaller than `2`. Text chunks need room for a terminating zero.
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size >= 2, "Chunk size must be at least 2.");
        Self { chunk_size }
    }

    /// Decodes the value of `column` in the current row. Each field may only be decoded once per
    /// row, since `SQLGetData` drains the field.
    pub fn decode(
        &self,
        statement: &mut impl StatementHandle,
        column: &Column,
    ) -> Result<Value, Error> {
        let ordinal = column.ordinal;
        let value = match DecodeStrategy::for_data_type(&column.data_type) {
            DecodeStrategy::Fixed(c_type) => self
                .read_fixed(statement, ordinal, c_type)?
                .map(|bytes| fixed_to_value(c_type, &bytes)),
            DecodeStrategy::Timestamp => {
                match self.read_fixed(statement, ordinal, CType::TypeTimestamp)? {
                    Some(bytes) => Some(Value::Timestamp(to_timestamp(
                        TimestampStruct::from_ne_bytes(&bytes),
                        ordinal,
                    )?)),
                    None => None,
                }
            }
            DecodeStrategy::Decimal { scale } => {
                match self.read_bounded_text(statement, ordinal, DECIMAL_TEXT_SIZE)? {
                    Some((text, false)) => Some(Value::Decimal(
                        Decimal::from_text(&text, scale)
                            .ok_or_else(|| invalid_decimal(ordinal, &text))?,
                    )),
                    Some((text, true)) => return Err(invalid_decimal(ordinal, &text)),
                    None => None,
                }
            }
            DecodeStrategy::NarrowText { max_len } => self
                .read_chunked(statement, ordinal, CType::Char, max_len)?
                .map(|bytes| Value::Text(narrow_to_string(bytes))),
            DecodeStrategy::WideText { max_len } => self
                .read_chunked(statement, ordinal, CType::WChar, max_len)?
                .map(|bytes| Value::Text(wide_to_string(&bytes))),
            DecodeStrategy::Binary { max_len } => self
                .read_chunked(statement, ordinal, CType::Binary, max_len)?
                .map(Value::Binary),
            DecodeStrategy::FallbackText => {
                match self.read_bounded_text(statement, ordinal, FALLBACK_TEXT_SIZE)? {
                    Some((text, truncated)) => {
                        if truncated {
                            warn!(
                                "Value of column {ordinal} of type {} has been truncated to \
                                {} bytes.",
                                column.data_type,
                                text.len()
                            );
                        }
                        Some(Value::Text(narrow_to_string(text)))
                    }
                    None => None,
                }
            }
        };
        Ok(value.unwrap_or(Value::Null))
    }

    /// Reads a text field of arbitrary length. `None` if the field is `NULL`. Used to read the
    /// result sets of catalog functions.
    pub fn read_text(
        &self,
        statement: &mut impl StatementHandle,
        ordinal: usize,
    ) -> Result<Option<String>, Error> {
        Ok(self
            .read_chunked(statement, ordinal, CType::Char, 0)?
            .map(narrow_to_string))
    }

    /// Reads a small integer field. `None` if the field is `NULL`. Used to read the result sets of
    /// catalog functions.
    pub fn read_i16(
        &self,
        statement: &mut impl StatementHandle,
        ordinal: usize,
    ) -> Result<Option<i16>, Error> {
        Ok(self
            .read_fixed(statement, ordinal, CType::SShort)?
            .map(|bytes| i16::from_ne_bytes(array(&bytes))))
    }

    /// Copies the next chunk of the field at `ordinal` into `buf` as binary data, continuing where
    /// the previous call left off. Returns the number of bytes written, which is `0` once the
    /// field is drained. `None` for `NULL`.
    pub fn read_chunk(
        &self,
        statement: &mut impl StatementHandle,
        ordinal: usize,
        buf: &mut [u8],
    ) -> Result<Option<usize>, Error> {
        if buf.is_empty() {
            return Ok(self.remaining_length(statement, ordinal)?.map(|_| 0));
        }
        match statement.get_data(column_number(ordinal), CType::Binary, buf) {
            SqlResult::Success(Indicator::Null) => Ok(None),
            SqlResult::Success(Indicator::Length(len)) => Ok(Some(min(len, buf.len()))),
            SqlResult::Success(Indicator::NoTotal) => Ok(Some(buf.len())),
            SqlResult::SuccessWithInfo(indicator) => {
                if indicator.is_null() {
                    return Ok(None);
                }
                if !statement.has_state(State::STRING_DATA_RIGHT_TRUNCATION) {
                    return Err(unexpected_info(&*statement, ordinal));
                }
                Ok(Some(buf.len()))
            }
            SqlResult::NoData => Ok(Some(0)),
            SqlResult::Error { function } => SqlResult::Error { function }
                .into_result(&*statement)
                .provide_context_for_diagnostic(decode_error(ordinal)),
        }
    }

    /// Asks for the length in bytes of the part of the field at `ordinal` not yet fetched, without
    /// fetching any of it. `None` for `NULL`. [`Indicator::NoTotal`] if the data source does not
    /// know the length.
    pub fn remaining_length(
        &self,
        statement: &mut impl StatementHandle,
        ordinal: usize,
    ) -> Result<Option<Indicator>, Error> {
        let indicator = match statement.get_data(column_number(ordinal), CType::Binary, &mut []) {
            SqlResult::Success(indicator) | SqlResult::SuccessWithInfo(indicator) => indicator,
            SqlResult::NoData => Indicator::Length(0),
            SqlResult::Error { function } => {
                return SqlResult::Error { function }
                    .into_result(&*statement)
                    .provide_context_for_diagnostic(decode_error(ordinal));
            }
        };
        if indicator.is_null() {
            Ok(None)
        } else {
            Ok(Some(indicator))
        }
    }

    /// One call to `SQLGetData` into a buffer matching the size of `c_type`. `None` for `NULL`.
    fn read_fixed(
        &self,
        statement: &mut impl StatementHandle,
        ordinal: usize,
        c_type: CType,
    ) -> Result<Option<Vec<u8>>, Error> {
        let mut buf = vec![0; c_type.fixed_size().unwrap_or(TimestampStruct::SIZE)];
        let result = statement.get_data(column_number(ordinal), c_type, &mut buf);
        if matches!(result, SqlResult::NoData) {
            return Err(Error::FieldConsumed { column: ordinal });
        }
        let indicator = result
            .into_result(&*statement)
            .provide_context_for_diagnostic(decode_error(ordinal))?;
        if indicator.is_null() {
            Ok(None)
        } else {
            Ok(Some(buf))
        }
    }

    /// Fetches a variadic field in chunks of at most `chunk_size` units and concatenates them.
    /// `max_len` is the declared maximum length in units, or `0` if unknown.
    ///
    /// A chunk which did not fit into the buffer is reported with `SQL_SUCCESS_WITH_INFO` and
    /// SQLSTATE `01004`. The chunk completing the value is reported with `SQL_SUCCESS`.
    fn read_chunked(
        &self,
        statement: &mut impl StatementHandle,
        ordinal: usize,
        c_type: CType,
        max_len: usize,
    ) -> Result<Option<Vec<u8>>, Error> {
        let terminator = c_type.terminating_zero();
        let unit = if c_type == CType::WChar { 2 } else { 1 };
        let capacity_units = if max_len == 0 {
            self.chunk_size
        } else {
            min(max_len + terminator / unit, self.chunk_size)
        };
        let mut buf = vec![0u8; capacity_units * unit];
        // Number of payload bytes in a chunk which filled the buffer.
        let payload = buf.len() - terminator;

        let mut value = Vec::new();
        let mut is_first_chunk = true;
        loop {
            let result = statement.get_data(column_number(ordinal), c_type, &mut buf);
            match result {
                SqlResult::Success(indicator) => {
                    match indicator {
                        Indicator::Null => return Ok(None),
                        Indicator::Length(len) => {
                            value.extend_from_slice(&buf[..min(len, payload)]);
                        }
                        Indicator::NoTotal => {
                            let len = if terminator == 0 {
                                payload
                            } else {
                                text_len(&buf[..payload], unit)
                            };
                            value.extend_from_slice(&buf[..len]);
                        }
                    }
                    break;
                }
                SqlResult::SuccessWithInfo(indicator) => {
                    if indicator.is_null() {
                        return Ok(None);
                    }
                    if !statement.has_state(State::STRING_DATA_RIGHT_TRUNCATION) {
                        return Err(unexpected_info(&*statement, ordinal));
                    }
                    value.extend_from_slice(&buf[..payload]);
                }
                // The entire value has already been fetched.
                SqlResult::NoData => {
                    if is_first_chunk {
                        return Ok(Some(value));
                    }
                    break;
                }
                SqlResult::Error { function } => {
                    return SqlResult::Error { function }
                        .into_result(&*statement)
                        .provide_context_for_diagnostic(decode_error(ordinal));
                }
            }
            is_first_chunk = false;
        }
        Ok(Some(value))
    }

    /// Single call to `SQLGetData` fetching narrow text into a buffer of `capacity` bytes. The
    /// boolean indicates whether the text has been truncated. `None` for `NULL`.
    fn read_bounded_text(
        &self,
        statement: &mut impl StatementHandle,
        ordinal: usize,
        capacity: usize,
    ) -> Result<Option<(Vec<u8>, bool)>, Error> {
        let mut buf = vec![0u8; capacity];
        let payload = capacity - CType::Char.terminating_zero();
        let (indicator, truncated) = match statement.get_data(
            column_number(ordinal),
            CType::Char,
            &mut buf,
        ) {
            SqlResult::Success(indicator) => (indicator, false),
            SqlResult::SuccessWithInfo(indicator) => {
                let truncated = statement.has_state(State::STRING_DATA_RIGHT_TRUNCATION);
                if !truncated {
                    log_diagnostics(&*statement);
                }
                (indicator, truncated)
            }
            SqlResult::NoData => return Err(Error::FieldConsumed { column: ordinal }),
            SqlResult::Error { function } => {
                return SqlResult::Error { function }
                    .into_result(&*statement)
                    .provide_context_for_diagnostic(decode_error(ordinal));
            }
        };
        let len = match indicator {
            Indicator::Null => return Ok(None),
            Indicator::Length(len) if !truncated => min(len, payload),
            _ => text_len(&buf[..payload], 1),
        };
        buf.truncate(len);
        Ok(Some((buf, truncated)))
    }
}

fn decode_error(ordinal: usize) -> impl FnOnce(Record, &'static str) -> Error {
    move |record, function| Error::Decode {
        column: ordinal,
        record,
        function,
    }
}

/// `SQLGetData` reported partial success for another reason than truncation.
fn unexpected_info(statement: &impl StatementHandle, ordinal: usize) -> Error {
    let mut record = Record::with_capacity(512);
    record.fill_from(statement, 1);
    Error::UnexpectedInfo {
        column: ordinal,
        record,
    }
}

fn invalid_decimal(ordinal: usize, text: &[u8]) -> Error {
    Error::InvalidDecimal {
        column: ordinal,
        text: String::from_utf8_lossy(text).into_owned(),
    }
}

fn fixed_to_value(c_type: CType, bytes: &[u8]) -> Value {
    match c_type {
        CType::Bit => Value::Bool(bytes[0] != 0),
        CType::STinyInt => Value::I8(i8::from_ne_bytes(array(bytes))),
        CType::SShort => Value::I16(i16::from_ne_bytes(array(bytes))),
        CType::SLong => Value::I32(i32::from_ne_bytes(array(bytes))),
        CType::SBigInt => Value::I64(i64::from_ne_bytes(array(bytes))),
        CType::Float => Value::F32(f32::from_ne_bytes(array(bytes))),
        CType::Double => Value::F64(f64::from_ne_bytes(array(bytes))),
        CType::Char | CType::WChar | CType::Binary | CType::TypeTimestamp => {
            unreachable!("{c_type:?} is not decoded as a plain fixed size value")
        }
    }
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Converts the timestamp, truncating fractional seconds to a resolution of 100 nanoseconds.
fn to_timestamp(ts: TimestampStruct, ordinal: usize) -> Result<NaiveDateTime, Error> {
    let invalid = || Error::InvalidTimestamp {
        column: ordinal,
        year: ts.year,
        month: ts.month,
        day: ts.day,
        hour: ts.hour,
        minute: ts.minute,
        second: ts.second,
    };
    if ts.fraction >= 1_000_000_000 {
        return Err(invalid());
    }
    let nanos = ts.fraction / 100 * 100;
    NaiveDate::from_ymd_opt(ts.year.into(), ts.month.into(), ts.day.into())
        .and_then(|date| {
            date.and_hms_nano_opt(ts.hour.into(), ts.minute.into(), ts.second.into(), nanos)
        })
        .ok_or_else(invalid)
}

/// Length in bytes of zero terminated text in `buf`. Length of `buf` if there is no terminator.
fn text_len(buf: &[u8], unit: usize) -> usize {
    buf.chunks_exact(unit)
        .position(|c| c.iter().all(|&b| b == 0))
        .map(|pos| pos * unit)
        .unwrap_or(buf.len() - buf.len() % unit)
}

fn narrow_to_string(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|error| String::from_utf8_lossy(error.as_bytes()).into_owned())
}

fn wide_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_ne_bytes([c[0], c[1]]))
        .collect();
    U16Str::from_slice(&units).to_string_lossy()
}
