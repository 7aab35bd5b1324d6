use std::fmt;

use log::{Level, warn};

/// Length of an SQLSTATE excluding the terminating zero.
pub const SQLSTATE_SIZE: usize = 5;

/// A buffer large enough to hold an `SQLSTATE` for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(pub [u8; SQLSTATE_SIZE]);

impl State {
    /// String or binary data returned for a column resulted in the truncation of nonblank character
    /// or non-NULL binary data. If it was a string value, it was right-truncated. Returned by
    /// `SQLGetData` then there is more data to fetch for the same value.
    pub const STRING_DATA_RIGHT_TRUNCATION: State = State(*b"01004");
    /// The driver was unable to allocate memory required to support execution or completion of the
    /// function.
    pub const MEMORY_ALLOCATION_ERROR: State = State(*b"HY001");
    /// The value specified for the argument `ColumnNumber` was greater than the number of columns
    /// in the result set.
    pub const INVALID_DESCRIPTOR_INDEX: State = State(*b"07009");
    /// The link to the data source failed before the function completed processing.
    pub const COMMUNICATION_LINK_FAILURE: State = State(*b"08S01");

    /// Drops terminating zero
    pub fn from_chars_with_nul(code: &[u8; SQLSTATE_SIZE + 1]) -> Self {
        let mut ascii = [0; SQLSTATE_SIZE];
        ascii.copy_from_slice(&code[..SQLSTATE_SIZE]);
        State(ascii)
    }

    /// View status code as string slice for displaying. ODBC status codes always consist of ASCII
    /// characters, anything else is replaced with a question mark.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("?????")
    }

    /// The first two characters of an SQLSTATE denote its class. Class `08` is a connection
    /// exception.
    pub fn is_connection_exception(&self) -> bool {
        self.0.starts_with(b"08")
    }
}

/// Result of [`Diagnostics::diagnostic_record`].
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticResult {
    /// A five-character SQLSTATE code for the diagnostic record `rec_number`. The first two
    /// characters indicate the class; the next three indicate the subclass.
    pub state: State,
    /// Native error code specific to the data source.
    pub native_error: i32,
    /// The length of the diagnostic message reported by the source (excluding the terminating
    /// zero).
    pub text_length: i16,
}

/// Report diagnostics from the last call to a function using a handle.
pub trait Diagnostics {
    /// Call this method to retrieve diagnostic information for the last call to a function.
    ///
    /// # Arguments
    ///
    /// * `rec_number` - Indicates the status record from which the application seeks information.
    ///   Status records are numbered from 1. Function panics for values smaller < 1.
    /// * `message_text` - Buffer in which to return the diagnostic message text string. If the
    ///   number of characters to return is greater than the buffer length, the message is
    ///   truncated. To determine that a truncation occurred, the application must compare the
    ///   buffer length to [`DiagnosticResult::text_length`].
    ///
    /// # Result
    ///
    /// * `Some(rec)` - The function successfully returned diagnostic information.
    /// * `None` - `rec_number` was greater than the number of diagnostic records that existed for
    ///   the specified Handle.
    fn diagnostic_record(&self, rec_number: i16, message_text: &mut [u8])
    -> Option<DiagnosticResult>;

    /// Builds on top of [`Self::diagnostic_record`], if the message does not fit in the buffer, it
    /// will grow the message buffer and extract it again.
    fn diagnostic_record_vec(
        &self,
        rec_number: i16,
        message_text: &mut Vec<u8>,
    ) -> Option<DiagnosticResult> {
        // Use all the memory available in the buffer, but don't allocate any extra.
        let cap = message_text.capacity();
        message_text.resize(cap, 0);

        let mut result = self.diagnostic_record(rec_number, message_text)?;
        let mut text_length = usize::try_from(result.text_length).unwrap_or(0);

        if text_length > message_text.len() {
            // Resize with +1 to account for terminating zero
            message_text.resize(text_length + 1, 0);
            result = self.diagnostic_record(rec_number, message_text)?;
        }
        text_length = text_length.min(message_text.len());

        // Some drivers pad the message with null-chars (which is still a valid C string, but not a
        // valid Rust string).
        while text_length > 0 && message_text[text_length - 1] == 0 {
            text_length -= 1;
        }
        message_text.truncate(text_length);
        Some(result)
    }

    /// `true` if any diagnostic record associated with the last call carries `state`.
    fn has_state(&self, state: State) -> bool {
        let mut rec_number = 1;
        let mut message = Vec::new();
        while let Some(result) = self.diagnostic_record_vec(rec_number, &mut message) {
            if result.state == state {
                return true;
            }
            if rec_number == i16::MAX {
                break;
            }
            rec_number += 1;
        }
        false
    }
}

/// Diagnostic Record
///
/// `std::fmt::Display` renders status code, native error and message.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Record {
    pub state: State,
    /// Error code returned by Driver manager or driver
    pub native_error: i32,
    /// Buffer containing the error message. The buffer already has the correct size, and there is
    /// no terminating zero at the end.
    pub message: Vec<u8>,
}

impl Record {
    /// Creates an empty diagnostic record with at least the specified capacity for the message.
    /// Using a buffer with a size different from zero then filling the diagnostic record may safe a
    /// second function call.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            message: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Fill this diagnostic `Record` from any handle.
    ///
    /// # Return
    ///
    /// `true` if a record has been found, `false` if not.
    pub fn fill_from(&mut self, handle: &(impl Diagnostics + ?Sized), record_number: i16) -> bool {
        match handle.diagnostic_record_vec(record_number, &mut self.message) {
            Some(result) => {
                self.state = result.state;
                self.native_error = result.native_error;
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "State: {}, Native error: {}, Message: {}",
            self.state.as_str(),
            self.native_error,
            String::from_utf8_lossy(&self.message),
        )
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Logs every diagnostic record left behind by the last call on `handle` as a warning. Messages
/// which are not valid UTF-8 are logged lossily.
pub fn log_diagnostics(handle: &(impl Diagnostics + ?Sized)) {
    if log::max_level() < Level::Warn {
        return;
    }
    let mut record = Record::with_capacity(512);
    for rec_number in 1..=i16::MAX {
        if !record.fill_from(handle, rec_number) {
            return;
        }
        warn!("{record}");
    }
    warn!(
        "More than {} diagnostic records have been reported. The rest is not logged.",
        i16::MAX
    );
}
