/// Indicator value signaling a `NULL` field (`SQL_NULL_DATA`).
pub const NULL_DATA: isize = -1;
/// Indicator value signaling that the length of the remaining data is not known (`SQL_NO_TOTAL`).
pub const NO_TOTAL: isize = -4;

/// Indicates existence and length of a value.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Indicator {
    /// Field does not exist
    Null,
    /// Field exists, but its length had not be reported by the driver.
    NoTotal,
    /// Fields exists. Value indicates number of bytes required to store the value. In case of
    /// truncated data, this is the true length of the data, before truncation occurred.
    Length(usize),
}

impl Indicator {
    /// Creates an indicator from an `isize` indicator value returned by ODBC.
    ///
    /// Negative values other than [`NULL_DATA`] are not valid lengths. Some drivers and driver
    /// managers assumed `SQLLEN` to be 32Bits even on 64Bit platforms, which may produce those.
    /// They are reported as [`Indicator::NoTotal`], which is the conservative interpretation.
    pub fn from_isize(indicator: isize) -> Self {
        match indicator {
            NULL_DATA => Indicator::Null,
            NO_TOTAL => Indicator::NoTotal,
            other => usize::try_from(other)
                .map(Indicator::Length)
                .unwrap_or(Indicator::NoTotal),
        }
    }

    /// Creates an indicator value as required by the ODBC C API.
    pub fn to_isize(self) -> isize {
        match self {
            Indicator::Null => NULL_DATA,
            Indicator::NoTotal => NO_TOTAL,
            Indicator::Length(len) => len.try_into().unwrap_or(isize::MAX),
        }
    }

    /// Only `true` if the indicator is the equivalent to [`NULL_DATA`], indicating a non-existing
    /// value.
    pub fn is_null(self) -> bool {
        matches!(self, Indicator::Null)
    }

    /// If the indicator is [`Indicator::Length`] this is [`Some`].
    pub fn length(self) -> Option<usize> {
        if let Indicator::Length(len) = self {
            Some(len)
        } else {
            None
        }
    }
}
