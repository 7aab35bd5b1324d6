/// Number of characters (or bytes, for binary columns) fetched per call to `SQLGetData` if not
/// specified otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 255;

/// Configures a [`crate::RowCursor`].
///
/// ```
/// use odbc_row_cursor::CursorOptions;
///
/// let options = CursorOptions::new()
///     .with_close_connection(true)
///     .with_chunk_size(4096);
/// assert_eq!(4096, options.chunk_size());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorOptions {
    close_connection: bool,
    chunk_size: usize,
    records_affected: isize,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self {
            close_connection: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            records_affected: -1,
        }
    }
}

impl CursorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// If `true` closing the cursor also closes the connection the statement has been allocated
    /// on. Default is `false`.
    pub fn with_close_connection(mut self, close_connection: bool) -> Self {
        self.close_connection = close_connection;
        self
    }

    /// Upper bound for the size of the buffer used to fetch text and binary values in units of
    /// characters (text) or bytes (binary). Larger values are fetched in several chunks.
    ///
    /// # Panics
    ///
    /// If `chunk_size` is smaller than `2`. A text chunk needs room for at least one character and
    /// the terminating zero.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        assert!(chunk_size >= 2, "Chunk size must be at least 2.");
        self.chunk_size = chunk_size;
        self
    }

    /// Number of rows changed, inserted or deleted by the statement, as reported by the command
    /// layer. `-1` if unknown or if the statement is a query.
    pub fn with_records_affected(mut self, records_affected: isize) -> Self {
        self.records_affected = records_affected;
        self
    }

    pub fn close_connection(&self) -> bool {
        self.close_connection
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn records_affected(&self) -> isize {
        self.records_affected
    }
}

#[cfg(test)]
mod tests {
    use super::{CursorOptions, DEFAULT_CHUNK_SIZE};

    #[test]
    fn defaults() {
        let options = CursorOptions::default();
        assert!(!options.close_connection());
        assert_eq!(DEFAULT_CHUNK_SIZE, options.chunk_size());
        assert_eq!(-1, options.records_affected());
    }

    #[test]
    #[should_panic]
    fn chunk_size_of_one_is_rejected() {
        let _ = CursorOptions::new().with_chunk_size(1);
    }
}
