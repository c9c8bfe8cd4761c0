//! Session and per-query options.

use std::time::Duration;

/// Default rows per batch when draining a result eagerly.
pub const DEFAULT_FETCH_SIZE: usize = 100;

/// Default rows per page for cursors opened without an explicit fetch size.
pub const DEFAULT_CURSOR_FETCH_SIZE: usize = 1;

/// Declared column size above which a column is read in chunks.
pub const DEFAULT_LONG_DATA_THRESHOLD: usize = 8000;

/// Bytes requested per chunk when reading long data.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// How projected rows expose their values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowShape {
    /// Ordered values, addressed by position.
    #[default]
    Positional,
    /// Values keyed by column name.
    Named,
}

/// Character width used for text exchanged with the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharEncoding {
    /// 8-bit units (UTF-8).
    #[default]
    Narrow,
    /// 16-bit units (UTF-16).
    Wide,
}

impl CharEncoding {
    /// Bytes per code unit.
    pub fn unit_width(&self) -> usize {
        match self {
            CharEncoding::Narrow => 1,
            CharEncoding::Wide => 2,
        }
    }

    /// Worst-case code units needed for one character.
    pub fn max_units_per_char(&self) -> usize {
        match self {
            CharEncoding::Narrow => 4,
            CharEncoding::Wide => 2,
        }
    }
}

/// Options consumed from the session for every operation on a connection.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Shape of projected rows.
    pub row_shape: RowShape,
    /// Character width for text data.
    pub encoding: CharEncoding,
    /// Rows per batch in eager mode.
    pub fetch_size: usize,
    /// Column size above which data is read in chunks.
    pub long_data_threshold: usize,
    /// Bytes per chunk for long data.
    pub chunk_size: usize,
    /// Passed to the driver for each statement; not enforced here.
    pub query_timeout: Option<Duration>,
    /// Passed to the driver when the connection is created; not enforced here.
    pub connection_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            row_shape: RowShape::Positional,
            encoding: CharEncoding::Narrow,
            fetch_size: DEFAULT_FETCH_SIZE,
            long_data_threshold: DEFAULT_LONG_DATA_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            query_timeout: None,
            connection_timeout: None,
        }
    }
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projected row shape.
    ///
    /// # Example
    ///
    /// ```
    /// use odbc_bridge_rs::{RowShape, SessionOptions};
    ///
    /// let options = SessionOptions::new().with_row_shape(RowShape::Named);
    /// assert_eq!(options.row_shape, RowShape::Named);
    /// ```
    pub fn with_row_shape(mut self, shape: RowShape) -> Self {
        self.row_shape = shape;
        self
    }

    pub fn with_encoding(mut self, encoding: CharEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the eager batch size. Values below 1 are clamped to 1.
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }

    pub fn with_long_data_threshold(mut self, threshold: usize) -> Self {
        self.long_data_threshold = threshold;
        self
    }

    /// Set the chunk size for long data. Never smaller than 16 bytes.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(16);
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }
}

/// Per-query options for [`Connection::execute`](crate::Connection::execute).
///
/// Supplying a fetch size or a cursor name implies cursor mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Request cursor mode without naming the cursor.
    pub cursor: bool,
    /// Name applied to the statement before execution.
    pub cursor_name: Option<String>,
    /// Rows per page.
    pub fetch_size: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursor(mut self) -> Self {
        self.cursor = true;
        self
    }

    pub fn with_cursor_name(mut self, name: impl Into<String>) -> Self {
        self.cursor_name = Some(name.into());
        self
    }

    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = Some(fetch_size);
        self
    }

    /// Whether results are returned page by page.
    pub fn is_cursor_mode(&self) -> bool {
        self.cursor || self.cursor_name.is_some() || self.fetch_size.is_some()
    }

    /// Rows per page, clamped to at least 1.
    pub fn effective_fetch_size(&self) -> usize {
        self.fetch_size
            .unwrap_or(DEFAULT_CURSOR_FETCH_SIZE)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults() {
        let options = SessionOptions::new();
        assert_eq!(options.row_shape, RowShape::Positional);
        assert_eq!(options.encoding, CharEncoding::Narrow);
        assert_eq!(options.fetch_size, DEFAULT_FETCH_SIZE);
        assert_eq!(options.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(options.query_timeout.is_none());
    }

    #[test]
    fn test_session_builder() {
        let options = SessionOptions::new()
            .with_encoding(CharEncoding::Wide)
            .with_fetch_size(0)
            .with_chunk_size(2)
            .with_query_timeout(Duration::from_secs(5));
        assert_eq!(options.encoding, CharEncoding::Wide);
        assert_eq!(options.fetch_size, 1);
        assert_eq!(options.chunk_size, 16);
        assert_eq!(options.query_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_fetch_size_implies_cursor_mode() {
        assert!(!QueryOptions::new().is_cursor_mode());
        assert!(QueryOptions::new().with_fetch_size(10).is_cursor_mode());
        assert!(QueryOptions::new().with_cursor_name("c1").is_cursor_mode());
        assert!(QueryOptions::new().with_cursor().is_cursor_mode());
    }

    #[test]
    fn test_fetch_size_clamped_to_one() {
        assert_eq!(QueryOptions::new().with_fetch_size(0).effective_fetch_size(), 1);
        assert_eq!(QueryOptions::new().with_fetch_size(25).effective_fetch_size(), 25);
        assert_eq!(
            QueryOptions::new().with_cursor().effective_fetch_size(),
            DEFAULT_CURSOR_FETCH_SIZE
        );
    }

    #[test]
    fn test_encoding_widths() {
        assert_eq!(CharEncoding::Narrow.unit_width(), 1);
        assert_eq!(CharEncoding::Wide.unit_width(), 2);
        assert_eq!(CharEncoding::Narrow.max_units_per_char(), 4);
        assert_eq!(CharEncoding::Wide.max_units_per_char(), 2);
    }
}
