//! Error types for the call-level client engine.

use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// One diagnostic record reported by the backend for a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Five character SQLSTATE code.
    pub state: String,
    /// Driver specific native error code.
    pub native_error: i32,
    /// Message text.
    pub message: String,
    /// One-based row within the fetched row set, when the record is about a row.
    pub row: Option<usize>,
    /// One-based column, when the record is about a column.
    pub column: Option<u16>,
}

impl DiagnosticRecord {
    /// Create a new diagnostic record.
    pub fn new(state: impl Into<String>, native_error: i32, message: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            native_error,
            message: message.into(),
            row: None,
            column: None,
        }
    }

    /// Attach the row and column the record refers to.
    pub fn at(mut self, row: usize, column: u16) -> Self {
        self.row = Some(row);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({}) {}", self.state, self.native_error, self.message)
    }
}

/// All diagnostic records a driver produced for a single failed call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<DiagnosticRecord>);

impl Diagnostics {
    /// Wrap a list of records.
    pub fn new(records: Vec<DiagnosticRecord>) -> Self {
        Self(records)
    }

    /// Shorthand for a failure carrying exactly one record.
    pub fn single(state: impl Into<String>, native_error: i32, message: impl Into<String>) -> Self {
        Self(vec![DiagnosticRecord::new(state, native_error, message)])
    }

    /// Append another record.
    pub fn push(&mut self, record: DiagnosticRecord) {
        self.0.push(record);
    }

    /// All records, in the order the driver reported them.
    pub fn records(&self) -> &[DiagnosticRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SQLSTATE of the first record, if any.
    pub fn first_state(&self) -> Option<&str> {
        self.0.first().map(|r| r.state.as_str())
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no diagnostic records");
        }
        for (i, record) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", record)?;
        }
        Ok(())
    }
}

impl From<DiagnosticRecord> for Diagnostics {
    fn from(record: DiagnosticRecord) -> Self {
        Self(vec![record])
    }
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The backend reported a failure.
    Driver,
    /// Caller-supplied parameters do not match what the backend expects.
    ProtocolMismatch,
    /// The handle was already closed or freed.
    ResourceInvalid,
    /// A buffer could not be allocated.
    Allocation,
    /// Fetched data could not be represented without loss.
    DataIntegrity,
    /// A value could not be converted between native and backend types.
    Conversion,
    /// The background unit of work did not complete.
    Task,
}

/// Error type for engine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The backend reported a failure for a specific call.
    #[error("{function} failed: {diagnostics}")]
    Driver {
        function: &'static str,
        diagnostics: Diagnostics,
    },

    /// Parameter count or shape does not match the statement.
    #[error("Parameter mismatch: {message}")]
    ProtocolMismatch { message: String },

    /// No procedure matched the catalog lookup.
    #[error("Procedure not found: {name}")]
    ProcedureNotFound { name: String },

    /// Operation on a handle that has already been closed or freed.
    #[error("{resource} is closed")]
    ResourceInvalid { resource: &'static str },

    /// Buffer allocation failed.
    #[error("Failed to allocate {requested} bytes for {purpose}")]
    Allocation {
        requested: usize,
        purpose: &'static str,
    },

    /// A fixed-size value was truncated by the driver.
    #[error("Data truncated in column {column} (row {row})")]
    DataTruncated { column: String, row: usize },

    /// Type conversion error.
    #[error("Type conversion error: {message}")]
    TypeConversion { message: String },

    /// Bind type code that the engine cannot interpret.
    #[error("Unsupported bind type code: {code}")]
    UnsupportedType { code: i16 },

    /// Buffer too small.
    #[error("Buffer too small: need {needed} bytes, have {available} at {location}")]
    BufferTooSmall {
        needed: usize,
        available: usize,
        location: &'static Location<'static>,
    },

    /// Column not found.
    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },

    /// The background worker panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Create a driver error for the named call.
    pub fn driver(function: &'static str, diagnostics: Diagnostics) -> Self {
        Self::Driver {
            function,
            diagnostics,
        }
    }

    /// Create a parameter mismatch error.
    pub fn protocol_mismatch(message: impl Into<String>) -> Self {
        Self::ProtocolMismatch {
            message: message.into(),
        }
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Map a failed `try_reserve` into an allocation error.
    pub fn allocation(requested: usize, purpose: &'static str) -> Self {
        Self::Allocation { requested, purpose }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Driver { .. } => ErrorKind::Driver,
            Error::ProtocolMismatch { .. } | Error::ProcedureNotFound { .. } => {
                ErrorKind::ProtocolMismatch
            }
            Error::ResourceInvalid { .. } => ErrorKind::ResourceInvalid,
            Error::Allocation { .. } => ErrorKind::Allocation,
            Error::DataTruncated { .. } => ErrorKind::DataIntegrity,
            Error::TypeConversion { .. }
            | Error::UnsupportedType { .. }
            | Error::BufferTooSmall { .. }
            | Error::ColumnNotFound { .. } => ErrorKind::Conversion,
            Error::Task(_) => ErrorKind::Task,
        }
    }

    /// Diagnostic records, for driver errors.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Error::Driver { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_keeps_every_record() {
        let diagnostics = Diagnostics::new(vec![
            DiagnosticRecord::new("42S02", 208, "Invalid object name 't'"),
            DiagnosticRecord::new("42000", 8180, "Statement(s) could not be prepared"),
        ]);
        let err = Error::driver("SQLExecDirect", diagnostics);

        assert_eq!(err.kind(), ErrorKind::Driver);
        assert_eq!(err.diagnostics().map(Diagnostics::len), Some(2));
        let text = err.to_string();
        assert!(text.starts_with("SQLExecDirect failed"));
        assert!(text.contains("[42S02] (208) Invalid object name 't'"));
        assert!(text.contains("[42000] (8180)"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::protocol_mismatch("expected 2, got 1").kind(),
            ErrorKind::ProtocolMismatch
        );
        assert_eq!(
            Error::ProcedureNotFound {
                name: "p".to_string()
            }
            .kind(),
            ErrorKind::ProtocolMismatch
        );
        assert_eq!(
            Error::ResourceInvalid {
                resource: "connection"
            }
            .kind(),
            ErrorKind::ResourceInvalid
        );
        assert_eq!(
            Error::allocation(16, "column buffer").kind(),
            ErrorKind::Allocation
        );
        assert_eq!(
            Error::DataTruncated {
                column: "ID".to_string(),
                row: 0
            }
            .kind(),
            ErrorKind::DataIntegrity
        );
    }

    #[test]
    fn test_diagnostics_display_empty() {
        assert_eq!(Diagnostics::default().to_string(), "no diagnostic records");
        assert_eq!(
            Diagnostics::single("HY000", 1, "boom").first_state(),
            Some("HY000")
        );
    }
}
