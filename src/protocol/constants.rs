//! Call-level interface constants.
//!
//! Numeric codes follow the ODBC 3.x headers (`sql.h`, `sqlext.h`).

// SQL data types
pub const SQL_UNKNOWN_TYPE: i16 = 0;
pub const SQL_CHAR: i16 = 1;
pub const SQL_NUMERIC: i16 = 2;
pub const SQL_DECIMAL: i16 = 3;
pub const SQL_INTEGER: i16 = 4;
pub const SQL_SMALLINT: i16 = 5;
pub const SQL_FLOAT: i16 = 6;
pub const SQL_REAL: i16 = 7;
pub const SQL_DOUBLE: i16 = 8;
pub const SQL_DATETIME: i16 = 9;
pub const SQL_TIME: i16 = 10;
pub const SQL_TIMESTAMP: i16 = 11;
pub const SQL_VARCHAR: i16 = 12;
pub const SQL_TYPE_DATE: i16 = 91;
pub const SQL_TYPE_TIME: i16 = 92;
pub const SQL_TYPE_TIMESTAMP: i16 = 93;
pub const SQL_LONGVARCHAR: i16 = -1;
pub const SQL_BINARY: i16 = -2;
pub const SQL_VARBINARY: i16 = -3;
pub const SQL_LONGVARBINARY: i16 = -4;
pub const SQL_BIGINT: i16 = -5;
pub const SQL_TINYINT: i16 = -6;
pub const SQL_BIT: i16 = -7;
pub const SQL_WCHAR: i16 = -8;
pub const SQL_WVARCHAR: i16 = -9;
pub const SQL_WLONGVARCHAR: i16 = -10;
pub const SQL_GUID: i16 = -11;

// C data types
pub const SQL_C_CHAR: i16 = 1;
pub const SQL_C_WCHAR: i16 = -8;
pub const SQL_C_SBIGINT: i16 = -25;
pub const SQL_C_DOUBLE: i16 = 8;
pub const SQL_C_BIT: i16 = -7;
pub const SQL_C_BINARY: i16 = -2;
pub const SQL_C_TYPE_DATE: i16 = 91;
pub const SQL_C_TYPE_TIME: i16 = 92;
pub const SQL_C_TYPE_TIMESTAMP: i16 = 93;

// Length/indicator sentinels
pub const SQL_NULL_DATA: isize = -1;
pub const SQL_NO_TOTAL: isize = -4;

// Row status array values
pub const SQL_ROW_SUCCESS: u16 = 0;
pub const SQL_ROW_NOROW: u16 = 3;
pub const SQL_ROW_ERROR: u16 = 5;
pub const SQL_ROW_SUCCESS_WITH_INFO: u16 = 6;

// Procedure column types (SQLProcedureColumns COLUMN_TYPE)
pub const SQL_PARAM_TYPE_UNKNOWN: i16 = 0;
pub const SQL_PARAM_INPUT: i16 = 1;
pub const SQL_PARAM_INPUT_OUTPUT: i16 = 2;
pub const SQL_RESULT_COL: i16 = 3;
pub const SQL_PARAM_OUTPUT: i16 = 4;
pub const SQL_RETURN_VALUE: i16 = 5;

// Nullability
pub const SQL_NO_NULLS: i16 = 0;
pub const SQL_NULLABLE: i16 = 1;
pub const SQL_NULLABLE_UNKNOWN: i16 = 2;

// Minimum display sizes for date/time columns ("yyyy-mm-dd", "hh:mm:ss",
// "yyyy-mm-dd hh:mm:ss"). Some drivers report less.
pub const SQL_DATE_MIN_COLUMN_SIZE: usize = 10;
pub const SQL_TIME_MIN_COLUMN_SIZE: usize = 8;
pub const SQL_TIMESTAMP_MIN_COLUMN_SIZE: usize = 19;

// Sizes of the C date/time structs
pub const DATE_STRUCT_SIZE: usize = 6;
pub const TIME_STRUCT_SIZE: usize = 6;
pub const TIMESTAMP_STRUCT_SIZE: usize = 16;

/// Sign, decimal point and terminator added to a numeric column rendered as text.
pub const NUMERIC_TEXT_OVERHEAD: usize = 3;

/// Digits needed to render any f64 in scientific notation.
pub const MIN_NUMERIC_TEXT_DIGITS: usize = 24;

// SQLSTATE codes the engine and the in-memory driver produce
pub const SQLSTATE_GENERAL_ERROR: &str = "HY000";
pub const SQLSTATE_INVALID_CURSOR_STATE: &str = "24000";
pub const SQLSTATE_SYNTAX_ERROR: &str = "42000";
pub const SQLSTATE_RESTRICTED_DATA_TYPE: &str = "07006";
pub const SQLSTATE_STRING_TRUNCATED: &str = "01004";
pub const SQLSTATE_FRACTIONAL_TRUNCATION: &str = "01S07";
pub const SQLSTATE_NUMERIC_OUT_OF_RANGE: &str = "22003";
pub const SQLSTATE_COUNT_FIELD_INCORRECT: &str = "07002";
pub const SQLSTATE_INVALID_DESCRIPTOR_INDEX: &str = "07009";
pub const SQLSTATE_FUNCTION_SEQUENCE: &str = "HY010";
pub const SQLSTATE_CONNECTION_NOT_OPEN: &str = "08003";
