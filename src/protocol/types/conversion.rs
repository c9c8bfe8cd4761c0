//! Type conversion matrix.
//!
//! Maps declared backend types onto bind types and strides, and converts
//! between bound bytes, stored cells and [`Value`]s. Every function here is
//! pure; the same rules serve result columns and procedure parameters.
//!
//! | Backend family | Bind type | Value |
//! |----------------|-----------|-------|
//! | TINYINT, SMALLINT, INTEGER | `SBigInt` | `Integer` |
//! | BIGINT | `SBigInt` | `BigInt` |
//! | DECIMAL, NUMERIC, FLOAT, REAL, DOUBLE | `Double`, or `Char` text | `Double` |
//! | BIT | `Bit` | `Boolean` |
//! | DATE, TIME, TIMESTAMP | date/time structs | `Timestamp` (UTC) |
//! | BINARY, VARBINARY, LONGVARBINARY | `Binary` | `Binary` |
//! | character and unknown types | `Char` or `WChar` | `Text` |

use bytes::Bytes;

use crate::config::{CharEncoding, SessionOptions};
use crate::error::{Error, Result};
use crate::protocol::buffer::{Indicator, ReadBuffer, WriteBuffer};
use crate::protocol::constants::{MIN_NUMERIC_TEXT_DIGITS, NUMERIC_TEXT_OVERHEAD};
use crate::protocol::decode::{
    decode_text, encode_text, encoding_of, format_numeric, parse_bool_text,
    parse_datetime_text, parse_integer_text, parse_numeric_text, read_date_struct,
    read_time_struct, read_timestamp_struct, text_room, write_date_struct, write_time_struct,
    write_timestamp_struct, DateTimeFields,
};
use crate::protocol::handle::DriverCapabilities;

use super::bind_type::BindType;
use super::sql_type::{SqlType, TypeFamily};
use super::stored::Cell;
use super::value::Value;

/// Inputs to bind decisions that come from the session and the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindContext {
    pub encoding: CharEncoding,
    pub supports_double_bind: bool,
    pub long_data_threshold: usize,
    pub chunk_size: usize,
}

impl BindContext {
    pub fn new(options: &SessionOptions, capabilities: DriverCapabilities) -> Self {
        Self {
            encoding: options.encoding,
            supports_double_bind: capabilities.supports_double_bind,
            long_data_threshold: options.long_data_threshold,
            chunk_size: options.chunk_size,
        }
    }

    /// Stride used for long columns: one chunk, rounded to a whole wide unit.
    pub fn chunk_stride(&self) -> usize {
        self.chunk_size + self.chunk_size % 2
    }

    fn is_long(&self, column_size: usize) -> bool {
        column_size == 0 || column_size > self.long_data_threshold
    }
}

/// Bind decision for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindPlan {
    pub bind_type: BindType,
    pub stride: usize,
    pub long_data: bool,
}

/// Bytes needed for `column_size` characters in the worst case, plus a
/// terminator unit.
pub fn text_stride(column_size: usize, encoding: CharEncoding) -> usize {
    (column_size * encoding.max_units_per_char() + 1) * encoding.unit_width()
}

/// Bytes needed for a numeric rendered as text: digits, sign, decimal point
/// and terminator.
pub fn numeric_text_stride(column_size: usize) -> usize {
    column_size.max(MIN_NUMERIC_TEXT_DIGITS) + NUMERIC_TEXT_OVERHEAD
}

/// Choose the bind type and stride for a described column.
///
/// `column_size` must already be clamped to the type's minimum.
pub fn plan_column(sql_type: SqlType, column_size: usize, ctx: &BindContext) -> BindPlan {
    let fixed = |bind_type: BindType| BindPlan {
        bind_type,
        stride: bind_type.fixed_size().unwrap_or(0),
        long_data: false,
    };

    match sql_type.family() {
        TypeFamily::Integral | TypeFamily::BigInteger => fixed(BindType::SBigInt),
        TypeFamily::Numeric if ctx.supports_double_bind => fixed(BindType::Double),
        TypeFamily::Numeric => BindPlan {
            bind_type: BindType::Char,
            stride: numeric_text_stride(column_size),
            long_data: false,
        },
        TypeFamily::Boolean => fixed(BindType::Bit),
        TypeFamily::Temporal => match sql_type {
            SqlType::Date => fixed(BindType::Date),
            SqlType::Time => fixed(BindType::Time),
            _ => fixed(BindType::Timestamp),
        },
        TypeFamily::Binary if ctx.is_long(column_size) => BindPlan {
            bind_type: BindType::Binary,
            stride: ctx.chunk_stride(),
            long_data: true,
        },
        TypeFamily::Binary => BindPlan {
            bind_type: BindType::Binary,
            stride: column_size,
            long_data: false,
        },
        TypeFamily::Character => {
            let bind_type = if sql_type.is_wide() {
                BindType::WChar
            } else {
                BindType::text(ctx.encoding)
            };
            if ctx.is_long(column_size) {
                BindPlan {
                    bind_type,
                    stride: ctx.chunk_stride(),
                    long_data: true,
                }
            } else {
                BindPlan {
                    bind_type,
                    stride: text_stride(column_size, encoding_of(bind_type)),
                    long_data: false,
                }
            }
        }
    }
}

/// Decode bound bytes into a cell.
///
/// For variable-length bind types `bytes` is exactly the value, without
/// terminator. For fixed types it is the slot.
pub fn read_cell(bind: BindType, bytes: &[u8]) -> Result<Cell> {
    let mut buf = ReadBuffer::new(bytes);
    Ok(match bind {
        BindType::Char | BindType::WChar => Cell::Text(decode_text(bytes, bind)?),
        BindType::Binary => Cell::Bytes(Bytes::copy_from_slice(bytes)),
        BindType::SBigInt => Cell::Integer(buf.read_i64_ne()?),
        BindType::Double => Cell::Double(buf.read_f64_ne()?),
        BindType::Bit => Cell::Bit(buf.read_u8()? != 0),
        BindType::Date => Cell::DateTime(read_date_struct(&mut buf)?),
        BindType::Time => Cell::DateTime(read_time_struct(&mut buf)?),
        BindType::Timestamp => Cell::DateTime(read_timestamp_struct(&mut buf)?),
    })
}

/// Convert a stored cell into a value, guided by the declared type.
///
/// Text cells of non-character types are the textual fallback and are parsed
/// without regard to locale.
pub fn cell_to_value(cell: &Cell, sql_type: SqlType) -> Result<Value> {
    let family = sql_type.family();
    Ok(match cell {
        Cell::Null => Value::Null,
        Cell::Integer(v) => match family {
            TypeFamily::BigInteger => Value::BigInt(*v),
            TypeFamily::Boolean => Value::Boolean(*v != 0),
            TypeFamily::Numeric => Value::Double(*v as f64),
            _ => Value::Integer(*v),
        },
        Cell::Double(v) => Value::Double(*v),
        Cell::Bit(b) => Value::Boolean(*b),
        Cell::Text(s) => match family {
            TypeFamily::Integral => Value::Integer(parse_integer_text(s)?),
            TypeFamily::BigInteger => Value::BigInt(parse_integer_text(s)?),
            TypeFamily::Numeric => Value::Double(parse_numeric_text(s)?),
            TypeFamily::Boolean => Value::Boolean(parse_bool_text(s)?),
            TypeFamily::Temporal => Value::Timestamp(parse_datetime_text(s)?),
            TypeFamily::Binary | TypeFamily::Character => Value::Text(s.clone()),
        },
        Cell::Bytes(b) => Value::Binary(b.to_vec()),
        Cell::DateTime(fields) => Value::Timestamp(fields.to_utc()?),
    })
}

/// Result of writing a value into a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub indicator: Indicator,
    /// The slot holds less than the full value.
    pub truncated: bool,
}

impl WriteOutcome {
    fn complete(len: usize) -> Self {
        Self {
            indicator: Indicator::Length(len),
            truncated: false,
        }
    }
}

/// Text a value is rendered as when bound to a character buffer.
pub fn render_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(s.clone()),
        Value::Integer(v) | Value::BigInt(v) => Some(v.to_string()),
        Value::Double(v) => Some(format_numeric(*v)),
        Value::Boolean(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::Binary(bytes) => Some(bytes.iter().map(|b| format!("{:02X}", b)).collect()),
    }
}

/// Encoded byte length of a value for a variable-length bind type.
pub fn encoded_len(value: &Value, bind: BindType) -> usize {
    match (bind, value) {
        (BindType::Binary, Value::Binary(bytes)) => bytes.len(),
        (BindType::Binary, other) => render_text(other).map_or(0, |s| s.len()),
        (BindType::Char | BindType::WChar, other) => render_text(other)
            .map_or(0, |s| encode_text(&s, encoding_of(bind)).len()),
        (fixed, _) => fixed.fixed_size().unwrap_or(0),
    }
}

fn conversion_error(value: &Value, bind: BindType) -> Error {
    Error::type_conversion(format!("cannot bind {} value as {}", value.type_name(), bind))
}

fn to_i64_for_bind(value: &Value) -> Result<(i64, bool)> {
    match value {
        Value::Integer(v) | Value::BigInt(v) => Ok((*v, false)),
        Value::Boolean(b) => Ok((i64::from(*b), false)),
        Value::Double(v) => {
            if !v.is_finite() || *v < i64::MIN as f64 || *v >= i64::MAX as f64 {
                return Err(Error::type_conversion(format!("{} out of BIGINT range", v)));
            }
            Ok((v.trunc() as i64, v.fract() != 0.0))
        }
        Value::Text(s) => match parse_integer_text(s) {
            Ok(v) => Ok((v, false)),
            Err(_) => to_i64_for_bind(&Value::Double(parse_numeric_text(s)?)),
        },
        other => Err(conversion_error(other, BindType::SBigInt)),
    }
}

fn to_f64_for_bind(value: &Value) -> Result<f64> {
    match value {
        Value::Double(v) => Ok(*v),
        Value::Integer(v) | Value::BigInt(v) => Ok(*v as f64),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => parse_numeric_text(s),
        other => Err(conversion_error(other, BindType::Double)),
    }
}

fn to_bool_for_bind(value: &Value) -> Result<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Integer(v) | Value::BigInt(v) => Ok(*v != 0),
        Value::Double(v) => Ok(*v != 0.0),
        Value::Text(s) => parse_bool_text(s),
        other => Err(conversion_error(other, BindType::Bit)),
    }
}

fn to_fields_for_bind(value: &Value, bind: BindType) -> Result<DateTimeFields> {
    match value {
        Value::Timestamp(ts) => DateTimeFields::from_utc(ts),
        Value::Text(s) => DateTimeFields::from_utc(&parse_datetime_text(s)?),
        other => Err(conversion_error(other, bind)),
    }
}

/// Write a value into a bound slot using the bind type's C representation.
///
/// Character data is terminated when the slot has room for it; the indicator
/// always reports the full byte length of the value.
pub fn write_value(value: &Value, bind: BindType, slot: &mut [u8]) -> Result<WriteOutcome> {
    if value.is_null() {
        return Ok(WriteOutcome {
            indicator: Indicator::Null,
            truncated: false,
        });
    }

    match bind {
        BindType::Char | BindType::WChar => {
            let text = render_text(value).unwrap_or_default();
            let encoded = encode_text(&text, encoding_of(bind));
            let copied = encoded.len().min(text_room(slot.len(), bind));
            slot[..copied].copy_from_slice(&encoded[..copied]);
            let terminator = bind.terminator_len();
            if slot.len() >= copied + terminator {
                slot[copied..copied + terminator].fill(0);
            }
            Ok(WriteOutcome {
                indicator: Indicator::Length(encoded.len()),
                truncated: copied < encoded.len(),
            })
        }
        BindType::Binary => {
            let bytes = match value {
                Value::Binary(bytes) => bytes.clone(),
                other => render_text(other).unwrap_or_default().into_bytes(),
            };
            let copied = bytes.len().min(slot.len());
            slot[..copied].copy_from_slice(&bytes[..copied]);
            Ok(WriteOutcome {
                indicator: Indicator::Length(bytes.len()),
                truncated: copied < bytes.len(),
            })
        }
        BindType::SBigInt => {
            let (v, fractional) = to_i64_for_bind(value)?;
            WriteBuffer::new(slot).write_i64_ne(v)?;
            Ok(WriteOutcome {
                indicator: Indicator::Length(8),
                truncated: fractional,
            })
        }
        BindType::Double => {
            WriteBuffer::new(slot).write_f64_ne(to_f64_for_bind(value)?)?;
            Ok(WriteOutcome::complete(8))
        }
        BindType::Bit => {
            WriteBuffer::new(slot).write_u8(u8::from(to_bool_for_bind(value)?))?;
            Ok(WriteOutcome::complete(1))
        }
        BindType::Date => {
            let fields = to_fields_for_bind(value, bind)?;
            write_date_struct(&mut WriteBuffer::new(slot), &fields)?;
            let has_time = fields.hour != 0
                || fields.minute != 0
                || fields.second != 0
                || fields.fraction != 0;
            Ok(WriteOutcome {
                indicator: Indicator::Length(bind.fixed_size().unwrap_or(0)),
                truncated: has_time,
            })
        }
        BindType::Time => {
            let fields = to_fields_for_bind(value, bind)?;
            write_time_struct(&mut WriteBuffer::new(slot), &fields)?;
            Ok(WriteOutcome {
                indicator: Indicator::Length(bind.fixed_size().unwrap_or(0)),
                truncated: fields.fraction != 0,
            })
        }
        BindType::Timestamp => {
            let fields = to_fields_for_bind(value, bind)?;
            write_timestamp_struct(&mut WriteBuffer::new(slot), &fields)?;
            Ok(WriteOutcome::complete(bind.fixed_size().unwrap_or(0)))
        }
    }
}

/// Read a value back out of a slot written by [`write_value`] or a driver.
///
/// Variable-length data beyond the slot is not recovered; callers size
/// parameter buffers so that cannot happen.
pub fn read_value(
    bind: BindType,
    sql_type: SqlType,
    slot: &[u8],
    indicator: Indicator,
) -> Result<Value> {
    let len = match indicator {
        Indicator::Null => return Ok(Value::Null),
        Indicator::NoTotal => slot.len(),
        Indicator::Length(n) => n,
    };
    let bytes = if bind.is_variable() {
        let room = if bind.is_character() {
            text_room(slot.len(), bind)
        } else {
            slot.len()
        };
        &slot[..len.min(room)]
    } else {
        slot
    };
    cell_to_value(&read_cell(bind, bytes)?, sql_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ctx() -> BindContext {
        BindContext::new(&SessionOptions::default(), DriverCapabilities::default())
    }

    #[test]
    fn test_integral_and_bigint_plans() {
        for t in [SqlType::TinyInt, SqlType::SmallInt, SqlType::Integer, SqlType::BigInt] {
            let plan = plan_column(t, 10, &ctx());
            assert_eq!(plan.bind_type, BindType::SBigInt);
            assert_eq!(plan.stride, 8);
        }
        assert_eq!(
            cell_to_value(&Cell::Integer(9_007_199_254_740_993), SqlType::BigInt).unwrap(),
            Value::BigInt(9_007_199_254_740_993)
        );
        assert_eq!(
            cell_to_value(&Cell::Integer(5), SqlType::SmallInt).unwrap(),
            Value::Integer(5)
        );
    }

    #[test]
    fn test_numeric_plan_depends_on_double_support() {
        let with_double = plan_column(SqlType::Decimal, 10, &ctx());
        assert_eq!(with_double.bind_type, BindType::Double);

        let mut no_double = ctx();
        no_double.supports_double_bind = false;
        let plan = plan_column(SqlType::Numeric, 30, &no_double);
        assert_eq!(plan.bind_type, BindType::Char);
        assert_eq!(plan.stride, 33);
        assert_eq!(plan_column(SqlType::Real, 7, &no_double).stride, 27);

        assert_eq!(
            cell_to_value(&Cell::Text("-12.50".to_string()), SqlType::Numeric).unwrap(),
            Value::Double(-12.5)
        );
    }

    #[test]
    fn test_character_strides() {
        let plan = plan_column(SqlType::Varchar, 10, &ctx());
        assert_eq!(plan, BindPlan {
            bind_type: BindType::Char,
            stride: 41,
            long_data: false
        });

        let wide = plan_column(SqlType::WVarchar, 10, &ctx());
        assert_eq!(wide.bind_type, BindType::WChar);
        assert_eq!(wide.stride, 42);

        let long = plan_column(SqlType::LongVarchar, 0, &ctx());
        assert!(long.long_data);
        assert_eq!(long.stride, ctx().chunk_stride());

        let unknown = plan_column(SqlType::Other(-360), 5, &ctx());
        assert_eq!(unknown.bind_type, BindType::Char);
    }

    #[test]
    fn test_binary_and_temporal_plans() {
        assert_eq!(plan_column(SqlType::Varbinary, 16, &ctx()).stride, 16);
        assert!(plan_column(SqlType::LongVarbinary, 0, &ctx()).long_data);
        assert!(plan_column(SqlType::Varbinary, 9000, &ctx()).long_data);
        assert_eq!(plan_column(SqlType::Date, 10, &ctx()).bind_type, BindType::Date);
        assert_eq!(plan_column(SqlType::Time, 8, &ctx()).stride, 6);
        assert_eq!(plan_column(SqlType::Timestamp, 19, &ctx()).stride, 16);
        assert_eq!(plan_column(SqlType::Bit, 1, &ctx()).bind_type, BindType::Bit);
    }

    #[test]
    fn test_write_then_read_text_truncates_to_slot() {
        let mut slot = [0xAAu8; 6];
        let outcome = write_value(&Value::from("abcdefgh"), BindType::Char, &mut slot).unwrap();
        assert!(outcome.truncated);
        assert_eq!(outcome.indicator, Indicator::Length(8));
        assert_eq!(&slot, b"abcde\0");

        let value = read_value(BindType::Char, SqlType::Varchar, &slot, outcome.indicator).unwrap();
        assert_eq!(value, Value::from("abcde"));
    }

    #[test]
    fn test_write_double_into_bigint_reports_fraction() {
        let mut slot = [0u8; 8];
        let outcome = write_value(&Value::Double(2.75), BindType::SBigInt, &mut slot).unwrap();
        assert!(outcome.truncated);
        assert_eq!(
            read_value(BindType::SBigInt, SqlType::Integer, &slot, outcome.indicator).unwrap(),
            Value::Integer(2)
        );
    }

    #[test]
    fn test_null_is_never_a_sentinel() {
        let mut slot = [0u8; 8];
        let outcome = write_value(&Value::Null, BindType::SBigInt, &mut slot).unwrap();
        assert_eq!(outcome.indicator, Indicator::Null);
        assert_eq!(
            read_value(BindType::SBigInt, SqlType::Integer, &slot, outcome.indicator).unwrap(),
            Value::Null
        );
        assert_eq!(cell_to_value(&Cell::Null, SqlType::Bit).unwrap(), Value::Null);
    }

    #[test]
    fn test_timestamp_and_wide_values() {
        let ts = Utc.with_ymd_and_hms(2023, 7, 1, 12, 0, 1).unwrap();
        let mut slot = [0u8; 16];
        let outcome = write_value(&Value::Timestamp(ts), BindType::Timestamp, &mut slot).unwrap();
        assert_eq!(
            read_value(BindType::Timestamp, SqlType::Timestamp, &slot, outcome.indicator).unwrap(),
            Value::Timestamp(ts)
        );

        let mut wide = [0u8; 22];
        let outcome = write_value(&Value::from("h\u{e9}llo"), BindType::WChar, &mut wide).unwrap();
        assert_eq!(outcome.indicator, Indicator::Length(10));
        assert_eq!(
            read_value(BindType::WChar, SqlType::WVarchar, &wide, outcome.indicator).unwrap(),
            Value::from("h\u{e9}llo")
        );
    }

    #[test]
    fn test_numeric_rendered_as_text() {
        let mut slot = [0u8; 27];
        let outcome = write_value(&Value::Double(-3.25), BindType::Char, &mut slot).unwrap();
        assert_eq!(outcome.indicator, Indicator::Length(5));
        assert_eq!(
            read_value(BindType::Char, SqlType::Decimal, &slot, outcome.indicator).unwrap(),
            Value::Double(-3.25)
        );
    }

    #[test]
    fn test_write_rejects_impossible_conversions() {
        let mut slot = [0u8; 8];
        assert!(matches!(
            write_value(&Value::Binary(vec![1]), BindType::Double, &mut slot),
            Err(Error::TypeConversion { .. })
        ));
    }
}
