//! Parameter marshaler.
//!
//! Caller values are bound in two phases. [`bind_values`] produces descriptors
//! from the values alone. For procedure calls, [`resolve_parameters`] then
//! consumes that set and, guided by catalog metadata, replaces the buffer of
//! every OUT and INOUT parameter with one sized for the declared type. After
//! execution [`read_back`] writes the backend's values into the echoed list.

use tracing::debug;

use crate::config::CharEncoding;
use crate::error::{Error, Result};
use crate::protocol::buffer::{alloc_zeroed, Indicator};
use crate::protocol::catalog::ProcedureParameter;
use crate::protocol::constants::NUMERIC_TEXT_OVERHEAD;
use crate::protocol::decode::{encode_text, encoding_of};
use crate::protocol::types::{
    numeric_text_stride, text_stride, write_value, BindContext, BindType, ParamDirection,
    ParameterDescriptor, ParameterSet, ResolvedShape, SqlType, TypeFamily, Value,
};

/// Column sizes reported for integer parameters.
const INTEGER_PRECISION: usize = 10;
const BIGINT_PRECISION: usize = 19;
/// Column size reported for double parameters.
const DOUBLE_PRECISION: usize = 15;
/// `yyyy-mm-dd hh:mm:ss.fffffffff`
const TIMESTAMP_PRECISION: usize = 29;
const TIMESTAMP_SCALE: i16 = 9;

/// Bind caller values by their native type.
pub fn bind_values(values: &[Value], encoding: CharEncoding) -> Result<ParameterSet> {
    let params = values
        .iter()
        .enumerate()
        .map(|(i, value)| bind_value(i as u16 + 1, value, encoding))
        .collect::<Result<Vec<_>>>()?;
    Ok(ParameterSet::new(params))
}

fn bind_value(index: u16, value: &Value, encoding: CharEncoding) -> Result<ParameterDescriptor> {
    let (bind_type, sql_type, column_size, decimal_digits, capacity) = match value {
        Value::Null => (BindType::Char, SqlType::Varchar, 1, 0, 0),
        Value::Text(s) => {
            let bind_type = BindType::text(encoding);
            let sql_type = match encoding {
                CharEncoding::Narrow => SqlType::Varchar,
                CharEncoding::Wide => SqlType::WVarchar,
            };
            let encoded_len = encode_text(s, encoding).len();
            (
                bind_type,
                sql_type,
                s.chars().count().max(1),
                0,
                encoded_len + encoding.unit_width(),
            )
        }
        Value::Integer(_) => (BindType::SBigInt, SqlType::Integer, INTEGER_PRECISION, 0, 8),
        Value::BigInt(_) => (BindType::SBigInt, SqlType::BigInt, BIGINT_PRECISION, 0, 8),
        Value::Double(_) => (BindType::Double, SqlType::Double, DOUBLE_PRECISION, 0, 8),
        Value::Boolean(_) => (BindType::Bit, SqlType::Bit, 1, 0, 1),
        Value::Binary(bytes) => (
            BindType::Binary,
            SqlType::Varbinary,
            bytes.len().max(1),
            0,
            bytes.len(),
        ),
        Value::Timestamp(_) => (
            BindType::Timestamp,
            SqlType::Timestamp,
            TIMESTAMP_PRECISION,
            TIMESTAMP_SCALE,
            BindType::Timestamp.fixed_size().unwrap_or(0),
        ),
    };

    let mut buffer = alloc_zeroed(capacity, "parameter buffer")?;
    let outcome = write_value(value, bind_type, &mut buffer)?;
    if outcome.truncated {
        return Err(Error::DataTruncated {
            column: format!("parameter {}", index),
            row: 0,
        });
    }

    Ok(ParameterDescriptor::supplied(
        index,
        bind_type,
        sql_type,
        column_size,
        decimal_digits,
        buffer,
        outcome.indicator,
    ))
}

/// Fail unless the caller supplied exactly `expected` values.
pub fn check_parameter_count(expected: usize, supplied: usize) -> Result<()> {
    if expected != supplied {
        return Err(Error::protocol_mismatch(format!(
            "statement expects {} parameter(s), {} supplied",
            expected, supplied
        )));
    }
    Ok(())
}

/// Re-describe supplied parameters from catalog metadata.
///
/// INPUT parameters keep their buffers. OUTPUT and INPUT_OUTPUT parameters
/// get a new buffer no smaller than the declared type's largest
/// representation; INOUT buffers are refilled from the caller's value.
pub fn resolve_parameters(
    supplied: ParameterSet,
    catalog: &[ProcedureParameter],
    values: &[Value],
    ctx: &BindContext,
) -> Result<ParameterSet> {
    check_parameter_count(catalog.len(), supplied.len())?;
    check_parameter_count(catalog.len(), values.len())?;

    let params = supplied
        .into_inner()
        .into_iter()
        .zip(catalog.iter().zip(values))
        .map(|(desc, (meta, value))| resolve_parameter(desc, meta, value, ctx))
        .collect::<Result<Vec<_>>>()?;
    Ok(ParameterSet::new(params))
}

fn resolve_parameter(
    desc: ParameterDescriptor,
    meta: &ProcedureParameter,
    value: &Value,
    ctx: &BindContext,
) -> Result<ParameterDescriptor> {
    if meta.direction == ParamDirection::In {
        return Ok(desc.into_resolved_input(meta.nullable));
    }

    let (bind_type, size) = output_buffer_plan(meta, ctx);
    let capacity = size.max(desc.capacity());
    let mut buffer = alloc_zeroed(capacity, "output parameter buffer")?;

    let indicator = if meta.direction == ParamDirection::InOut {
        let outcome = write_value(value, bind_type, &mut buffer)?;
        if outcome.truncated {
            return Err(Error::DataTruncated {
                column: meta.name.clone(),
                row: 0,
            });
        }
        outcome.indicator
    } else {
        Indicator::Null
    };

    debug!(
        index = desc.index,
        name = %meta.name,
        direction = ?meta.direction,
        bind_type = %bind_type,
        from = desc.capacity(),
        to = capacity,
        "resolved output parameter"
    );

    let shape = ResolvedShape {
        direction: meta.direction,
        bind_type,
        sql_type: meta.sql_type,
        column_size: meta.column_size,
        decimal_digits: meta.decimal_digits,
        nullable: meta.nullable,
    };
    Ok(desc.into_resolved(shape, buffer, indicator))
}

/// Bind type and buffer size for an output parameter of the declared type.
pub fn output_buffer_plan(meta: &ProcedureParameter, ctx: &BindContext) -> (BindType, usize) {
    let size = meta.column_size;
    match meta.sql_type.family() {
        TypeFamily::Numeric => match meta.sql_type {
            SqlType::Decimal | SqlType::Numeric if size == 0 => {
                (BindType::Char, numeric_text_stride(0))
            }
            SqlType::Decimal | SqlType::Numeric => {
                (BindType::Char, size + NUMERIC_TEXT_OVERHEAD)
            }
            _ => (BindType::Double, 8),
        },
        TypeFamily::Integral | TypeFamily::BigInteger => (BindType::SBigInt, 8),
        TypeFamily::Boolean => (BindType::Bit, 1),
        TypeFamily::Temporal => (
            BindType::Timestamp,
            BindType::Timestamp.fixed_size().unwrap_or(0),
        ),
        TypeFamily::Binary => {
            let size = if size == 0 { ctx.long_data_threshold } else { size };
            (BindType::Binary, size)
        }
        TypeFamily::Character => {
            let bind_type = if meta.sql_type.is_wide() {
                BindType::WChar
            } else {
                BindType::text(ctx.encoding)
            };
            let size = if size == 0 { ctx.long_data_threshold } else { size };
            (bind_type, text_stride(size, encoding_of(bind_type)))
        }
    }
}

/// Echoed parameter list: the caller's values, with every OUT and INOUT
/// position replaced by what the backend wrote.
pub fn read_back(params: &ParameterSet, values: Vec<Value>) -> Result<Vec<Value>> {
    params
        .iter()
        .zip(values)
        .map(|(desc, value)| {
            if desc.direction.is_output() {
                desc.value()
            } else {
                Ok(value)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionOptions;
    use crate::protocol::handle::DriverCapabilities;
    use crate::protocol::types::{Nullability, ParamPhase};
    use chrono::{TimeZone, Utc};

    fn ctx() -> BindContext {
        BindContext::new(&SessionOptions::default(), DriverCapabilities::default())
    }

    fn meta(direction: ParamDirection, sql_type: SqlType, size: usize) -> ProcedureParameter {
        ProcedureParameter {
            name: "p".to_string(),
            direction,
            sql_type,
            column_size: size,
            decimal_digits: 2,
            nullable: Nullability::Nullable,
        }
    }

    #[test]
    fn test_bind_values_by_native_type() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let set = bind_values(
            &[
                Value::from("abc"),
                Value::Integer(1),
                Value::Double(0.5),
                Value::Boolean(true),
                Value::Null,
                Value::Binary(vec![1, 2, 3]),
                Value::Timestamp(ts),
            ],
            CharEncoding::Narrow,
        )
        .unwrap();

        let text = set.get(0).unwrap();
        assert_eq!(text.bind_type, BindType::Char);
        assert_eq!(text.capacity(), 4);
        assert_eq!(text.indicator(), Indicator::Length(3));

        assert_eq!(set.get(1).unwrap().bind_type, BindType::SBigInt);
        assert_eq!(set.get(2).unwrap().bind_type, BindType::Double);
        assert_eq!(set.get(3).unwrap().bind_type, BindType::Bit);

        let null = set.get(4).unwrap();
        assert_eq!(null.capacity(), 0);
        assert_eq!(null.indicator(), Indicator::Null);

        assert_eq!(set.get(5).unwrap().indicator(), Indicator::Length(3));
        let stamp = set.get(6).unwrap();
        assert_eq!(stamp.column_size, 29);
        assert_eq!(stamp.value().unwrap(), Value::Timestamp(ts));
        assert!(set.iter().all(|p| p.phase() == ParamPhase::Supplied));
        assert_eq!(set.get(6).unwrap().index, 7);
    }

    #[test]
    fn test_wide_text_parameter() {
        let set = bind_values(&[Value::from("\u{e9}t\u{e9}")], CharEncoding::Wide).unwrap();
        let p = set.get(0).unwrap();
        assert_eq!(p.bind_type, BindType::WChar);
        assert_eq!(p.sql_type, SqlType::WVarchar);
        assert_eq!(p.capacity(), 8);
        assert_eq!(p.value().unwrap(), Value::from("\u{e9}t\u{e9}"));
    }

    #[test]
    fn test_parameter_count_mismatch() {
        assert!(check_parameter_count(2, 2).is_ok());
        assert!(matches!(
            check_parameter_count(2, 1),
            Err(Error::ProtocolMismatch { .. })
        ));
    }

    #[test]
    fn test_resolve_grows_output_buffers() {
        let values = vec![Value::from("x"), Value::Null, Value::Integer(4)];
        let supplied = bind_values(&values, CharEncoding::Narrow).unwrap();
        let catalog = vec![
            meta(ParamDirection::In, SqlType::Varchar, 10),
            meta(ParamDirection::Out, SqlType::Varchar, 50),
            meta(ParamDirection::InOut, SqlType::Numeric, 12),
        ];
        let resolved = resolve_parameters(supplied, &catalog, &values, &ctx()).unwrap();

        let input = resolved.get(0).unwrap();
        assert_eq!(input.capacity(), 2);
        assert_eq!(input.phase(), ParamPhase::Resolved);

        let out = resolved.get(1).unwrap();
        assert_eq!(out.direction, ParamDirection::Out);
        assert_eq!(out.capacity(), 201);
        assert_eq!(out.indicator(), Indicator::Null);

        let inout = resolved.get(2).unwrap();
        assert_eq!(inout.bind_type, BindType::Char);
        assert_eq!(inout.capacity(), 15);
        assert_eq!(inout.decimal_digits, 2);
        assert_eq!(inout.value().unwrap(), Value::Double(4.0));
    }

    #[test]
    fn test_resolve_never_shrinks() {
        let long = "y".repeat(100);
        let values = vec![Value::from(long.as_str())];
        let supplied = bind_values(&values, CharEncoding::Narrow).unwrap();
        let catalog = vec![meta(ParamDirection::InOut, SqlType::Varchar, 5)];
        let resolved = resolve_parameters(supplied, &catalog, &values, &ctx()).unwrap();
        assert_eq!(resolved.get(0).unwrap().capacity(), 101);
        assert_eq!(resolved.get(0).unwrap().value().unwrap(), Value::from(long.as_str()));
    }

    #[test]
    fn test_read_back_keeps_inputs() {
        let values = vec![Value::Integer(1), Value::Null];
        let supplied = bind_values(&values, CharEncoding::Narrow).unwrap();
        let catalog = vec![
            meta(ParamDirection::In, SqlType::Integer, 10),
            meta(ParamDirection::Out, SqlType::Integer, 10),
        ];
        let mut resolved = resolve_parameters(supplied, &catalog, &values, &ctx()).unwrap();
        resolved.get_mut(0).unwrap().store(&Value::Integer(99)).unwrap();
        resolved.get_mut(1).unwrap().store(&Value::Integer(42)).unwrap();

        let echoed = read_back(&resolved, values).unwrap();
        assert_eq!(echoed, vec![Value::Integer(1), Value::Integer(42)]);
    }

    #[test]
    fn test_output_plans() {
        let c = ctx();
        assert_eq!(
            output_buffer_plan(&meta(ParamDirection::Out, SqlType::Float, 15), &c),
            (BindType::Double, 8)
        );
        assert_eq!(
            output_buffer_plan(&meta(ParamDirection::Out, SqlType::Varbinary, 16), &c),
            (BindType::Binary, 16)
        );
        assert_eq!(
            output_buffer_plan(&meta(ParamDirection::Out, SqlType::WVarchar, 10), &c),
            (BindType::WChar, 42)
        );
        assert_eq!(
            output_buffer_plan(&meta(ParamDirection::Out, SqlType::Date, 10), &c),
            (BindType::Timestamp, 16)
        );
    }
}
