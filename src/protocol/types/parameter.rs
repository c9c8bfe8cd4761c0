//! Parameter descriptors and the owning parameter set.

use crate::error::Result;
use crate::protocol::buffer::Indicator;
use crate::protocol::constants::*;

use super::bind_type::BindType;
use super::column::Nullability;
use super::conversion::{read_value, write_value};
use super::sql_type::SqlType;
use super::value::Value;

/// Direction of a procedure parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamDirection {
    #[default]
    In,
    Out,
    InOut,
}

impl ParamDirection {
    /// Map a catalog `COLUMN_TYPE`. Result columns, return values and unknown
    /// kinds are not parameters and yield `None`.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            SQL_PARAM_INPUT => Some(ParamDirection::In),
            SQL_PARAM_INPUT_OUTPUT => Some(ParamDirection::InOut),
            SQL_PARAM_OUTPUT => Some(ParamDirection::Out),
            _ => None,
        }
    }

    pub fn code(&self) -> i16 {
        match self {
            ParamDirection::In => SQL_PARAM_INPUT,
            ParamDirection::InOut => SQL_PARAM_INPUT_OUTPUT,
            ParamDirection::Out => SQL_PARAM_OUTPUT,
        }
    }

    /// Whether the backend writes a value back.
    pub fn is_output(&self) -> bool {
        matches!(self, ParamDirection::Out | ParamDirection::InOut)
    }
}

/// Lifecycle phase of a parameter descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamPhase {
    /// Bound from the caller's value alone.
    Supplied,
    /// Re-described from catalog metadata.
    Resolved,
}

/// Shape of a parameter after catalog resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedShape {
    pub direction: ParamDirection,
    pub bind_type: BindType,
    pub sql_type: SqlType,
    pub column_size: usize,
    pub decimal_digits: i16,
    pub nullable: Nullability,
}

/// One bound parameter: its declared shape plus an owned value buffer and
/// its length/indicator cell.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// 1-based ordinal.
    pub index: u16,
    pub direction: ParamDirection,
    pub bind_type: BindType,
    pub sql_type: SqlType,
    pub column_size: usize,
    pub decimal_digits: i16,
    pub nullable: Nullability,
    buffer: Vec<u8>,
    indicator: Indicator,
    phase: ParamPhase,
}

impl ParameterDescriptor {
    /// An input parameter in the supplied phase.
    pub fn supplied(
        index: u16,
        bind_type: BindType,
        sql_type: SqlType,
        column_size: usize,
        decimal_digits: i16,
        buffer: Vec<u8>,
        indicator: Indicator,
    ) -> Self {
        Self {
            index,
            direction: ParamDirection::In,
            bind_type,
            sql_type,
            column_size,
            decimal_digits,
            nullable: Nullability::Nullable,
            buffer,
            indicator,
            phase: ParamPhase::Supplied,
        }
    }

    /// Turn this descriptor into a resolved one with a replacement buffer.
    pub(crate) fn into_resolved(
        self,
        shape: ResolvedShape,
        buffer: Vec<u8>,
        indicator: Indicator,
    ) -> Self {
        Self {
            index: self.index,
            direction: shape.direction,
            bind_type: shape.bind_type,
            sql_type: shape.sql_type,
            column_size: shape.column_size,
            decimal_digits: shape.decimal_digits,
            nullable: shape.nullable,
            buffer,
            indicator,
            phase: ParamPhase::Resolved,
        }
    }

    /// Keep the supplied buffer, recording the catalog direction.
    pub(crate) fn into_resolved_input(mut self, nullable: Nullability) -> Self {
        self.direction = ParamDirection::In;
        self.nullable = nullable;
        self.phase = ParamPhase::Resolved;
        self
    }

    pub fn phase(&self) -> ParamPhase {
        self.phase
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Buffer length in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    pub fn set_indicator(&mut self, indicator: Indicator) {
        self.indicator = indicator;
    }

    /// Current buffer content as a value.
    pub fn value(&self) -> Result<Value> {
        read_value(self.bind_type, self.sql_type, &self.buffer, self.indicator)
    }

    /// Write a value into the buffer, updating the indicator. Returns whether
    /// the value was truncated to fit.
    pub fn store(&mut self, value: &Value) -> Result<bool> {
        let outcome = write_value(value, self.bind_type, &mut self.buffer)?;
        self.indicator = outcome.indicator;
        Ok(outcome.truncated)
    }
}

/// Owns every parameter buffer of one execution. Dropping the set releases
/// all of them.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    params: Vec<ParameterDescriptor>,
}

impl ParameterSet {
    pub fn new(params: Vec<ParameterDescriptor>) -> Self {
        Self { params }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ParameterDescriptor> {
        self.params.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ParameterDescriptor> {
        self.params.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParameterDescriptor> {
        self.params.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ParameterDescriptor> {
        self.params.iter_mut()
    }

    pub fn into_inner(self) -> Vec<ParameterDescriptor> {
        self.params
    }

    /// Total bytes held by parameter buffers.
    pub fn bytes_allocated(&self) -> usize {
        self.params.iter().map(ParameterDescriptor::capacity).sum()
    }
}
