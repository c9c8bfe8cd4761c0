//! Buffer primitives for bound column and parameter memory.
//!
//! Drivers write values into caller-owned buffers in the platform's native
//! byte order; [`ReadBuffer`] and [`WriteBuffer`] are cursors over one such
//! slot. [`Indicator`] is the length-or-indicator cell that travels with
//! every slot.

use std::panic::Location;

use crate::error::{Error, Result};
use crate::protocol::constants::{SQL_NO_TOTAL, SQL_NULL_DATA};

/// Length/indicator value paired with a bound slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// The value is NULL.
    Null,
    /// The driver does not know how many bytes remain.
    NoTotal,
    /// Total byte length of the value, which may exceed the slot.
    Length(usize),
}

impl Indicator {
    /// Decode a raw `SQLLEN` cell. Unknown negative values are treated as NULL.
    pub fn from_raw(raw: isize) -> Self {
        match raw {
            SQL_NO_TOTAL => Indicator::NoTotal,
            n if n >= 0 => Indicator::Length(n as usize),
            _ => Indicator::Null,
        }
    }

    pub fn to_raw(self) -> isize {
        match self {
            Indicator::Null => SQL_NULL_DATA,
            Indicator::NoTotal => SQL_NO_TOTAL,
            Indicator::Length(n) => n as isize,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Indicator::Null)
    }
}

/// Allocate a zero-filled buffer without aborting on allocation failure.
pub fn alloc_zeroed(len: usize, purpose: &'static str) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| Error::allocation(len, purpose))?;
    data.resize(len, 0);
    Ok(data)
}

/// A cursor for reading native values out of a bound slot.
pub struct ReadBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ReadBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Get remaining bytes count.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Get current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Check if there are enough bytes remaining.
    #[track_caller]
    fn ensure_remaining(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                available: self.remaining(),
                location: Location::caller(),
            });
        }
        Ok(())
    }

    #[track_caller]
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure_remaining(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    #[track_caller]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    #[track_caller]
    pub fn read_i16_ne(&mut self) -> Result<i16> {
        Ok(i16::from_ne_bytes(self.take()?))
    }

    #[track_caller]
    pub fn read_u16_ne(&mut self) -> Result<u16> {
        Ok(u16::from_ne_bytes(self.take()?))
    }

    #[track_caller]
    pub fn read_u32_ne(&mut self) -> Result<u32> {
        Ok(u32::from_ne_bytes(self.take()?))
    }

    #[track_caller]
    pub fn read_i64_ne(&mut self) -> Result<i64> {
        Ok(i64::from_ne_bytes(self.take()?))
    }

    #[track_caller]
    pub fn read_f64_ne(&mut self) -> Result<f64> {
        Ok(f64::from_ne_bytes(self.take()?))
    }

    /// Read `len` raw bytes.
    #[track_caller]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure_remaining(len)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Skip bytes.
    #[track_caller]
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.ensure_remaining(count)?;
        self.pos += count;
        Ok(())
    }
}

/// A cursor for writing native values into a bound slot.
pub struct WriteBuffer<'a> {
    data: &'a mut [u8],
    pos: usize,
}

impl<'a> WriteBuffer<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    #[track_caller]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.remaining() < bytes.len() {
            return Err(Error::BufferTooSmall {
                needed: bytes.len(),
                available: self.remaining(),
                location: Location::caller(),
            });
        }
        self.data[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    #[track_caller]
    pub fn write_u8(&mut self, val: u8) -> Result<()> {
        self.write_bytes(&[val])
    }

    #[track_caller]
    pub fn write_i16_ne(&mut self, val: i16) -> Result<()> {
        self.write_bytes(&val.to_ne_bytes())
    }

    #[track_caller]
    pub fn write_u16_ne(&mut self, val: u16) -> Result<()> {
        self.write_bytes(&val.to_ne_bytes())
    }

    #[track_caller]
    pub fn write_u32_ne(&mut self, val: u32) -> Result<()> {
        self.write_bytes(&val.to_ne_bytes())
    }

    #[track_caller]
    pub fn write_i64_ne(&mut self, val: i64) -> Result<()> {
        self.write_bytes(&val.to_ne_bytes())
    }

    #[track_caller]
    pub fn write_f64_ne(&mut self, val: f64) -> Result<()> {
        self.write_bytes(&val.to_ne_bytes())
    }

    /// Write padding zeros.
    #[track_caller]
    pub fn write_zeros(&mut self, count: usize) -> Result<()> {
        if self.remaining() < count {
            return Err(Error::BufferTooSmall {
                needed: count,
                available: self.remaining(),
                location: Location::caller(),
            });
        }
        self.data[self.pos..self.pos + count].fill(0);
        self.pos += count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_raw_values() {
        assert_eq!(Indicator::from_raw(SQL_NULL_DATA), Indicator::Null);
        assert_eq!(Indicator::from_raw(SQL_NO_TOTAL), Indicator::NoTotal);
        assert_eq!(Indicator::from_raw(12), Indicator::Length(12));
        assert_eq!(Indicator::Length(0).to_raw(), 0);
        assert_eq!(Indicator::Null.to_raw(), SQL_NULL_DATA);
        assert!(Indicator::from_raw(-99).is_null());
    }

    #[test]
    fn test_read_write_native_values() {
        let mut slot = [0u8; 19];
        let mut w = WriteBuffer::new(&mut slot);
        w.write_i64_ne(-9_007_199_254_740_993).unwrap();
        w.write_f64_ne(2.5).unwrap();
        w.write_i16_ne(-3).unwrap();
        w.write_u8(7).unwrap();
        assert_eq!(w.len(), 19);
        assert!(w.write_u8(1).is_err());

        let mut r = ReadBuffer::new(&slot);
        assert_eq!(r.read_i64_ne().unwrap(), -9_007_199_254_740_993);
        assert_eq!(r.read_f64_ne().unwrap(), 2.5);
        assert_eq!(r.read_i16_ne().unwrap(), -3);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_read_past_end_reports_location() {
        let slot = [1u8, 2];
        let mut r = ReadBuffer::new(&slot);
        match r.read_u32_ne() {
            Err(Error::BufferTooSmall {
                needed,
                available,
                location,
            }) => {
                assert_eq!(needed, 4);
                assert_eq!(available, 2);
                assert!(location.file().ends_with("buffer.rs"));
            }
            other => panic!("expected BufferTooSmall, got {:?}", other),
        }
    }

    #[test]
    fn test_alloc_zeroed() {
        let data = alloc_zeroed(32, "test").unwrap();
        assert_eq!(data.len(), 32);
        assert!(data.iter().all(|b| *b == 0));
        assert!(matches!(
            alloc_zeroed(usize::MAX, "huge"),
            Err(Error::Allocation { purpose: "huge", .. })
        ));
    }
}
