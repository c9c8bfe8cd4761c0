//! DATE_STRUCT, TIME_STRUCT and TIMESTAMP_STRUCT encoding.
//!
//! Calendar fields are interpreted as UTC. A TIME value has no date part and
//! is anchored on 1970-01-01.
//!
//! TIMESTAMP_STRUCT layout (16 bytes, native byte order):
//! - year: i16
//! - month, day, hour, minute, second: u16
//! - fraction: u32, nanoseconds

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::error::{Error, Result};
use crate::protocol::buffer::{ReadBuffer, WriteBuffer};

/// Calendar fields split out of a date/time struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTimeFields {
    pub year: i16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    /// Nanoseconds.
    pub fraction: u32,
}

impl DateTimeFields {
    /// Reassemble the fields into a UTC timestamp.
    pub fn to_utc(&self) -> Result<DateTime<Utc>> {
        let date = NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
        .ok_or_else(|| {
            Error::type_conversion(format!(
                "invalid date {:04}-{:02}-{:02}",
                self.year, self.month, self.day
            ))
        })?;
        let datetime = date
            .and_hms_nano_opt(
                u32::from(self.hour),
                u32::from(self.minute),
                u32::from(self.second),
                self.fraction,
            )
            .ok_or_else(|| {
                Error::type_conversion(format!(
                    "invalid time {:02}:{:02}:{:02}.{:09}",
                    self.hour, self.minute, self.second, self.fraction
                ))
            })?;
        Ok(datetime.and_utc())
    }

    /// Split a UTC timestamp into fields.
    pub fn from_utc(ts: &DateTime<Utc>) -> Result<Self> {
        let year = i16::try_from(ts.year())
            .map_err(|_| Error::type_conversion(format!("year {} out of range", ts.year())))?;
        Ok(Self {
            year,
            month: ts.month() as u16,
            day: ts.day() as u16,
            hour: ts.hour() as u16,
            minute: ts.minute() as u16,
            second: ts.second() as u16,
            // Leap seconds are folded into the last second.
            fraction: ts.nanosecond().min(999_999_999),
        })
    }
}

/// Parse the text form a driver renders for a date/time value
/// (`yyyy-mm-dd`, `hh:mm:ss[.f]` or `yyyy-mm-dd hh:mm:ss[.f]`).
pub fn parse_datetime_text(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    if let Ok(time) = NaiveTime::parse_from_str(text, "%H:%M:%S%.f") {
        return Ok(NaiveDate::default().and_time(time).and_utc());
    }
    Err(Error::type_conversion(format!(
        "invalid date/time text {:?}",
        text
    )))
}

/// Read a DATE_STRUCT (year, month, day).
pub fn read_date_struct(buf: &mut ReadBuffer<'_>) -> Result<DateTimeFields> {
    Ok(DateTimeFields {
        year: buf.read_i16_ne()?,
        month: buf.read_u16_ne()?,
        day: buf.read_u16_ne()?,
        ..Default::default()
    })
}

/// Read a TIME_STRUCT (hour, minute, second), anchored on 1970-01-01.
pub fn read_time_struct(buf: &mut ReadBuffer<'_>) -> Result<DateTimeFields> {
    Ok(DateTimeFields {
        year: 1970,
        month: 1,
        day: 1,
        hour: buf.read_u16_ne()?,
        minute: buf.read_u16_ne()?,
        second: buf.read_u16_ne()?,
        fraction: 0,
    })
}

pub fn read_timestamp_struct(buf: &mut ReadBuffer<'_>) -> Result<DateTimeFields> {
    Ok(DateTimeFields {
        year: buf.read_i16_ne()?,
        month: buf.read_u16_ne()?,
        day: buf.read_u16_ne()?,
        hour: buf.read_u16_ne()?,
        minute: buf.read_u16_ne()?,
        second: buf.read_u16_ne()?,
        fraction: buf.read_u32_ne()?,
    })
}

pub fn write_date_struct(buf: &mut WriteBuffer<'_>, fields: &DateTimeFields) -> Result<()> {
    buf.write_i16_ne(fields.year)?;
    buf.write_u16_ne(fields.month)?;
    buf.write_u16_ne(fields.day)
}

pub fn write_time_struct(buf: &mut WriteBuffer<'_>, fields: &DateTimeFields) -> Result<()> {
    buf.write_u16_ne(fields.hour)?;
    buf.write_u16_ne(fields.minute)?;
    buf.write_u16_ne(fields.second)
}

pub fn write_timestamp_struct(buf: &mut WriteBuffer<'_>, fields: &DateTimeFields) -> Result<()> {
    write_date_struct(buf, fields)?;
    write_time_struct(buf, fields)?;
    buf.write_u32_ne(fields.fraction)
}
