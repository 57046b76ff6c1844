use time::{Date, Month, PrimitiveDateTime, Time};

use crate::error::DecodeError;

pub const TIMESTAMP_LEN: usize = 5;
pub const DATE_LEN: usize = 2;

/// Decode a packed 5-byte timestamp.
///
/// The month is split across the top two bits of the first two bytes.
/// An all-zero timestamp means the record carries no time.
pub fn decode_timestamp(data: &[u8]) -> Result<Option<PrimitiveDateTime>, DecodeError> {
    let raw: [u8; TIMESTAMP_LEN] = data
        .get(..TIMESTAMP_LEN)
        .and_then(|d| d.try_into().ok())
        .ok_or(DecodeError::NotEnoughData {
            needed: TIMESTAMP_LEN,
            available: data.len(),
        })?;

    if raw == [0; TIMESTAMP_LEN] {
        return Ok(None);
    }

    let second = raw[0] & 0x3F;
    let minute = raw[1] & 0x3F;
    let hour = raw[2] & 0x1F;
    let day = raw[3] & 0x1F;
    let month = ((raw[0] >> 6) << 2) | (raw[1] >> 6);
    let year = 2000 + i32::from(raw[4] & 0x7F);

    let invalid = |_| DecodeError::InvalidTimestamp(raw);

    let month = Month::try_from(month).map_err(invalid)?;
    let date = Date::from_calendar_date(year, month, day).map_err(invalid)?;
    let time = Time::from_hms(hour, minute, second).map_err(invalid)?;

    Ok(Some(PrimitiveDateTime::new(date, time)))
}

/// Decode a packed 2-byte date, as used by daily summaries. The result
/// is midnight of that day.
pub fn decode_date(data: &[u8]) -> Result<Option<PrimitiveDateTime>, DecodeError> {
    let raw: [u8; DATE_LEN] = data
        .get(..DATE_LEN)
        .and_then(|d| d.try_into().ok())
        .ok_or(DecodeError::NotEnoughData {
            needed: DATE_LEN,
            available: data.len(),
        })?;

    if raw == [0; DATE_LEN] {
        return Ok(None);
    }

    let day = raw[0] & 0x1F;
    let month = ((raw[0] >> 5) << 1) | (raw[1] >> 7);
    let year = 2000 + i32::from(raw[1] & 0x7F);

    let invalid = |_| DecodeError::InvalidTimestamp([raw[0], raw[1], 0, 0, 0]);

    let month = Month::try_from(month).map_err(invalid)?;
    let date = Date::from_calendar_date(year, month, day).map_err(invalid)?;

    Ok(Some(date.midnight()))
}
