//! Pump history pages and the records stored in them.
//!
//! The pump keeps its event history in fixed-size pages. Page 0 holds
//! the most recent events, and records are appended to a page in the
//! order they happen, so the newest record of a page is its last one.

use time::PrimitiveDateTime;

use crate::error::DecodeError;

mod crc;
pub use crc::Crc16;

mod record;
pub use record::{
    BasalPattern, Bolus, HistoryRecord, RecordInfo, RecordType, TempBasal, UnabsorbedBolus,
};

mod timestamp;
pub use timestamp::{decode_date, decode_timestamp};

/// The size of a history page including its trailing CRC.
pub const PAGE_SIZE: usize = 1024;
const CRC_LEN: usize = 2;

/// Which part of the history a caller is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    /// Read every page.
    All,
    /// Stop at the first record older than this time.
    Since(PrimitiveDateTime),
}

impl Cutoff {
    /// A cutoff `hours` hours before `now`.
    pub fn hours_before(now: PrimitiveDateTime, hours: u32) -> Self {
        Self::Since(now - time::Duration::hours(i64::from(hours)))
    }

    /// Whether `record` is older than this cutoff. Records without a
    /// time are never past the cutoff.
    pub fn is_past(&self, record: &HistoryRecord) -> bool {
        match (self, record.time) {
            (Cutoff::Since(cutoff), Some(time)) => time < *cutoff,
            _ => false,
        }
    }
}

/// A decoded history page.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    records: Vec<HistoryRecord>,
}

impl HistoryPage {
    /// Decode the raw contents of a page.
    ///
    /// A full [`PAGE_SIZE`] buffer must end in a valid big-endian CRC,
    /// which is stripped before decoding. Shorter buffers are taken to
    /// be page data whose CRC was already checked by the connection.
    pub fn from_data(data: &[u8], newer: bool) -> Result<Self, DecodeError> {
        let data = if data.len() == PAGE_SIZE {
            let (body, crc) = data.split_at(PAGE_SIZE - CRC_LEN);
            let expected = u16::from_be_bytes([crc[0], crc[1]]);
            let computed = Crc16::from_iter(body.iter().copied());

            if expected != computed {
                return Err(DecodeError::BadCrc { expected, computed });
            }

            body
        } else {
            data
        };

        Ok(Self {
            records: decode_page(data, newer)?,
        })
    }

    /// The records of this page, newest first.
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<HistoryRecord> {
        self.records
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
    /// Start of the trailing zero padding.
    end: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        let end = data.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
        Self {
            data,
            offset: 0,
            end,
        }
    }

    fn remaining(&self) -> &'a [u8] {
        self.data.get(self.offset..).unwrap_or_default()
    }

    /// Only zero padding is left.
    fn at_end(&self) -> bool {
        self.offset >= self.end
    }

    fn advance(&mut self, len: usize) -> Result<(), DecodeError> {
        let available = self.remaining().len();
        if len > available {
            return Err(DecodeError::NotEnoughData {
                needed: len,
                available,
            });
        }
        self.offset += len;
        Ok(())
    }
}

/// Decode every record in `data`, stopping at trailing zero padding.
///
/// Records are decoded front to back and returned newest first.
pub fn decode_page(data: &[u8], newer: bool) -> Result<Vec<HistoryRecord>, DecodeError> {
    let mut cursor = Cursor::new(data);
    let mut records = Vec::new();

    while !cursor.at_end() {
        let record = HistoryRecord::decode(cursor.remaining(), cursor.offset, newer)?;
        cursor.advance(record.len())?;
        records.push(record);
    }

    records.reverse();
    Ok(records)
}

/// Displays a record time as `YYYY-MM-DD HH:MM:SS`.
pub struct DisplayTime<'a>(pub &'a PrimitiveDateTime);

impl core::fmt::Display for DisplayTime<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let layout = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        let formatted = self.0.format(layout).map_err(|_| core::fmt::Error)?;
        f.write_str(&formatted)
    }
}
