//! Daily schedules: basal rates, basal patterns and carb ratios.
//!
//! A schedule is stored on the pump as a header byte followed by
//! 3-byte records `[value, reserved, start]`, where `start` counts
//! half hours since midnight.

use core::time::Duration;

use time::PrimitiveDateTime;

use crate::{fmt::LogItem, Loggable};

const HALF_HOUR: Duration = Duration::from_secs(30 * 60);
const STRIDE: usize = 3;

/// How the raw value of a schedule record maps to its unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleFormat {
    pub value_scale: i32,
    pub unit: &'static str,
}

impl ScheduleFormat {
    /// Basal rates in milliunits per hour, stored in steps of 0.025 U/h.
    pub const BASAL_RATES: Self = Self {
        value_scale: 25,
        unit: "mU/h",
    };

    /// Carb ratios in grams per unit.
    pub const CARB_RATIOS: Self = Self {
        value_scale: 1,
        unit: "g/U",
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleEntry {
    /// Offset from 00:00.
    pub start: Duration,
    pub value: i32,
}

impl ScheduleEntry {
    /// The entry returned when nothing in a schedule applies.
    pub const ZERO: Self = Self {
        start: Duration::ZERO,
        value: 0,
    };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
    format: ScheduleFormat,
}

impl Schedule {
    pub fn new(entries: Vec<ScheduleEntry>, format: ScheduleFormat) -> Self {
        Self { entries, format }
    }

    /// Decode a schedule response: one header byte, then records.
    pub fn decode(data: &[u8], format: ScheduleFormat) -> Self {
        Self::decode_entries(data.get(1..).unwrap_or_default(), format)
    }

    /// Decode a run of records with no header.
    ///
    /// Decoding stops at the first all-zero record after the first one,
    /// since a zero rate at 00:00 is legitimate. A trailing partial
    /// record is ignored.
    pub fn decode_entries(data: &[u8], format: ScheduleFormat) -> Self {
        let mut entries = Vec::new();

        for (i, record) in data.chunks_exact(STRIDE).enumerate() {
            let (value, start) = (record[0], record[2]);

            if i > 0 && value == 0 && start == 0 {
                break;
            }

            entries.push(ScheduleEntry {
                start: HALF_HOUR * u32::from(start),
                value: i32::from(value) * format.value_scale,
            });
        }

        Self { entries, format }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn format(&self) -> ScheduleFormat {
        self.format
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry in effect at the time of day of `instant`.
    pub fn active_at(&self, instant: PrimitiveDateTime) -> ScheduleEntry {
        self.active_at_offset(time_of_day(instant))
    }

    /// The last entry starting at or before `offset` since midnight, or
    /// [`ScheduleEntry::ZERO`] if there is none.
    pub fn active_at_offset(&self, offset: Duration) -> ScheduleEntry {
        let mut last = ScheduleEntry::ZERO;

        for entry in &self.entries {
            if entry.start > offset {
                break;
            }
            last = *entry;
        }

        last
    }
}

/// Time elapsed since midnight of the day `instant` falls on.
pub fn time_of_day(instant: PrimitiveDateTime) -> Duration {
    let (hour, minute, second, nanos) = instant.time().as_hms_nano();
    let seconds = u64::from(hour) * 3600 + u64::from(minute) * 60 + u64::from(second);
    Duration::new(seconds, nanos)
}

/// Format a time-of-day offset as `HH:MM`.
pub fn format_offset(offset: Duration) -> String {
    let minutes = offset.as_secs() / 60;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

impl Loggable for Schedule {
    fn as_log(&self) -> Vec<LogItem> {
        let mut log = vec![LogItem::from((0, "Schedule"))];

        if self.entries.is_empty() {
            log.push((1, "(empty)").into());
        }

        for entry in &self.entries {
            let value = format!("{} {}", entry.value, self.format.unit);
            log.push((1, format_offset(entry.start), value).into());
        }

        log
    }
}
