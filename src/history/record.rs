use core::time::Duration;

use time::PrimitiveDateTime;

use crate::{
    error::DecodeError,
    fmt::LogItem,
    schedule::{format_offset, Schedule, ScheduleFormat},
    Loggable,
};

use super::timestamp::{decode_date, decode_timestamp, TIMESTAMP_LEN};

const HALF_HOUR: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Bolus,
    Prime,
    Alarm,
    DailyTotal,
    BasalProfileBefore,
    BasalProfileAfter,
    BgCapture,
    ClearAlarm,
    SelectBasalProfile,
    TempBasalDuration,
    ChangeTime,
    NewTime,
    LowBattery,
    BatteryChange,
    SuspendPump,
    ResumePump,
    Rewind,
    TempBasalRate,
    LowReservoir,
    BolusWizard,
    UnabsorbedInsulin,
    BasalProfileStart,
}

impl TryFrom<u8> for RecordType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let ty = match value {
            0x01 => Self::Bolus,
            0x03 => Self::Prime,
            0x06 => Self::Alarm,
            0x07 => Self::DailyTotal,
            0x08 => Self::BasalProfileBefore,
            0x09 => Self::BasalProfileAfter,
            0x0A => Self::BgCapture,
            0x0C => Self::ClearAlarm,
            0x14 => Self::SelectBasalProfile,
            0x16 => Self::TempBasalDuration,
            0x17 => Self::ChangeTime,
            0x18 => Self::NewTime,
            0x19 => Self::LowBattery,
            0x1A => Self::BatteryChange,
            0x1E => Self::SuspendPump,
            0x1F => Self::ResumePump,
            0x21 => Self::Rewind,
            0x33 => Self::TempBasalRate,
            0x34 => Self::LowReservoir,
            0x5B => Self::BolusWizard,
            0x5C => Self::UnabsorbedInsulin,
            0x7B => Self::BasalProfileStart,
            v => return Err(v),
        };

        Ok(ty)
    }
}

impl From<RecordType> for u8 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::Bolus => 0x01,
            RecordType::Prime => 0x03,
            RecordType::Alarm => 0x06,
            RecordType::DailyTotal => 0x07,
            RecordType::BasalProfileBefore => 0x08,
            RecordType::BasalProfileAfter => 0x09,
            RecordType::BgCapture => 0x0A,
            RecordType::ClearAlarm => 0x0C,
            RecordType::SelectBasalProfile => 0x14,
            RecordType::TempBasalDuration => 0x16,
            RecordType::ChangeTime => 0x17,
            RecordType::NewTime => 0x18,
            RecordType::LowBattery => 0x19,
            RecordType::BatteryChange => 0x1A,
            RecordType::SuspendPump => 0x1E,
            RecordType::ResumePump => 0x1F,
            RecordType::Rewind => 0x21,
            RecordType::TempBasalRate => 0x33,
            RecordType::LowReservoir => 0x34,
            RecordType::BolusWizard => 0x5B,
            RecordType::UnabsorbedInsulin => 0x5C,
            RecordType::BasalProfileStart => 0x7B,
        }
    }
}

impl RecordType {
    /// The encoded length of a record of this type starting at `data[0]`.
    ///
    /// Pumps of family 23 and later use longer bolus, wizard and daily
    /// total records.
    pub fn length(&self, data: &[u8], newer: bool) -> usize {
        match self {
            RecordType::Bolus if newer => 13,
            RecordType::Bolus => 9,
            RecordType::Prime => 10,
            RecordType::Alarm => 9,
            RecordType::DailyTotal if newer => 10,
            RecordType::DailyTotal => 7,
            RecordType::BasalProfileBefore | RecordType::BasalProfileAfter => 152,
            RecordType::ChangeTime => 14,
            RecordType::TempBasalRate => 8,
            RecordType::BolusWizard if newer => 22,
            RecordType::BolusWizard => 20,
            RecordType::UnabsorbedInsulin => usize::from(data.get(1).copied().unwrap_or(0)).max(2),
            RecordType::BasalProfileStart => 10,
            RecordType::BgCapture
            | RecordType::ClearAlarm
            | RecordType::SelectBasalProfile
            | RecordType::TempBasalDuration
            | RecordType::NewTime
            | RecordType::LowBattery
            | RecordType::BatteryChange
            | RecordType::SuspendPump
            | RecordType::ResumePump
            | RecordType::Rewind
            | RecordType::LowReservoir => 7,
        }
    }

    /// Offset of the event timestamp within the record, if it has one.
    fn timestamp_offset(&self, newer: bool) -> Option<usize> {
        match self {
            RecordType::Bolus if newer => Some(8),
            RecordType::Bolus => Some(4),
            RecordType::Prime => Some(5),
            RecordType::Alarm => Some(4),
            RecordType::DailyTotal | RecordType::UnabsorbedInsulin => None,
            _ => Some(2),
        }
    }
}

impl core::fmt::Display for RecordType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasalPattern {
    Standard,
    A,
    B,
    Unknown(u8),
}

impl From<u8> for BasalPattern {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Standard,
            1 => Self::A,
            2 => Self::B,
            v => Self::Unknown(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempBasal {
    /// Absolute rate in milliunits per hour.
    Absolute(i32),
    Percent(u8),
}

/// Insulin amounts are in milliunits throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bolus {
    pub programmed: i32,
    pub delivered: i32,
    /// Only reported by newer pumps.
    pub unabsorbed: Option<i32>,
    /// Non-zero for square wave boluses.
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnabsorbedBolus {
    pub amount: i32,
    pub age: Duration,
}

/// The decoded payload of a history record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordInfo {
    Bolus(Bolus),
    Prime {
        fixed: i32,
        amount: i32,
    },
    Alarm {
        code: u8,
    },
    DailyTotal {
        total: i32,
    },
    BasalProfileBefore(Schedule),
    BasalProfileAfter(Schedule),
    BgCapture {
        glucose: u16,
    },
    ClearAlarm {
        code: u8,
    },
    SelectBasalProfile {
        pattern: BasalPattern,
    },
    TempBasalDuration {
        duration: Duration,
    },
    ChangeTime {
        new_time: Option<PrimitiveDateTime>,
    },
    NewTime,
    LowBattery,
    BatteryChange,
    SuspendPump,
    ResumePump,
    Rewind,
    TempBasalRate(TempBasal),
    LowReservoir {
        remaining: i32,
    },
    BolusWizard {
        glucose: u16,
        carbs: u16,
    },
    UnabsorbedInsulin(Vec<UnabsorbedBolus>),
    BasalProfileStart {
        profile: u8,
        start: Duration,
        rate: i32,
        pattern: BasalPattern,
    },
}

impl RecordInfo {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordInfo::Bolus(_) => RecordType::Bolus,
            RecordInfo::Prime { .. } => RecordType::Prime,
            RecordInfo::Alarm { .. } => RecordType::Alarm,
            RecordInfo::DailyTotal { .. } => RecordType::DailyTotal,
            RecordInfo::BasalProfileBefore(_) => RecordType::BasalProfileBefore,
            RecordInfo::BasalProfileAfter(_) => RecordType::BasalProfileAfter,
            RecordInfo::BgCapture { .. } => RecordType::BgCapture,
            RecordInfo::ClearAlarm { .. } => RecordType::ClearAlarm,
            RecordInfo::SelectBasalProfile { .. } => RecordType::SelectBasalProfile,
            RecordInfo::TempBasalDuration { .. } => RecordType::TempBasalDuration,
            RecordInfo::ChangeTime { .. } => RecordType::ChangeTime,
            RecordInfo::NewTime => RecordType::NewTime,
            RecordInfo::LowBattery => RecordType::LowBattery,
            RecordInfo::BatteryChange => RecordType::BatteryChange,
            RecordInfo::SuspendPump => RecordType::SuspendPump,
            RecordInfo::ResumePump => RecordType::ResumePump,
            RecordInfo::Rewind => RecordType::Rewind,
            RecordInfo::TempBasalRate(_) => RecordType::TempBasalRate,
            RecordInfo::LowReservoir { .. } => RecordType::LowReservoir,
            RecordInfo::BolusWizard { .. } => RecordType::BolusWizard,
            RecordInfo::UnabsorbedInsulin(_) => RecordType::UnabsorbedInsulin,
            RecordInfo::BasalProfileStart { .. } => RecordType::BasalProfileStart,
        }
    }

    /// Decode the payload of `record`, whose length has already been
    /// checked against [`RecordType::length`].
    fn decode(ty: RecordType, record: &[u8], newer: bool) -> Result<Self, DecodeError> {
        let units = |hi: u8, lo: u8| i32::from(u16::from_be_bytes([hi, lo])) * 25;

        let info = match ty {
            RecordType::Bolus if newer => Self::Bolus(Bolus {
                programmed: units(record[1], record[2]),
                delivered: units(record[3], record[4]),
                unabsorbed: Some(units(record[5], record[6])),
                duration: HALF_HOUR * u32::from(record[7]),
            }),
            RecordType::Bolus => Self::Bolus(Bolus {
                programmed: i32::from(record[1]) * 100,
                delivered: i32::from(record[2]) * 100,
                unabsorbed: None,
                duration: HALF_HOUR * u32::from(record[3]),
            }),
            RecordType::Prime => Self::Prime {
                fixed: i32::from(record[2]) * 100,
                amount: i32::from(record[4]) * 100,
            },
            RecordType::Alarm => Self::Alarm { code: record[1] },
            RecordType::DailyTotal => Self::DailyTotal {
                total: units(record[3], record[4]),
            },
            RecordType::BasalProfileBefore => Self::BasalProfileBefore(Schedule::decode_entries(
                &record[7..],
                ScheduleFormat::BASAL_RATES,
            )),
            RecordType::BasalProfileAfter => Self::BasalProfileAfter(Schedule::decode_entries(
                &record[7..],
                ScheduleFormat::BASAL_RATES,
            )),
            RecordType::BgCapture => Self::BgCapture {
                glucose: (u16::from(record[6] & 0x80) << 1) | u16::from(record[1]),
            },
            RecordType::ClearAlarm => Self::ClearAlarm { code: record[1] },
            RecordType::SelectBasalProfile => Self::SelectBasalProfile {
                pattern: BasalPattern::from(record[1]),
            },
            RecordType::TempBasalDuration => Self::TempBasalDuration {
                duration: HALF_HOUR * u32::from(record[1]),
            },
            RecordType::ChangeTime => Self::ChangeTime {
                new_time: decode_timestamp(&record[9..])?,
            },
            RecordType::NewTime => Self::NewTime,
            RecordType::LowBattery => Self::LowBattery,
            RecordType::BatteryChange => Self::BatteryChange,
            RecordType::SuspendPump => Self::SuspendPump,
            RecordType::ResumePump => Self::ResumePump,
            RecordType::Rewind => Self::Rewind,
            RecordType::TempBasalRate => {
                let flags = record[7];
                if flags >> 3 == 0 {
                    Self::TempBasalRate(TempBasal::Absolute(units(flags & 0x07, record[1])))
                } else {
                    Self::TempBasalRate(TempBasal::Percent(record[1]))
                }
            }
            RecordType::LowReservoir => Self::LowReservoir {
                remaining: i32::from(record[1]) * 100,
            },
            RecordType::BolusWizard => {
                let carbs = if newer {
                    (u16::from(record[8] & 0x0C) << 6) | u16::from(record[7])
                } else {
                    u16::from(record[7])
                };

                Self::BolusWizard {
                    glucose: (u16::from(record[8] & 0x03) << 8) | u16::from(record[1]),
                    carbs,
                }
            }
            RecordType::UnabsorbedInsulin => Self::UnabsorbedInsulin(
                record[2..]
                    .chunks_exact(3)
                    .map(|b| UnabsorbedBolus {
                        amount: i32::from(b[0]) * 25,
                        age: Duration::from_secs(
                            (u64::from(b[1]) | (u64::from(b[2] & 0x30) << 4)) * 60,
                        ),
                    })
                    .collect(),
            ),
            RecordType::BasalProfileStart => Self::BasalProfileStart {
                profile: record[1],
                start: HALF_HOUR * u32::from(record[7]),
                rate: i32::from(record[8]) * 25,
                pattern: BasalPattern::from(record[9]),
            },
        };

        Ok(info)
    }
}

fn format_units(milliunits: i32) -> String {
    format!("{}.{:03} U", milliunits / 1000, (milliunits % 1000).abs())
}

impl core::fmt::Display for RecordInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordInfo::Bolus(bolus) => {
                write!(
                    f,
                    "programmed {}, delivered {}",
                    format_units(bolus.programmed),
                    format_units(bolus.delivered)
                )?;
                if !bolus.duration.is_zero() {
                    write!(f, " over {} min", bolus.duration.as_secs() / 60)?;
                }
                Ok(())
            }
            RecordInfo::Prime { fixed, amount } => write!(
                f,
                "fixed {}, amount {}",
                format_units(*fixed),
                format_units(*amount)
            ),
            RecordInfo::Alarm { code } | RecordInfo::ClearAlarm { code } => {
                write!(f, "code 0x{code:02X}")
            }
            RecordInfo::DailyTotal { total } => write!(f, "total {}", format_units(*total)),
            RecordInfo::BasalProfileBefore(s) | RecordInfo::BasalProfileAfter(s) => {
                write!(f, "{} entries", s.entries().len())
            }
            RecordInfo::BgCapture { glucose } => write!(f, "{glucose} mg/dL"),
            RecordInfo::SelectBasalProfile { pattern } => write!(f, "pattern {pattern:?}"),
            RecordInfo::TempBasalDuration { duration } => {
                write!(f, "{} min", duration.as_secs() / 60)
            }
            RecordInfo::ChangeTime { new_time } => match new_time {
                Some(t) => write!(f, "new time {}", super::DisplayTime(t)),
                None => write!(f, "new time unset"),
            },
            RecordInfo::TempBasalRate(TempBasal::Absolute(rate)) => {
                write!(f, "{}/h", format_units(*rate))
            }
            RecordInfo::TempBasalRate(TempBasal::Percent(pct)) => write!(f, "{pct}%"),
            RecordInfo::LowReservoir { remaining } => {
                write!(f, "{} remaining", format_units(*remaining))
            }
            RecordInfo::BolusWizard { glucose, carbs } => {
                write!(f, "glucose {glucose} mg/dL, carbs {carbs} g")
            }
            RecordInfo::UnabsorbedInsulin(boluses) => write!(f, "{} boluses", boluses.len()),
            RecordInfo::BasalProfileStart {
                profile,
                start,
                rate,
                pattern,
            } => write!(
                f,
                "profile {profile} ({pattern:?}) from {} at {}/h",
                format_offset(*start),
                format_units(*rate)
            ),
            RecordInfo::NewTime
            | RecordInfo::LowBattery
            | RecordInfo::BatteryChange
            | RecordInfo::SuspendPump
            | RecordInfo::ResumePump
            | RecordInfo::Rewind => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    /// When the event happened, if the record type carries a time.
    pub time: Option<PrimitiveDateTime>,
    pub info: RecordInfo,
    /// The raw bytes of this record.
    pub data: Vec<u8>,
}

impl HistoryRecord {
    /// Decode the record at the start of `data`, which begins `offset`
    /// bytes into its page.
    pub fn decode(data: &[u8], offset: usize, newer: bool) -> Result<Self, DecodeError> {
        let Some(&code) = data.first() else {
            return Err(DecodeError::NotEnoughData {
                needed: 1,
                available: 0,
            });
        };

        let ty = RecordType::try_from(code)
            .map_err(|ty| DecodeError::UnknownRecordType { ty, offset })?;

        let length = ty.length(data, newer);
        let record = data.get(..length).ok_or(DecodeError::RecordTooLong {
            ty: code,
            offset,
            length,
            available: data.len(),
        })?;

        let time = match (ty, ty.timestamp_offset(newer)) {
            (RecordType::DailyTotal, _) => decode_date(&record[1..])?,
            (_, Some(at)) => decode_timestamp(&record[at..at + TIMESTAMP_LEN])?,
            (_, None) => None,
        };

        let info = RecordInfo::decode(ty, record, newer)?;

        Ok(Self {
            time,
            info,
            data: record.to_vec(),
        })
    }

    pub fn record_type(&self) -> RecordType {
        self.info.record_type()
    }

    /// The number of bytes this record occupied in its page.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Loggable for HistoryRecord {
    fn as_log(&self) -> Vec<LogItem> {
        let time = self
            .time
            .as_ref()
            .map(|t| super::DisplayTime(t).to_string())
            .unwrap_or_else(|| "-".into());

        let mut log = vec![
            LogItem::from((0, "History record")),
            (1, "Type", self.record_type()).into(),
            (1, "Time", time).into(),
        ];

        let details = self.info.to_string();
        if !details.is_empty() {
            log.push((1, "Details", details).into());
        }

        if let RecordInfo::BasalProfileBefore(schedule) | RecordInfo::BasalProfileAfter(schedule) =
            &self.info
        {
            for entry in schedule.entries() {
                log.push((2, format_offset(entry.start), format_units(entry.value)).into());
            }
        }

        log.push((1, "Data", format!("{:02X?}", self.data)).into());
        log
    }
}
