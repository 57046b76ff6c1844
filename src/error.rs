use crate::connection::Command;

/// Errors produced while decoding pump data.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeError {
    NotEnoughData {
        needed: usize,
        available: usize,
    },
    UnknownRecordType {
        ty: u8,
        offset: usize,
    },
    RecordTooLong {
        ty: u8,
        offset: usize,
        length: usize,
        available: usize,
    },
    InvalidTimestamp([u8; 5]),
    BadCrc {
        expected: u16,
        computed: u16,
    },
    InvalidModel,
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DecodeError::NotEnoughData { needed, available } => {
                write!(f, "need {needed} bytes, only {available} available")
            }
            DecodeError::UnknownRecordType { ty, offset } => {
                write!(f, "unknown record type 0x{ty:02X} at offset {offset}")
            }
            DecodeError::RecordTooLong {
                ty,
                offset,
                length,
                available,
            } => write!(
                f,
                "record 0x{ty:02X} at offset {offset} is {length} bytes but only {available} remain"
            ),
            DecodeError::InvalidTimestamp(data) => write!(f, "invalid timestamp {data:02X?}"),
            DecodeError::BadCrc { expected, computed } => write!(
                f,
                "CRC mismatch: page says 0x{expected:04X}, computed 0x{computed:04X}"
            ),
            DecodeError::InvalidModel => write!(f, "invalid model response"),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Clone, Debug, PartialEq)]
pub enum PumpError<CON> {
    /// The connection failed to complete an exchange.
    Connection(CON),
    /// The response to `command` could not be decoded.
    Decode {
        command: Command,
        error: DecodeError,
    },
    /// History page `page` could not be decoded.
    History {
        page: usize,
        error: DecodeError,
    },
}

impl<CON> From<CON> for PumpError<CON> {
    fn from(value: CON) -> Self {
        Self::Connection(value)
    }
}

impl<CON> PumpError<CON> {
    pub fn map<CON2, F>(self, f: F) -> PumpError<CON2>
    where
        F: FnOnce(CON) -> CON2,
    {
        match self {
            PumpError::Connection(e) => PumpError::Connection(f(e)),
            PumpError::Decode { command, error } => PumpError::Decode { command, error },
            PumpError::History { page, error } => PumpError::History { page, error },
        }
    }

    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            PumpError::Connection(_) => None,
            PumpError::Decode { error, .. } | PumpError::History { error, .. } => Some(error),
        }
    }
}

impl<CON> core::fmt::Display for PumpError<CON>
where
    CON: core::fmt::Display,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PumpError::Connection(e) => write!(f, "connection error: {e}"),
            PumpError::Decode { command, error } => {
                write!(f, "could not decode {command} response: {error}")
            }
            PumpError::History { page, error } => {
                write!(f, "could not decode history page {page}: {error}")
            }
        }
    }
}

impl<CON> std::error::Error for PumpError<CON>
where
    CON: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PumpError::Connection(e) => Some(e),
            PumpError::Decode { error, .. } | PumpError::History { error, .. } => Some(error),
        }
    }
}
