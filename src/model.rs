use crate::{error::DecodeError, log_vec, Loggable};

/// The model reported by a pump, e.g. `"523"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PumpModel {
    model: String,
    family: u8,
}

impl PumpModel {
    /// The first family that uses the longer history record encodings.
    pub const FIRST_NEWER_FAMILY: u8 = 23;

    /// Parse a model response: a length byte followed by that many
    /// ASCII digits.
    pub fn from_data(data: &[u8]) -> Result<Self, DecodeError> {
        let (len, rest) = data.split_first().ok_or(DecodeError::NotEnoughData {
            needed: 1,
            available: 0,
        })?;
        let len = usize::from(*len);

        let digits = rest.get(..len).ok_or(DecodeError::NotEnoughData {
            needed: len + 1,
            available: data.len(),
        })?;

        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(DecodeError::InvalidModel);
        }

        let model: String = digits.iter().map(|&b| char::from(b)).collect();

        let family = digits
            .iter()
            .fold(0u32, |acc, d| (acc * 10 + u32::from(d - b'0')) % 100);

        Ok(Self {
            model,
            family: family as u8,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn family(&self) -> u8 {
        self.family
    }

    /// Whether this pump uses the longer history record encodings.
    pub fn is_newer(&self) -> bool {
        self.family >= Self::FIRST_NEWER_FAMILY
    }
}

impl Loggable for PumpModel {
    fn as_log(&self) -> Vec<crate::fmt::LogItem> {
        log_vec![
            (0, "Pump model"),
            (1, "Model", &self.model),
            (1, "Family", self.family),
            (1, "Newer", self.is_newer()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_model() {
        let model = PumpModel::from_data(&[3, b'5', b'2', b'3']).unwrap();
        assert_eq!(model.model(), "523");
        assert_eq!(model.family(), 23);
        assert!(model.is_newer());

        let model = PumpModel::from_data(&[3, b'7', b'2', b'2', 0, 0]).unwrap();
        assert_eq!(model.family(), 22);
        assert!(!model.is_newer());
    }

    #[test]
    fn reject_garbage() {
        assert_eq!(
            PumpModel::from_data(&[]),
            Err(DecodeError::NotEnoughData {
                needed: 1,
                available: 0
            })
        );
        assert_eq!(
            PumpModel::from_data(&[4, b'5', b'2']),
            Err(DecodeError::NotEnoughData {
                needed: 5,
                available: 3
            })
        );
        assert_eq!(
            PumpModel::from_data(&[2, b'5', b'x']),
            Err(DecodeError::InvalidModel)
        );
        assert_eq!(PumpModel::from_data(&[0]), Err(DecodeError::InvalidModel));
    }
}
