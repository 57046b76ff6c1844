use core::str::FromStr;

/// A radio frequency in Hz.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(u32);

impl Frequency {
    /// The lowest frequency accepted when parsing.
    pub const MIN: Self = Self(860_000_000);
    /// The highest frequency accepted when parsing.
    pub const MAX: Self = Self(920_000_000);

    pub const fn from_hz(hz: u32) -> Self {
        Self(hz)
    }

    pub const fn hz(&self) -> u32 {
        self.0
    }

    /// The frequency `hz` above this one, or `None` on overflow.
    pub fn checked_add(&self, hz: u32) -> Option<Self> {
        self.0.checked_add(hz).map(Self)
    }
}

/// Formats as megahertz with three decimals, e.g. `916.500`.
impl core::fmt::Display for Frequency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let khz = (u64::from(self.0) + 500) / 1000;
        write!(f, "{:3}.{:03}", khz / 1000, khz % 1000)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseFrequencyError {
    Invalid(String),
    OutOfRange(String),
}

impl core::fmt::Display for ParseFrequencyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParseFrequencyError::Invalid(s) => write!(f, "invalid frequency {s:?}"),
            ParseFrequencyError::OutOfRange(s) => write!(f, "frequency {s} out of range"),
        }
    }
}

impl std::error::Error for ParseFrequencyError {}

/// Accepts either megahertz (`916.5`) or hertz (`916500000`).
impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| ParseFrequencyError::Invalid(s.to_string()))?;

        let (min, max) = (f64::from(Self::MIN.0), f64::from(Self::MAX.0));

        let hz = if (min / 1e6..=max / 1e6).contains(&value) {
            (value * 1e6).round()
        } else if (min..=max).contains(&value) {
            value.round()
        } else {
            return Err(ParseFrequencyError::OutOfRange(s.to_string()));
        };

        Ok(Self(hz as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_megahertz_and_hertz() {
        assert_eq!("916.5".parse(), Ok(Frequency::from_hz(916_500_000)));
        assert_eq!("916500000".parse(), Ok(Frequency::from_hz(916_500_000)));
        assert_eq!("868.35".parse(), Ok(Frequency::from_hz(868_350_000)));
    }

    #[test]
    fn parse_rejects_out_of_range() {
        assert!(matches!(
            "433.92".parse::<Frequency>(),
            Err(ParseFrequencyError::OutOfRange(_))
        ));
        assert!(matches!(
            "fast".parse::<Frequency>(),
            Err(ParseFrequencyError::Invalid(_))
        ));
    }

    #[test]
    fn display_as_megahertz() {
        assert_eq!(Frequency::from_hz(916_500_000).to_string(), "916.500");
        assert_eq!(Frequency::from_hz(916_050_000).to_string(), "916.050");
    }
}
