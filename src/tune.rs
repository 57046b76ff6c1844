//! Radio frequency calibration.
//!
//! The pump's radio drifts slightly from its nominal frequency, so the
//! best frequency to talk to it is found by sweeping a range and
//! measuring the signal strength of short exchanges at each step.

use crate::{
    connection::{Frequency, RadioControl},
    fmt::LogItem,
    Loggable,
};

/// The RSSI reported for a frequency at which the pump never answered.
pub const MIN_RSSI: i32 = -128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    pub start: Frequency,
    /// Inclusive.
    pub end: Frequency,
    pub step_hz: u32,
    /// Probe attempts per frequency.
    pub sample_size: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start: Frequency::from_hz(916_000_000),
            end: Frequency::from_hz(917_000_000),
            step_hz: 50_000,
            sample_size: 2,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), TuneError> {
        if self.step_hz == 0 {
            Err(TuneError::ZeroStep)
        } else if self.start > self.end {
            Err(TuneError::EmptyRange {
                start: self.start,
                end: self.end,
            })
        } else if self.sample_size == 0 {
            Err(TuneError::ZeroSampleSize)
        } else {
            Ok(())
        }
    }

    /// The frequencies visited by a sweep, ascending.
    pub fn frequencies(&self) -> impl Iterator<Item = Frequency> + '_ {
        let step = self.step_hz.max(1);
        core::iter::successors(Some(self.start), move |f| f.checked_add(step))
            .take_while(|f| *f <= self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneError {
    ZeroStep,
    EmptyRange { start: Frequency, end: Frequency },
    ZeroSampleSize,
}

impl core::fmt::Display for TuneError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TuneError::ZeroStep => write!(f, "frequency step must be non-zero"),
            TuneError::EmptyRange { start, end } => {
                write!(f, "start frequency {start} is above end frequency {end}")
            }
            TuneError::ZeroSampleSize => write!(f, "sample size must be non-zero"),
        }
    }
}

impl std::error::Error for TuneError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencySample {
    pub frequency: Frequency,
    /// Average RSSI of the successful attempts, or [`MIN_RSSI`].
    pub signal: i32,
    pub failed_attempts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationResult {
    samples: Vec<FrequencySample>,
    best: Frequency,
}

impl CalibrationResult {
    /// All samples, in ascending frequency order.
    pub fn samples(&self) -> &[FrequencySample] {
        &self.samples
    }

    /// The frequency with the strongest signal.
    pub fn best(&self) -> Frequency {
        self.best
    }

    pub fn best_sample(&self) -> Option<&FrequencySample> {
        self.samples.iter().find(|s| s.frequency == self.best)
    }
}

/// Sweep the frequencies of `config` and pick the one with the
/// strongest signal.
pub fn search_frequencies<R>(
    radio: &mut R,
    config: &SweepConfig,
) -> Result<CalibrationResult, TuneError>
where
    R: RadioControl,
{
    search_frequencies_with(radio, config, |_| {})
}

/// Like [`search_frequencies`], calling `observer` with each sample as
/// soon as it has been measured.
pub fn search_frequencies_with<R, F>(
    radio: &mut R,
    config: &SweepConfig,
    mut observer: F,
) -> Result<CalibrationResult, TuneError>
where
    R: RadioControl,
    F: FnMut(&FrequencySample),
{
    config.validate()?;

    radio.set_retries(1);

    let mut samples = Vec::new();
    let mut best = config.start;
    let mut max_signal = MIN_RSSI;

    for frequency in config.frequencies() {
        let sample = try_frequency(radio, frequency, config.sample_size);

        if sample.signal > max_signal {
            max_signal = sample.signal;
            best = frequency;
        }

        observer(&sample);
        samples.push(sample);
    }

    log::info!("Best frequency {} MHz ({} dBm)", best, max_signal);

    Ok(CalibrationResult { samples, best })
}

/// Measure the average RSSI at `frequency` over `sample_size` probes.
///
/// Failed probes are left out of the average. If none succeed the
/// signal is [`MIN_RSSI`].
pub fn try_frequency<R>(radio: &mut R, frequency: Frequency, sample_size: usize) -> FrequencySample
where
    R: RadioControl,
{
    radio.set_frequency(frequency);
    log::debug!("Frequency set to {} MHz", frequency);

    let mut sum: i64 = 0;
    let mut count: i64 = 0;
    let mut failed_attempts = 0;

    for attempt in 0..sample_size {
        match radio.probe() {
            (Ok(_), rssi) => {
                sum += i64::from(rssi);
                count += 1;
            }
            (Err(e), _) => {
                log::debug!("Probe {attempt} at {frequency} MHz failed: {e:?}");
                failed_attempts += 1;
            }
        }
    }

    // Floor division, so halves round up for negative sums too.
    let signal = if count == 0 {
        MIN_RSSI
    } else {
        (sum + count / 2).div_euclid(count) as i32
    };

    FrequencySample {
        frequency,
        signal,
        failed_attempts,
    }
}

impl Loggable for CalibrationResult {
    fn as_log(&self) -> Vec<LogItem> {
        let mut log = vec![LogItem::from((0, "Frequency sweep"))];

        for sample in &self.samples {
            let bar_len = usize::try_from(sample.signal - MIN_RSSI).unwrap_or(0);
            let mut line = format!("{:4} {}", sample.signal, "━".repeat(bar_len));
            if sample.frequency == self.best {
                line.push_str(" ⏺");
            }
            log.push((1, sample.frequency, line).into());
        }

        log.push((1, "Best", self.best).into());
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Replay;

    fn mhz(khz: u32) -> Frequency {
        Frequency::from_hz(khz * 1000)
    }

    #[test]
    fn average_rounds_half_up() {
        let mut radio = Replay::new().with_probes(mhz(916_500), [Some(-60), Some(-64)]);

        let sample = try_frequency(&mut radio, mhz(916_500), 2);
        assert_eq!(sample.signal, -62);
        assert_eq!(sample.failed_attempts, 0);

        let mut radio = Replay::new().with_probes(mhz(916_500), [Some(-60), Some(-63)]);
        assert_eq!(try_frequency(&mut radio, mhz(916_500), 2).signal, -61);
    }

    #[test]
    fn identical_readings_average_to_themselves() {
        let mut radio = Replay::new().with_probes(mhz(916_500), [Some(-75), Some(-75)]);
        assert_eq!(try_frequency(&mut radio, mhz(916_500), 2).signal, -75);

        let mut radio = Replay::new().with_probes(mhz(916_500), [Some(-61), Some(-61), Some(-61)]);
        assert_eq!(try_frequency(&mut radio, mhz(916_500), 3).signal, -61);
    }

    #[test]
    fn failed_attempts_are_not_averaged() {
        let mut radio = Replay::new().with_probes(mhz(916_500), [None, Some(-70), None]);

        let sample = try_frequency(&mut radio, mhz(916_500), 3);
        assert_eq!(sample.signal, -70);
        assert_eq!(sample.failed_attempts, 2);
    }

    #[test]
    fn no_answer_reports_minimum() {
        let mut radio = Replay::new();

        let sample = try_frequency(&mut radio, mhz(916_500), 2);
        assert_eq!(sample.signal, MIN_RSSI);
        assert_eq!(sample.failed_attempts, 2);
    }

    #[test]
    fn sweep_picks_strongest_signal() {
        let config = SweepConfig {
            start: mhz(916_000),
            end: mhz(916_200),
            step_hz: 50_000,
            sample_size: 2,
        };

        let mut radio = Replay::new()
            .with_probes(mhz(916_000), [Some(-90), Some(-92)])
            .with_probes(mhz(916_100), [Some(-60), None])
            .with_probes(mhz(916_150), [Some(-75), Some(-75)]);

        let result = search_frequencies(&mut radio, &config).unwrap();

        let signals: Vec<_> = result.samples().iter().map(|s| s.signal).collect();
        assert_eq!(signals, vec![-91, MIN_RSSI, -60, -75, MIN_RSSI]);
        assert_eq!(result.best(), mhz(916_100));
        assert_eq!(result.best_sample().map(|s| s.failed_attempts), Some(1));
        assert_eq!(radio.retries(), Some(1));
        assert_eq!(
            radio.tuned(),
            &[mhz(916_000), mhz(916_050), mhz(916_100), mhz(916_150), mhz(916_200)]
        );
    }

    #[test]
    fn ties_favour_lower_frequency() {
        let config = SweepConfig {
            start: mhz(916_000),
            end: mhz(916_100),
            step_hz: 50_000,
            sample_size: 1,
        };

        let mut radio = Replay::new()
            .with_probes(mhz(916_000), [Some(-80)])
            .with_probes(mhz(916_050), [Some(-65)])
            .with_probes(mhz(916_100), [Some(-65)]);

        let result = search_frequencies(&mut radio, &config).unwrap();
        assert_eq!(result.best(), mhz(916_050));
    }

    #[test]
    fn silent_sweep_defaults_to_start() {
        let config = SweepConfig::default();
        let result = search_frequencies(&mut Replay::new(), &config).unwrap();

        assert_eq!(result.samples().len(), 21);
        assert!(result.samples().iter().all(|s| s.signal == MIN_RSSI));
        assert_eq!(result.best(), config.start);
    }

    #[test]
    fn observer_sees_every_sample() {
        let config = SweepConfig::default();
        let mut seen = Vec::new();

        let result =
            search_frequencies_with(&mut Replay::new(), &config, |s| seen.push(s.frequency))
                .unwrap();

        let expected: Vec<_> = result.samples().iter().map(|s| s.frequency).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let base = SweepConfig::default();

        let zero_step = SweepConfig { step_hz: 0, ..base };
        assert_eq!(
            search_frequencies(&mut Replay::new(), &zero_step),
            Err(TuneError::ZeroStep)
        );

        let inverted = SweepConfig {
            start: base.end,
            end: base.start,
            ..base
        };
        assert!(matches!(
            inverted.validate(),
            Err(TuneError::EmptyRange { .. })
        ));

        let no_samples = SweepConfig {
            sample_size: 0,
            ..base
        };
        assert_eq!(no_samples.validate(), Err(TuneError::ZeroSampleSize));
    }

    #[test]
    fn single_frequency_range() {
        let config = SweepConfig {
            start: mhz(916_500),
            end: mhz(916_500),
            ..SweepConfig::default()
        };

        let result = search_frequencies(&mut Replay::new(), &config).unwrap();
        assert_eq!(result.samples().len(), 1);
    }

    #[test]
    fn render_marks_best() {
        let config = SweepConfig {
            start: mhz(916_000),
            end: mhz(916_050),
            step_hz: 50_000,
            sample_size: 1,
        };
        let mut radio = Replay::new()
            .with_probes(mhz(916_000), [Some(-126)])
            .with_probes(mhz(916_050), [Some(-125)]);

        let result = search_frequencies(&mut radio, &config).unwrap();
        let lines = crate::Logger::render(&result.as_log());

        assert_eq!(
            lines,
            vec![
                "Frequency sweep".to_string(),
                "  916.000: -126 ━━".to_string(),
                "  916.050: -125 ━━━ ⏺".to_string(),
                "  Best:    916.050".to_string(),
            ]
        );
    }
}
