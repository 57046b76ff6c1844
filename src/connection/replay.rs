use std::collections::{HashMap, VecDeque};

use super::{Command, Frequency, PumpConnection, RadioControl};

#[derive(Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// No response was recorded for this command.
    MissingResponse(Command),
    /// The requested page was not recorded.
    MissingPage(usize),
    /// The page was recorded as a failed transfer.
    PageFailed(usize),
    /// The pump did not answer a probe at this frequency.
    NoResponse(Frequency),
    /// A probe was attempted before any frequency was set.
    NoFrequency,
}

impl core::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReplayError::MissingResponse(cmd) => write!(f, "no recorded response for {cmd}"),
            ReplayError::MissingPage(page) => write!(f, "history page {page} was not recorded"),
            ReplayError::PageFailed(page) => write!(f, "transfer of history page {page} failed"),
            ReplayError::NoResponse(freq) => write!(f, "no response at {freq} MHz"),
            ReplayError::NoFrequency => write!(f, "radio frequency not set"),
        }
    }
}

impl std::error::Error for ReplayError {}

/// A connection that answers from previously recorded pump responses.
///
/// Useful for decoding captures offline and for exercising the
/// history and tuning logic without hardware.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    responses: HashMap<Command, Vec<u8>>,
    pages: Vec<Option<Vec<u8>>>,
    probes: HashMap<Frequency, VecDeque<Option<i32>>>,
    frequency: Option<Frequency>,
    retries: Option<usize>,
    fetched_pages: Vec<usize>,
    tuned: Vec<Frequency>,
}

impl Replay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, command: Command, data: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(command, data.into());
        self
    }

    /// Append the next history page.
    pub fn with_page(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.pages.push(Some(data.into()));
        self
    }

    /// Append a history page whose transfer fails.
    pub fn with_failed_page(mut self) -> Self {
        self.pages.push(None);
        self
    }

    /// Queue probe outcomes for `frequency`: `Some(rssi)` for an answered
    /// probe, `None` for a probe that got no response.
    pub fn with_probes<I>(mut self, frequency: Frequency, outcomes: I) -> Self
    where
        I: IntoIterator<Item = Option<i32>>,
    {
        self.probes
            .entry(frequency)
            .or_default()
            .extend(outcomes);
        self
    }

    /// The history pages fetched so far, in request order.
    pub fn fetched_pages(&self) -> &[usize] {
        &self.fetched_pages
    }

    /// Every frequency the radio was tuned to, in order.
    pub fn tuned(&self) -> &[Frequency] {
        &self.tuned
    }

    pub fn retries(&self) -> Option<usize> {
        self.retries
    }
}

impl PumpConnection for Replay {
    type Error = ReplayError;

    fn execute(&mut self, command: Command) -> Result<Vec<u8>, Self::Error> {
        log::trace!("Replaying response to {command}");

        self.responses
            .get(&command)
            .cloned()
            .ok_or(ReplayError::MissingResponse(command))
    }

    fn history_page(&mut self, page: usize) -> Result<Vec<u8>, Self::Error> {
        self.fetched_pages.push(page);

        match self.pages.get(page) {
            Some(Some(data)) => Ok(data.clone()),
            Some(None) => Err(ReplayError::PageFailed(page)),
            None => Err(ReplayError::MissingPage(page)),
        }
    }

    fn history_page_count(&mut self) -> Result<usize, Self::Error> {
        Ok(self.pages.len())
    }
}

impl RadioControl for Replay {
    type Error = ReplayError;

    fn set_frequency(&mut self, frequency: Frequency) {
        self.frequency = Some(frequency);
        self.tuned.push(frequency);
    }

    fn probe(&mut self) -> (Result<Vec<u8>, Self::Error>, i32) {
        let Some(frequency) = self.frequency else {
            return (Err(ReplayError::NoFrequency), i32::from(i8::MIN));
        };

        let outcome = self
            .probes
            .get_mut(&frequency)
            .and_then(|queue| queue.pop_front())
            .flatten();

        match outcome {
            Some(rssi) => {
                let model = self
                    .responses
                    .get(&Command::Model)
                    .cloned()
                    .unwrap_or_default();
                (Ok(model), rssi)
            }
            None => (
                Err(ReplayError::NoResponse(frequency)),
                i32::from(i8::MIN),
            ),
        }
    }

    fn set_retries(&mut self, retries: usize) {
        self.retries = Some(retries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probes_are_consumed_in_order() {
        let freq = Frequency::from_hz(916_500_000);
        let mut replay = Replay::new().with_probes(freq, [Some(-70), None]);

        replay.set_frequency(freq);

        assert_eq!(replay.probe().1, -70);
        assert_eq!(replay.probe().0, Err(ReplayError::NoResponse(freq)));
        assert_eq!(replay.probe().0, Err(ReplayError::NoResponse(freq)));
        assert_eq!(replay.tuned(), &[freq]);
    }

    #[test]
    fn probe_without_frequency_fails() {
        let mut replay = Replay::new();
        assert_eq!(replay.probe().0, Err(ReplayError::NoFrequency));
    }

    #[test]
    fn pages_are_tracked() {
        let mut replay = Replay::new().with_page(vec![0u8; 4]).with_failed_page();

        assert_eq!(replay.history_page_count(), Ok(2));
        assert_eq!(replay.history_page(0), Ok(vec![0u8; 4]));
        assert_eq!(replay.history_page(1), Err(ReplayError::PageFailed(1)));
        assert_eq!(replay.history_page(2), Err(ReplayError::MissingPage(2)));
        assert_eq!(replay.fetched_pages(), &[0, 1, 2]);
    }
}
