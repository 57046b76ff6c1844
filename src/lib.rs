//! medtronic-rs: decoding and radio tuning for Medtronic insulin pumps.
//!
//! This library decodes the schedules and history pages a pump reports
//! (in the [`schedule`] and [`history`] modules), and finds the best
//! radio frequency to reach a pump with (in the [`tune`] module). The
//! radio link itself is abstracted by the traits in [`connection`].

pub mod connection;

mod error;
pub use error::{DecodeError, PumpError};

pub mod history;

mod model;
pub use model::PumpModel;

pub mod schedule;

pub mod tune;

#[macro_use]
mod fmt;
#[cfg(test)]
mod tests;

pub use fmt::{LogItem, LogOutput, Loggable, Logger};

use connection::{Command, PumpConnection};
use history::{Cutoff, HistoryPage, HistoryRecord};
use schedule::{Schedule, ScheduleFormat};

pub struct Pump<CON> {
    inner: CON,
}

impl<CON> Pump<CON> {
    pub fn release(self) -> CON {
        self.inner
    }
}

impl<CON> From<CON> for Pump<CON>
where
    CON: PumpConnection,
{
    fn from(value: CON) -> Self {
        Self::new(value)
    }
}

impl<CON> Pump<CON>
where
    CON: PumpConnection,
{
    pub fn inner_mut(&mut self) -> &mut CON {
        &mut self.inner
    }

    pub fn new(inner: CON) -> Self {
        Self { inner }
    }

    pub fn execute(&mut self, command: Command) -> Result<Vec<u8>, PumpError<CON::Error>> {
        Ok(self.inner.execute(command)?)
    }

    pub fn model(&mut self) -> Result<PumpModel, PumpError<CON::Error>> {
        let data = self.execute(Command::Model)?;

        PumpModel::from_data(&data).map_err(|error| PumpError::Decode {
            command: Command::Model,
            error,
        })
    }

    fn schedule(
        &mut self,
        command: Command,
        format: ScheduleFormat,
    ) -> Result<Schedule, PumpError<CON::Error>> {
        let data = self.execute(command)?;
        Ok(Schedule::decode(&data, format))
    }

    pub fn basal_rates(&mut self) -> Result<Schedule, PumpError<CON::Error>> {
        self.schedule(Command::BasalRates, ScheduleFormat::BASAL_RATES)
    }

    pub fn basal_pattern_a(&mut self) -> Result<Schedule, PumpError<CON::Error>> {
        self.schedule(Command::BasalPatternA, ScheduleFormat::BASAL_RATES)
    }

    pub fn basal_pattern_b(&mut self) -> Result<Schedule, PumpError<CON::Error>> {
        self.schedule(Command::BasalPatternB, ScheduleFormat::BASAL_RATES)
    }

    pub fn carb_ratios(&mut self) -> Result<Schedule, PumpError<CON::Error>> {
        self.schedule(Command::CarbRatios, ScheduleFormat::CARB_RATIOS)
    }

    /// Stream history records, newest first, until `cutoff` is reached.
    ///
    /// This queries the pump model (to select the record encoding) and
    /// the number of history pages before returning.
    pub fn history(
        &mut self,
        cutoff: Cutoff,
    ) -> Result<HistoryIter<&mut CON>, PumpError<CON::Error>> {
        let newer = self.model()?.is_newer();
        let page_count = self.inner.history_page_count()?;

        match cutoff {
            Cutoff::All => log::info!("Retrieving {page_count} pages of records"),
            Cutoff::Since(t) => {
                log::info!("Retrieving records since {}", history::DisplayTime(&t))
            }
        }

        Ok(HistoryIter::new(&mut self.inner, page_count, newer, cutoff))
    }
}

/// Where a [`HistoryIter`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Running,
    /// Every page was read.
    Exhausted,
    /// A record older than the cutoff was found.
    CutoffReached,
    /// A page could not be fetched or decoded.
    Failed,
}

/// Reads history pages one at a time and yields their records.
///
/// Once the iterator has stopped, for whatever reason, it only ever
/// returns `None`. A failure is yielded exactly once as an `Err` item.
pub struct HistoryIter<CON> {
    connection: CON,
    page_count: usize,
    next_page: usize,
    newer: bool,
    cutoff: Cutoff,
    pending: std::vec::IntoIter<HistoryRecord>,
    state: StreamState,
}

impl<CON> HistoryIter<CON>
where
    CON: PumpConnection,
{
    pub fn new(connection: CON, page_count: usize, newer: bool, cutoff: Cutoff) -> Self {
        Self {
            connection,
            page_count,
            next_page: 0,
            newer,
            cutoff,
            pending: Vec::new().into_iter(),
            state: StreamState::Running,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The number of pages fetched so far.
    pub fn pages_read(&self) -> usize {
        self.next_page
    }

    fn fail(&mut self, error: PumpError<CON::Error>) -> Option<<Self as Iterator>::Item> {
        log::error!("Stopping history retrieval: {error:?}");
        self.state = StreamState::Failed;
        self.pending = Vec::new().into_iter();
        Some(Err(error))
    }
}

impl<CON> Iterator for HistoryIter<CON>
where
    CON: PumpConnection,
{
    type Item = Result<HistoryRecord, PumpError<CON::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.state == StreamState::Running {
            if let Some(record) = self.pending.next() {
                if self.cutoff.is_past(&record) {
                    if let Some(t) = &record.time {
                        log::info!("Stopping at timestamp {}", history::DisplayTime(t));
                    }
                    self.state = StreamState::CutoffReached;
                    return None;
                }

                return Some(Ok(record));
            }

            if self.next_page >= self.page_count {
                self.state = StreamState::Exhausted;
                return None;
            }

            let page = self.next_page;
            self.next_page += 1;
            log::info!("Scanning page {page}");

            let data = match self.connection.history_page(page) {
                Ok(data) => data,
                Err(e) => return self.fail(PumpError::Connection(e)),
            };

            match HistoryPage::from_data(&data, self.newer) {
                Ok(decoded) => self.pending = decoded.into_records().into_iter(),
                Err(error) => return self.fail(PumpError::History { page, error }),
            }
        }

        None
    }
}

impl<CON> core::iter::FusedIterator for HistoryIter<CON> where CON: PumpConnection {}
