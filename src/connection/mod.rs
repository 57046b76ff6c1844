mod command;
pub use command::Command;

mod frequency;
pub use frequency::{Frequency, ParseFrequencyError};

mod replay;
pub use replay::{Replay, ReplayError};

/// A link to a pump that can run commands and fetch history pages.
///
/// Implementations own the radio packet exchange, the wakeup handshake
/// and any transport-level retries. All calls block until the pump
/// answers or the implementation gives up.
pub trait PumpConnection {
    type Error: core::fmt::Debug;

    /// Run `command` and return the response payload.
    fn execute(&mut self, command: Command) -> Result<Vec<u8>, Self::Error>;

    /// Fetch the raw contents of history page `page`. Page 0 is the newest.
    fn history_page(&mut self, page: usize) -> Result<Vec<u8>, Self::Error>;

    /// The number of history pages the pump currently holds.
    fn history_page_count(&mut self) -> Result<usize, Self::Error>;
}

impl<T> PumpConnection for &mut T
where
    T: PumpConnection,
{
    type Error = T::Error;

    fn execute(&mut self, command: Command) -> Result<Vec<u8>, Self::Error> {
        (**self).execute(command)
    }

    fn history_page(&mut self, page: usize) -> Result<Vec<u8>, Self::Error> {
        (**self).history_page(page)
    }

    fn history_page_count(&mut self) -> Result<usize, Self::Error> {
        (**self).history_page_count()
    }
}

/// Control over the radio used to reach the pump.
pub trait RadioControl {
    type Error: core::fmt::Debug;

    fn set_frequency(&mut self, frequency: Frequency);

    /// Perform a lightweight exchange with the pump and return its
    /// outcome together with the RSSI measured for that exchange.
    ///
    /// The RSSI is only meaningful if the exchange succeeded.
    fn probe(&mut self) -> (Result<Vec<u8>, Self::Error>, i32);

    /// Limit the number of transport retries per exchange.
    fn set_retries(&mut self, retries: usize) {
        let _ = retries;
    }
}

impl<T> RadioControl for &mut T
where
    T: RadioControl,
{
    type Error = T::Error;

    fn set_frequency(&mut self, frequency: Frequency) {
        (**self).set_frequency(frequency)
    }

    fn probe(&mut self) -> (Result<Vec<u8>, Self::Error>, i32) {
        (**self).probe()
    }

    fn set_retries(&mut self, retries: usize) {
        (**self).set_retries(retries)
    }
}
