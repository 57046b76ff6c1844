use std::{io::ErrorKind, path::PathBuf};

use clap::Parser;
use medtronic_rs::connection::{Command, Frequency, ParseFrequencyError, Replay};
use time::{OffsetDateTime, PrimitiveDateTime};

#[derive(Parser)]
pub struct CommonOpts {
    /// Capture file with recorded pump responses
    #[clap(default_value = "demos/capture.txt", long, short)]
    capture: PathBuf,
}

fn error<T>(val: T) -> std::io::Error
where
    T: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    std::io::Error::new(ErrorKind::Other, val)
}

impl CommonOpts {
    /// Load the capture file into a [`Replay`] connection.
    ///
    /// Each non-empty line not starting with `#` is one of:
    ///
    /// * `cmd <opcode> <hex data>`: the response to a command
    /// * `page <hex data>`: the next history page
    /// * `probe <frequency> <rssi|-> ...`: probe outcomes at a frequency
    pub fn get_connection(&self) -> std::io::Result<Replay> {
        let contents = std::fs::read_to_string(&self.capture)?;
        let mut replay = Replay::new();

        for (number, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let bad_line =
                |msg: &str| error(format!("{}:{}: {msg}", self.capture.display(), number + 1));

            let mut words = line.split_whitespace();
            replay = match words.next() {
                Some("cmd") => {
                    let opcode = words.next().ok_or_else(|| bad_line("missing opcode"))?;
                    let opcode =
                        u8::from_str_radix(opcode, 16).map_err(|_| bad_line("bad opcode"))?;
                    let data = hex::decode(words.next().unwrap_or_default())
                        .map_err(|e| bad_line(&e.to_string()))?;
                    replay.with_response(Command::from(opcode), data)
                }
                Some("page") => {
                    let data = hex::decode(words.next().unwrap_or_default())
                        .map_err(|e| bad_line(&e.to_string()))?;
                    replay.with_page(data)
                }
                Some("probe") => {
                    let frequency: Frequency = words
                        .next()
                        .ok_or_else(|| bad_line("missing frequency"))?
                        .parse()
                        .map_err(|e: ParseFrequencyError| bad_line(&e.to_string()))?;

                    let outcomes = words
                        .map(|w| match w {
                            "-" => Ok(None),
                            rssi => rssi.parse().map(Some).map_err(|_| bad_line("bad rssi")),
                        })
                        .collect::<Result<Vec<Option<i32>>, _>>()?;

                    replay.with_probes(frequency, outcomes)
                }
                _ => return Err(bad_line("unknown directive")),
            };
        }

        log::debug!("Loaded capture {}", self.capture.display());

        Ok(replay)
    }
}

pub fn init_logger() {
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or("info".to_string()))
        .init();
}

/// The current UTC time without an offset, as the pump keeps it.
#[allow(dead_code)]
pub fn now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}
