//! Print recent pump history.
//!
//! Usage:
//!   # Records from the last 6 hours
//!   cargo run --example pumphistory
//!
//!   # Every record on the pump
//!   cargo run --example pumphistory -- -a

mod common;

use clap::Parser;
use medtronic_rs::{history::Cutoff, LogOutput, Logger, Pump};

#[derive(Parser)]
struct CliOpts {
    #[clap(flatten)]
    common: common::CommonOpts,

    /// Get the entire pump history
    #[clap(short, long)]
    all: bool,

    /// Number of hours of history to get
    #[clap(short = 'n', long, default_value = "6")]
    hours: u32,
}

fn main() -> std::io::Result<()> {
    common::init_logger();

    let opts = CliOpts::parse();
    let mut pump = Pump::new(opts.common.get_connection()?);

    let cutoff = if opts.all {
        Cutoff::All
    } else {
        Cutoff::hours_before(common::now(), opts.hours)
    };

    let history = pump
        .history(cutoff)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let mut count = 0;
    for record in history {
        let record = record.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Logger::log(&LogOutput::StdOut, &record);
        count += 1;
    }

    log::info!("Read {count} records");

    Ok(())
}
