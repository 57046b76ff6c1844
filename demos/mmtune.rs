//! Find the frequency at which the pump answers most strongly.
//!
//! Usage:
//!   # Sweep the default range
//!   cargo run --example mmtune
//!
//!   # Measure a single frequency
//!   cargo run --example mmtune -- 916.55

mod common;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use medtronic_rs::{
    connection::Frequency,
    tune::{self, SweepConfig},
    LogOutput, Logger,
};

#[derive(Parser)]
struct CliOpts {
    #[clap(flatten)]
    common: common::CommonOpts,

    /// Measure only this frequency (MHz or Hz)
    frequency: Option<Frequency>,

    /// First frequency of the sweep
    #[clap(long, default_value = "916.0")]
    start: Frequency,

    /// Last frequency of the sweep
    #[clap(long, default_value = "917.0")]
    end: Frequency,

    /// Step between frequencies, in Hz
    #[clap(long, default_value = "50000")]
    step: u32,

    /// Probe attempts per frequency
    #[clap(long, default_value = "2")]
    samples: usize,
}

fn main() -> std::io::Result<()> {
    common::init_logger();

    let opts = CliOpts::parse();
    let mut radio = opts.common.get_connection()?;

    let config = SweepConfig {
        start: opts.start,
        end: opts.end,
        step_hz: opts.step,
        sample_size: opts.samples,
    };

    config
        .validate()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    if let Some(frequency) = opts.frequency {
        let sample = tune::try_frequency(&mut radio, frequency, config.sample_size);
        println!("{}  {:4}", sample.frequency, sample.signal);
        return Ok(());
    }

    let steps = config.frequencies().count() as u64;
    let progress = ProgressBar::new(steps).with_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let result = tune::search_frequencies_with(&mut radio, &config, |sample| {
        progress.set_message(format!("{} MHz", sample.frequency));
        progress.inc(1);
    })
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    progress.finish_and_clear();

    Logger::log(&LogOutput::StdOut, &result);
    println!("{}", result.best());

    Ok(())
}
