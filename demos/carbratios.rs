//! Print the carb ratio schedule and the ratio currently in effect.

mod common;

use clap::Parser;
use medtronic_rs::{LogOutput, Logger, Pump};

#[derive(Parser)]
struct CliOpts {
    #[clap(flatten)]
    common: common::CommonOpts,
}

fn main() -> std::io::Result<()> {
    common::init_logger();

    let opts = CliOpts::parse();
    let mut pump = Pump::new(opts.common.get_connection()?);

    let ratios = pump
        .carb_ratios()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    Logger::log(&LogOutput::StdOut, &ratios);

    let current = ratios.active_at(common::now());
    println!("Current carb ratio: {}", current.value);

    Ok(())
}
