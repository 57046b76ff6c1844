//! Print the basal rate schedules and the rate currently in effect.

mod common;

use clap::Parser;
use medtronic_rs::{schedule::format_offset, LogOutput, Logger, Pump};

#[derive(Parser)]
struct CliOpts {
    #[clap(flatten)]
    common: common::CommonOpts,
}

fn main() -> std::io::Result<()> {
    common::init_logger();

    let opts = CliOpts::parse();
    let mut pump = Pump::new(opts.common.get_connection()?);

    let rates = pump
        .basal_rates()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    Logger::log(&LogOutput::StdOut, &rates);

    for (name, pattern) in [("A", pump.basal_pattern_a()), ("B", pump.basal_pattern_b())] {
        match pattern {
            Ok(schedule) => {
                println!("Pattern {name}:");
                Logger::log(&LogOutput::StdOut, &schedule);
            }
            Err(e) => log::warn!("Could not read basal pattern {name}: {e}"),
        }
    }

    let current = rates.active_at(common::now());
    println!(
        "Current basal rate: {} mU/h since {}",
        current.value,
        format_offset(current.start)
    );

    Ok(())
}
