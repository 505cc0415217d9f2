mod cli;
mod config;
mod emissions;
mod estimate;
mod input;
mod logging;
mod tracker;

use std::io::{self, Write};

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::debug;

use cli::Cli;
use config::UserConfig;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = UserConfig::load();
    let _log_guard = logging::init(config.log_level, config.log_output.into(), cli.log_level);

    let request = input::read_request(io::stdin().lock());
    debug!(duration_s = request.duration_seconds, "Tracking emissions");

    let report = emissions::track_emissions(request.duration_seconds, &config);

    let json = if cli.pretty {
        report.to_json_pretty()?
    } else {
        report.to_json()?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    stdout.flush()?;

    Ok(())
}
