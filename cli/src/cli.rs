use clap::Parser;

use crate::config::LogLevel;

/// Measure or estimate the CO2 emitted over a time window.
///
/// Reads `{"duration_seconds": N}` from stdin, tracks power draw for N
/// seconds and prints the emissions report as JSON on stdout.
#[derive(Debug, Parser)]
#[command(name = "carbon-track", version, verbatim_doc_comment)]
pub struct Cli {
    /// Override the configured log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty: bool,
}
