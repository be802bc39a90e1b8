pub mod commands;

use crate::core::config::{load_config, Config};
use clap::{Parser, Subcommand};
use std::path::Path;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "oligoscan",
    version,
    about = "Genome-wide oligonucleotide probe candidate design",
    long_about = "oligoscan enumerates every candidate oligo of a genome within a window of \
                  lengths, scores each against configurable measurements, filters them on \
                  sequence content, ORF overlap and alignment uniqueness, and picks the best \
                  candidate per genomic window."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of chromosomes processed concurrently (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enumerate candidate oligos for every chromosome of a genome
    Generate(commands::generate::GenerateArgs),

    /// Measure candidates and persist their attribute vectors
    Measure(commands::measure::MeasureArgs),

    /// Apply measurement filters to a measurement file
    Filter(commands::filter::FilterArgs),

    /// Pick the best-scoring candidate per genomic window
    Select(commands::select::SelectArgs),

    /// Run generate, measure, filter and select end to end
    Run(commands::run::RunArgs),

    /// Print a measurement file as tab-separated text
    Dump(commands::dump::DumpArgs),
}

/// Load the configuration file if one was given, defaults otherwise
pub fn load_or_default(path: Option<&Path>) -> Result<Config, crate::OligoError> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_config(path)
        }
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
