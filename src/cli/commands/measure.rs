use crate::cli::load_or_default;
use crate::core::pipeline::measure_file;
use crate::filter::FilterRegistry;
use crate::measure::MeasurementRegistry;
use crate::resources::ResourceCache;
use clap::Args;
use colored::*;
use std::path::PathBuf;

#[derive(Args)]
pub struct MeasureArgs {
    /// Candidate FASTA file
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Measurement file to write
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub fn run(args: MeasureArgs) -> anyhow::Result<()> {
    let config = load_or_default(args.config.as_deref())?;
    let registry = MeasurementRegistry::with_builtins();
    let filters = FilterRegistry::with_builtins();
    let mut chain = filters.sequence_chain(&config.sequence_filters)?;

    let counts = measure_file(
        &args.input,
        &args.output,
        &registry,
        &config.measurements,
        &mut chain,
        &ResourceCache::new(),
    )?;

    println!(
        "{} Measured {} of {} candidates into {}",
        "✓".green().bold(),
        counts.written,
        counts.read,
        args.output.display()
    );
    for stats in &counts.filters {
        println!("  {:<12} rejected {}", stats.name, stats.rejected);
    }
    Ok(())
}
