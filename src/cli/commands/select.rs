use crate::cli::load_or_default;
use crate::core::selector::{select_file, write_selections};
use crate::measure::MeasurementRegistry;
use clap::Args;
use colored::*;
use std::path::PathBuf;

#[derive(Args)]
pub struct SelectArgs {
    /// Measurement file to select from
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Unfiltered measurement file whose records normalize population-based
    /// scores; defaults to the input
    #[arg(short, long, value_name = "FILE")]
    pub population: Option<PathBuf>,

    /// Tab-separated selection output
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Configuration file (weights and measurement parameters)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Genomic window width; defaults to the configured step or window size
    #[arg(short, long)]
    pub step: Option<u64>,
}

pub fn run(args: SelectArgs) -> anyhow::Result<()> {
    let config = load_or_default(args.config.as_deref())?;
    let step = args.step.unwrap_or_else(|| config.selection_step());
    let registry = MeasurementRegistry::with_builtins();

    let population = args.population.as_ref().unwrap_or(&args.input);
    let selections = select_file(&args.input, population, &registry, &config.measurements, step)?;
    write_selections(&args.output, &selections)?;

    println!(
        "{} Selected {} candidates (step {}) into {}",
        "✓".green().bold(),
        selections.len(),
        step,
        args.output.display()
    );
    Ok(())
}
