use crate::cli::load_or_default;
use crate::core::pipeline::{Pipeline, RunReport};
use clap::Args;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// Genome FASTA file; omit with --resume to reuse generated candidates
    #[arg(short, long, value_name = "FILE", required_unless_present = "resume")]
    pub input: Option<PathBuf>,

    /// Run directory
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Skip generation and process the candidates already in the run directory
    #[arg(long, conflicts_with = "input")]
    pub resume: bool,
}

pub fn run(args: RunArgs, threads: usize) -> anyhow::Result<()> {
    let mut config = load_or_default(args.config.as_deref())?;
    if threads > 0 {
        config.performance.threads = threads;
    }

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} chromosomes")?
            .progress_chars("##-"),
    );

    let pipeline = Pipeline::new(config, &args.output)?.with_progress(progress.clone());
    let report = match &args.input {
        Some(genome) if !args.resume => pipeline.run(genome)?,
        _ => pipeline.resume()?,
    };
    progress.finish_and_clear();

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!(
        "{} {} chromosome(s) in {:.1}s",
        "✓".green().bold(),
        report.units.len(),
        report.elapsed_secs
    );
    println!(
        "  {:<22} {}",
        "candidates",
        report.generated.to_string().bold()
    );
    println!("  {:<22} {}", "measured", report.measured());
    println!("  {:<22} {}", "passed filters", report.filtered());
    println!(
        "  {:<22} {}",
        "selected",
        report.selected().to_string().green()
    );
}
