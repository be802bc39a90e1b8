use crate::cli::load_or_default;
use crate::core::generator::{CandidateGenerator, FastaDirSink};
use crate::core::pipeline::CHROMOSOMES_FILE;
use crate::storage::save_json;
use clap::Args;
use colored::*;
use std::path::PathBuf;

#[derive(Args)]
pub struct GenerateArgs {
    /// Genome FASTA file (optionally gzipped)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Directory receiving one candidate FASTA per chromosome
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Central candidate length
    #[arg(short = 'w', long)]
    pub size: Option<usize>,

    /// Half-width of the candidate length range
    #[arg(short = 'n', long)]
    pub interval: Option<usize>,

    /// Report 1-based start coordinates in candidate names
    #[arg(long)]
    pub start1: bool,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let mut config = load_or_default(args.config.as_deref())?;
    if let Some(size) = args.size {
        config.window.size = size;
    }
    if let Some(interval) = args.interval {
        config.window.interval = interval;
    }
    if args.start1 {
        config.window.start1 = true;
    }

    let mut generator = CandidateGenerator::new(config.window)?;
    let mut sink = FastaDirSink::new(&args.output)?.with_line_width(config.output.line_width);
    let lengths = generator.generate_file(&args.input, &mut sink)?;
    save_json(args.output.join(CHROMOSOMES_FILE), &lengths)?;

    println!(
        "{} {} candidates ({}..={} nt) from {} chromosome(s) in {}",
        "✓".green().bold(),
        generator.emitted(),
        config.window.min_size(),
        config.window.max_size(),
        lengths.len(),
        args.output.display()
    );
    Ok(())
}
