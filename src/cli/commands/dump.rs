use crate::cli::load_or_default;
use crate::measure::MeasurementRegistry;
use crate::storage::MeasurementReader;
use clap::Args;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Args)]
pub struct DumpArgs {
    /// Measurement file
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Configuration file used for the score column
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append the weighted score of each record
    #[arg(long)]
    pub score: bool,

    /// Stop after this many records
    #[arg(long)]
    pub limit: Option<u64>,
}

pub fn run(args: DumpArgs) -> anyhow::Result<()> {
    let config = load_or_default(args.config.as_deref())?;
    let registry = MeasurementRegistry::with_builtins();
    let mut reader = MeasurementReader::open(&args.input, &registry)?.with_specs(&config.measurements);
    let mut vector = reader.new_vector()?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    write!(out, "#id")?;
    for name in reader.names() {
        write!(out, "\t{}", name)?;
    }
    if args.score {
        write!(out, "\tscore")?;
    }
    writeln!(out)?;

    let mut written = 0u64;
    while args.limit.map_or(true, |limit| written < limit) && reader.next_into(&mut vector)? {
        write!(out, "{}", vector.id())?;
        for value in vector.values() {
            write!(out, "\t{}", value)?;
        }
        if args.score {
            write!(out, "\t{:.6}", vector.score())?;
        }
        writeln!(out)?;
        written += 1;
    }
    out.flush()?;
    Ok(())
}
