use clap::Parser;
use colored::*;
use oligoscan::cli::{Cli, Commands};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // OLIGOSCAN_LOG wins over -v
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let log_level = std::env::var("OLIGOSCAN_LOG").unwrap_or_else(|_| default_level.to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<oligoscan::OligoError>() {
            Some(oligoscan::OligoError::Config(_)) => 2,
            Some(oligoscan::OligoError::Io(_)) => 3,
            Some(oligoscan::OligoError::Parse(_)) | Some(oligoscan::OligoError::Alignment(_)) => 4,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => oligoscan::cli::commands::generate::run(args),
        Commands::Measure(args) => oligoscan::cli::commands::measure::run(args),
        Commands::Filter(args) => oligoscan::cli::commands::filter::run(args),
        Commands::Select(args) => oligoscan::cli::commands::select::run(args),
        Commands::Run(args) => oligoscan::cli::commands::run::run(args, cli.threads),
        Commands::Dump(args) => oligoscan::cli::commands::dump::run(args),
    }
}
