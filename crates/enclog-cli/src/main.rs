//! enclog CLI - Encoder log scanning and cross-run merging

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use enclog::ScanConfig;
use tracing_subscriber::EnvFilter;

mod commands;

/// Video encoder log ingestion tool.
#[derive(Parser)]
#[command(name = "enclog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse logs and show the sequence/config/qp tree
    Scan {
        /// Simulation directories or log files
        #[arg(required = true)]
        urls: Vec<PathBuf>,

        #[command(flatten)]
        scan: ScanArgs,

        /// Print parsed records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge summary data of all runs by sequence and config
    Merge {
        /// Simulation directories or log files
        #[arg(required = true)]
        urls: Vec<PathBuf>,

        #[command(flatten)]
        scan: ScanArgs,

        /// Output JSON file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write one CSV row per (bitrate, value) point
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Worker threads (default: all cores)
    #[arg(short, long, env = "ENCLOG_THREADS")]
    threads: Option<usize>,

    /// Log filename suffix
    #[arg(long, default_value = enclog::scan::DEFAULT_SUFFIX)]
    suffix: String,

    /// Do not look into <dir>/log when <dir> has no logs
    #[arg(long)]
    no_log_subdir: bool,

    /// Treat logs without summary block as failures
    #[arg(long)]
    require_summary: bool,
}

impl ScanArgs {
    fn config(&self) -> ScanConfig {
        let mut builder = ScanConfig::builder()
            .suffix(&self.suffix)
            .search_log_subdir(!self.no_log_subdir)
            .require_summary(self.require_summary);
        if let Some(threads) = self.threads {
            builder = builder.threads(threads);
        }
        builder.build()
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Scan { urls, scan, json } => {
            commands::scan::run(&urls, scan.config(), json, cli.verbose)
        }
        Commands::Merge { urls, scan, output, csv } => {
            commands::merge::run(&urls, scan.config(), output, csv, cli.verbose)
        }
    }
}
