//! EDC Ingest CLI - Normalize EDC energy-sharing exports
//!
//! # Commands
//!
//! ```bash
//! edc-ingest ingest alokace.csv prenosy.csv -o graph.json   # Full run to JSON
//! edc-ingest groups skupiny.csv                             # Sharing groups to JSON
//! edc-ingest stations alokace.csv prenosy.csv               # List discovered stations
//! edc-ingest transfers alokace.csv prenosy.csv --ean 8591…  # Transfers leaving a station
//! ```
//!
//! Defaults come from `EDC_*` environment variables (and `.env`); flags
//! override them.

use clap::{Args, Parser, Subcommand};
use edc_ingest::logs::LOG_BROADCASTER;
use edc_ingest::{ingest_files, load_sharing_groups, AllocationLayout, IngestOptions, IngestResult};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "edc-ingest")]
#[command(about = "Normalize EDC energy-sharing exports into a station graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full run: allocations + transfer matrix → JSON
    Ingest {
        /// Allocation export
        allocations: PathBuf,

        /// Transfer matrix export
        transfers: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Fold a sharing-group export into groups
    Groups {
        /// Sharing-group export
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// List the stations discovered in both exports
    Stations {
        allocations: PathBuf,
        transfers: PathBuf,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// List transfers sent by one station
    Transfers {
        allocations: PathBuf,
        transfers: PathBuf,

        /// EAN of the sending station
        #[arg(long)]
        ean: String,

        /// Print at most this many transfers
        #[arg(short, long)]
        limit: Option<usize>,

        #[command(flatten)]
        read: ReadArgs,
    },
}

/// Flags shared by every command that reads exports
#[derive(Args)]
struct ReadArgs {
    /// CSV delimiter (default: ';')
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Force an encoding instead of detecting it
    #[arg(short, long)]
    encoding: Option<String>,

    /// Slot layout of the allocation export
    #[arg(long, value_parser = parse_layout)]
    layout: Option<AllocationLayout>,

    /// Do not echo pipeline logs
    #[arg(short, long)]
    quiet: bool,
}

impl ReadArgs {
    /// Resolve options and apply the log echo setting.
    fn options(&self) -> IngestOptions {
        let mut options = IngestOptions::from_env();
        if let Some(delimiter) = self.delimiter {
            options = options.with_delimiter(delimiter);
        }
        if let Some(ref encoding) = self.encoding {
            options = options.with_encoding(encoding.clone());
        }
        if let Some(layout) = self.layout {
            options = options.with_layout(layout);
        }
        if self.quiet {
            options = options.with_quiet(true);
        }
        LOG_BROADCASTER.set_echo(!options.quiet);
        options
    }
}

fn parse_layout(value: &str) -> Result<AllocationLayout, String> {
    AllocationLayout::from_name(value)
        .ok_or_else(|| format!("unknown layout '{}' (expected interleaved or blocked)", value))
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ingest {
            allocations,
            transfers,
            output,
            read,
        } => cmd_ingest(&allocations, &transfers, output.as_deref(), &read.options()),

        Commands::Groups { input, output, read } => cmd_groups(&input, output.as_deref(), &read.options()),

        Commands::Stations {
            allocations,
            transfers,
            read,
        } => cmd_stations(&allocations, &transfers, &read.options()),

        Commands::Transfers {
            allocations,
            transfers,
            ean,
            limit,
            read,
        } => cmd_transfers(&allocations, &transfers, &ean, limit, &read.options()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_ingest(
    allocations: &Path,
    transfers: &Path,
    output: Option<&Path>,
    options: &IngestOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = ingest_files(allocations, transfers, options)?;

    eprintln!("\n📊 {}", result.summary());

    let json = serde_json::to_string_pretty(&result)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_groups(input: &Path, output: Option<&Path>, options: &IngestOptions) -> Result<(), Box<dyn std::error::Error>> {
    let groups = load_sharing_groups(input, options)?;

    let json = serde_json::to_string_pretty(&groups)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_stations(allocations: &Path, transfers: &Path, options: &IngestOptions) -> Result<(), Box<dyn std::error::Error>> {
    let result = ingest_files(allocations, transfers, options)?;

    eprintln!("\n📋 Stations ({}):\n", result.stations.len());
    for station in &result.stations {
        let kind = station.kind.map(|k| k.code()).unwrap_or("-");
        let sent = result.transfers_from(station.id).count();
        let received = result.transfers_to(station.id).count();
        println!("{:>5}  {:<20} {:<7} sent {:>6}  received {:>6}", station.id, station.ean, kind, sent, received);
    }

    Ok(())
}

fn cmd_transfers(
    allocations: &Path,
    transfers: &Path,
    ean: &str,
    limit: Option<usize>,
    options: &IngestOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = ingest_files(allocations, transfers, options)?;

    let station = result
        .station_by_ean(ean)
        .ok_or_else(|| format!("Station not found: {}", ean))?;

    eprintln!("\n⚡ Transfers from {} (id {}):\n", station.ean, station.id);
    let sent: Vec<_> = result.transfers_from(station.id).collect();
    for transfer in sent.iter().take(limit.unwrap_or(usize::MAX)) {
        print_transfer(&result, transfer);
    }
    if let Some(limit) = limit.filter(|&l| l < sent.len()) {
        eprintln!("   ... +{} more", sent.len() - limit);
    }

    Ok(())
}

fn print_transfer(result: &IngestResult, transfer: &edc_ingest::EnergyTransfer) {
    let to = result
        .station(transfer.to_station_id)
        .map(|s| s.ean.as_str())
        .unwrap_or("?");
    match result.period(transfer.time_period_id) {
        Some(period) => println!(
            "{}  {} - {}  → {:<20} {} {}",
            period.start.format("%d.%m.%Y"),
            period.start.format("%H:%M"),
            period.end.format("%H:%M"),
            to,
            transfer.value,
            transfer.unit
        ),
        None => println!("{:>16}  → {:<20} {} {}", "?", to, transfer.value, transfer.unit),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
