//! DRAM timing engine CLI.
//!
//! This binary drives the engine from the command line. It performs:
//! 1. **Trace run:** Feed a JSON-lines request trace through the built-in controller and
//!    print statistics, optionally dumping the issued command stream.
//! 2. **Config check:** Validate a JSON configuration without running anything.
//!
//! Log verbosity follows `RUST_LOG` (for example `RUST_LOG=minirank_core=debug`).

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use minirank_core::Config;
use minirank_core::dram::RecordedCommand;
use minirank_core::sim::{TraceController, load_trace};

#[derive(Parser, Debug)]
#[command(
    name = "minirank",
    author,
    version,
    about = "Cycle-exact DRAM timing and command-scheduling engine",
    long_about = "Run a request trace through a DRAM channel model, or check a configuration.\n\nTraces are JSON lines: {\"at\": 0, \"rank\": 0, \"bank\": 3, \"row\": 5, \"is_read\": true}\n\nExamples:\n  minirank run --trace reads.jsonl\n  minirank run --config ddr4.json --trace mix.jsonl --commands cmds.jsonl\n  minirank check ddr4.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a request trace through the built-in controller.
    Run {
        /// JSON configuration; defaults apply when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON-lines request trace.
        #[arg(short, long)]
        trace: PathBuf,

        /// Write the command stream as JSON lines ("-" for stdout).
        #[arg(long)]
        commands: Option<PathBuf>,

        /// Statistics sections to print (summary, latency, banks, power).
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,
    },

    /// Validate a JSON configuration.
    Check {
        /// Configuration path.
        path: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            config,
            trace,
            commands,
            stats,
        } => cmd_run(config.as_deref(), &trace, commands.as_deref(), &stats),
        Commands::Check { path } => cmd_check(&path),
    };

    if let Err(message) = result {
        error!("{message}");
        eprintln!("Error: {message}");
        process::exit(1);
    }
}

/// Loads `path` as a configuration, or the defaults when `None`.
fn load_config(path: Option<&Path>) -> Result<Config, String> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let json = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
    Config::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))
}

/// Runs a trace and reports statistics.
///
/// # Arguments
///
/// * `config` - Optional configuration path.
/// * `trace` - Trace path.
/// * `commands` - Optional command stream destination.
/// * `sections` - Statistics sections; empty prints all.
fn cmd_run(
    config: Option<&Path>,
    trace: &Path,
    commands: Option<&Path>,
    sections: &[String],
) -> Result<(), String> {
    let config = load_config(config)?;
    let records = load_trace(trace).map_err(|e| format!("{}: {e}", trace.display()))?;
    info!(path = %trace.display(), requests = records.len(), "trace loaded");

    let controller = TraceController::new(&config, records).map_err(|e| e.to_string())?;
    let report = controller.run().map_err(|e| e.to_string())?;

    println!(
        "[*] Served {} requests, finished at tick {}",
        report.served, report.end_tick
    );
    report.stats.print_sections(sections);

    if let Some(dest) = commands {
        write_commands(dest, &report.commands)
            .map_err(|e| format!("failed to write commands to {}: {e}", dest.display()))?;
    }
    Ok(())
}

fn write_commands(dest: &Path, commands: &[RecordedCommand]) -> io::Result<()> {
    let sink: Box<dyn Write> = if dest == Path::new("-") {
        Box::new(io::stdout().lock())
    } else {
        Box::new(fs::File::create(dest)?)
    };
    let mut out = BufWriter::new(sink);
    for command in commands {
        serde_json::to_writer(&mut out, command)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

fn cmd_check(path: &Path) -> Result<(), String> {
    let config = load_config(Some(path))?;
    println!(
        "[*] {}: OK ({} ranks x {} banks, {} B bursts, {} B rows)",
        path.display(),
        config.device.ranks_per_channel,
        config.device.banks_per_rank,
        config.burst_size(),
        config.row_buffer_size()
    );
    Ok(())
}
