//! wmr: streaming map/reduce shim
//!
//! Usage: wmr <COMMAND> [OPTIONS]

use clap::{ArgAction, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process;
use tracing::{debug, info};

use wmr_stream::commands::{
    verify_sorted_source, BuiltinMapper, BuiltinReducer, MapCommand, ReduceCommand,
};
use wmr_stream::config;
use wmr_stream::kv::{LineReader, Result, WmrError};

#[derive(Parser)]
#[command(name = "wmr")]
#[command(version)]
#[command(about = "Streaming map/reduce shim: key<TAB>value lines in, key<TAB>value lines out", long_about = None)]
struct Cli {
    /// Key/value delimiter: a single byte, \t, tab, or \xHH
    #[arg(long, short = 'd', global = true, default_value = "\\t")]
    delimiter: String,

    /// Increase log verbosity on stderr (-v, -vv, -vvv)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Use small I/O buffers
    #[arg(long, global = true)]
    low_memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mapper over key/value lines
    Map {
        /// Input file (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Built-in mapper to run
        #[arg(short, long, default_value = "identity", value_parser = ["identity", "words", "swap"])]
        mapper: String,

        /// Print statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Run a reducer over sorted key/value lines
    Reduce {
        /// Input file (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Built-in reducer to run
        #[arg(short, long, default_value = "identity", value_parser = ["identity", "sum", "count"])]
        reducer: String,

        /// Fail if group keys are not in ascending bytewise order
        #[arg(long)]
        verify_sorted: bool,

        /// Print statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Check that reducer input is grouped in ascending key order
    Check {
        /// Input file (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries records; diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose >= 2)
        .with_line_number(verbose >= 3)
        .init();

    debug!("wmr started with verbosity level: {}", verbose);
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = config::parse_delimiter(&cli.delimiter).and_then(|delimiter| {
        // Must be set before any reader or writer is built
        config::set_delimiter(delimiter);

        match cli.command {
            Commands::Map {
                input,
                mapper,
                stats,
            } => run_map(input, &mapper, stats, cli.low_memory),
            Commands::Reduce {
                input,
                reducer,
                verify_sorted,
                stats,
            } => run_reduce(input, &reducer, verify_sorted, stats, cli.low_memory),
            Commands::Check { input } => run_check(input),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_map(input: Option<PathBuf>, mapper: &str, stats: bool, low_memory: bool) -> Result<()> {
    let mut mapper = BuiltinMapper::from_str(mapper)
        .ok_or_else(|| WmrError::InvalidArgument(format!("unknown mapper '{}'", mapper)))?;
    let cmd = MapCommand::new().with_low_memory(low_memory);

    let stdout = io::stdout();
    let handle = stdout.lock();

    let result = match input {
        Some(path) if path.as_os_str() != "-" => cmd.run(path, handle, &mut mapper)?,
        _ => cmd.run_stdin(handle, &mut mapper)?,
    };

    if stats {
        eprintln!("{}", result);
    }
    Ok(())
}

fn run_reduce(
    input: Option<PathBuf>,
    reducer: &str,
    verify_sorted: bool,
    stats: bool,
    low_memory: bool,
) -> Result<()> {
    let mut reducer = BuiltinReducer::from_str(reducer)
        .ok_or_else(|| WmrError::InvalidArgument(format!("unknown reducer '{}'", reducer)))?;
    let cmd = ReduceCommand::new()
        .with_verify_sorted(verify_sorted)
        .with_low_memory(low_memory);

    let stdout = io::stdout();
    let handle = stdout.lock();

    let result = match input {
        Some(path) if path.as_os_str() != "-" => cmd.run(path, handle, &mut reducer)?,
        _ => cmd.run_stdin(handle, &mut reducer)?,
    };

    if stats {
        eprintln!("{}", result);
    }
    Ok(())
}

fn run_check(input: Option<PathBuf>) -> Result<()> {
    let delimiter = config::delimiter();
    let groups = match input {
        Some(path) if path.as_os_str() != "-" => {
            verify_sorted_source(LineReader::from_path(path)?, delimiter)?
        }
        _ => {
            let stdin = io::stdin();
            verify_sorted_source(LineReader::new(stdin.lock()), delimiter)?
        }
    };

    info!(groups, "input is sorted");
    eprintln!("Sorted: {} groups", groups);
    Ok(())
}
