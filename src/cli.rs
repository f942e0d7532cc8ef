//! Command-line interface definition.
//!
//! One target per invocation; everything else is flags. Parsing of the
//! port expression and target string happens later so that errors can
//! name the offending input, not here.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Spyglass - a single-target TCP port scanner.
///
/// Probes a host for open TCP ports and, in banner mode, identifies
/// the listening service by its protocol greeting.
#[derive(Parser, Debug)]
#[command(name = "spyglass")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A single-target TCP port scanner with banner identification", long_about = None)]
pub struct Cli {
    /// Target to scan (IP address or hostname)
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Ports to scan: a list "80,443,8080", a range "1-1000", or a single port
    #[arg(short, long, default_value = "1-1000")]
    pub ports: String,

    /// Connection timeout per port, in seconds
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Maximum number of concurrent probes
    #[arg(short, long, default_value = "100", value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency: u64,

    /// Grab service banners from open ports
    #[arg(short, long)]
    pub banner: bool,

    /// Include closed and filtered ports in the listing
    #[arg(long)]
    pub show_closed: bool,

    /// Enable verbose output (progress bar, debug logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write results to a file (FILE defaults to results.txt)
    #[arg(
        short,
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "results.txt"
    )]
    pub output: Option<PathBuf>,

    /// Output format for console and file
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Plain
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}
