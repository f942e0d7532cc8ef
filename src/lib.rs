//! # Spyglass - A Single-Target TCP Port Scanner
//!
//! Spyglass probes one host across a set of TCP ports to determine
//! which are open and, optionally, identifies the listening service by
//! capturing its initial protocol banner.
//!
//! ## Features
//!
//! - **Concurrent Probing**: Async I/O with a bounded worker pool
//! - **Banner Identification**: FTP, HTTP, SSH, and generic strategies
//! - **Flexible Port Expressions**: Lists, ranges, and single ports
//! - **Cooperative Cancellation**: Ctrl-C yields a valid partial report
//! - **Multiple Output Formats**: Plain text, JSON, and CSV
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use spyglass::scanner::{run_scan, ScanConfig};
//! use spyglass::types::PortSpec;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScanConfig::new("192.168.1.1".parse().unwrap()).with_banners();
//!     let ports: PortSpec = "20-25".parse().unwrap();
//!
//!     let report = run_scan(config, ports.to_ports(), CancellationToken::new()).await;
//!     for result in &report.results {
//!         println!("{}: {}", result.port, result.status);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Validated port and target types with newtype patterns
//! - [`scanner`] - Connection probe and the concurrent orchestrator
//! - [`banner`] - Protocol strategy chain for service identification
//! - [`output`] - Console and file rendering of scan reports
//! - [`error`] - Connection failure classification
//! - [`cli`] - Command-line argument surface

pub mod banner;
pub mod cli;
pub mod error;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use error::ScanError;
pub use scanner::{run_scan, PortResult, PortStatus, ScanConfig, ScanReport};
pub use types::{Port, PortSpec, ScanTarget, TargetSpec};
