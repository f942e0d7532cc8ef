//! Spyglass binary entry point.
//!
//! Thin glue: parse arguments, validate the port expression and target
//! before any probing starts, wire Ctrl-C to the cancellation token,
//! run the scan, and hand the report to the sink.

use anyhow::Context;
use clap::Parser;
use spyglass::cli::{Cli, OutputFormat};
use spyglass::output;
use spyglass::scanner::{run_scan, ScanConfig};
use spyglass::types::{PortSpec, TargetSpec};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Both of these fail fast, before any network activity.
    let port_spec: PortSpec = cli
        .ports
        .parse()
        .with_context(|| format!("invalid port specification '{}'", cli.ports))?;
    let target = TargetSpec::parse(&cli.target)?
        .resolve()
        .await
        .context("target resolution failed")?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut config = ScanConfig::new(target.ip)
        .with_hostname(&target.original)
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_concurrency(cli.concurrency as usize);
    if cli.banner {
        config = config.with_banners();
    }
    if cli.verbose {
        config = config.with_verbose();
    }

    if cli.format == OutputFormat::Plain {
        output::print_scan_header(
            &target.original,
            &target.ip.to_string(),
            port_spec.len(),
            cli.banner,
        );
    }

    let report = run_scan(config, port_spec.to_ports(), cancel).await;

    if report.cancelled {
        output::print_warning("scan interrupted; reporting partial results");
    }

    let report = if cli.show_closed {
        report
    } else {
        report.without_closed()
    };

    // A failed file write is reported but doesn't invalidate the scan.
    if let Some(path) = &cli.output {
        match output::write_report(path, &report, cli.format) {
            Ok(()) => output::print_info(&format!("results written to {}", path.display())),
            Err(e) => output::print_error(&format!("failed to write {}: {}", path.display(), e)),
        }
    }

    output::print_report(&report, cli.format)?;

    Ok(())
}

/// Route logs to stderr so they never interleave with report output.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "spyglass=debug" } else { "spyglass=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}
