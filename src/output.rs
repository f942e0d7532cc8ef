//! Result sink: console rendering and file persistence.
//!
//! The scan core hands over an ordered `ScanReport` and never prints
//! anything itself; everything about presentation lives here. The
//! styled table goes to the console, while file output uses the
//! unstyled renderers so no escape codes end up on disk.

use crate::cli::OutputFormat;
use crate::scanner::{PortStatus, ScanReport};
use console::{style, Style};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Placeholder for an absent banner in banner-mode listings.
const NO_BANNER: &str = "N/A";

/// Format and print scan results to the console.
pub fn print_report(report: &ScanReport, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => print_plain(report),
        OutputFormat::Json => {
            println!("{}", render_json(report)?);
            Ok(())
        }
        OutputFormat::Csv => {
            println!("{}", render_csv(report)?);
            Ok(())
        }
    }
}

/// Persist a report to a file in the given format.
pub fn write_report(path: &Path, report: &ScanReport, format: OutputFormat) -> io::Result<()> {
    let content = match format {
        OutputFormat::Plain => render_plain(report),
        OutputFormat::Json => render_json(report)?,
        OutputFormat::Csv => render_csv(report)?,
    };
    fs::write(path, content)
}

/// Print results in human-readable plain text with styling.
fn print_plain(report: &ScanReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    writeln!(
        out,
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    )?;
    writeln!(
        out,
        "                    {} Scan Results",
        style("Spyglass").cyan().bold()
    )?;
    writeln!(
        out,
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    )?;
    writeln!(out)?;

    writeln!(out, "  {} {}", style("Target:").bold(), report.target)?;
    writeln!(
        out,
        "  {} {}",
        style("IP Address:").bold(),
        report.ip_address
    )?;
    writeln!(out)?;

    writeln!(
        out,
        "  {} {} of {} ports scanned in {:.2}s",
        style("Statistics:").bold(),
        report.ports_scanned,
        report.ports_requested,
        report.duration_ms as f64 / 1000.0
    )?;
    writeln!(
        out,
        "               {} open, {} closed, {} filtered",
        style(report.open_ports).green().bold(),
        style(report.closed_ports).red(),
        style(report.filtered_ports).yellow()
    )?;
    if report.cancelled {
        writeln!(
            out,
            "               {}",
            style("scan was interrupted; results are partial").yellow()
        )?;
    }
    writeln!(out)?;

    if report.results.is_empty() {
        writeln!(out, "  {}", style("No ports to display.").dim())?;
    } else {
        writeln!(
            out,
            "  {}",
            style("───────────────────────────────────────────────────────────────").dim()
        )?;
        if report.banner_mode {
            writeln!(
                out,
                "  {:>6}  {:^10}  {}",
                style("PORT").bold(),
                style("STATE").bold(),
                style("BANNER").bold()
            )?;
        } else {
            writeln!(
                out,
                "  {:>6}  {:^10}",
                style("PORT").bold(),
                style("STATE").bold()
            )?;
        }
        writeln!(
            out,
            "  {}",
            style("───────────────────────────────────────────────────────────────").dim()
        )?;

        for result in &report.results {
            let status_style = match result.status {
                PortStatus::Open => Style::new().green().bold(),
                PortStatus::Closed => Style::new().red(),
                PortStatus::Filtered => Style::new().yellow(),
            };

            if report.banner_mode {
                let banner = result
                    .banner
                    .as_deref()
                    .map(|b| truncate_string(b, 40))
                    .unwrap_or_else(|| NO_BANNER.to_string());
                writeln!(
                    out,
                    "  {:>6}  {:^10}  {}",
                    result.port,
                    status_style.apply_to(result.status.to_string()),
                    style(banner).dim()
                )?;
            } else {
                writeln!(
                    out,
                    "  {:>6}  {:^10}",
                    result.port,
                    status_style.apply_to(result.status.to_string())
                )?;
            }
        }

        writeln!(
            out,
            "  {}",
            style("───────────────────────────────────────────────────────────────").dim()
        )?;
    }

    writeln!(out)?;
    Ok(())
}

/// Unstyled plain-text rendering, suitable for files.
fn render_plain(report: &ScanReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("Spyglass scan report: {}\n", report.target));
    output.push_str(&format!("{}\n\n", "=".repeat(60)));

    output.push_str(&format!("Target:       {}\n", report.target));
    output.push_str(&format!("IP Address:   {}\n", report.ip_address));
    output.push_str(&format!("Started:      {}\n", report.started_at));
    output.push_str(&format!("Duration:     {} ms\n\n", report.duration_ms));

    output.push_str(&format!(
        "Summary: {} of {} ports scanned, {} open, {} closed, {} filtered\n",
        report.ports_scanned,
        report.ports_requested,
        report.open_ports,
        report.closed_ports,
        report.filtered_ports
    ));
    if report.cancelled {
        output.push_str("Note: scan was interrupted; results are partial\n");
    }
    output.push('\n');

    if !report.results.is_empty() {
        output.push_str(&format!("{}\n", "-".repeat(60)));
        if report.banner_mode {
            output.push_str(&format!("{:>6}  {:^10}  {}\n", "PORT", "STATE", "BANNER"));
        } else {
            output.push_str(&format!("{:>6}  {:^10}\n", "PORT", "STATE"));
        }
        output.push_str(&format!("{}\n", "-".repeat(60)));

        for result in &report.results {
            if report.banner_mode {
                let banner = result.banner.as_deref().unwrap_or(NO_BANNER);
                output.push_str(&format!(
                    "{:>6}  {:^10}  {}\n",
                    result.port, result.status, banner
                ));
            } else {
                output.push_str(&format!("{:>6}  {:^10}\n", result.port, result.status));
            }
        }
    }

    output
}

/// JSON rendering of the full report.
fn render_json(report: &ScanReport) -> io::Result<String> {
    serde_json::to_string_pretty(report).map_err(io::Error::other)
}

/// CSV rendering: one row per port, banner column only in banner mode.
fn render_csv(report: &ScanReport) -> io::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    if report.banner_mode {
        wtr.write_record(["port", "status", "banner"])?;
        for result in &report.results {
            wtr.write_record([
                &result.port.to_string(),
                &result.status.to_string(),
                result.banner.as_deref().unwrap_or(NO_BANNER),
            ])?;
        }
    } else {
        wtr.write_record(["port", "status"])?;
        for result in &report.results {
            wtr.write_record([&result.port.to_string(), &result.status.to_string()])?;
        }
    }

    let bytes = wtr.into_inner().map_err(io::Error::other)?;
    String::from_utf8(bytes).map_err(io::Error::other)
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(target: &str, ip: &str, ports: usize, banner_mode: bool) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("Spyglass").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Target: {} ({})",
        style("•").dim(),
        style(target).white().bold(),
        ip
    );
    println!(
        "{} Scanning {} ports{}...",
        style("•").dim(),
        style(ports).white().bold(),
        if banner_mode { " with banner grabbing" } else { "" }
    );
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Truncate a string to a maximum length, adding ellipsis if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= max_len.saturating_sub(3))
            .last()
            .unwrap_or(0);
        format!("{}...", &s[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{PortResult, PortStatus};
    use crate::types::Port;
    use chrono::Utc;

    fn sample_report(banner_mode: bool) -> ScanReport {
        let mut results = vec![
            PortResult::new(Port::new(22).unwrap(), PortStatus::Open)
                .with_banner(Some("SSH-2.0-OpenSSH_9.6".to_string())),
            PortResult::new(Port::new(80).unwrap(), PortStatus::Open),
            PortResult::new(Port::new(81).unwrap(), PortStatus::Closed),
        ];
        if !banner_mode {
            for r in &mut results {
                r.banner = None;
            }
        }
        ScanReport {
            target: "example.com".to_string(),
            ip_address: "93.184.216.34".to_string(),
            started_at: Utc::now(),
            ports_requested: 3,
            ports_scanned: 3,
            open_ports: 2,
            closed_ports: 1,
            filtered_ports: 0,
            duration_ms: 120,
            banner_mode,
            cancelled: false,
            results,
        }
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
    }

    #[test]
    fn test_render_csv_banner_mode_uses_na() {
        let csv = render_csv(&sample_report(true)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("port,status,banner"));
        assert_eq!(lines.next(), Some("22,open,SSH-2.0-OpenSSH_9.6"));
        assert_eq!(lines.next(), Some("80,open,N/A"));
        assert_eq!(lines.next(), Some("81,closed,N/A"));
    }

    #[test]
    fn test_render_csv_plain_mode_has_no_banner_column() {
        let csv = render_csv(&sample_report(false)).unwrap();
        assert_eq!(csv.lines().next(), Some("port,status"));
    }

    #[test]
    fn test_render_json_round_trips() {
        let json = render_json(&sample_report(true)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["target"], "example.com");
        assert_eq!(value["results"].as_array().unwrap().len(), 3);
        assert_eq!(value["results"][0]["port"], 22);
    }

    #[test]
    fn test_render_plain_lists_na_for_missing_banner() {
        let text = render_plain(&sample_report(true));
        assert!(text.contains("SSH-2.0-OpenSSH_9.6"));
        assert!(text.contains("N/A"));
        assert!(text.contains("2 open, 1 closed, 0 filtered") || text.contains("Summary"));
    }

    #[test]
    fn test_write_report_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");

        write_report(&path, &sample_report(false), OutputFormat::Plain).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Spyglass scan report"));
        assert!(written.contains("80"));
    }
}
