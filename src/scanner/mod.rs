//! Scan orchestration.
//!
//! Probes for distinct ports have no data dependency on one another,
//! so the orchestrator runs them on a bounded worker pool and re-sorts
//! the collected results by port afterwards - completion order is not
//! commit order. Cancellation is cooperative: it stops further probes
//! from starting while in-flight probes finish naturally, bounding
//! shutdown latency to one timeout interval.

pub mod tcp;

use crate::types::Port;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use tcp::TcpConnectScanner;

/// Status of a scanned port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    /// Port is open (service listening).
    Open,
    /// Port is closed (connection refused).
    Closed,
    /// Port gave no response within the timeout, possibly a firewall.
    Filtered,
}

impl std::fmt::Display for PortStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortStatus::Open => write!(f, "open"),
            PortStatus::Closed => write!(f, "closed"),
            PortStatus::Filtered => write!(f, "filtered"),
        }
    }
}

/// Result of probing a single port. Built once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct PortResult {
    /// The port that was probed.
    pub port: Port,
    /// Status determined by the probe.
    pub status: PortStatus,
    /// Banner captured from the service, when banner mode found one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    /// Time to establish the connection, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl PortResult {
    /// Create a new port result.
    pub fn new(port: Port, status: PortStatus) -> Self {
        Self {
            port,
            status,
            banner: None,
            response_time_ms: None,
        }
    }

    /// Set the banner.
    pub fn with_banner(mut self, banner: Option<String>) -> Self {
        self.banner = banner;
        self
    }

    /// Set the response time.
    pub fn with_response_time(mut self, time_ms: u64) -> Self {
        self.response_time_ms = Some(time_ms);
        self
    }

    /// Boolean view of the status: only `Open` counts.
    pub fn is_open(&self) -> bool {
        matches!(self.status, PortStatus::Open)
    }
}

/// Completed (possibly cancelled) scan.
///
/// `results` holds one entry per probed port, ascending by port number,
/// no duplicates. When the scan was cancelled mid-flight, `cancelled`
/// is set and `results` covers exactly the probes that ran.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub target: String,
    pub ip_address: String,
    pub started_at: DateTime<Utc>,
    pub ports_requested: usize,
    pub ports_scanned: usize,
    pub open_ports: usize,
    pub closed_ports: usize,
    pub filtered_ports: usize,
    pub duration_ms: u64,
    pub banner_mode: bool,
    pub cancelled: bool,
    pub results: Vec<PortResult>,
}

impl ScanReport {
    /// Drop non-open entries from the listing. Summary counts still
    /// reflect the full scan.
    pub fn without_closed(mut self) -> Self {
        self.results.retain(|r| r.is_open());
        self
    }
}

/// Configuration for a scan. Immutable once the scan starts.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Target IP address.
    pub target: IpAddr,
    /// Original target specification (hostname if resolved).
    pub target_hostname: String,
    /// Connection/read timeout per port.
    pub timeout: Duration,
    /// Whether to run the banner chain on each port.
    pub grab_banners: bool,
    /// Maximum number of concurrently running probes.
    pub concurrency: usize,
    /// Show a progress bar while scanning.
    pub verbose: bool,
}

impl ScanConfig {
    /// Conservative default for concurrent probes.
    pub const DEFAULT_CONCURRENCY: usize = 100;
    /// Default per-connection timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Create a new scan configuration.
    pub fn new(target: IpAddr) -> Self {
        Self {
            target,
            target_hostname: target.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            grab_banners: false,
            concurrency: Self::DEFAULT_CONCURRENCY,
            verbose: false,
        }
    }

    /// Set the target hostname.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.target_hostname = hostname.into();
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable banner grabbing.
    pub fn with_banners(mut self) -> Self {
        self.grab_banners = true;
        self
    }

    /// Set the concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Enable verbose progress output.
    pub fn with_verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

/// Execute a scan over `ports`, checking `cancel` before each probe.
///
/// Probes share no mutable state; the stream collector is the single
/// funnel for results. A cancelled scan returns a valid partial report
/// with entries only for probes that actually started.
pub async fn run_scan(
    config: ScanConfig,
    ports: Vec<Port>,
    cancel: CancellationToken,
) -> ScanReport {
    let started_at = Utc::now();
    let start = Instant::now();
    let ports_requested = ports.len();

    info!(
        host = %config.target,
        ports = ports_requested,
        concurrency = config.concurrency,
        banners = config.grab_banners,
        "starting scan"
    );

    let progress = if config.verbose {
        let pb = ProgressBar::new(ports_requested as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let scanner = Arc::new(TcpConnectScanner::new(
        config.target,
        config.timeout,
        config.grab_banners,
    ));

    let mut results: Vec<PortResult> = stream::iter(ports)
        .map(|port| {
            let sem = Arc::clone(&semaphore);
            let scanner = Arc::clone(&scanner);
            let cancel = cancel.clone();
            let progress = progress.clone();

            async move {
                // A probe that never starts leaves no entry in the report.
                if cancel.is_cancelled() {
                    return None;
                }
                let _permit = sem.acquire().await.ok()?;
                if cancel.is_cancelled() {
                    return None;
                }

                let result = scanner.scan_port(port).await;

                if let Some(ref pb) = progress {
                    pb.inc(1);
                    if result.is_open() {
                        pb.set_message(format!("open: {}", port));
                    }
                }

                Some(result)
            }
        })
        .buffer_unordered(1000) // high buffering; the semaphore is the real limit
        .filter_map(|result| async move { result })
        .collect()
        .await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    // Completion order is arbitrary; the report's order is not.
    results.sort_by_key(|r| r.port);

    let open_ports = results.iter().filter(|r| r.is_open()).count();
    let closed_ports = results
        .iter()
        .filter(|r| r.status == PortStatus::Closed)
        .count();
    let filtered_ports = results
        .iter()
        .filter(|r| r.status == PortStatus::Filtered)
        .count();

    let cancelled = cancel.is_cancelled();
    let duration_ms = start.elapsed().as_millis() as u64;

    info!(
        scanned = results.len(),
        open = open_ports,
        cancelled,
        duration_ms,
        "scan finished"
    );

    ScanReport {
        target: config.target_hostname,
        ip_address: config.target.to_string(),
        started_at,
        ports_requested,
        ports_scanned: results.len(),
        open_ports,
        closed_ports,
        filtered_ports,
        duration_ms,
        banner_mode: config.grab_banners,
        cancelled,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    fn loopback_config() -> ScanConfig {
        ScanConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .with_timeout(Duration::from_millis(250))
            .with_concurrency(16)
    }

    #[test]
    fn test_port_status_display() {
        assert_eq!(PortStatus::Open.to_string(), "open");
        assert_eq!(PortStatus::Closed.to_string(), "closed");
        assert_eq!(PortStatus::Filtered.to_string(), "filtered");
    }

    #[test]
    fn test_config_defaults() {
        let config = ScanConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.concurrency, ScanConfig::DEFAULT_CONCURRENCY);
        assert!(!config.grab_banners);
    }

    #[test]
    fn test_concurrency_floor() {
        let config = ScanConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST)).with_concurrency(0);
        assert_eq!(config.concurrency, 1);
    }

    #[tokio::test]
    async fn test_scan_is_complete_and_sorted() {
        // One live listener among closed ports.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_port = listener.local_addr().unwrap().port();

        let spare = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed = spare.local_addr().unwrap().port();
        drop(spare);

        let mut wanted: Vec<u16> = vec![open_port, closed];
        wanted.sort_unstable();
        let ports: Vec<Port> = wanted.iter().map(|&p| Port::new(p).unwrap()).collect();

        let report = run_scan(loopback_config(), ports, CancellationToken::new()).await;

        assert!(!report.cancelled);
        assert_eq!(report.ports_scanned, 2);
        assert_eq!(report.results.len(), 2);

        let reported: Vec<u16> = report.results.iter().map(|r| r.port.as_u16()).collect();
        assert_eq!(reported, wanted);

        let open_entry = report
            .results
            .iter()
            .find(|r| r.port.as_u16() == open_port)
            .unwrap();
        assert!(open_entry.is_open());
        assert_eq!(report.open_ports, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_yields_empty_report() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let ports: Vec<Port> = (8000..8010).map(Port::new_unchecked).collect();
        let report = run_scan(loopback_config(), ports, cancel).await;

        assert!(report.cancelled);
        assert_eq!(report.ports_scanned, 0);
        assert!(report.results.is_empty());
        assert_eq!(report.ports_requested, 10);
    }

    #[tokio::test]
    async fn test_partial_results_stay_sorted_and_unique() {
        // Serialize probes and cancel partway through; the report must
        // stay sorted with at most one entry per port.
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });

        let config = loopback_config().with_concurrency(1);
        let ports: Vec<Port> = (20000..20040).map(Port::new_unchecked).collect();
        let total = ports.len();

        let report = run_scan(config, ports, cancel).await;

        assert!(report.results.len() <= total);
        let seen: Vec<u16> = report.results.iter().map(|r| r.port.as_u16()).collect();
        let mut expected = seen.clone();
        expected.sort_unstable();
        expected.dedup();
        assert_eq!(seen, expected, "entries must be sorted and unique");
    }

    #[tokio::test]
    async fn test_without_closed_keeps_summary() {
        let spare = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed = spare.local_addr().unwrap().port();
        drop(spare);

        let report = run_scan(
            loopback_config(),
            vec![Port::new(closed).unwrap()],
            CancellationToken::new(),
        )
        .await;

        let trimmed = report.without_closed();
        assert!(trimmed.results.is_empty());
        assert_eq!(trimmed.ports_scanned, 1);
    }
}
