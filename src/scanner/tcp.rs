//! TCP connect probe.
//!
//! Determines port status through the operating system's socket API.
//! Completes the full TCP handshake, so no special privileges are
//! required. The probe is total: every connection failure becomes a
//! port status, never an error.

use crate::banner::{acquire_banner, BannerOutcome};
use crate::error::{ScanError, ScanResult};
use crate::scanner::{PortResult, PortStatus};
use crate::types::Port;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Probes one (address, port) pair per call with a bounded connect.
pub struct TcpConnectScanner {
    target: IpAddr,
    timeout: Duration,
    grab_banners: bool,
}

impl TcpConnectScanner {
    /// Create a new TCP connect scanner.
    ///
    /// # Arguments
    /// * `target` - Target IP address to scan
    /// * `timeout` - Connection timeout per port
    /// * `grab_banners` - Whether to run the banner chain on each port
    pub fn new(target: IpAddr, timeout: Duration, grab_banners: bool) -> Self {
        Self {
            target,
            timeout,
            grab_banners,
        }
    }

    /// Probe a single port.
    pub async fn scan_port(&self, port: Port) -> PortResult {
        let addr = SocketAddr::new(self.target, port.as_u16());

        if self.grab_banners {
            self.scan_with_banner(addr, port).await
        } else {
            self.probe(addr, port).await
        }
    }

    /// Plain open/closed probe. The stream is dropped on every path.
    async fn probe(&self, addr: SocketAddr, port: Port) -> PortResult {
        let start = Instant::now();

        match self.attempt_connect(addr).await {
            Ok(stream) => {
                let response_time = start.elapsed().as_millis() as u64;
                drop(stream);
                PortResult::new(port, PortStatus::Open).with_response_time(response_time)
            }
            Err(e) => PortResult::new(port, classify_failure(&e)),
        }
    }

    /// Banner mode. The acquirer owns its connections, so the
    /// open/closed verdict comes from the strategy chain itself; ports
    /// no strategy could connect to collapse to closed.
    async fn scan_with_banner(&self, addr: SocketAddr, port: Port) -> PortResult {
        let start = Instant::now();
        let BannerOutcome { open, banner } = acquire_banner(addr, self.timeout).await;

        if open {
            PortResult::new(port, PortStatus::Open)
                .with_banner(banner)
                .with_response_time(start.elapsed().as_millis() as u64)
        } else {
            PortResult::new(port, PortStatus::Closed)
        }
    }

    /// Attempt to connect to the target address.
    async fn attempt_connect(&self, addr: SocketAddr) -> ScanResult<TcpStream> {
        match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => {
                let error_str = e.to_string().to_lowercase();
                if error_str.contains("refused") {
                    Err(ScanError::ConnectionRefused)
                } else if error_str.contains("unreachable") {
                    if error_str.contains("host") {
                        Err(ScanError::HostUnreachable)
                    } else {
                        Err(ScanError::NetworkUnreachable(e.to_string()))
                    }
                } else {
                    Err(ScanError::ConnectionFailed(e.to_string()))
                }
            }
            Err(_) => {
                debug!(%addr, timeout_ms = self.timeout.as_millis() as u64, "connect timed out");
                Err(ScanError::Timeout)
            }
        }
    }
}

/// Fold a connection failure into a port status.
///
/// A refusal means something answered, so the port is closed; silence
/// (timeout, unreachable) renders as filtered. Consumers that only
/// care about the open/not-open boolean see no difference.
fn classify_failure(error: &ScanError) -> PortStatus {
    match error {
        ScanError::ConnectionRefused => PortStatus::Closed,
        ScanError::Timeout
        | ScanError::HostUnreachable
        | ScanError::NetworkUnreachable(_) => PortStatus::Filtered,
        ScanError::ConnectionFailed(_) => PortStatus::Closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    /// Bind and drop to find a loopback port with nothing listening.
    async fn closed_port() -> Port {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Port::new(port).unwrap()
    }

    #[tokio::test]
    async fn test_scan_closed_port_is_deterministic() {
        let probe_timeout = Duration::from_millis(250);
        let scanner = TcpConnectScanner::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            probe_timeout,
            false,
        );

        let port = closed_port().await;
        let start = Instant::now();
        let result = scanner.scan_port(port).await;

        assert!(!result.is_open());
        assert_eq!(result.banner, None);
        // Refusals on loopback come back well within timeout + epsilon.
        assert!(start.elapsed() < probe_timeout + Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_scan_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = Port::new(listener.local_addr().unwrap().port()).unwrap();

        let scanner = TcpConnectScanner::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            Duration::from_millis(250),
            false,
        );

        let result = scanner.scan_port(port).await;
        assert_eq!(result.status, PortStatus::Open);
        assert!(result.response_time_ms.is_some());
        // Banner grabbing was not requested.
        assert_eq!(result.banner, None);
    }

    #[tokio::test]
    async fn test_banner_mode_closed_port_collapses() {
        let scanner = TcpConnectScanner::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            Duration::from_millis(200),
            true,
        );

        let result = scanner.scan_port(closed_port().await).await;
        assert_eq!(result.status, PortStatus::Closed);
        assert_eq!(result.banner, None);
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure(&ScanError::ConnectionRefused),
            PortStatus::Closed
        );
        assert_eq!(classify_failure(&ScanError::Timeout), PortStatus::Filtered);
        assert_eq!(
            classify_failure(&ScanError::HostUnreachable),
            PortStatus::Filtered
        );
    }
}
