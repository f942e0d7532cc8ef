//! Protocol-aware banner acquisition for TCP ports.
//!
//! Service identity cannot be known before connecting, so acquisition
//! tries a fixed chain of protocol strategies, each on its own fresh
//! connection: FTP (servers greet first), HTTP (minimal GET), SSH
//! (unprompted version string), then a generic CR-LF poke. The first
//! strategy to extract a non-empty banner settles the banner; any
//! successful connection anywhere in the chain marks the port open.
//!
//! Up to four connection attempts per port is the accepted cost:
//! banner mode is opt-in and typically runs against a small set of
//! already-interesting ports.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Maximum bytes to read for a banner.
const MAX_BANNER_SIZE: usize = 1024;

/// Maximum length of a sanitized banner.
const MAX_BANNER_CHARS: usize = 256;

/// Login probe for FTP servers that stay quiet until spoken to.
const FTP_PROBE: &[u8] = b"USER anonymous\r\n";

/// Bare line ending sent by the generic fallback probe.
const GENERIC_PROBE: &[u8] = b"\r\n";

/// Outcome of running the strategy chain against one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerOutcome {
    /// Whether any strategy established a TCP connection.
    pub open: bool,
    /// First banner extracted, sanitized to printable text.
    pub banner: Option<String>,
}

/// Result of a single strategy attempt.
enum StrategyOutcome {
    /// The connection attempt itself failed (refused, unreachable, timeout).
    NoConnect,
    /// Connected; banner text if the service produced any.
    Connected(Option<String>),
}

/// One protocol interaction that may coax a banner out of a port.
///
/// Strategies run in a fixed order and each opens its own connection.
/// Supporting a new protocol means appending an implementation here,
/// not branching on port numbers.
#[async_trait]
trait BannerStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, addr: SocketAddr, io_timeout: Duration) -> StrategyOutcome;
}

/// FTP servers greet on connect; quiet ones may still answer USER.
struct FtpGreeting;

#[async_trait]
impl BannerStrategy for FtpGreeting {
    fn name(&self) -> &'static str {
        "ftp"
    }

    async fn attempt(&self, addr: SocketAddr, io_timeout: Duration) -> StrategyOutcome {
        let Some(mut stream) = connect(addr, io_timeout).await else {
            return StrategyOutcome::NoConnect;
        };

        if let Some(text) = read_text(&mut stream, io_timeout).await {
            return StrategyOutcome::Connected(Some(text));
        }

        if stream.write_all(FTP_PROBE).await.is_err() {
            return StrategyOutcome::Connected(None);
        }

        StrategyOutcome::Connected(read_text(&mut stream, io_timeout).await)
    }
}

/// Minimal HTTP request; the banner is the status line alone.
struct HttpGet;

#[async_trait]
impl BannerStrategy for HttpGet {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn attempt(&self, addr: SocketAddr, io_timeout: Duration) -> StrategyOutcome {
        let Some(mut stream) = connect(addr, io_timeout).await else {
            return StrategyOutcome::NoConnect;
        };

        let request = format!(
            "GET / HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            addr.ip()
        );
        if stream.write_all(request.as_bytes()).await.is_err() {
            return StrategyOutcome::Connected(None);
        }

        let Some(data) = read_some(&mut stream, io_timeout).await else {
            return StrategyOutcome::Connected(None);
        };

        let status_line = String::from_utf8_lossy(&data)
            .lines()
            .next()
            .map(|line| sanitize_banner(line.as_bytes()))
            .filter(|line| !line.is_empty());

        StrategyOutcome::Connected(status_line)
    }
}

/// SSH servers volunteer their version string without prompting.
struct SshVersion;

#[async_trait]
impl BannerStrategy for SshVersion {
    fn name(&self) -> &'static str {
        "ssh"
    }

    async fn attempt(&self, addr: SocketAddr, io_timeout: Duration) -> StrategyOutcome {
        let Some(mut stream) = connect(addr, io_timeout).await else {
            return StrategyOutcome::NoConnect;
        };

        StrategyOutcome::Connected(read_text(&mut stream, io_timeout).await)
    }
}

/// Last resort: poke the service with a bare line ending and listen.
struct GenericProbe;

#[async_trait]
impl BannerStrategy for GenericProbe {
    fn name(&self) -> &'static str {
        "generic"
    }

    async fn attempt(&self, addr: SocketAddr, io_timeout: Duration) -> StrategyOutcome {
        let Some(mut stream) = connect(addr, io_timeout).await else {
            return StrategyOutcome::NoConnect;
        };

        if stream.write_all(GENERIC_PROBE).await.is_err() {
            return StrategyOutcome::Connected(None);
        }

        StrategyOutcome::Connected(read_text(&mut stream, io_timeout).await)
    }
}

/// Run the strategy chain against `addr`.
///
/// A strategy that connects but extracts nothing passes the turn to the
/// next one; the first non-empty banner ends the chain. Connections are
/// dropped at the end of every attempt, success or not.
pub async fn acquire_banner(addr: SocketAddr, io_timeout: Duration) -> BannerOutcome {
    let strategies: [&dyn BannerStrategy; 4] = [&FtpGreeting, &HttpGet, &SshVersion, &GenericProbe];

    let mut open = false;
    for strategy in strategies {
        match strategy.attempt(addr, io_timeout).await {
            StrategyOutcome::NoConnect => {
                debug!(strategy = strategy.name(), %addr, "connection attempt failed");
            }
            StrategyOutcome::Connected(Some(banner)) => {
                debug!(strategy = strategy.name(), %addr, banner = %banner, "banner acquired");
                return BannerOutcome {
                    open: true,
                    banner: Some(banner),
                };
            }
            StrategyOutcome::Connected(None) => {
                debug!(strategy = strategy.name(), %addr, "connected, no banner");
                open = true;
            }
        }
    }

    BannerOutcome { open, banner: None }
}

/// Connect with a timeout. Failures collapse to `None`.
async fn connect(addr: SocketAddr, io_timeout: Duration) -> Option<TcpStream> {
    match timeout(io_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Some(stream),
        _ => None,
    }
}

/// Single bounded read. `None` on timeout, error, or peer close
/// without data.
async fn read_some(stream: &mut TcpStream, io_timeout: Duration) -> Option<Vec<u8>> {
    let mut buffer = vec![0u8; MAX_BANNER_SIZE];
    match timeout(io_timeout, stream.read(&mut buffer)).await {
        Ok(Ok(n)) if n > 0 => {
            buffer.truncate(n);
            Some(buffer)
        }
        _ => None,
    }
}

/// Read once and sanitize; `None` when nothing printable came back.
async fn read_text(stream: &mut TcpStream, io_timeout: Duration) -> Option<String> {
    let data = read_some(stream, io_timeout).await?;
    let text = sanitize_banner(&data);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Sanitize raw banner bytes into a single printable line.
///
/// Invalid UTF-8 is substituted rather than failing the probe; control
/// characters become spaces and whitespace runs are folded.
fn sanitize_banner(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);

    let mut result = String::new();
    let mut prev_space = true; // swallows leading whitespace
    for c in text.chars() {
        let c = if c.is_whitespace() || c.is_control() {
            ' '
        } else {
            c
        };
        if c == ' ' {
            if !prev_space {
                result.push(' ');
            }
            prev_space = true;
        } else {
            result.push(c);
            prev_space = false;
        }
        if result.len() >= MAX_BANNER_CHARS {
            break;
        }
    }

    result.trim_end().to_string()
}
