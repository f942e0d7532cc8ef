//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortSpec` parses user-supplied port expressions into a validated set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated network port number (1-65535).
///
/// Using a newtype prevents accidental misuse of raw u16 values
/// and ensures port numbers are always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Create a Port without validation. Use only when the value is known valid.
    ///
    /// # Safety
    /// The caller must ensure `port` is in the valid range (1-65535).
    #[inline]
    pub const fn new_unchecked(port: u16) -> Self {
        Self(port)
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange {
            port: value as u64,
            spec: value.to_string(),
        })
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    #[error("invalid port number: '{0}'")]
    InvalidToken(String),
    #[error("port {port} is out of valid range (1-65535) in '{spec}'")]
    OutOfRange { port: u64, spec: String },
    #[error("empty range: start ({start}) is greater than end ({end})")]
    EmptyRange { start: u16, end: u16 },
    #[error("malformed range '{0}': expected exactly one start-end pair")]
    MalformedRange(String),
    #[error("empty port specification")]
    Empty,
}

/// A validated set of ports parsed from a user-supplied expression.
///
/// Exactly one of three forms is accepted:
/// - Comma-separated list: "80,443,8080"
/// - Inclusive range: "20-25"
/// - Single port: "80"
///
/// Parsing is atomic: a single bad token rejects the whole expression,
/// so a `PortSpec` never holds a partial port list. Ports come out
/// sorted ascending with duplicates removed.
///
/// There is no built-in default range; callers that want one (the CLI
/// defaults to 1-1000) supply it themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortSpec {
    ports: Vec<Port>,
}

impl PortSpec {
    fn from_ports(mut ports: Vec<Port>) -> Self {
        ports.sort_unstable();
        ports.dedup();
        Self { ports }
    }

    /// All ports in the set, ascending and deduplicated.
    pub fn to_ports(&self) -> Vec<Port> {
        self.ports.clone()
    }

    /// Number of unique ports in the set.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Check if empty (never true for a parsed spec).
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }

        if s.contains(',') {
            let mut ports = Vec::new();
            for token in s.split(',') {
                ports.push(parse_port(token.trim(), s)?);
            }
            Ok(Self::from_ports(ports))
        } else if s.contains('-') {
            let bounds: Vec<&str> = s.split('-').collect();
            if bounds.len() != 2 {
                return Err(PortError::MalformedRange(s.to_string()));
            }

            let start = parse_port(bounds[0].trim(), s)?;
            let end = parse_port(bounds[1].trim(), s)?;
            if start > end {
                return Err(PortError::EmptyRange {
                    start: start.as_u16(),
                    end: end.as_u16(),
                });
            }

            let ports = (start.as_u16()..=end.as_u16())
                .map(Port::new_unchecked)
                .collect();
            Ok(Self::from_ports(ports))
        } else {
            Ok(Self::from_ports(vec![parse_port(s, s)?]))
        }
    }
}

/// Parse one integer token, naming the token and the whole spec on failure.
fn parse_port(token: &str, spec: &str) -> Result<Port, PortError> {
    let value: u64 = token
        .parse()
        .map_err(|_| PortError::InvalidToken(token.to_string()))?;

    if value < Port::MIN as u64 || value > Port::MAX as u64 {
        return Err(PortError::OutOfRange {
            port: value,
            spec: spec.to_string(),
        });
    }

    Ok(Port::new_unchecked(value as u16))
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ports.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports_of(spec: &str) -> Vec<u16> {
        spec.parse::<PortSpec>()
            .unwrap()
            .to_ports()
            .iter()
            .map(|p| p.as_u16())
            .collect()
    }

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(1).is_some());
        assert!(Port::new(80).is_some());
        assert!(Port::new(65535).is_some());
    }

    #[test]
    fn test_single_port() {
        assert_eq!(ports_of("80"), vec![80]);
    }

    #[test]
    fn test_comma_list() {
        assert_eq!(ports_of("80,443,8080"), vec![80, 443, 8080]);
    }

    #[test]
    fn test_range() {
        assert_eq!(ports_of("20-25"), vec![20, 21, 22, 23, 24, 25]);
    }

    #[test]
    fn test_list_is_sorted_and_deduped() {
        assert_eq!(ports_of("443,80,443,80"), vec![80, 443]);
    }

    #[test]
    fn test_whitespace_tolerated() {
        assert_eq!(ports_of(" 80 , 443 "), vec![80, 443]);
        assert_eq!(ports_of(" 20 - 25 "), vec![20, 21, 22, 23, 24, 25]);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            "70000".parse::<PortSpec>(),
            Err(PortError::OutOfRange { port: 70000, .. })
        ));
        assert!(matches!(
            "80,70000".parse::<PortSpec>(),
            Err(PortError::OutOfRange { .. })
        ));
        assert!(matches!(
            "0".parse::<PortSpec>(),
            Err(PortError::OutOfRange { port: 0, .. })
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(matches!(
            "10-5".parse::<PortSpec>(),
            Err(PortError::EmptyRange { start: 10, end: 5 })
        ));
        assert!(matches!(
            "500-100".parse::<PortSpec>(),
            Err(PortError::EmptyRange { .. })
        ));
    }

    #[test]
    fn test_bad_token_rejects_whole_spec() {
        assert!(matches!(
            "80,abc,443".parse::<PortSpec>(),
            Err(PortError::InvalidToken(t)) if t == "abc"
        ));
    }

    #[test]
    fn test_malformed_range_rejected() {
        assert!(matches!(
            "1-3-5".parse::<PortSpec>(),
            Err(PortError::MalformedRange(_))
        ));
    }

    #[test]
    fn test_empty_spec_rejected() {
        assert!(matches!("".parse::<PortSpec>(), Err(PortError::Empty)));
        assert!(matches!("   ".parse::<PortSpec>(), Err(PortError::Empty)));
    }

    #[test]
    fn test_full_range_bounds() {
        let spec: PortSpec = "65530-65535".parse().unwrap();
        assert_eq!(spec.len(), 6);
        assert_eq!(spec.to_ports().last().unwrap().as_u16(), 65535);
    }
}
