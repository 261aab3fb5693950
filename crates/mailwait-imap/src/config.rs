//! Where the server lives and how the transport is secured.

use std::time::Duration;

/// Transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// TLS from the first byte.
    Tls,
    /// Plaintext connect, upgraded with STARTTLS before LOGIN.
    StartTls,
    /// No encryption; local test servers only.
    Plain,
}

impl Security {
    /// Port used when none is configured: 993 for TLS, 143 otherwise.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Tls => 993,
            Self::StartTls | Self::Plain => 143,
        }
    }
}

/// Resolved connection settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname, also the TLS server name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Transport security.
    pub security: Security,
    /// Bound on TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
    /// Bound on each command round-trip.
    pub io_timeout: Duration,
}

impl Config {
    /// Creates settings; a missing `port` falls back to
    /// [`Security::default_port`].
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        security: Security,
        port: Option<u16>,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.unwrap_or_else(|| security.default_port()),
            security,
            connect_timeout,
            io_timeout,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECS: Duration = Duration::from_secs(5);

    #[test]
    fn test_port_follows_security() {
        assert_eq!(Config::new("h", Security::Tls, None, SECS, SECS).port, 993);
        assert_eq!(Config::new("h", Security::StartTls, None, SECS, SECS).port, 143);
        assert_eq!(Config::new("h", Security::Plain, None, SECS, SECS).port, 143);
    }

    #[test]
    fn test_explicit_port_wins() {
        let config = Config::new("localhost", Security::Plain, Some(3143), SECS, SECS);
        assert_eq!(config.port, 3143);
        assert_eq!(config.host, "localhost");
    }
}
