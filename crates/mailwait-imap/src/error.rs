//! Errors raised while talking to the IMAP server.

use std::time::Duration;

use thiserror::Error;

/// Failure of a connection or of a single command.
#[derive(Debug, Error)]
pub enum Error {
    /// The socket failed.
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    /// TLS setup or handshake failed.
    #[error("TLS handshake failed: {0}")]
    Tls(#[from] rustls::Error),

    /// The host cannot be used as a TLS server name.
    #[error("host is not a valid TLS server name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// LOGIN was refused.
    #[error("login rejected: {0}")]
    Auth(String),

    /// A command completed with `NO`.
    #[error("command refused: {0}")]
    No(String),

    /// A command completed with `BAD`.
    #[error("command rejected as malformed: {0}")]
    Bad(String),

    /// The server closed the session with `BYE`.
    #[error("server closed the session: {0}")]
    Bye(String),

    /// No reply within the connect or I/O timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// A response line could not be parsed.
    #[error("unparsable response at byte {position}: {message}")]
    Parse {
        /// Offset into the response.
        position: usize,
        /// What was expected there.
        message: String,
    },

    /// A response or request that breaks the protocol, such as an
    /// unexpected greeting or a second TLS upgrade.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

/// Result type for IMAP operations.
pub type Result<T> = std::result::Result<T, Error>;
