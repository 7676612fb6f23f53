//! Errors from talking to the mail server.
//!
//! Server status replies (`NO`, `BAD`, `BYE`) keep the server's text so a
//! failed login or select can be reported as the server phrased it.

use std::time::Duration;

use thiserror::Error;

/// IMAP client error.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket error, including the server dropping the connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake failure.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The configured host is not a valid TLS server name.
    #[error("Invalid server name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// A server response could not be parsed.
    #[error("Unparseable response at byte {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// Command refused, e.g. bad credentials or a missing mailbox.
    #[error("Server refused the command: {0}")]
    No(String),

    /// Command rejected as malformed.
    #[error("Server rejected the command as invalid: {0}")]
    Bad(String),

    /// Server is closing the connection.
    #[error("Server closed the session: {0}")]
    Bye(String),

    /// The server did not answer in time.
    #[error("Timed out after {after:?} waiting for {waiting_for}")]
    Timeout {
        /// What the client was waiting for.
        waiting_for: &'static str,
        /// The configured limit.
        after: Duration,
    },

    /// Response was well-formed but not what the client expected.
    #[error("Unexpected server behaviour: {0}")]
    Protocol(String),
}

/// Result alias for IMAP operations.
pub type Result<T> = std::result::Result<T, Error>;
