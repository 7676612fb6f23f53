//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, timeouts)
//! - TLS/plaintext stream abstraction
//! - Framed I/O for IMAP protocol
//! - Type-state connection wrapper with streaming FETCH

mod client;
mod config;
mod framed;
mod stream;

pub use client::{Authenticated, Client, FetchStream, NotAuthenticated, Selected};
pub use config::{Config, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, Security};
pub use framed::FramedStream;
pub use stream::{ImapStream, connect, create_tls_connector};
