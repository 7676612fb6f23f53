//! Error types for the core library.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IMAP operation failed.
    #[error("IMAP error: {0}")]
    Imap(#[from] kng_imap::Error),

    /// MIME message could not be parsed.
    #[error("MIME error: {0}")]
    Mime(#[from] kng_mime::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The data directory does not exist.
    #[error("Directory {} does not exist, run `kng setup` first", .0.display())]
    MissingDirectory(PathBuf),

    /// The completed-notebooks file does not exist.
    #[error("File {} does not exist, run `kng setup` first", .0.display())]
    MissingFile(PathBuf),

    /// A notebook title that cannot name a file in the output directory.
    #[error("Title {0:?} is not a usable file name")]
    UnsafeTitle(String),

    /// The background fetch task panicked or was cancelled.
    #[error("Fetch task aborted: {0}")]
    FetchAborted(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
