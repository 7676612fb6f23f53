//! Decoding errors.
//!
//! Every variant describes why a message or one of its parts could not be
//! turned into bytes or text. Header parsing itself never fails.

use std::string::FromUtf8Error;

/// Result alias for MIME decoding.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a message or part could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `Content-Type` value without a `type/subtype` essence.
    #[error("Malformed Content-Type: {0}")]
    InvalidContentType(String),

    /// Broken quoted-printable escape or RFC 2047 encoded word.
    #[error("Malformed encoding: {0}")]
    InvalidEncoding(String),

    /// Body declared base64 but is not.
    #[error("Bad base64 body: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Text declared UTF-8 or ASCII but is not.
    #[error("Text is not valid UTF-8: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// `charset` parameter naming an encoding this crate does not decode.
    #[error("Unsupported charset: {0}")]
    UnknownCharset(String),

    /// `multipart/*` part without a `boundary` parameter.
    #[error("Multipart part has no boundary")]
    MissingBoundary,

    /// Multipart body that cannot be split into parts.
    #[error("Malformed multipart body: {0}")]
    InvalidMultipart(String),
}
