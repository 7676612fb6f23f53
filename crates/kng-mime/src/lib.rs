//! # kng-mime
//!
//! MIME message parsing for mail fetched over IMAP.
//!
//! ## Features
//!
//! - **Message parsing**: headers plus recursive multipart bodies
//! - **Part classification**: attachment, inline or multipart container
//! - **Decoding**: Base64, Quoted-Printable, RFC 2047 headers, RFC 2231 parameters
//! - **Charsets**: UTF-8, US-ASCII, ISO-8859-1 and Windows-1252
//!
//! ## Quick Start
//!
//! ```
//! use kng_mime::{Message, PartKind};
//!
//! let raw = concat!(
//!     "Subject: Your Kindle Notes From Dune\r\n",
//!     "Content-Type: multipart/mixed; boundary=b\r\n",
//!     "\r\n",
//!     "--b\r\n",
//!     "Content-Type: text/csv; name=\"Dune.csv\"\r\n",
//!     "Content-Disposition: attachment\r\n",
//!     "\r\n",
//!     "Highlight,Page 1,,Fear is the mind-killer\r\n",
//!     "--b--\r\n",
//! );
//!
//! let message = Message::parse(raw.as_bytes()).unwrap();
//! assert_eq!(message.decoded_subject().as_deref(), Some("Your Kindle Notes From Dune"));
//!
//! let csv = message
//!     .parts()
//!     .find(|part| part.kind().is_csv_attachment(".csv"))
//!     .unwrap();
//! assert_eq!(csv.filename().as_deref(), Some("Dune.csv"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod charset;
pub mod encoding;

pub use charset::Charset;
pub use content_type::{ContentDisposition, ContentType, DispositionKind};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, PartKind, Parts, TransferEncoding};
