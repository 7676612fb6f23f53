//! # kng-imap
//!
//! A small async IMAP4rev1 client covering the commands needed to harvest
//! messages from a mailbox: LOGIN, SELECT, SEARCH, FETCH and LOGOUT.
//!
//! ## Quick Start
//!
//! ```ignore
//! use kng_imap::{Client, Config, FetchAttribute, SearchCriteria, SequenceSet};
//!
//! #[tokio::main]
//! async fn main() -> kng_imap::Result<()> {
//!     let config = Config::new("imap.gmail.com");
//!     let stream = kng_imap::connection::connect(&config).await?;
//!     let client = Client::from_stream(stream, config.io_timeout).await?;
//!
//!     let client = client.login("user@example.com", "password").await?;
//!     let (mut client, status) = client.select("INBOX").await?;
//!     println!("Messages: {}", status.exists);
//!
//!     let ids = client.search(&SearchCriteria::body("FROM no-reply@amazon.com")).await?;
//!     if let Some(set) = SequenceSet::from_ids(ids.iter().map(|n| n.get())) {
//!         let mut stream = client.fetch_stream(&set, &[FetchAttribute::body()]).await?;
//!         while let Some(message) = stream.next().await? {
//!             println!("{} has {} bytes", message.seq, message.body().map_or(0, <[u8]>::len));
//!         }
//!     }
//!
//!     client.logout().await
//! }
//! ```
//!
//! ## Connection States
//!
//! The client uses the type-state pattern so that only commands valid in the
//! current protocol state can be issued:
//!
//! ```text
//! NotAuthenticated ── login() ──→ Authenticated ── select() ──→ Selected
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, SearchCriteria, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, FetchStream, FramedStream, ImapStream, NotAuthenticated,
    Security, Selected,
};
pub use error::{Error, Result};
pub use parser::{FetchItem, FetchedMessage, Response, ResponseParser, UntaggedResponse};
pub use types::{MailboxStatus, SeqNum, SequenceSet, Status, Tag};
