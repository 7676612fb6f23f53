//! # kng-core
//!
//! Harvests reading notes from "Your Kindle Notes" notification mail.
//!
//! This crate provides:
//! - Title normalization for dedup keys and file names
//! - A parser for the vendor's CSV notebook export
//! - Attachment extraction from notification messages
//! - A background mail fetcher over a [`Mailbox`] session
//! - The completed-notebooks snapshot
//! - Plain-text notebook output
//! - The [`Harvester`] tying it all together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dedup;
mod error;
pub mod extract;
pub mod fetcher;
pub mod mailbox;
pub mod note;
pub mod parser;
pub mod pipeline;
pub mod title;
pub mod writer;

pub use config::{Config, ImapServer};
pub use dedup::{CompletedNotebooks, SetupOutcome};
pub use error::{Error, Result};
pub use extract::{AttachmentExtractor, CsvAttachment, Extracted};
pub use fetcher::{FetchStream, MailFetcher, MessageSink, RawMessage};
pub use mailbox::{ImapMailbox, Mailbox};
pub use note::{Note, NoteKind, Notebook};
pub use parser::{Columns, NoteParser, ParseError};
pub use pipeline::{Harvester, RunSummary, run};
pub use title::{NormalizedKey, denormalize, normalize};
pub use writer::NotebookWriter;
