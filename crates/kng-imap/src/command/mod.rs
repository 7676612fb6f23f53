//! IMAP command builder.
//!
//! This module provides types and serialization for the commands the client
//! issues.

mod tag_generator;

use crate::types::SequenceSet;

pub use tag_generator::TagGenerator;

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: String,
    },
    /// SEARCH command.
    Search {
        /// Search criteria.
        criteria: SearchCriteria,
    },
    /// FETCH command.
    Fetch {
        /// Messages to fetch.
        sequence: SequenceSet,
        /// Data items to fetch.
        items: Vec<FetchAttribute>,
    },
}

impl Command {
    /// Serializes the command with the given tag, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }
            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_astring(&mut buf, mailbox);
            }
            Self::Search { criteria } => {
                buf.extend_from_slice(b"SEARCH ");
                criteria.write(&mut buf);
            }
            Self::Fetch { sequence, items } => {
                buf.extend_from_slice(b"FETCH ");
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_items(&mut buf, items);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns a loggable form of the command with credentials masked.
    #[must_use]
    pub fn redacted(&self, tag: &str) -> String {
        match self {
            Self::Login { username, .. } => format!("{tag} LOGIN {username} ****"),
            other => String::from_utf8_lossy(&other.serialize(tag))
                .trim_end()
                .to_string(),
        }
    }
}

/// FETCH data items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// Message UID.
    Uid,
    /// Size of the message in octets.
    Rfc822Size,
    /// A body section, e.g. `BODY[]` for the whole message.
    Body {
        /// Section specifier; `None` requests the entire message.
        section: Option<String>,
        /// Use `BODY.PEEK`, leaving the `\Seen` flag untouched.
        peek: bool,
    },
}

impl FetchAttribute {
    /// The full message body, `BODY[]`.
    #[must_use]
    pub const fn body() -> Self {
        Self::Body {
            section: None,
            peek: false,
        }
    }

    /// The full message body without setting `\Seen`, `BODY.PEEK[]`.
    #[must_use]
    pub const fn body_peek() -> Self {
        Self::Body {
            section: None,
            peek: true,
        }
    }

    fn write(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Flags => buf.extend_from_slice(b"FLAGS"),
            Self::Uid => buf.extend_from_slice(b"UID"),
            Self::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
            Self::Body { section, peek } => {
                if *peek {
                    buf.extend_from_slice(b"BODY.PEEK[");
                } else {
                    buf.extend_from_slice(b"BODY[");
                }
                if let Some(s) = section {
                    buf.extend_from_slice(s.as_bytes());
                }
                buf.push(b']');
            }
        }
    }
}

/// SEARCH criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Body contains text.
    Body(String),
    /// Header or body contains text.
    Text(String),
    /// From header contains text.
    From(String),
    /// Subject contains text.
    Subject(String),
    /// All of the criteria must match.
    And(Vec<Self>),
}

impl SearchCriteria {
    /// Body contains the given text.
    #[must_use]
    pub fn body(text: impl Into<String>) -> Self {
        Self::Body(text.into())
    }

    fn write(&self, buf: &mut Vec<u8>) {
        match self {
            Self::All => buf.extend_from_slice(b"ALL"),
            Self::Body(s) => write_keyed(buf, b"BODY ", s),
            Self::Text(s) => write_keyed(buf, b"TEXT ", s),
            Self::From(s) => write_keyed(buf, b"FROM ", s),
            Self::Subject(s) => write_keyed(buf, b"SUBJECT ", s),
            Self::And(all) => {
                for (i, c) in all.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    c.write(buf);
                }
            }
        }
    }
}

fn write_keyed(buf: &mut Vec<u8>, key: &[u8], value: &str) {
    buf.extend_from_slice(key);
    write_quoted(buf, value);
}

fn write_fetch_items(buf: &mut Vec<u8>, items: &[FetchAttribute]) {
    if let [single] = items {
        single.write(buf);
        return;
    }
    buf.push(b'(');
    for (i, attr) in items.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        attr.write(buf);
    }
    buf.push(b')');
}

/// Writes an astring (atom or quoted string).
fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        write_quoted(buf, s);
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

fn write_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
}

/// Returns true if the byte needs quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*') || b < 0x20 || b == 0x7F
}
