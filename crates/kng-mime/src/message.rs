//! MIME message structure and handling.

use crate::charset::Charset;
use crate::content_type::{ContentDisposition, ContentType, DispositionKind};
use crate::encoding::{decode_base64, decode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Deepest multipart nesting accepted.
const MAX_DEPTH: usize = 16;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Classification of a MIME part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartKind {
    /// A leaf that is neither marked inline nor plain `text/*`.
    Attachment {
        /// Disposition filename, falling back to the content-type name.
        filename: Option<String>,
    },
    /// A leaf part shown in the message body.
    Inline {
        /// `type/subtype` of the part.
        content_type: String,
    },
    /// A container of further parts.
    Multipart,
}

impl PartKind {
    /// True for attachments whose filename ends with `suffix`.
    #[must_use]
    pub fn is_csv_attachment(&self, suffix: &str) -> bool {
        matches!(self, Self::Attachment { filename: Some(name) } if name.ends_with(suffix))
    }
}

/// MIME message part.
///
/// Leaf parts carry their still-encoded body; multipart containers carry
/// their child parts instead.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body (raw bytes, transfer-encoded). Empty for multipart parts.
    pub body: Vec<u8>,
    /// Child parts of a multipart container.
    pub children: Vec<Part>,
}

impl Part {
    /// Creates a new leaf part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            body,
            children: Vec::new(),
        }
    }

    fn parse(raw: &[u8], depth: usize) -> Result<Self> {
        let (head, body) = split_head(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(head));
        let mut part = Self::new(headers, Vec::new());

        let content_type = part.content_type().ok();
        match content_type {
            Some(ct) if ct.is_multipart() => {
                if depth >= MAX_DEPTH {
                    return Err(Error::InvalidMultipart("nesting too deep".to_string()));
                }
                let boundary = ct.boundary().ok_or(Error::MissingBoundary)?;
                part.children = split_multipart(body, boundary)?
                    .into_iter()
                    .map(|section| Self::parse(section, depth + 1))
                    .collect::<Result<_>>()?;
            }
            _ => part.body = body.to_vec(),
        }

        Ok(part)
    }

    /// Gets the content type, defaulting to `text/plain` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the content disposition, if the header is present.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Classifies this part.
    ///
    /// A leaf is inline when its disposition says so, or when it is `text/*`
    /// and not explicitly an attachment. Every other leaf is an attachment,
    /// with or without a `Content-Disposition` header.
    #[must_use]
    pub fn kind(&self) -> PartKind {
        let content_type = self.content_type().unwrap_or_default();
        if content_type.is_multipart() {
            return PartKind::Multipart;
        }

        let disposition = self.disposition().map(|d| d.kind);
        let inline = match disposition {
            Some(DispositionKind::Inline) => true,
            Some(DispositionKind::Attachment) => false,
            _ => content_type.is_text(),
        };
        if inline {
            PartKind::Inline {
                content_type: content_type.essence(),
            }
        } else {
            PartKind::Attachment {
                filename: self.filename(),
            }
        }
    }

    /// The attachment-style filename: the disposition `filename`, else the
    /// content-type `name`.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.filename())
            .or_else(|| self.content_type().ok().and_then(|ct| ct.name()))
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&self.body),
            TransferEncoding::QuotedPrintable => decode_quoted_printable(&self.body),
            _ => Ok(self.body.clone()),
        }
    }

    /// Gets the decoded body as text in the declared charset.
    ///
    /// # Errors
    ///
    /// Returns an error if transfer decoding fails, the charset is unknown,
    /// or the bytes are invalid in it.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        let content_type = self.content_type()?;
        let charset = Charset::from_label(content_type.charset().unwrap_or("us-ascii"))?;
        charset.decode(&decoded)
    }
}

/// A parsed MIME message.
#[derive(Debug, Clone)]
pub struct Message {
    root: Part,
}

impl Message {
    /// Parses a raw RFC 5322 message, splitting multipart bodies recursively.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart body has no boundary or no parts.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        Ok(Self {
            root: Part::parse(raw, 0)?,
        })
    }

    /// Top-level message headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// The top-level entity.
    #[must_use]
    pub const fn root(&self) -> &Part {
        &self.root
    }

    /// Gets the raw Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.root.headers.get("subject")
    }

    /// Gets the Subject header with encoded words decoded.
    #[must_use]
    pub fn decoded_subject(&self) -> Option<String> {
        self.root.headers.decoded("subject")
    }

    /// Gets the From header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.root.headers.get("from")
    }

    /// Walks every part depth-first in document order.
    ///
    /// Nested multipart containers are yielded before their children. A
    /// single-part message yields itself.
    #[must_use]
    pub fn parts(&self) -> Parts<'_> {
        let stack = if self.root.children.is_empty() {
            vec![&self.root]
        } else {
            self.root.children.iter().rev().collect()
        };
        Parts { stack }
    }
}

/// Depth-first iterator over message parts.
#[derive(Debug)]
pub struct Parts<'a> {
    stack: Vec<&'a Part>,
}

impl<'a> Iterator for Parts<'a> {
    type Item = &'a Part;

    fn next(&mut self) -> Option<Self::Item> {
        let part = self.stack.pop()?;
        self.stack.extend(part.children.iter().rev());
        Some(part)
    }
}

/// Splits a raw entity at the first empty line.
fn split_head(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.starts_with(b"\r\n") {
        return (&[], &raw[2..]);
    }
    if raw.starts_with(b"\n") {
        return (&[], &raw[1..]);
    }

    let crlf = find(raw, b"\r\n\r\n", 0).map(|i| (i, i + 4));
    let lf = find(raw, b"\n\n", 0).map(|i| (i, i + 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    match split {
        Some((head_end, body_start)) => (&raw[..head_end], &raw[body_start..]),
        None => (raw, &[]),
    }
}

/// Splits a multipart body into its raw sections.
///
/// A missing close delimiter is tolerated; the last section runs to the end.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<&'a [u8]>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut sections = Vec::new();
    let mut start: Option<usize> = None;
    let mut pos = 0;

    while let Some(found) = find(body, delimiter, pos) {
        let after = found + delimiter.len();
        if found > 0 && body[found - 1] != b'\n' {
            pos = after;
            continue;
        }

        if let Some(begin) = start {
            sections.push(trim_line_break(&body[begin..found]));
        }
        if body[after..].starts_with(b"--") {
            return Ok(sections);
        }

        let next = find(body, b"\n", after).map_or(body.len(), |n| n + 1);
        start = Some(next);
        pos = next;
    }

    match start {
        Some(begin) => {
            if begin < body.len() {
                sections.push(trim_line_break(&body[begin..]));
            }
            Ok(sections)
        }
        None => Err(Error::InvalidMultipart(format!(
            "no delimiter for boundary {boundary:?}"
        ))),
    }
}

/// Drops the line break that belongs to the following delimiter.
fn trim_line_break(section: &[u8]) -> &[u8] {
    section
        .strip_suffix(b"\r\n")
        .or_else(|| section.strip_suffix(b"\n"))
        .unwrap_or(section)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KINDLE_MAIL: &str = concat!(
        "From: Amazon Kindle <no-reply@amazon.com>\r\n",
        "Subject: Your Kindle Notes From Other Book Notebook\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/mixed;\r\n",
        "\tboundary=\"----=_Part_1\"\r\n",
        "\r\n",
        "This is a multi-part message in MIME format.\r\n",
        "------=_Part_1\r\n",
        "Content-Type: multipart/alternative; boundary=alt\r\n",
        "\r\n",
        "--alt\r\n",
        "Content-Type: text/plain; charset=UTF-8\r\n",
        "Content-Transfer-Encoding: quoted-printable\r\n",
        "\r\n",
        "Your notes are attached =E2=80=94 enjoy.\r\n",
        "--alt\r\n",
        "Content-Type: text/html; charset=UTF-8\r\n",
        "\r\n",
        "<p>Your notes are attached</p>\r\n",
        "--alt--\r\n",
        "------=_Part_1\r\n",
        "Content-Type: text/csv; charset=UTF-8; name=\"Other Book Notebook.csv\"\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "Content-Disposition: attachment; filename=\"Other Book Notebook.csv\"\r\n",
        "\r\n",
        "SGlnaGxpZ2h0\r\n",
        "------=_Part_1--\r\n",
    );

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(" Base64 "), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::QuotedPrintable.to_string(), "quoted-printable");
    }

    #[test]
    fn test_single_part() {
        let message =
            Message::parse(b"From: a@example.com\nSubject: Hi\n\nHello, World!").unwrap();

        assert_eq!(message.subject(), Some("Hi"));
        assert_eq!(message.from(), Some("a@example.com"));
        let parts: Vec<&Part> = message.parts().collect();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].body_text().unwrap(), "Hello, World!");
        assert_eq!(
            parts[0].kind(),
            PartKind::Inline {
                content_type: "text/plain".to_string()
            }
        );
    }

    #[test]
    fn test_nested_multipart_walk() {
        let message = Message::parse(KINDLE_MAIL.as_bytes()).unwrap();
        let kinds: Vec<PartKind> = message.parts().map(Part::kind).collect();

        assert_eq!(
            kinds,
            vec![
                PartKind::Multipart,
                PartKind::Inline {
                    content_type: "text/plain".to_string()
                },
                PartKind::Inline {
                    content_type: "text/html".to_string()
                },
                PartKind::Attachment {
                    filename: Some("Other Book Notebook.csv".to_string())
                },
            ]
        );
        assert!(kinds[3].is_csv_attachment(".csv"));
        assert!(!kinds[1].is_csv_attachment(".csv"));
    }

    #[test]
    fn test_part_bodies_decode() {
        let message = Message::parse(KINDLE_MAIL.as_bytes()).unwrap();
        let parts: Vec<&Part> = message.parts().collect();

        assert_eq!(parts[1].body_text().unwrap(), "Your notes are attached \u{2014} enjoy.");
        assert_eq!(parts[3].decode_body().unwrap(), b"Highlight");
        assert_eq!(parts[3].filename().as_deref(), Some("Other Book Notebook.csv"));
    }

    #[test]
    fn test_attachment_name_falls_back_to_content_type() {
        let part = Part::parse(
            b"Content-Type: text/csv; name=\"Some Book.csv\"\r\nContent-Disposition: attachment\r\n\r\nx",
            0,
        )
        .unwrap();
        assert!(part.kind().is_csv_attachment(".csv"));
        assert_eq!(part.filename().as_deref(), Some("Some Book.csv"));
    }

    #[test]
    fn test_attachment_without_disposition() {
        let part = Part::parse(
            b"Content-Type: application/octet-stream; name=\"Book.csv\"\r\n\r\nx",
            0,
        )
        .unwrap();
        assert_eq!(
            part.kind(),
            PartKind::Attachment {
                filename: Some("Book.csv".to_string())
            }
        );
    }

    #[test]
    fn test_disposition_overrides_text_default() {
        let inline_csv = Part::parse(
            b"Content-Type: text/csv; name=\"Book.csv\"\r\nContent-Disposition: inline\r\n\r\nx",
            0,
        )
        .unwrap();
        assert!(!inline_csv.kind().is_csv_attachment(".csv"));

        let inline_pdf =
            Part::parse(b"Content-Type: application/pdf\r\nContent-Disposition: inline\r\n\r\nx", 0)
                .unwrap();
        assert_eq!(
            inline_pdf.kind(),
            PartKind::Inline {
                content_type: "application/pdf".to_string()
            }
        );

        let odd_text =
            Part::parse(b"Content-Type: text/csv\r\nContent-Disposition: x-other\r\n\r\nx", 0)
                .unwrap();
        assert!(matches!(odd_text.kind(), PartKind::Inline { .. }));
    }

    #[test]
    fn test_missing_boundary() {
        let result = Message::parse(b"Content-Type: multipart/mixed\r\n\r\nbody");
        assert!(matches!(result, Err(Error::MissingBoundary)));
    }

    #[test]
    fn test_no_delimiter() {
        let result = Message::parse(b"Content-Type: multipart/mixed; boundary=x\r\n\r\nbody");
        assert!(matches!(result, Err(Error::InvalidMultipart(_))));
    }

    #[test]
    fn test_unterminated_multipart() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\n\n--b\n\nfirst\n--b\n\nsecond\n";
        let message = Message::parse(raw).unwrap();
        let bodies: Vec<&[u8]> = message.parts().map(|p| p.body.as_slice()).collect();
        assert_eq!(bodies, vec![&b"first"[..], &b"second"[..]]);
    }

    #[test]
    fn test_delimiter_must_start_line() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\n\n--b\n\nsee --b inline\n--b--\n";
        let message = Message::parse(raw).unwrap();
        let parts: Vec<&Part> = message.parts().collect();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].body, b"see --b inline");
    }

    #[test]
    fn test_unknown_charset() {
        let part = Part::parse(b"Content-Type: text/plain; charset=x-unknown\r\n\r\nhi", 0).unwrap();
        assert!(matches!(part.body_text(), Err(Error::UnknownCharset(_))));
    }
}
