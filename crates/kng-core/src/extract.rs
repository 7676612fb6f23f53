//! Finding notebook exports in notification mail.

use kng_mime::{Charset, Message, Part};
use tracing::{debug, warn};

use crate::note::Note;
use crate::parser::{NoteParser, ParseError};
use crate::title::{NormalizedKey, normalize};

/// Subject prefix of notification mail.
pub const SUBJECT_PREFIX: &str = "Your Kindle Notes";

/// Filename suffix of export attachments.
pub const ATTACHMENT_SUFFIX: &str = ".csv";

/// An export attachment, decoded to UTF-8 but not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvAttachment {
    /// Normalized notebook title.
    pub title: NormalizedKey,
    /// Attachment body text.
    pub body: Vec<u8>,
}

/// A parsed export attachment.
#[derive(Debug)]
pub struct Extracted {
    /// Normalized notebook title.
    pub title: NormalizedKey,
    /// Parsed notes, or why the export could not be read.
    pub result: Result<Vec<Note>, ParseError>,
}

/// Picks export attachments out of decoded messages.
#[derive(Debug, Clone)]
pub struct AttachmentExtractor {
    subject_prefix: String,
    attachment_suffix: String,
}

impl Default for AttachmentExtractor {
    fn default() -> Self {
        Self {
            subject_prefix: SUBJECT_PREFIX.to_string(),
            attachment_suffix: ATTACHMENT_SUFFIX.to_string(),
        }
    }
}

impl AttachmentExtractor {
    /// Creates an extractor for the current notification format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the required subject prefix. Matching is case-sensitive.
    #[must_use]
    pub fn subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    /// Sets the attachment filename suffix.
    #[must_use]
    pub fn attachment_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.attachment_suffix = suffix.into();
        self
    }

    /// True when the decoded subject starts with the configured prefix.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        message
            .decoded_subject()
            .is_some_and(|subject| subject.starts_with(&self.subject_prefix))
    }

    /// Returns every export attachment of a matching message, in part order.
    ///
    /// Messages with another subject yield nothing. Parts whose transfer
    /// encoding is broken are skipped with a warning; charset problems fall
    /// back to a lossy decode.
    #[must_use]
    pub fn attachments(&self, message: &Message) -> Vec<CsvAttachment> {
        if !self.matches(message) {
            debug!(subject = ?message.subject(), "subject does not match, skipping");
            return Vec::new();
        }

        message
            .parts()
            .filter(|part| part.kind().is_csv_attachment(&self.attachment_suffix))
            .filter_map(|part| self.attachment(part))
            .collect()
    }

    /// Returns every export attachment of a matching message, parsed.
    #[must_use]
    pub fn extract(&self, message: &Message, parser: &NoteParser) -> Vec<Extracted> {
        self.attachments(message)
            .into_iter()
            .map(|attachment| Extracted {
                result: parser.parse(attachment.title.as_str(), &attachment.body),
                title: attachment.title,
            })
            .collect()
    }

    fn attachment(&self, part: &Part) -> Option<CsvAttachment> {
        let content_type = part.content_type().unwrap_or_default();
        let name = content_type.name().or_else(|| part.filename())?;
        let raw_title = name.strip_suffix(&self.attachment_suffix).unwrap_or(&name);
        let title = normalize(raw_title);

        let decoded = match part.decode_body() {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(%title, error = %e, "cannot decode attachment, skipping");
                return None;
            }
        };

        let label = content_type.charset().unwrap_or("utf-8");
        let text = Charset::from_label(label)
            .and_then(|charset| charset.decode(&decoded))
            .unwrap_or_else(|e| {
                warn!(%title, error = %e, "charset problem, decoding best-effort");
                Charset::from_label(label)
                    .unwrap_or(Charset::Utf8)
                    .decode_lossy(&decoded)
            });

        Some(CsvAttachment {
            title,
            body: text.into_bytes(),
        })
    }
}
