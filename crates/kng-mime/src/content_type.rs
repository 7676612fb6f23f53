//! MIME content type and content disposition handling.

use crate::charset::Charset;
use crate::encoding::decode_rfc2047;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "application", "multipart"), lowercase.
    pub main_type: String,
    /// Subtype (e.g., "plain", "csv", "mixed"), lowercase.
    pub sub_type: String,
    /// Parameters keyed by lowercase name (e.g., charset, boundary, name).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// The RFC 2045 default, `text/plain; charset=us-ascii`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "us-ascii")
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Returns the `name` parameter with encoded words decoded.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.parameters.get("name").map(|n| decode_param(n))
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type == "text"
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="quoted; value"`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let (type_str, params) = s.split_once(';').unwrap_or((s, ""));

        let (main_type, sub_type) = type_str
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype: {s}")))?;
        let main_type = main_type.trim().to_ascii_lowercase();
        let sub_type = sub_type.trim().to_ascii_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::InvalidContentType(format!("Empty type: {s}")));
        }

        Ok(Self {
            main_type,
            sub_type,
            parameters: parse_parameters(params),
        })
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::text_plain()
    }
}

/// Disposition type of a part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionKind {
    /// Displayed as part of the message.
    Inline,
    /// Meant to be saved separately.
    Attachment,
    /// Any other disposition, lowercase.
    Other(String),
}

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type.
    pub kind: DispositionKind,
    /// Parameters keyed by lowercase name.
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a disposition header value. Never fails; unknown types are kept.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let (kind, params) = s.split_once(';').unwrap_or((s, ""));
        let kind = match kind.trim().to_ascii_lowercase().as_str() {
            "inline" => DispositionKind::Inline,
            "attachment" => DispositionKind::Attachment,
            other => DispositionKind::Other(other.to_string()),
        };
        Self {
            kind,
            parameters: parse_parameters(params),
        }
    }

    /// Returns the `filename` parameter with encoded words decoded.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.parameters.get("filename").map(|n| decode_param(n))
    }

    /// True for any disposition other than inline.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind != DispositionKind::Inline
    }
}

fn decode_param(value: &str) -> String {
    if value.contains("=?") {
        decode_rfc2047(value).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

/// Parses `; key=value` parameter lists, including RFC 2231 extended values
/// (`key*=charset'lang'pct-encoded`) and continuations (`key*0`, `key*1*`).
fn parse_parameters(s: &str) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    let mut sections: BTreeMap<(String, u32), (String, bool)> = BTreeMap::new();

    for segment in split_unquoted(s) {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = unquote(value.trim());
        let (key, extended) = match key.strip_suffix('*') {
            Some(base) => (base.to_string(), true),
            None => (key, false),
        };

        match key.split_once('*') {
            Some((base, index)) => {
                if let Ok(index) = index.parse::<u32>() {
                    sections.insert((base.to_string(), index), (value, extended));
                }
            }
            None if extended => {
                let (charset, encoded) = split_charset(&value);
                parameters.insert(key, charset.decode_lossy(&percent_decode(encoded)));
            }
            None => {
                parameters.entry(key).or_insert(value);
            }
        }
    }

    let mut assembled: BTreeMap<String, (Vec<u8>, Charset)> = BTreeMap::new();
    for ((base, index), (value, extended)) in sections {
        let (bytes, charset) = assembled
            .entry(base)
            .or_insert_with(|| (Vec::new(), Charset::Utf8));
        if extended {
            let encoded = if index == 0 {
                let (declared, rest) = split_charset(&value);
                *charset = declared;
                rest
            } else {
                value.as_str()
            };
            bytes.extend(percent_decode(encoded));
        } else {
            bytes.extend_from_slice(value.as_bytes());
        }
    }
    for (base, (bytes, charset)) in assembled {
        parameters.insert(base, charset.decode_lossy(&bytes));
    }

    parameters
}

/// Splits on `;` outside double quotes.
fn split_unquoted(s: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&s[start..]);
    segments
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Splits `charset'language'text`, defaulting to UTF-8.
fn split_charset(value: &str) -> (Charset, &str) {
    let mut fields = value.splitn(3, '\'');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(charset), Some(_), Some(text)) => {
            (Charset::from_label(charset).unwrap_or(Charset::Utf8), text)
        }
        _ => (Charset::Utf8, value),
    }
}

fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(value) = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
        {
            out.push(value);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}
