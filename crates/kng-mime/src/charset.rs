//! Character set decoding.
//!
//! Mail bodies and encoded words name their charset. Only the handful that
//! show up in notification mail are supported; anything else is reported as
//! [`Error::UnknownCharset`] so the caller can fall back to a lossy read.

use crate::error::{Error, Result};

/// A supported character set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// UTF-8.
    Utf8,
    /// US-ASCII, decoded as its UTF-8 superset.
    UsAscii,
    /// ISO-8859-1.
    Latin1,
    /// Windows-1252.
    Windows1252,
}

/// Windows-1252 code points for bytes 0x80..=0x9F. Unassigned bytes map to
/// the C1 control with the same value.
const WINDOWS_1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

impl Charset {
    /// Resolves a charset label as found in a `charset=` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCharset`] for unsupported labels.
    pub fn from_label(label: &str) -> Result<Self> {
        let normalized = label.trim().trim_matches('"').to_ascii_lowercase();
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "us-ascii" | "ascii" => Ok(Self::UsAscii),
            "iso-8859-1" | "iso_8859-1" | "latin1" | "l1" => Ok(Self::Latin1),
            "windows-1252" | "cp1252" => Ok(Self::Windows1252),
            _ => Err(Error::UnknownCharset(label.trim().to_string())),
        }
    }

    /// Decodes bytes strictly.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid in this charset.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 | Self::UsAscii => String::from_utf8(bytes.to_vec()).map_err(Into::into),
            Self::Latin1 | Self::Windows1252 => Ok(self.decode_lossy(bytes)),
        }
    }

    /// Decodes bytes, replacing invalid sequences with U+FFFD.
    #[must_use]
    pub fn decode_lossy(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 | Self::UsAscii => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => WINDOWS_1252_HIGH[usize::from(b - 0x80)],
                    _ => char::from(b),
                })
                .collect(),
        }
    }
}

/// Decodes bytes in the named charset.
///
/// # Errors
///
/// Returns an error for unknown charsets or invalid input.
pub fn decode(bytes: &[u8], label: &str) -> Result<String> {
    Charset::from_label(label)?.decode(bytes)
}
