//! Transfer and header decoding.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 encoded words.

use crate::charset::Charset;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Decodes Base64 data, ignoring embedded whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045) to raw bytes.
///
/// The result is in whatever charset the part declares.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        // Soft line break, with or without CR.
        match data.get(i + 1..) {
            Some([b'\r', b'\n', ..]) => {
                i += 3;
                continue;
            }
            Some([b'\n', ..]) => {
                i += 2;
                continue;
            }
            _ => {}
        }

        let hex = data
            .get(i + 1..i + 3)
            .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".to_string()))?;
        let value = std::str::from_utf8(hex)
            .ok()
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(|| {
                Error::InvalidEncoding(format!("Invalid hex: {}", String::from_utf8_lossy(hex)))
            })?;
        result.push(value);
        i += 3;
    }

    Ok(result)
}

/// Decodes an RFC 2047 encoded header value.
///
/// Encoded words (`=?charset?B|Q?text?=`) may be mixed with plain text.
/// Whitespace between two adjacent encoded words is dropped. Words in an
/// unknown charset are decoded lossily as UTF-8.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    let mut pending_space = String::new();
    let mut last_was_encoded = false;

    while let Some(start) = rest.find("=?") {
        let Some((word, consumed)) = split_encoded_word(&rest[start..]) else {
            result.push_str(&pending_space);
            pending_space.clear();
            result.push_str(&rest[..start + 2]);
            rest = &rest[start + 2..];
            last_was_encoded = false;
            continue;
        };

        let between = &rest[..start];
        if !(last_was_encoded && between.chars().all(char::is_whitespace)) {
            result.push_str(&pending_space);
            result.push_str(between);
        }
        pending_space.clear();

        result.push_str(&decode_encoded_word(word)?);
        last_was_encoded = true;
        rest = &rest[start + consumed..];

        let trimmed = rest.trim_start();
        if trimmed.starts_with("=?") {
            pending_space.push_str(&rest[..rest.len() - trimmed.len()]);
            rest = trimmed;
        }
    }

    result.push_str(&pending_space);
    result.push_str(rest);
    Ok(result)
}

/// Splits `=?charset?enc?text?=` off the front of `s`, returning the inner
/// `charset?enc?text` and the number of bytes consumed.
fn split_encoded_word(s: &str) -> Option<(&str, usize)> {
    let inner = s.strip_prefix("=?")?;
    let first = inner.find('?')?;
    let second = first + 1 + inner[first + 1..].find('?')?;
    let end = second + 1 + inner[second + 1..].find("?=")?;
    let word = &inner[..end];
    if word.contains(char::is_whitespace) {
        return None;
    }
    Some((word, end + 4))
}

fn decode_encoded_word(word: &str) -> Result<String> {
    let mut fields = word.splitn(3, '?');
    let (Some(charset), Some(encoding), Some(encoded)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(Error::InvalidEncoding(format!("Invalid RFC 2047 word: {word}")));
    };
    // RFC 2231 allows a language suffix: utf-8*en
    let charset = charset.split('*').next().unwrap_or(charset);

    let bytes = match encoding {
        "B" | "b" => decode_base64(encoded.as_bytes())?,
        "Q" | "q" => decode_quoted_printable(encoded.replace('_', " ").as_bytes())?,
        other => {
            return Err(Error::InvalidEncoding(format!("Unknown encoding: {other}")));
        }
    };

    Ok(Charset::from_label(charset)
        .unwrap_or(Charset::Utf8)
        .decode_lossy(&bytes))
}
