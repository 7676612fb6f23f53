//! Byte-level lexer for IMAP server responses.
//!
//! Works over a complete response as produced by
//! [`FramedStream::read_response`](crate::FramedStream::read_response), with
//! literals already inlined after their `{n}\r\n` marker.

use crate::{Error, Result};

/// IMAP lexer state.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Peeks at the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Advances by one byte and returns it.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Builds a parse error at the current position.
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.into(),
        }
    }

    /// Consumes the expected byte or fails.
    pub fn expect(&mut self, expected: u8) -> Result<()> {
        match self.advance() {
            Some(b) if b == expected => Ok(()),
            Some(b) => {
                self.pos -= 1;
                Err(self.error(format!(
                    "expected '{}', got '{}'",
                    expected as char, b as char
                )))
            }
            None => Err(self.error(format!("expected '{}', got end of input", expected as char))),
        }
    }

    /// Consumes a single space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(b' ')
    }

    /// Skips any run of spaces.
    pub fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    /// Returns true if only the line terminator (or nothing) remains.
    #[must_use]
    pub fn at_line_end(&self) -> bool {
        matches!(self.peek(), None | Some(b'\r' | b'\n'))
    }

    /// Reads an atom: a run of bytes up to a space, bracket, parenthesis or
    /// line end.
    pub fn read_atom(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b' ' | b'(' | b')' | b'[' | b']' | b'{' | b'"' | b'\r' | b'\n') {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected atom"));
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("atom is not valid UTF-8"))
    }

    /// Reads an unsigned decimal number.
    pub fn read_number(&mut self) -> Result<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected number"));
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("number out of range"))
    }

    /// Returns true if the next byte is an ASCII digit.
    #[must_use]
    pub fn at_digit(&self) -> bool {
        self.peek().is_some_and(|b| b.is_ascii_digit())
    }

    /// Reads a quoted string, resolving backslash escapes.
    pub fn read_quoted(&mut self) -> Result<Vec<u8>> {
        self.expect(b'"')?;
        let mut out = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => return Ok(out),
                Some(b'\\') => match self.advance() {
                    Some(b) => out.push(b),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(b'\r' | b'\n') | None => return Err(self.error("unterminated quoted string")),
                Some(b) => out.push(b),
            }
        }
    }

    /// Reads a literal: `{n}\r\n` followed by exactly `n` bytes.
    pub fn read_literal(&mut self) -> Result<&'a [u8]> {
        self.expect(b'{')?;
        let len = self.read_number()? as usize;
        if self.peek() == Some(b'+') {
            self.pos += 1;
        }
        self.expect(b'}')?;
        self.expect(b'\r')?;
        self.expect(b'\n')?;
        let end = self.pos + len;
        if end > self.input.len() {
            return Err(self.error(format!("literal of {len} bytes is truncated")));
        }
        let data = &self.input[self.pos..end];
        self.pos = end;
        Ok(data)
    }

    /// Reads an `nstring`: `NIL`, a quoted string, or a literal.
    pub fn read_nstring(&mut self) -> Result<Option<Vec<u8>>> {
        match self.peek() {
            Some(b'"') => self.read_quoted().map(Some),
            Some(b'{') => self.read_literal().map(|d| Some(d.to_vec())),
            _ => {
                let atom = self.read_atom()?;
                if atom.eq_ignore_ascii_case("NIL") {
                    Ok(None)
                } else {
                    Err(self.error(format!("expected nstring, got {atom}")))
                }
            }
        }
    }

    /// Reads bytes up to (not including) the closing delimiter and consumes it.
    pub fn read_until(&mut self, delimiter: u8) -> Result<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == delimiter {
                let text = std::str::from_utf8(&self.input[start..self.pos])
                    .map_err(|_| self.error("text is not valid UTF-8"))?;
                self.pos += 1;
                return Ok(text);
            }
            if matches!(b, b'\r' | b'\n') {
                break;
            }
            self.pos += 1;
        }
        Err(self.error(format!("missing '{}'", delimiter as char)))
    }

    /// Reads the rest of the line as text, excluding the CRLF.
    #[must_use]
    pub fn read_text_until_crlf(&mut self) -> String {
        let start = self.pos;
        while !self.at_line_end() {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    /// Skips one value of any shape: atom, number, quoted string, literal or
    /// parenthesized list.
    pub fn skip_value(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'"') => self.read_quoted().map(drop),
            Some(b'{') => self.read_literal().map(drop),
            Some(b'(') => {
                self.pos += 1;
                loop {
                    self.skip_spaces();
                    match self.peek() {
                        Some(b')') => {
                            self.pos += 1;
                            return Ok(());
                        }
                        None => return Err(self.error("unterminated list")),
                        _ => self.skip_value()?,
                    }
                }
            }
            _ => {
                self.read_atom()?;
                // Atoms such as BODY[HEADER] carry a bracketed suffix.
                if self.peek() == Some(b'[') {
                    self.pos += 1;
                    self.read_until(b']')?;
                }
                Ok(())
            }
        }
    }
}
